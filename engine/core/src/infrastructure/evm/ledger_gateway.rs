// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! EVM Ledger Gateway
//!
//! [`LedgerGateway`] over Ethereum JSON-RPC.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** ABI-encode agreement calls, submit them through the signer
//!   endpoint as the session account, and wait for a mined receipt
//! - **Integration:** Signer (`eth_sendTransaction`) → Node (`eth_getTransactionReceipt`, `eth_call`)
//!
//! Finality is a mined receipt with `status == 1`. The wait is bounded by the
//! configured confirmation timeout; nothing is retried.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::contracts::{IChildContract, IParentContract};
use super::json_rpc::{JsonRpcClient, RpcError};
use crate::domain::agreement::{Agreement, AgreementIndex};
use crate::domain::ledger::{AgreementTerms, LedgerError, LedgerGateway, TxReceipt};
use crate::domain::session::Session;
use crate::domain::tenant::TenantId;

#[derive(Serialize)]
struct TransactionRequest {
    from: Address,
    to: Address,
    data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<U256>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    status: Option<U64>,
}

pub struct EvmLedgerGateway {
    /// Node used for reads and receipt polling
    rpc: Arc<JsonRpcClient>,
    /// Endpoint that signs and submits transactions for the session account
    signer: Arc<JsonRpcClient>,
    parent_contract: Address,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl EvmLedgerGateway {
    pub fn new(
        rpc: Arc<JsonRpcClient>,
        signer: Arc<JsonRpcClient>,
        parent_contract: Address,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            rpc,
            signer,
            parent_contract,
            confirmation_timeout,
            poll_interval,
        }
    }

    async fn send_transaction(
        &self,
        session: &Session,
        to: Address,
        data: Vec<u8>,
        value: Option<U256>,
    ) -> Result<TxReceipt, LedgerError> {
        let request = TransactionRequest {
            from: session.address,
            to,
            data: Bytes::from(data),
            value,
        };

        let tx_hash: B256 = self
            .signer
            .call("eth_sendTransaction", json!([request]))
            .await
            .map_err(ledger_error)?;

        info!(tx_hash = %tx_hash, from = %session.address, to = %to, "Transaction submitted, waiting for confirmation");

        match tokio::time::timeout(self.confirmation_timeout, self.wait_for_receipt(tx_hash)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(tx_hash = %tx_hash, "Confirmation wait timed out");
                Err(LedgerError::ConfirmationTimeout {
                    tx_hash,
                    waited_secs: self.confirmation_timeout.as_secs(),
                })
            }
        }
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, LedgerError> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .rpc
                .call("eth_getTransactionReceipt", json!([tx_hash]))
                .await
                .map_err(ledger_error)?;

            match receipt {
                Some(receipt) => {
                    let block_number = receipt.block_number.map(|n| n.to::<u64>());
                    if receipt.status == Some(U64::ZERO) {
                        return Err(LedgerError::TransactionReverted(format!(
                            "transaction {} reverted in block {}",
                            receipt.transaction_hash,
                            block_number.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string())
                        )));
                    }
                    info!(tx_hash = %receipt.transaction_hash, block = ?block_number, "Transaction confirmed");
                    return Ok(TxReceipt {
                        tx_hash: receipt.transaction_hash,
                        block_number,
                    });
                }
                None => {
                    debug!(tx_hash = %tx_hash, "Receipt not yet available");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn call_view<C: SolCall>(&self, call: &C) -> Result<C::Return, LedgerError> {
        let params = json!([
            { "to": self.parent_contract, "data": Bytes::from(call.abi_encode()) },
            "latest"
        ]);

        let raw: Bytes = self.rpc.call("eth_call", params).await.map_err(ledger_error)?;

        C::abi_decode_returns(&raw, true)
            .map_err(|e| LedgerError::Decode(format!("{}: {}", C::SIGNATURE, e)))
    }
}

fn into_agreements(infos: Vec<IParentContract::ChildContractInfo>) -> Result<Vec<Agreement>, LedgerError> {
    infos.into_iter().map(Agreement::try_from).collect()
}

/// Map a JSON-RPC failure onto the ledger error taxonomy
fn ledger_error(err: RpcError) -> LedgerError {
    if err.is_user_rejection() {
        return LedgerError::TransactionRejected(err.to_string());
    }
    if err.is_revert() {
        let reason = err
            .revert_data()
            .and_then(|data| Bytes::from_str(data).ok())
            .and_then(|data| alloy_sol_types::decode_revert_reason(&data))
            .unwrap_or_else(|| err.to_string());
        return LedgerError::TransactionReverted(reason);
    }
    match err {
        RpcError::Transport(reason) => LedgerError::NetworkUnavailable(reason),
        RpcError::Decode(reason) => LedgerError::Decode(reason),
        RpcError::Rpc { code, message, .. } => {
            LedgerError::TransactionRejected(format!("rpc error {}: {}", code, message))
        }
    }
}

#[async_trait]
impl LedgerGateway for EvmLedgerGateway {
    async fn create_agreement(&self, session: &Session, terms: &AgreementTerms) -> Result<TxReceipt, LedgerError> {
        let call = IParentContract::createChildContractCall {
            customerId: terms.customer_id.as_str().to_string(),
            serviceAvailabilityAgreement: U256::from(terms.availability_target.percent()),
            allocatedVcpus: U256::from(terms.allocated_capacity),
            monitoringPeriod: U256::from(terms.monitoring_period),
        };
        self.send_transaction(session, self.parent_contract, call.abi_encode(), None)
            .await
    }

    async fn subscribe(&self, session: &Session, contract: Address, stake: U256) -> Result<TxReceipt, LedgerError> {
        let call = IChildContract::subscribeCall {};
        self.send_transaction(session, contract, call.abi_encode(), Some(stake))
            .await
    }

    async fn report_usage(&self, session: &Session, contract: Address, observed_available: u64) -> Result<TxReceipt, LedgerError> {
        let call = IChildContract::addUsageDataCall {
            availableVcpus: U256::from(observed_available),
        };
        self.send_transaction(session, contract, call.abi_encode(), None)
            .await
    }

    async fn terminate(&self, session: &Session, index: AgreementIndex) -> Result<TxReceipt, LedgerError> {
        let call = IParentContract::terminateChildContractCall {
            index: U256::from(index.0),
        };
        self.send_transaction(session, self.parent_contract, call.abi_encode(), None)
            .await
    }

    async fn list_alive(&self, customer_id: &TenantId) -> Result<Vec<Agreement>, LedgerError> {
        let call = IParentContract::getAliveContractsByCustomerIdCall {
            customerId: customer_id.as_str().to_string(),
        };
        into_agreements(self.call_view(&call).await?._0)
    }

    async fn list_terminated(&self, customer_id: &TenantId) -> Result<Vec<Agreement>, LedgerError> {
        let call = IParentContract::getTerminatedContractsByCustomerIdCall {
            customerId: customer_id.as_str().to_string(),
        };
        into_agreements(self.call_view(&call).await?._0)
    }
}
