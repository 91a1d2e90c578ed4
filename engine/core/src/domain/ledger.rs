// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Ledger
//!
//! Domain port for the agreement contract on the ledger.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Typed facade over create / subscribe / report / terminate and
//!   the alive / terminated reads. Implementations live in
//!   `crate::infrastructure::evm`.
//!
//! Every mutating call blocks until the submitted transaction is final and
//! returns its [`TxReceipt`]. Reads need no session. Settlement and
//! compensation arithmetic are performed by the contract and are opaque here.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::agreement::{Agreement, AgreementIndex, AvailabilityTarget};
use crate::domain::session::Session;
use crate::domain::tenant::TenantId;

/// Terms submitted with `createChildContract`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementTerms {
    pub customer_id: TenantId,
    pub availability_target: AvailabilityTarget,
    /// Allocated vCPUs at creation time
    pub allocated_capacity: u64,
    pub monitoring_period: u64,
}

/// Proof that a transaction reached finality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// `createChildContract`. The caller has already validated the terms.
    async fn create_agreement(&self, session: &Session, terms: &AgreementTerms) -> Result<TxReceipt, LedgerError>;

    /// `subscribe()` on the agreement contract, paying `stake` wei
    async fn subscribe(&self, session: &Session, contract: Address, stake: U256) -> Result<TxReceipt, LedgerError>;

    /// `addUsageData(observed)` on the agreement contract
    async fn report_usage(&self, session: &Session, contract: Address, observed_available: u64) -> Result<TxReceipt, LedgerError>;

    /// `terminateChildContract(index)`; triggers ledger-side settlement
    async fn terminate(&self, session: &Session, index: AgreementIndex) -> Result<TxReceipt, LedgerError>;

    async fn list_alive(&self, customer_id: &TenantId) -> Result<Vec<Agreement>, LedgerError>;

    async fn list_terminated(&self, customer_id: &TenantId) -> Result<Vec<Agreement>, LedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The signer or the ledger declined the transaction
    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    /// A contract precondition failed
    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("Ledger network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Transaction {tx_hash} not confirmed within {waited_secs}s")]
    ConfirmationTimeout { tx_hash: B256, waited_secs: u64 },

    #[error("Malformed ledger response: {0}")]
    Decode(String),
}
