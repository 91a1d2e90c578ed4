// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Ethereum ledger adapters

pub mod contracts;
pub mod json_rpc;
pub mod ledger_gateway;
pub mod wallet;

pub use json_rpc::JsonRpcClient;
pub use ledger_gateway::EvmLedgerGateway;
pub use wallet::JsonRpcWallet;
