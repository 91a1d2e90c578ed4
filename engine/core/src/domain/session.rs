// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Session
//!
//! Identity authorized to submit ledger transactions, and the wallet
//! capability port used to obtain it. The wallet itself (browser extension,
//! node-managed keystore, hardware signer) is external; only the
//! EIP-1193-style request contract below is relied upon.

use alloy_primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which flow requested the authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    /// Creates and terminates agreements
    Provider,
    /// Subscribes to agreements and reports usage
    Current,
}

impl std::fmt::Display for SessionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider => write!(f, "provider"),
            Self::Current => write!(f, "current"),
        }
    }
}

/// An active authorization. Passed by value to every ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub address: Address,
    pub role: SessionRole,
}

impl Session {
    pub fn provider(address: Address) -> Self {
        Self { address, role: SessionRole::Provider }
    }

    pub fn current(address: Address) -> Self {
        Self { address, role: SessionRole::Current }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Authorized(Session),
}

/// Wallet capability contract (`eth_accounts`, `wallet_requestPermissions`,
/// `eth_requestAccounts`)
#[async_trait]
pub trait WalletCapability: Send + Sync {
    /// Accounts already authorized, without prompting. Empty when revoked.
    async fn authorized_accounts(&self) -> Result<Vec<Address>, SessionError>;

    /// Prompt for account permission. `Ok(false)` when the grant was not given.
    async fn request_permissions(&self) -> Result<bool, SessionError>;

    /// Prompt for account access and return the selected accounts
    async fn request_accounts(&self) -> Result<Vec<Address>, SessionError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Wallet capability unavailable: {0}")]
    WalletUnavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}
