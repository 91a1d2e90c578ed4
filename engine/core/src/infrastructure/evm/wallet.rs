// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

// JSON-RPC Wallet Adapter
//
// Implements the wallet capability over an EIP-1193 style JSON-RPC endpoint
// (external signer or a node with managed accounts).

use alloy_primitives::Address;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::json_rpc::{JsonRpcClient, RpcError};
use crate::domain::session::{SessionError, WalletCapability};

pub struct JsonRpcWallet {
    rpc: Arc<JsonRpcClient>,
}

impl JsonRpcWallet {
    pub fn new(rpc: Arc<JsonRpcClient>) -> Self {
        Self { rpc }
    }
}

fn session_error(err: RpcError) -> SessionError {
    if err.is_user_rejection() {
        SessionError::PermissionDenied(err.to_string())
    } else {
        SessionError::WalletUnavailable(err.to_string())
    }
}

#[async_trait]
impl WalletCapability for JsonRpcWallet {
    async fn authorized_accounts(&self) -> Result<Vec<Address>, SessionError> {
        self.rpc
            .call("eth_accounts", json!([]))
            .await
            .map_err(session_error)
    }

    async fn request_permissions(&self) -> Result<bool, SessionError> {
        match self
            .rpc
            .call::<Value>("wallet_requestPermissions", json!([{ "eth_accounts": {} }]))
            .await
        {
            // A granted request returns the list of permissions
            Ok(Value::Array(granted)) => Ok(!granted.is_empty()),
            Ok(Value::Null) => Ok(false),
            Ok(_) => Ok(true),
            // Node-managed accounts have no permission prompt
            Err(err) if err.is_method_not_found() => Ok(true),
            Err(err) => Err(session_error(err)),
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, SessionError> {
        self.rpc
            .call("eth_requestAccounts", json!([]))
            .await
            .map_err(session_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    async fn wallet_with(server: &mut mockito::ServerGuard, method: &str, body: &str) -> JsonRpcWallet {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        JsonRpcWallet::new(Arc::new(JsonRpcClient::new(server.url(), Duration::from_secs(5)).unwrap()))
    }

    #[tokio::test]
    async fn test_authorized_accounts() {
        let mut server = mockito::Server::new_async().await;
        let wallet = wallet_with(
            &mut server,
            "eth_accounts",
            r#"{"jsonrpc":"2.0","id":1,"result":["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"]}"#,
        )
        .await;
        let accounts = wallet.authorized_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
    }

    #[tokio::test]
    async fn test_user_rejection_is_permission_denied() {
        let mut server = mockito::Server::new_async().await;
        let wallet = wallet_with(
            &mut server,
            "eth_requestAccounts",
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected the request."}}"#,
        )
        .await;
        let err = wallet.request_accounts().await.unwrap_err();
        assert!(matches!(err, SessionError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_missing_permission_method_counts_as_granted() {
        let mut server = mockito::Server::new_async().await;
        let wallet = wallet_with(
            &mut server,
            "wallet_requestPermissions",
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method wallet_requestPermissions not found"}}"#,
        )
        .await;
        assert!(wallet.request_permissions().await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_wallet_is_unavailable() {
        let wallet = JsonRpcWallet::new(Arc::new(
            JsonRpcClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap(),
        ));
        let err = wallet.authorized_accounts().await.unwrap_err();
        assert!(matches!(err, SessionError::WalletUnavailable(_)));
    }
}
