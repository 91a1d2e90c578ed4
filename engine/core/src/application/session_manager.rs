// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Session Manager
//!
//! Obtains and caches the account authorized to sign ledger writes.
//!
//! - The **provider** session is cached. While the wallet keeps reporting the
//!   cached address as authorized no prompt is issued; when the authorization
//!   disappears or changes, account access is requested again.
//! - The **current** session is never cached: every call prompts for
//!   permission and binds whatever account the wallet selects.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::events::AgreementEvent;
use crate::domain::session::{Session, SessionError, SessionRole, SessionState, WalletCapability};
use crate::infrastructure::event_bus::EventBus;

pub struct SessionManager {
    wallet: Option<Arc<dyn WalletCapability>>,
    provider: Mutex<SessionState>,
    event_bus: Arc<EventBus>,
}

impl SessionManager {
    /// `wallet` is `None` when no wallet capability is present in the
    /// environment; every session request then fails with `WalletUnavailable`.
    pub fn new(wallet: Option<Arc<dyn WalletCapability>>, event_bus: Arc<EventBus>) -> Self {
        Self {
            wallet,
            provider: Mutex::new(SessionState::Disconnected),
            event_bus,
        }
    }

    pub fn provider_state(&self) -> SessionState {
        *self.provider.lock()
    }

    fn wallet(&self) -> Result<&Arc<dyn WalletCapability>, SessionError> {
        self.wallet
            .as_ref()
            .ok_or_else(|| SessionError::WalletUnavailable("no wallet capability configured".to_string()))
    }

    pub async fn ensure_provider_session(&self) -> Result<Session, SessionError> {
        let wallet = self.wallet()?;

        if let SessionState::Authorized(cached) = self.provider_state() {
            let authorized = wallet.authorized_accounts().await?;
            if authorized.contains(&cached.address) {
                debug!(address = %cached.address, "Provider session still authorized");
                return Ok(cached);
            }
            // Revoked or switched: fall back to Disconnected and re-request
            info!(address = %cached.address, "Provider authorization lost, requesting access again");
            *self.provider.lock() = SessionState::Disconnected;
        }

        let accounts = wallet.request_accounts().await?;
        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| SessionError::PermissionDenied("wallet returned no accounts".to_string()))?;

        let session = Session::provider(address);
        *self.provider.lock() = SessionState::Authorized(session);
        self.announce(&session);
        Ok(session)
    }

    pub async fn ensure_current_session(&self) -> Result<Session, SessionError> {
        let wallet = self.wallet()?;

        if !wallet.request_permissions().await? {
            return Err(SessionError::PermissionDenied(
                "account permission was not granted".to_string(),
            ));
        }

        let accounts = wallet.request_accounts().await?;
        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| SessionError::PermissionDenied("wallet returned no accounts".to_string()))?;

        let session = Session::current(address);
        self.announce(&session);
        Ok(session)
    }

    fn announce(&self, session: &Session) {
        info!(address = %session.address, role = %session.role, "Session authorized");
        self.event_bus.publish_agreement_event(AgreementEvent::SessionAuthorized {
            address: session.address,
            role: session.role,
            authorized_at: Utc::now(),
        });
    }

    pub fn is_provider_connected(&self) -> bool {
        matches!(
            self.provider_state(),
            SessionState::Authorized(Session { role: SessionRole::Provider, .. })
        )
    }
}
