// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Engine wiring
//!
//! Builds the adapters and the lifecycle controller from an
//! [`EngineConfigManifest`].

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use sla_core::application::{InventoryAggregator, LifecycleController, LifecycleSettings, SessionManager};
use sla_core::domain::engine_config::EngineConfigManifest;
use sla_core::domain::inventory::InventoryService;
use sla_core::infrastructure::event_bus::EventBus;
use sla_core::infrastructure::evm::{EvmLedgerGateway, JsonRpcClient, JsonRpcWallet};
use sla_core::infrastructure::openstack_inventory::OpenStackInventoryClient;

/// Load and validate the configuration for a command
pub fn load_config(config_path: Option<PathBuf>) -> Result<EngineConfigManifest> {
    let config = EngineConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

pub fn inventory_client(config: &EngineConfigManifest) -> Result<Arc<dyn InventoryService>> {
    let token = config.resolve_auth_token()?;
    if token.is_none() {
        warn!("No inventory auth token configured; requests are sent unauthenticated");
    }
    let client = OpenStackInventoryClient::new(&config.spec.inventory, token)
        .context("Failed to create inventory client")?;
    Ok(Arc::new(client))
}

pub fn aggregator(config: &EngineConfigManifest, event_bus: Arc<EventBus>) -> Result<InventoryAggregator> {
    Ok(InventoryAggregator::new(
        inventory_client(config)?,
        event_bus,
        config.spec.inventory.resolution_concurrency,
    ))
}

pub struct Engine {
    pub controller: LifecycleController,
    pub event_bus: Arc<EventBus>,
}

impl Engine {
    pub fn build(config: &EngineConfigManifest) -> Result<Self> {
        let ledger = &config.spec.ledger;
        let event_bus = Arc::new(EventBus::with_default_capacity());
        let request_timeout = Duration::from_secs(config.spec.inventory.request_timeout_secs);

        let rpc = Arc::new(
            JsonRpcClient::new(ledger.rpc_url.clone(), request_timeout).context("Failed to create ledger RPC client")?,
        );
        let signer = if ledger.wallet_endpoint() == ledger.rpc_url {
            rpc.clone()
        } else {
            Arc::new(
                JsonRpcClient::new(ledger.wallet_endpoint(), request_timeout)
                    .context("Failed to create wallet RPC client")?,
            )
        };

        let gateway = Arc::new(EvmLedgerGateway::new(
            rpc,
            signer.clone(),
            ledger.parent_contract()?,
            ledger.confirmation_timeout(),
            ledger.poll_interval(),
        ));
        let sessions = SessionManager::new(Some(Arc::new(JsonRpcWallet::new(signer))), event_bus.clone());
        let settings = LifecycleSettings {
            monitoring_period: ledger.monitoring_period,
            subscription_stake: ledger.subscription_stake()?,
        };

        let controller = LifecycleController::new(
            aggregator(config, event_bus.clone())?,
            sessions,
            gateway,
            event_bus.clone(),
            settings,
        );

        Ok(Self { controller, event_bus })
    }

    /// Establish the provider session. Reads keep working without one, so a
    /// failure is only reported.
    pub async fn connect(&self) {
        match self.controller.connect_provider().await {
            Ok(session) => info!(address = %session.address, "Provider connected"),
            Err(e) => {
                warn!(error = %e, "Provider session not established");
                eprintln!("{}", format!("⚠ Provider wallet not connected: {}", e).yellow());
            }
        }
    }
}
