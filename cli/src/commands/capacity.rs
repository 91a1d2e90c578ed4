// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! `cloud-sla capacity <TENANT>`
//!
//! Inventory only: no ledger or wallet is contacted.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use sla_core::domain::events::InventoryEvent;
use sla_core::domain::tenant::TenantId;
use sla_core::infrastructure::event_bus::{DomainEvent, EventBus};

use crate::engine::{aggregator, load_config};
use crate::render;

#[derive(Args)]
pub struct CapacityArgs {
    /// Tenant (project) id
    #[arg(value_name = "TENANT")]
    pub tenant: String,

    /// Print the aggregation as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_command(args: CapacityArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let event_bus = Arc::new(EventBus::with_default_capacity());
    let mut events = event_bus.subscribe();

    let capacity = aggregator(&config, event_bus)?
        .aggregate(&TenantId::new(args.tenant.as_str()))
        .await
        .with_context(|| format!("Failed to aggregate capacity of tenant {}", args.tenant))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&capacity)?);
        return Ok(());
    }

    render::print_capacity(&capacity);

    for event in events.drain() {
        if let DomainEvent::Inventory(InventoryEvent::InstanceUnresolved { instance_id, reason, .. }) = event {
            println!("{}", format!("⚠ {} unresolved: {}", instance_id, reason).yellow());
        }
    }

    Ok(())
}
