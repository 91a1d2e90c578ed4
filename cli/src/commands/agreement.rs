// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Agreement lifecycle commands
//!
//! Commands: list, create, subscribe, report, terminate
//!
//! Every command selects the tenant first (capacity aggregation plus registry
//! refresh) and prints the refreshed registry afterwards.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use std::str::FromStr;

use sla_core::domain::agreement::AgreementIndex;
use sla_core::domain::tenant::TenantId;

use crate::engine::{load_config, Engine};
use crate::render;

#[derive(Subcommand)]
pub enum AgreementCommand {
    /// List alive and terminated agreements of a tenant
    List {
        #[arg(value_name = "TENANT")]
        tenant: String,
    },

    /// Create an agreement for the tenant's current allocated capacity
    Create {
        #[arg(value_name = "TENANT")]
        tenant: String,

        /// Target availability in percent (0-100)
        #[arg(long, allow_negative_numbers = true)]
        target: i64,
    },

    /// Subscribe to an agreement, staking the subscription amount
    Subscribe {
        #[arg(value_name = "TENANT")]
        tenant: String,

        /// Agreement contract address
        #[arg(value_name = "ADDRESS")]
        contract: String,
    },

    /// Report the tenant's available capacity to an agreement
    Report {
        #[arg(value_name = "TENANT")]
        tenant: String,

        /// Agreement contract address
        #[arg(value_name = "ADDRESS")]
        contract: String,
    },

    /// Terminate an agreement and trigger settlement
    Terminate {
        #[arg(value_name = "TENANT")]
        tenant: String,

        /// Agreement index in the parent contract
        #[arg(value_name = "INDEX")]
        index: u64,
    },
}

impl AgreementCommand {
    fn tenant(&self) -> &str {
        match self {
            Self::List { tenant }
            | Self::Create { tenant, .. }
            | Self::Subscribe { tenant, .. }
            | Self::Report { tenant, .. }
            | Self::Terminate { tenant, .. } => tenant,
        }
    }
}

fn parse_contract(raw: &str) -> Result<Address> {
    Address::from_str(raw.trim()).with_context(|| format!("'{}' is not a contract address", raw))
}

pub async fn handle_command(command: AgreementCommand, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = Engine::build(&config)?;
    let controller = &engine.controller;

    engine.connect().await;

    let tenant_id = TenantId::new(command.tenant());
    controller
        .select_tenant(&tenant_id)
        .await
        .with_context(|| format!("Failed to select tenant {}", tenant_id))?;

    match command {
        AgreementCommand::List { .. } => {
            // Surface registry read errors here, the selection only logs them
            controller
                .refresh_registry()
                .await
                .context("Failed to read agreements from the ledger")?;
            if controller.can_create() {
                println!("{}", "No alive agreement: 'agreement create' is available".dimmed());
                println!();
            }
        }
        AgreementCommand::Create { target, .. } => {
            let receipt = controller
                .create_agreement(target)
                .await
                .context("Failed to create agreement")?;
            render::print_receipt("Agreement creation", &receipt);
        }
        AgreementCommand::Subscribe { contract, .. } => {
            let receipt = controller
                .subscribe(parse_contract(&contract)?)
                .await
                .context("Failed to subscribe")?;
            render::print_receipt("Subscription", &receipt);
        }
        AgreementCommand::Report { contract, .. } => {
            let receipt = controller
                .report_usage(parse_contract(&contract)?)
                .await
                .context("Failed to report usage")?;
            render::print_receipt("Usage report", &receipt);
        }
        AgreementCommand::Terminate { index, .. } => {
            let receipt = controller
                .terminate(AgreementIndex(index))
                .await
                .context("Failed to terminate agreement")?;
            render::print_receipt("Termination", &receipt);
        }
    }

    if let Some(capacity) = controller.capacity() {
        println!(
            "Capacity: {} allocated / {} available vCPUs ({})",
            capacity.summary.allocated,
            capacity.summary.available,
            capacity.summary.classification()
        );
        println!();
    }
    render::print_agreements(&controller.registry().alive(), &controller.registry().terminated());

    Ok(())
}
