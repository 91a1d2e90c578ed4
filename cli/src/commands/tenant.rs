// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use crate::engine::{inventory_client, load_config};

#[derive(Subcommand)]
pub enum TenantCommand {
    /// List tenants known to the inventory service
    List,
}

pub async fn handle_command(command: TenantCommand, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;

    match command {
        TenantCommand::List => {
            let tenants = inventory_client(&config)?
                .list_tenants()
                .await
                .context("Failed to list tenants")?;

            if tenants.is_empty() {
                println!("{}", "No tenants found".yellow());
                return Ok(());
            }

            println!("{} tenants found:", tenants.len());
            println!("{:<34} {:<24} {}", "ID", "NAME", "DESCRIPTION");
            for tenant in tenants {
                println!(
                    "{:<34} {:<24} {}",
                    tenant.id.as_str(),
                    tenant.name.bold(),
                    tenant.description
                );
            }
            Ok(())
        }
    }
}
