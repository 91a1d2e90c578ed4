// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use sla_core::domain::engine_config::EngineConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./sla-config.yaml)
        #[arg(short, long, default_value = "./sla-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = EngineConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. SLA_CONFIG_PATH: {}",
            std::env::var("SLA_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./sla-config.yaml");
        println!("  4. ~/.cloud-sla/config.yaml");
        println!("  5. /etc/cloud-sla/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let inventory = &config.spec.inventory;
    println!("{}", "Inventory:".bold());
    println!("  Projects: {}", inventory.projects_url);
    println!("  Servers:  {}", inventory.servers_url);
    println!("  Flavors:  {}", inventory.flavors_url);
    println!(
        "  Auth token: {}",
        match inventory.auth_token.as_deref() {
            None => "(none)".to_string(),
            Some(raw) if raw.starts_with("env:") => raw.to_string(),
            Some(_) => "(set)".to_string(),
        }
    );
    println!("  Resolution concurrency: {}", inventory.resolution_concurrency);
    println!("  Request timeout: {}s", inventory.request_timeout_secs);
    println!();

    let ledger = &config.spec.ledger;
    println!("{}", "Ledger:".bold());
    println!("  RPC: {}", ledger.rpc_url);
    println!("  Wallet: {}", ledger.wallet_endpoint());
    println!(
        "  Parent contract: {}",
        ledger.parent_contract_address.as_deref().unwrap_or("(not set)")
    );
    println!("  Confirmation timeout: {}s", ledger.confirmation_timeout_secs);
    println!("  Monitoring period: {}", ledger.monitoring_period);
    println!("  Subscription stake: {} wei", ledger.subscription_stake_wei);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = EngineConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
