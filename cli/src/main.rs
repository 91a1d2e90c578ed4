// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Cloud SLA CLI
//!
//! The `cloud-sla` binary is the operator surface of the agreement lifecycle
//! engine. Every invocation runs one trigger against the engine and exits.
//!
//! ## Commands
//!
//! - `cloud-sla tenants list` - Tenants visible to the inventory service
//! - `cloud-sla capacity <TENANT>` - Allocated vs. available vCPUs
//! - `cloud-sla agreement list|create|subscribe|report|terminate` - Agreement lifecycle
//! - `cloud-sla config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use cloud_sla::commands::{self, AgreementCommand, CapacityArgs, ConfigCommand, TenantCommand};
use sla_core::domain::engine_config::EngineConfigManifest;

/// Cloud SLA - agreement lifecycle and capacity reconciliation
#[derive(Parser)]
#[command(name = "cloud-sla")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "SLA_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SLA_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tenant directory
    #[command(name = "tenants")]
    Tenants {
        #[command(subcommand)]
        command: TenantCommand,
    },

    /// Aggregate a tenant's compute capacity
    #[command(name = "capacity")]
    Capacity(CapacityArgs),

    /// Agreement lifecycle operations
    #[command(name = "agreement")]
    Agreement {
        #[command(subcommand)]
        command: AgreementCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging is configured from the manifest when one loads; errors surface
    // again once the command loads it for real
    let logging = EngineConfigManifest::load_or_default(cli.config.clone())
        .ok()
        .and_then(|config| config.spec.observability)
        .and_then(|observability| observability.logging);
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.as_ref().map(|l| l.level.clone()))
        .unwrap_or_else(|| "warn".to_string());
    let json = logging.as_ref().is_some_and(|l| l.format == "json");
    init_logging(&level, json)?;

    match cli.command {
        Some(Commands::Tenants { command }) => commands::tenant::handle_command(command, cli.config).await,
        Some(Commands::Capacity(args)) => commands::capacity::handle_command(args, cli.config).await,
        Some(Commands::Agreement { command }) => commands::agreement::handle_command(command, cli.config).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
