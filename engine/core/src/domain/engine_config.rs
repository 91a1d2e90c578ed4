// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

// Engine Configuration Types
//
// Defines the configuration schema for a Cloud SLA engine, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Inventory service endpoints and credentials
// - Ledger RPC endpoint, parent contract and confirmation policy
// - Observability settings

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const API_VERSION: &str = "cloud-sla/v1";
pub const KIND: &str = "EngineConfig";

/// Top-level Kubernetes-style engine configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfigManifest {
    /// API version (must be "cloud-sla/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "EngineConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: EngineConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfigSpec {
    #[serde(default)]
    pub inventory: InventoryConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Tenant (project) listing endpoint
    #[serde(default = "default_projects_url")]
    pub projects_url: String,

    /// Instance (server) endpoint; detail lookups append `/{id}`
    #[serde(default = "default_servers_url")]
    pub servers_url: String,

    /// Flavor endpoint; lookups append `/{flavorId}`
    #[serde(default = "default_flavors_url")]
    pub flavors_url: String,

    /// Auth token sent as `X-Auth-Token` (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Instances resolved concurrently during aggregation (1 = sequential)
    #[serde(default = "default_resolution_concurrency")]
    pub resolution_concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            projects_url: default_projects_url(),
            servers_url: default_servers_url(),
            flavors_url: default_flavors_url(),
            auth_token: None,
            resolution_concurrency: default_resolution_concurrency(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the ledger node
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// JSON-RPC endpoint of the wallet capability
    /// Default: same as rpc_url (node-managed accounts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_url: Option<String>,

    /// Address of the deployed parent (agreement factory) contract
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_contract_address: Option<String>,

    /// Upper bound on the wait for a transaction receipt
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    /// Delay between receipt polls in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Monitoring period written into new agreements
    #[serde(default = "default_monitoring_period")]
    pub monitoring_period: u64,

    /// Subscription stake in wei, decimal string (protocol constant: 1 ether)
    #[serde(default = "default_subscription_stake")]
    pub subscription_stake_wei: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            wallet_url: None,
            parent_contract_address: None,
            confirmation_timeout_secs: default_confirmation_timeout(),
            poll_interval_ms: default_poll_interval(),
            monitoring_period: default_monitoring_period(),
            subscription_stake_wei: default_subscription_stake(),
        }
    }
}

impl LedgerConfig {
    pub fn parent_contract(&self) -> anyhow::Result<Address> {
        let raw = self
            .parent_contract_address
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("ledger.parent_contract_address is not configured"))?;
        Address::from_str(raw.trim())
            .map_err(|e| anyhow::anyhow!("Invalid parent contract address '{}': {}", raw, e))
    }

    pub fn subscription_stake(&self) -> anyhow::Result<U256> {
        U256::from_str_radix(self.subscription_stake_wei.trim(), 10).map_err(|e| {
            anyhow::anyhow!(
                "Invalid subscription_stake_wei '{}': {}",
                self.subscription_stake_wei,
                e
            )
        })
    }

    pub fn wallet_endpoint(&self) -> &str {
        self.wallet_url.as_deref().unwrap_or(&self.rpc_url)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_projects_url() -> String {
    "http://localhost:5000/v3/projects".to_string()
}

fn default_servers_url() -> String {
    "http://localhost:8774/v2.1/servers".to_string()
}

fn default_flavors_url() -> String {
    "http://localhost:8774/v2.1/flavors".to_string()
}

fn default_resolution_concurrency() -> usize {
    1
}

fn default_request_timeout() -> u64 {
    30
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_confirmation_timeout() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_monitoring_period() -> u64 {
    10
}

fn default_subscription_stake() -> String {
    crate::domain::agreement::WEI_PER_ETHER.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for EngineConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "cloud-sla".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: EngineConfigSpec::default(),
        }
    }
}

impl EngineConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SLA_CONFIG_PATH environment variable
    /// 2. ./sla-config.yaml (working directory)
    /// 3. ~/.cloud-sla/config.yaml (user home)
    /// 4. /etc/cloud-sla/config.yaml (system, Unix) or C:\ProgramData\CloudSla\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SLA_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./sla-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".cloud-sla").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/cloud-sla/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\CloudSla\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SLA_AUTH_TOKEN") {
            tracing::info!("Environment override: SLA_AUTH_TOKEN");
            self.spec.inventory.auth_token = Some(val);
        }

        if let Ok(val) = std::env::var("SLA_RPC_URL") {
            tracing::info!("Environment override: SLA_RPC_URL={}", val);
            self.spec.ledger.rpc_url = val;
        }

        if let Ok(val) = std::env::var("SLA_PARENT_CONTRACT_ADDRESS") {
            tracing::info!("Environment override: SLA_PARENT_CONTRACT_ADDRESS={}", val);
            self.spec.ledger.parent_contract_address = Some(val);
        }

        if let Ok(val) = std::env::var("SLA_RESOLUTION_CONCURRENCY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => {
                    tracing::info!("Environment override: SLA_RESOLUTION_CONCURRENCY={}", n);
                    self.spec.inventory.resolution_concurrency = n;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for SLA_RESOLUTION_CONCURRENCY: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Resolve the inventory auth token, expanding "env:VAR_NAME"
    pub fn resolve_auth_token(&self) -> anyhow::Result<Option<String>> {
        match self.spec.inventory.auth_token.as_deref() {
            None => Ok(None),
            Some(raw) => match raw.strip_prefix("env:") {
                Some(var) => std::env::var(var).map(Some).map_err(|_| {
                    anyhow::anyhow!("Auth token references unset environment variable '{}'", var)
                }),
                None => Ok(Some(raw.to_string())),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let inventory = &self.spec.inventory;
        for (field, value) in [
            ("inventory.projects_url", &inventory.projects_url),
            ("inventory.servers_url", &inventory.servers_url),
            ("inventory.flavors_url", &inventory.flavors_url),
            ("ledger.rpc_url", &self.spec.ledger.rpc_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("{} is not a valid URL ('{}'): {}", field, value, e))?;
        }

        if let Some(wallet_url) = &self.spec.ledger.wallet_url {
            url::Url::parse(wallet_url)
                .map_err(|e| anyhow::anyhow!("ledger.wallet_url is not a valid URL: {}", e))?;
        }

        if inventory.resolution_concurrency == 0 {
            anyhow::bail!("inventory.resolution_concurrency must be at least 1");
        }

        if self.spec.ledger.parent_contract_address.is_some() {
            self.spec.ledger.parent_contract()?;
        }

        self.spec.ledger.subscription_stake()?;

        if self.spec.ledger.poll_interval_ms == 0 {
            anyhow::bail!("ledger.poll_interval_ms must be greater than zero");
        }

        if self.spec.ledger.confirmation_timeout_secs == 0 {
            anyhow::bail!("ledger.confirmation_timeout_secs must be greater than zero");
        }

        Ok(())
    }
}
