// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Compute Inventory Domain
//!
//! Value objects describing a tenant's compute instances and the capacity
//! figures derived from them, plus the [`InventoryService`] port through which
//! the engine reads the (external, mutable) cloud inventory.
//!
//! ## Capacity invariant
//!
//! For every instance sequence `allocated >= available >= 0`: `available`
//! only sums the subset of instances whose status is [`OperationalStatus::Active`].
//! The unresolved sentinel [`OperationalStatus::None`] always carries zero
//! capacity units, so it contributes to neither figure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::tenant::{Tenant, TenantId};

/// Operational status of a compute instance as reported by the inventory
///
/// `None` is produced by this engine only, when the instance detail or its
/// flavor could not be resolved. The inventory never reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationalStatus {
    Active,
    Build,
    Shutoff,
    Paused,
    Suspended,
    Error,
    /// Any other status string the inventory reports (kept verbatim)
    Other(String),
    /// Sentinel: capacity/status could not be resolved
    None,
}

impl OperationalStatus {
    /// Map an inventory status string to a known status
    pub fn from_inventory(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "BUILD" => Self::Build,
            "SHUTOFF" => Self::Shutoff,
            "PAUSED" => Self::Paused,
            "SUSPENDED" => Self::Suspended,
            "ERROR" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl std::fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Build => write!(f, "BUILD"),
            Self::Shutoff => write!(f, "SHUTOFF"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Suspended => write!(f, "SUSPENDED"),
            Self::Error => write!(f, "ERROR"),
            Self::Other(raw) => write!(f, "{}", raw),
            Self::None => write!(f, "NONE"),
        }
    }
}

/// One compute instance with its resolved capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub id: String,
    pub name: Option<String>,
    /// vCPU count of the instance's flavor
    pub capacity_units: u32,
    pub status: OperationalStatus,
}

impl ComputeInstance {
    /// Instance whose detail or flavor lookup failed
    pub fn unresolved(summary: &InstanceSummary) -> Self {
        Self {
            id: summary.id.clone(),
            name: summary.name.clone(),
            capacity_units: 0,
            status: OperationalStatus::None,
        }
    }
}

/// Coarse availability classification of a tenant's capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityClass {
    FullyAvailable,
    PartiallyAvailable,
}

impl std::fmt::Display for AvailabilityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullyAvailable => write!(f, "Fully Available"),
            Self::PartiallyAvailable => write!(f, "Partially Available"),
        }
    }
}

/// Allocated vs. available capacity, derived from an instance sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapacitySummary {
    pub allocated: u64,
    pub available: u64,
}

impl CapacitySummary {
    pub fn from_instances(instances: &[ComputeInstance]) -> Self {
        instances.iter().fold(Self::default(), |mut acc, instance| {
            let units = u64::from(instance.capacity_units);
            acc.allocated += units;
            if instance.status.is_active() {
                acc.available += units;
            }
            acc
        })
    }

    pub fn classification(&self) -> AvailabilityClass {
        if self.available == self.allocated {
            AvailabilityClass::FullyAvailable
        } else {
            AvailabilityClass::PartiallyAvailable
        }
    }
}

/// Result of aggregating one tenant's inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantCapacity {
    pub tenant_id: TenantId,
    /// Same order as the inventory's instance listing
    pub instances: Vec<ComputeInstance>,
    pub summary: CapacitySummary,
}

impl TenantCapacity {
    pub fn new(tenant_id: TenantId, instances: Vec<ComputeInstance>) -> Self {
        let summary = CapacitySummary::from_instances(&instances);
        Self {
            tenant_id,
            instances,
            summary,
        }
    }

    pub fn unresolved_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| i.status.is_unresolved())
            .count()
    }
}

/// Instance entry from the tenant listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Instance detail needed to resolve capacity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDetail {
    pub id: String,
    pub flavor_id: String,
    pub status: OperationalStatus,
}

/// Capacity class of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flavor {
    pub vcpus: u32,
}

/// Domain port for the cloud inventory service
/// Anti-Corruption Layer: implementations translate the vendor API shapes.
#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, InventoryError>;

    /// List all instances of a tenant (cross-tenant visible query)
    async fn list_instances(&self, tenant_id: &TenantId) -> Result<Vec<InstanceSummary>, InventoryError>;

    async fn get_instance(&self, instance_id: &str) -> Result<InstanceDetail, InventoryError>;

    async fn get_flavor(&self, flavor_id: &str) -> Result<Flavor, InventoryError>;
}

/// Errors from a single inventory sub-fetch
#[derive(Debug, Clone, thiserror::Error)]
pub enum InventoryError {
    #[error("Network fetch error for {resource}: {reason}")]
    NetworkFetch { resource: String, reason: String },

    #[error("Unexpected response for {resource}: {reason}")]
    Decode { resource: String, reason: String },
}

impl InventoryError {
    pub fn network(resource: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::NetworkFetch {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(resource: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}
