// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

use alloy_primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agreement::{AgreementIndex, RegistryBucket};
use crate::domain::inventory::CapacitySummary;
use crate::domain::session::SessionRole;
use crate::domain::tenant::TenantId;

/// Inventory events emitted while aggregating a tenant's capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InventoryEvent {
    InstanceUnresolved {
        tenant_id: TenantId,
        instance_id: String,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    CapacityAggregated {
        tenant_id: TenantId,
        summary: CapacitySummary,
        instance_count: usize,
        unresolved_count: usize,
        aggregated_at: DateTime<Utc>,
    },
    /// Aggregation finished after the operator switched tenants
    StaleAggregationDiscarded {
        tenant_id: TenantId,
        discarded_at: DateTime<Utc>,
    },
}

/// Agreement lifecycle events (ledger writes and registry refreshes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgreementEvent {
    SessionAuthorized {
        address: Address,
        role: SessionRole,
        authorized_at: DateTime<Utc>,
    },
    TransactionConfirmed {
        tenant_id: TenantId,
        action: LedgerAction,
        tx_hash: B256,
        confirmed_at: DateTime<Utc>,
    },
    TransactionFailed {
        tenant_id: TenantId,
        action: LedgerAction,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    RegistryRefreshed {
        tenant_id: TenantId,
        bucket: RegistryBucket,
        generation: u64,
        agreement_count: usize,
        refreshed_at: DateTime<Utc>,
    },
    /// A refresh response arrived after a newer one and was dropped
    StaleRefreshDiscarded {
        tenant_id: TenantId,
        bucket: RegistryBucket,
        generation: u64,
        discarded_at: DateTime<Utc>,
    },
}

/// Ledger write that produced an [`AgreementEvent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    Create,
    Subscribe { contract: Address },
    ReportUsage { contract: Address, observed_available: u64 },
    Terminate { index: AgreementIndex },
}

impl std::fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Subscribe { contract } => write!(f, "subscribe {}", contract),
            Self::ReportUsage { contract, observed_available } => {
                write!(f, "report {} -> {}", observed_available, contract)
            }
            Self::Terminate { index } => write!(f, "terminate #{}", index),
        }
    }
}
