// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Lifecycle Controller
//!
//! Sequences tenant selection, capacity aggregation, ledger writes and
//! registry refreshes:
//!
//! ```text
//! select_tenant ─▶ aggregate ─▶ refresh_registry
//!                      │
//!                      ▼
//!   create ─▶ subscribe ─▶ report_usage* ─▶ terminate   (each followed by a refresh)
//! ```
//!
//! The controller owns the session manager and hands the session to the
//! gateway on every write. A ledger failure aborts only the triggering call
//! and never touches the registry.

use alloy_primitives::{Address, U256};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::inventory_aggregator::InventoryAggregator;
use crate::application::registry_sync::{AgreementRegistry, RefreshOutcome};
use crate::application::session_manager::SessionManager;
use crate::domain::agreement::{
    Agreement, AgreementAction, AgreementIndex, AvailabilityTarget, RegistryBucket, WEI_PER_ETHER,
};
use crate::domain::events::{AgreementEvent, InventoryEvent, LedgerAction};
use crate::domain::inventory::{InventoryError, InventoryService, TenantCapacity};
use crate::domain::ledger::{AgreementTerms, LedgerError, LedgerGateway, TxReceipt};
use crate::domain::session::{Session, SessionError};
use crate::domain::tenant::{Tenant, TenantId};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No tenant selected")]
    NoTenantSelected,

    #[error("An aggregation or creation is already in progress for tenant {0}")]
    Busy(TenantId),

    /// The alive bucket could not be read, so an existing agreement can't be
    /// ruled out
    #[error("Alive agreements of tenant {0} are unknown; the registry could not be read")]
    RegistryUnavailable(TenantId),

    #[error("'{action}' is not offered for agreement {contract}")]
    ActionNotOffered { action: AgreementAction, contract: Address },

    /// The tenant selection changed while the operation was in flight
    #[error("Tenant selection changed while working on {0}; result discarded")]
    SelectionChanged(TenantId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Protocol constants applied to ledger writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub monitoring_period: u64,
    /// Wei paid with `subscribe()`
    pub subscription_stake: U256,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            monitoring_period: 10,
            subscription_stake: U256::from(WEI_PER_ETHER),
        }
    }
}

#[derive(Debug, Clone)]
struct Selection {
    tenant: Tenant,
    epoch: u64,
    capacity: Option<TenantCapacity>,
}

/// Releases the tenant's busy mark when dropped
struct BusyGuard<'a> {
    busy: &'a Mutex<HashSet<TenantId>>,
    tenant_id: TenantId,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.lock().remove(&self.tenant_id);
    }
}

pub struct LifecycleController {
    aggregator: InventoryAggregator,
    registry: AgreementRegistry,
    sessions: SessionManager,
    ledger: Arc<dyn LedgerGateway>,
    event_bus: Arc<EventBus>,
    settings: LifecycleSettings,
    selection: RwLock<Option<Selection>>,
    epoch: AtomicU64,
    /// Tenants with an aggregation or creation in flight
    busy: Mutex<HashSet<TenantId>>,
}

impl LifecycleController {
    pub fn new(
        aggregator: InventoryAggregator,
        sessions: SessionManager,
        ledger: Arc<dyn LedgerGateway>,
        event_bus: Arc<EventBus>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            aggregator,
            registry: AgreementRegistry::new(ledger.clone(), event_bus.clone()),
            sessions,
            ledger,
            event_bus,
            settings,
            selection: RwLock::new(None),
            epoch: AtomicU64::new(0),
            busy: Mutex::new(HashSet::new()),
        }
    }

    pub fn registry(&self) -> &AgreementRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn settings(&self) -> LifecycleSettings {
        self.settings
    }

    fn inventory(&self) -> &Arc<dyn InventoryService> {
        self.aggregator.inventory()
    }

    /// Establish the provider session up front
    pub async fn connect_provider(&self) -> Result<Session, LifecycleError> {
        Ok(self.sessions.ensure_provider_session().await?)
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, LifecycleError> {
        Ok(self.inventory().list_tenants().await?)
    }

    pub fn selected_tenant(&self) -> Option<Tenant> {
        self.selection.read().as_ref().map(|s| s.tenant.clone())
    }

    pub fn capacity(&self) -> Option<TenantCapacity> {
        self.selection.read().as_ref().and_then(|s| s.capacity.clone())
    }

    /// Select a tenant by id, then aggregate its capacity and refresh the
    /// registry
    pub async fn select_tenant(&self, tenant_id: &TenantId) -> Result<TenantCapacity, LifecycleError> {
        let tenant = self
            .list_tenants()
            .await?
            .into_iter()
            .find(|t| &t.id == tenant_id)
            .ok_or_else(|| LifecycleError::InvalidInput(format!("unknown tenant '{}'", tenant_id)))?;

        self.switch_to(tenant);
        self.aggregate().await
    }

    /// Make `tenant` the selection without aggregating. Any in-flight work for
    /// the previous tenant is discarded when it completes.
    pub fn switch_to(&self, tenant: Tenant) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!(tenant_id = %tenant.id, tenant = %tenant.name, epoch, "Tenant selected");
        *self.selection.write() = Some(Selection {
            tenant,
            epoch,
            capacity: None,
        });
        self.registry.reset();
    }

    fn current(&self) -> Result<(TenantId, u64), LifecycleError> {
        self.selection
            .read()
            .as_ref()
            .map(|s| (s.tenant.id.clone(), s.epoch))
            .ok_or(LifecycleError::NoTenantSelected)
    }

    fn enter_busy(&self, tenant_id: &TenantId) -> Result<BusyGuard<'_>, LifecycleError> {
        if !self.busy.lock().insert(tenant_id.clone()) {
            return Err(LifecycleError::Busy(tenant_id.clone()));
        }
        Ok(BusyGuard {
            busy: &self.busy,
            tenant_id: tenant_id.clone(),
        })
    }

    /// Aggregate the selected tenant's capacity, then refresh the registry
    pub async fn aggregate(&self) -> Result<TenantCapacity, LifecycleError> {
        let (tenant_id, epoch) = self.current()?;
        let _busy = self.enter_busy(&tenant_id)?;

        let capacity = self.aggregate_locked(&tenant_id, epoch).await?;
        self.refresh_after(&tenant_id).await;
        Ok(capacity)
    }

    async fn aggregate_locked(&self, tenant_id: &TenantId, epoch: u64) -> Result<TenantCapacity, LifecycleError> {
        let capacity = self.aggregator.aggregate(tenant_id).await?;

        let applied = match self.selection.write().as_mut() {
            Some(current) if current.epoch == epoch => {
                current.capacity = Some(capacity.clone());
                true
            }
            _ => false,
        };

        if !applied {
            warn!(tenant_id = %tenant_id, "Tenant changed during aggregation, discarding result");
            self.event_bus.publish_inventory_event(InventoryEvent::StaleAggregationDiscarded {
                tenant_id: tenant_id.clone(),
                discarded_at: Utc::now(),
            });
            return Err(LifecycleError::SelectionChanged(tenant_id.clone()));
        }
        Ok(capacity)
    }

    /// Rebuild both registry buckets for the selected tenant (no-op without
    /// a selection)
    pub async fn refresh_registry(&self) -> Result<(RefreshOutcome, RefreshOutcome), LifecycleError> {
        let tenant = self.selected_tenant();
        Ok(self.registry.refresh_all(tenant.as_ref().map(|t| &t.id)).await?)
    }

    /// Post-operation refresh. The triggering operation already succeeded, so
    /// a read failure here is logged and leaves the buckets cleared. Skipped
    /// when another tenant has been selected meanwhile.
    async fn refresh_after(&self, tenant_id: &TenantId) {
        if self.selected_tenant().map(|t| t.id).as_ref() != Some(tenant_id) {
            return;
        }
        if let Err(e) = self.registry.refresh_all(Some(tenant_id)).await {
            warn!(tenant_id = %tenant_id, error = %e, "Registry refresh failed");
        }
    }

    /// "create" is offered once capacity is known and the alive bucket was
    /// read and holds no agreement
    pub fn can_create(&self) -> bool {
        self.capacity().is_some() && self.registry.is_loaded(RegistryBucket::Alive) && !self.registry.has_alive()
    }

    pub async fn create_agreement(&self, availability_target: i64) -> Result<TxReceipt, LifecycleError> {
        let availability_target =
            AvailabilityTarget::new(availability_target).map_err(|e| LifecycleError::InvalidInput(e.to_string()))?;
        let (tenant_id, epoch) = self.current()?;
        let _busy = self.enter_busy(&tenant_id)?;

        let capacity = match self.capacity() {
            Some(capacity) => capacity,
            None => self.aggregate_locked(&tenant_id, epoch).await?,
        };

        // Re-read right before the write; a read failure aborts the create
        self.registry.refresh_alive(Some(&tenant_id)).await?;
        if !self.registry.is_loaded(RegistryBucket::Alive) {
            return Err(LifecycleError::RegistryUnavailable(tenant_id));
        }
        if self.registry.has_alive() {
            return Err(LifecycleError::InvalidInput(format!(
                "tenant {} already has an alive agreement",
                tenant_id
            )));
        }

        let terms = AgreementTerms {
            customer_id: tenant_id.clone(),
            availability_target,
            allocated_capacity: capacity.summary.allocated,
            monitoring_period: self.settings.monitoring_period,
        };

        let session = self.sessions.ensure_provider_session().await?;
        info!(
            tenant_id = %tenant_id,
            target = %availability_target,
            allocated = terms.allocated_capacity,
            "Creating agreement"
        );
        let result = self.ledger.create_agreement(&session, &terms).await;
        self.settle(&tenant_id, LedgerAction::Create, result).await
    }

    pub async fn subscribe(&self, contract: Address) -> Result<TxReceipt, LifecycleError> {
        let (tenant_id, _) = self.current()?;
        self.require_offered(contract, AgreementAction::Subscribe)?;

        let session = self.sessions.ensure_current_session().await?;
        let result = self
            .ledger
            .subscribe(&session, contract, self.settings.subscription_stake)
            .await;
        self.settle(&tenant_id, LedgerAction::Subscribe { contract }, result).await
    }

    /// Report the tenant's currently available capacity to the agreement
    pub async fn report_usage(&self, contract: Address) -> Result<TxReceipt, LifecycleError> {
        let (tenant_id, _) = self.current()?;
        self.require_offered(contract, AgreementAction::ReportUsage)?;

        let observed_available = self
            .capacity()
            .map(|c| c.summary.available)
            .ok_or_else(|| LifecycleError::InvalidInput(format!("capacity of tenant {} is not aggregated", tenant_id)))?;

        let session = self.sessions.ensure_current_session().await?;
        let result = self
            .ledger
            .report_usage(&session, contract, observed_available)
            .await;
        self.settle(
            &tenant_id,
            LedgerAction::ReportUsage {
                contract,
                observed_available,
            },
            result,
        )
        .await
    }

    /// Terminate by ledger index. Only subscribed agreements can be
    /// terminated; indexes missing from the alive bucket are left to the
    /// ledger to reject.
    pub async fn terminate(&self, index: AgreementIndex) -> Result<TxReceipt, LifecycleError> {
        let (tenant_id, _) = self.current()?;
        if let Some(agreement) = self.registry.find_alive_by_index(index) {
            if !agreement.offers(AgreementAction::Terminate) {
                return Err(LifecycleError::ActionNotOffered {
                    action: AgreementAction::Terminate,
                    contract: agreement.contract_address,
                });
            }
        }

        let session = self.sessions.ensure_provider_session().await?;
        let result = self.ledger.terminate(&session, index).await;
        self.settle(&tenant_id, LedgerAction::Terminate { index }, result).await
    }

    fn require_offered(&self, contract: Address, action: AgreementAction) -> Result<Agreement, LifecycleError> {
        self.registry
            .find_alive(contract)
            .filter(|agreement| agreement.offers(action))
            .ok_or(LifecycleError::ActionNotOffered { action, contract })
    }

    async fn settle(
        &self,
        tenant_id: &TenantId,
        action: LedgerAction,
        result: Result<TxReceipt, LedgerError>,
    ) -> Result<TxReceipt, LifecycleError> {
        match result {
            Ok(receipt) => {
                info!(tenant_id = %tenant_id, action = %action, tx_hash = %receipt.tx_hash, "Ledger write confirmed");
                self.event_bus.publish_agreement_event(AgreementEvent::TransactionConfirmed {
                    tenant_id: tenant_id.clone(),
                    action,
                    tx_hash: receipt.tx_hash,
                    confirmed_at: Utc::now(),
                });
                self.refresh_after(tenant_id).await;
                Ok(receipt)
            }
            Err(e) => {
                warn!(tenant_id = %tenant_id, action = %action, error = %e, "Ledger write failed");
                self.event_bus.publish_agreement_event(AgreementEvent::TransactionFailed {
                    tenant_id: tenant_id.clone(),
                    action,
                    reason: e.to_string(),
                    failed_at: Utc::now(),
                });
                Err(e.into())
            }
        }
    }
}
