// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sla_core::application::{
    InventoryAggregator, LifecycleController, LifecycleError, LifecycleSettings, SessionManager,
};
use sla_core::domain::agreement::{Agreement, AgreementAction, AgreementIndex};
use sla_core::domain::inventory::{
    AvailabilityClass, Flavor, InstanceDetail, InstanceSummary, InventoryError, InventoryService, OperationalStatus,
};
use sla_core::domain::ledger::{AgreementTerms, LedgerError, LedgerGateway, TxReceipt};
use sla_core::domain::session::{Session, SessionError, SessionRole, WalletCapability};
use sla_core::domain::tenant::{Tenant, TenantId};
use sla_core::domain::events::{AgreementEvent, InventoryEvent};
use sla_core::infrastructure::event_bus::{DomainEvent, EventBus};

/// Tenant id -> instances as (flavor vcpus, status); `None` vcpus makes the
/// flavor lookup fail
struct FakeInventory {
    tenants: HashMap<String, Vec<(Option<u32>, &'static str)>>,
    listing_delay: HashMap<String, u64>,
}

impl FakeInventory {
    fn new() -> Self {
        Self {
            tenants: HashMap::new(),
            listing_delay: HashMap::new(),
        }
    }

    fn with_tenant(mut self, id: &str, instances: Vec<(Option<u32>, &'static str)>) -> Self {
        self.tenants.insert(id.to_string(), instances);
        self
    }
}

#[async_trait]
impl InventoryService for FakeInventory {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, InventoryError> {
        let mut tenants: Vec<Tenant> = self
            .tenants
            .keys()
            .map(|id| Tenant {
                id: TenantId::new(id.as_str()),
                name: format!("{} name", id),
                description: String::new(),
            })
            .collect();
        tenants.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(tenants)
    }

    async fn list_instances(&self, tenant_id: &TenantId) -> Result<Vec<InstanceSummary>, InventoryError> {
        if let Some(ms) = self.listing_delay.get(tenant_id.as_str()) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        let instances = self.tenants.get(tenant_id.as_str()).cloned().unwrap_or_default();
        Ok((0..instances.len())
            .map(|i| InstanceSummary {
                id: format!("{}/{}", tenant_id, i),
                name: None,
            })
            .collect())
    }

    async fn get_instance(&self, instance_id: &str) -> Result<InstanceDetail, InventoryError> {
        let (tenant, position) = instance_id.split_once('/').unwrap();
        let (_, status) = self.tenants[tenant][position.parse::<usize>().unwrap()];
        Ok(InstanceDetail {
            id: instance_id.to_string(),
            flavor_id: instance_id.to_string(),
            status: OperationalStatus::from_inventory(status),
        })
    }

    async fn get_flavor(&self, flavor_id: &str) -> Result<Flavor, InventoryError> {
        let (tenant, position) = flavor_id.split_once('/').unwrap();
        let (vcpus, _) = self.tenants[tenant][position.parse::<usize>().unwrap()];
        vcpus
            .map(|vcpus| Flavor { vcpus })
            .ok_or_else(|| InventoryError::network(format!("flavor {}", flavor_id), "HTTP 500"))
    }
}

/// In-memory stand-in for the parent contract
#[derive(Default)]
struct FakeLedger {
    agreements: Mutex<Vec<(AgreementTerms, Agreement)>>,
    writes: AtomicUsize,
    last_report: Mutex<Option<u64>>,
    last_stake: Mutex<Option<U256>>,
    /// Make both listings fail as if the node were unreachable
    reads_fail: AtomicBool,
}

impl FakeLedger {
    fn receipt(&self) -> TxReceipt {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) as u8;
        TxReceipt {
            tx_hash: B256::repeat_byte(n + 1),
            block_number: Some(u64::from(n) + 100),
        }
    }

    fn list(&self, customer_id: &TenantId, alive: bool) -> Result<Vec<Agreement>, LedgerError> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(LedgerError::NetworkUnavailable("connection refused".into()));
        }
        Ok(self
            .agreements
            .lock()
            .iter()
            .map(|(_, a)| a.clone())
            .filter(|a| &a.customer_id == customer_id && a.is_alive() == alive)
            .collect())
    }
}

#[async_trait]
impl LedgerGateway for FakeLedger {
    async fn create_agreement(&self, session: &Session, terms: &AgreementTerms) -> Result<TxReceipt, LedgerError> {
        assert_eq!(session.role, SessionRole::Provider);
        let mut agreements = self.agreements.lock();
        let index = agreements.len() as u64;
        agreements.push((
            terms.clone(),
            Agreement {
                index: AgreementIndex(index),
                contract_address: Address::repeat_byte(0xc0 + index as u8),
                customer_id: terms.customer_id.clone(),
                created_at: Utc::now(),
                terminated_at: None,
                availability_target: terms.availability_target,
                subscribed: false,
                subscription_amount: U256::ZERO,
                compensation_amount: U256::ZERO,
                completed: false,
            },
        ));
        drop(agreements);
        Ok(self.receipt())
    }

    async fn subscribe(&self, _session: &Session, contract: Address, stake: U256) -> Result<TxReceipt, LedgerError> {
        {
            let mut agreements = self.agreements.lock();
            let (_, agreement) = agreements
                .iter_mut()
                .find(|(_, a)| a.contract_address == contract)
                .ok_or_else(|| LedgerError::TransactionReverted("unknown contract".into()))?;
            agreement.subscribed = true;
            agreement.subscription_amount = stake;
        }
        *self.last_stake.lock() = Some(stake);
        Ok(self.receipt())
    }

    async fn report_usage(&self, _session: &Session, _contract: Address, observed_available: u64) -> Result<TxReceipt, LedgerError> {
        *self.last_report.lock() = Some(observed_available);
        Ok(self.receipt())
    }

    async fn terminate(&self, session: &Session, index: AgreementIndex) -> Result<TxReceipt, LedgerError> {
        assert_eq!(session.role, SessionRole::Provider);
        {
            let mut agreements = self.agreements.lock();
            let (_, agreement) = agreements
                .get_mut(index.0 as usize)
                .ok_or_else(|| LedgerError::TransactionReverted("index out of range".into()))?;
            agreement.terminated_at = Some(Utc::now());
            agreement.completed = true;
        }
        Ok(self.receipt())
    }

    async fn list_alive(&self, customer_id: &TenantId) -> Result<Vec<Agreement>, LedgerError> {
        self.list(customer_id, true)
    }

    async fn list_terminated(&self, customer_id: &TenantId) -> Result<Vec<Agreement>, LedgerError> {
        self.list(customer_id, false)
    }
}

struct GrantingWallet;

#[async_trait]
impl WalletCapability for GrantingWallet {
    async fn authorized_accounts(&self) -> Result<Vec<Address>, SessionError> {
        Ok(vec![Address::repeat_byte(0x01)])
    }

    async fn request_permissions(&self) -> Result<bool, SessionError> {
        Ok(true)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, SessionError> {
        Ok(vec![Address::repeat_byte(0x01)])
    }
}

struct Harness {
    controller: LifecycleController,
    ledger: Arc<FakeLedger>,
    bus: Arc<EventBus>,
}

fn harness(inventory: FakeInventory) -> Harness {
    let bus = Arc::new(EventBus::with_default_capacity());
    let ledger = Arc::new(FakeLedger::default());
    let controller = LifecycleController::new(
        InventoryAggregator::new(Arc::new(inventory), bus.clone(), 1),
        SessionManager::new(Some(Arc::new(GrantingWallet)), bus.clone()),
        ledger.clone(),
        bus.clone(),
        LifecycleSettings::default(),
    );
    Harness { controller, ledger, bus }
}

fn standard_tenant() -> FakeInventory {
    FakeInventory::new().with_tenant(
        "t1",
        vec![(Some(4), "ACTIVE"), (Some(4), "ACTIVE"), (Some(4), "SHUTOFF"), (None, "ACTIVE")],
    )
}

#[tokio::test]
async fn test_mixed_inventory_with_unresolved_instance() {
    let h = harness(standard_tenant());
    let capacity = h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();

    assert_eq!(capacity.summary.allocated, 12);
    assert_eq!(capacity.summary.available, 8);
    assert_eq!(capacity.summary.classification(), AvailabilityClass::PartiallyAvailable);
    assert_eq!(capacity.instances[3].status, OperationalStatus::None);
    assert!(h.controller.can_create());
}

#[tokio::test]
async fn test_empty_tenant_can_create_with_zero_capacity() {
    let h = harness(FakeInventory::new().with_tenant("t1", vec![]));
    let capacity = h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    assert_eq!(capacity.summary.allocated, 0);
    assert_eq!(capacity.summary.available, 0);
    assert_eq!(capacity.summary.classification(), AvailabilityClass::FullyAvailable);

    h.controller.create_agreement(95).await.unwrap();
    let agreements = h.ledger.agreements.lock();
    assert_eq!(agreements[0].0.allocated_capacity, 0);
    assert_eq!(agreements[0].0.monitoring_period, 10);
}

#[tokio::test]
async fn test_new_agreement_only_offers_subscribe() {
    let h = harness(standard_tenant());
    h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();

    h.controller.create_agreement(99).await.unwrap();

    let alive = h.controller.registry().alive();
    assert_eq!(alive.len(), 1);
    assert_eq!(alive[0].availability_target.percent(), 99);
    assert!(!alive[0].subscribed);
    assert_eq!(alive[0].offered_actions(), vec![AgreementAction::Subscribe]);
    assert!(h.controller.registry().terminated().is_empty());
    assert!(!h.controller.can_create());
}

#[tokio::test]
async fn test_full_lifecycle() {
    let h = harness(standard_tenant());
    h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    h.controller.create_agreement(99).await.unwrap();
    let contract = h.controller.registry().alive()[0].contract_address;

    // Not subscribed yet
    let err = h.controller.report_usage(contract).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::ActionNotOffered { action: AgreementAction::ReportUsage, .. }
    ));

    h.controller.subscribe(contract).await.unwrap();
    assert_eq!(*h.ledger.last_stake.lock(), Some(h.controller.settings().subscription_stake));
    assert!(h.controller.registry().alive()[0].subscribed);

    h.controller.report_usage(contract).await.unwrap();
    assert_eq!(*h.ledger.last_report.lock(), Some(8));

    h.controller.terminate(AgreementIndex(0)).await.unwrap();
    assert!(h.controller.registry().alive().is_empty());
    assert_eq!(h.controller.registry().terminated().len(), 1);
    assert!(h.controller.can_create());
}

#[tokio::test]
async fn test_terminate_unknown_index_leaves_registry_unchanged() {
    let h = harness(standard_tenant());
    h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    h.controller.create_agreement(99).await.unwrap();

    let before = (h.controller.registry().alive(), h.controller.registry().terminated());
    let err = h.controller.terminate(AgreementIndex(42)).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Ledger(LedgerError::TransactionReverted(_))));
    assert_eq!((h.controller.registry().alive(), h.controller.registry().terminated()), before);
}

#[tokio::test]
async fn test_out_of_range_target_never_reaches_ledger() {
    let h = harness(standard_tenant());
    h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();

    for target in [101, -1] {
        let err = h.controller.create_agreement(target).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidInput(_)));
    }
    assert_eq!(h.ledger.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_without_tenant() {
    let h = harness(standard_tenant());
    let err = h.controller.create_agreement(99).await.unwrap_err();
    assert!(matches!(err, LifecycleError::NoTenantSelected));
}

#[tokio::test]
async fn test_unknown_tenant_is_invalid_input() {
    let h = harness(standard_tenant());
    let err = h.controller.select_tenant(&TenantId::new("nope")).await.unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidInput(_)));
    assert!(h.controller.selected_tenant().is_none());
}

#[tokio::test]
async fn test_registry_refresh_is_idempotent() {
    let h = harness(standard_tenant());
    h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    h.controller.create_agreement(97).await.unwrap();

    h.controller.refresh_registry().await.unwrap();
    let first = (h.controller.registry().alive(), h.controller.registry().terminated());
    h.controller.refresh_registry().await.unwrap();

    assert_eq!((h.controller.registry().alive(), h.controller.registry().terminated()), first);
}

#[tokio::test]
async fn test_switching_tenant_discards_stale_aggregation() {
    let mut inventory = standard_tenant().with_tenant("t2", vec![(Some(2), "ACTIVE")]);
    inventory.listing_delay.insert("t1".to_string(), 100);
    let h = harness(inventory);
    let mut events = h.bus.subscribe();

    let tenants = h.controller.list_tenants().await.unwrap();
    h.controller.switch_to(tenants[0].clone());

    let slow = h.controller.aggregate();
    let switch = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.controller.select_tenant(&TenantId::new("t2")).await
    };
    let (slow, switched) = tokio::join!(slow, switch);

    assert!(matches!(slow, Err(LifecycleError::SelectionChanged(_))));
    let capacity = switched.unwrap();
    assert_eq!(capacity.tenant_id, TenantId::new("t2"));
    assert_eq!(h.controller.capacity().unwrap().summary.allocated, 2);

    let discarded = events
        .drain()
        .into_iter()
        .any(|e| matches!(e, DomainEvent::Inventory(InventoryEvent::StaleAggregationDiscarded { .. })));
    assert!(discarded);
}

#[tokio::test]
async fn test_concurrent_create_is_busy() {
    let mut inventory = standard_tenant();
    inventory.listing_delay.insert("t1".to_string(), 80);
    let h = harness(inventory);
    let tenants = h.controller.list_tenants().await.unwrap();
    h.controller.switch_to(tenants[0].clone());

    // First create has to aggregate and holds the tenant busy meanwhile
    let first = h.controller.create_agreement(99);
    let second = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.controller.create_agreement(99).await
    };
    let (first, second) = tokio::join!(first, second);

    first.unwrap();
    assert!(matches!(second, Err(LifecycleError::Busy(_))));
    assert_eq!(h.ledger.agreements.lock().len(), 1);
}

#[tokio::test]
async fn test_confirmed_write_is_published() {
    let h = harness(standard_tenant());
    h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    let mut events = h.bus.subscribe();

    h.controller.create_agreement(99).await.unwrap();

    let events = events.drain();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::Agreement(AgreementEvent::TransactionConfirmed { .. }))));
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::Agreement(AgreementEvent::RegistryRefreshed { .. }))));
}

#[tokio::test]
async fn test_missing_wallet_blocks_writes_only() {
    let bus = Arc::new(EventBus::with_default_capacity());
    let controller = LifecycleController::new(
        InventoryAggregator::new(Arc::new(standard_tenant()), bus.clone(), 1),
        SessionManager::new(None, bus.clone()),
        Arc::new(FakeLedger::default()),
        bus,
        LifecycleSettings::default(),
    );

    controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    let err = controller.create_agreement(99).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Session(SessionError::WalletUnavailable(_))));
}

#[tokio::test]
async fn test_unreadable_registry_refuses_create() {
    let h = harness(standard_tenant());
    h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    h.controller.create_agreement(99).await.unwrap();

    h.ledger.reads_fail.store(true, Ordering::SeqCst);

    // Selection still succeeds; only the registry is unknown
    let capacity = h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    assert_eq!(capacity.summary.allocated, 12);
    assert!(h.controller.registry().alive().is_empty());
    assert!(!h.controller.can_create());

    let err = h.controller.refresh_registry().await.unwrap_err();
    assert!(matches!(err, LifecycleError::Ledger(LedgerError::NetworkUnavailable(_))));

    let err = h.controller.create_agreement(95).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Ledger(LedgerError::NetworkUnavailable(_))));
    assert_eq!(h.ledger.agreements.lock().len(), 1);
    assert_eq!(h.ledger.writes.load(Ordering::SeqCst), 1);

    // Once reads work again the existing agreement is visible and still blocks create
    h.ledger.reads_fail.store(false, Ordering::SeqCst);
    h.controller.refresh_registry().await.unwrap();
    assert_eq!(h.controller.registry().alive().len(), 1);
    assert!(!h.controller.can_create());
    let err = h.controller.create_agreement(95).await.unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidInput(_)));
    assert_eq!(h.ledger.agreements.lock().len(), 1);
}

#[tokio::test]
async fn test_create_rechecks_ledger_before_writing() {
    let h = harness(standard_tenant());
    h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    assert!(h.controller.can_create());

    // Reads start failing after the selection loaded an empty alive bucket
    h.ledger.reads_fail.store(true, Ordering::SeqCst);
    let err = h.controller.create_agreement(99).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Ledger(LedgerError::NetworkUnavailable(_))));
    assert_eq!(h.ledger.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_terminate_requires_subscription() {
    let h = harness(standard_tenant());
    h.controller.select_tenant(&TenantId::new("t1")).await.unwrap();
    h.controller.create_agreement(99).await.unwrap();
    let contract = h.controller.registry().alive()[0].contract_address;

    let err = h.controller.terminate(AgreementIndex(0)).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::ActionNotOffered { action: AgreementAction::Terminate, contract: c } if c == contract
    ));
    assert_eq!(h.ledger.writes.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.registry().alive().len(), 1);

    // Indexes outside the alive bucket still go to the ledger
    let err = h.controller.terminate(AgreementIndex(7)).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Ledger(LedgerError::TransactionReverted(_))));

    h.controller.subscribe(contract).await.unwrap();
    h.controller.terminate(AgreementIndex(0)).await.unwrap();
    assert_eq!(h.controller.registry().terminated().len(), 1);
}
