// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Agreement Registry Sync
//!
//! Local read model of a tenant's agreements, split into the *alive* and
//! *terminated* buckets and rebuilt from the ledger on demand.
//!
//! Every refresh is clear-then-replace: the bucket is emptied, the ledger is
//! read, and the result replaces the bucket in one write. Refreshes are tagged
//! with a per-bucket generation; a response whose generation is no longer the
//! latest is discarded, so a slow read can never overwrite a newer one.
//!
//! Readers only ever see an empty bucket or one complete generation. A bucket
//! counts as loaded only once the latest generation has been applied; a
//! cleared or failed bucket is empty but not loaded.

use alloy_primitives::Address;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::agreement::{Agreement, AgreementIndex, RegistryBucket};
use crate::domain::events::AgreementEvent;
use crate::domain::ledger::{LedgerError, LedgerGateway};
use crate::domain::tenant::TenantId;
use crate::infrastructure::event_bus::EventBus;

/// What happened to one bucket refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No tenant selected; nothing was read
    Skipped,
    Applied { generation: u64, agreement_count: usize },
    /// A newer refresh started while this one was reading
    Discarded { generation: u64 },
}

#[derive(Default)]
struct Bucket {
    latest: AtomicU64,
    /// `None` until the latest generation has been applied
    entries: RwLock<Option<Vec<Agreement>>>,
}

impl Bucket {
    fn begin(&self) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        *self.entries.write() = None;
        generation
    }

    fn snapshot(&self) -> Vec<Agreement> {
        self.entries.read().clone().unwrap_or_default()
    }

    /// Replace the entries if `generation` is still the latest
    fn complete(&self, generation: u64, agreements: Vec<Agreement>) -> bool {
        let mut entries = self.entries.write();
        if self.latest.load(Ordering::SeqCst) != generation {
            return false;
        }
        *entries = Some(agreements);
        true
    }
}

pub struct AgreementRegistry {
    ledger: Arc<dyn LedgerGateway>,
    event_bus: Arc<EventBus>,
    alive: Bucket,
    terminated: Bucket,
}

impl AgreementRegistry {
    pub fn new(ledger: Arc<dyn LedgerGateway>, event_bus: Arc<EventBus>) -> Self {
        Self {
            ledger,
            event_bus,
            alive: Bucket::default(),
            terminated: Bucket::default(),
        }
    }

    fn bucket(&self, bucket: RegistryBucket) -> &Bucket {
        match bucket {
            RegistryBucket::Alive => &self.alive,
            RegistryBucket::Terminated => &self.terminated,
        }
    }

    pub fn alive(&self) -> Vec<Agreement> {
        self.alive.snapshot()
    }

    pub fn terminated(&self) -> Vec<Agreement> {
        self.terminated.snapshot()
    }

    /// Whether the bucket holds the result of its latest refresh
    pub fn is_loaded(&self, bucket: RegistryBucket) -> bool {
        self.bucket(bucket).entries.read().is_some()
    }

    pub fn generation(&self, bucket: RegistryBucket) -> u64 {
        self.bucket(bucket).latest.load(Ordering::SeqCst)
    }

    pub fn find_alive(&self, contract: Address) -> Option<Agreement> {
        self.alive
            .entries
            .read()
            .iter()
            .flatten()
            .find(|a| a.contract_address == contract)
            .cloned()
    }

    pub fn find_alive_by_index(&self, index: AgreementIndex) -> Option<Agreement> {
        self.alive
            .entries
            .read()
            .iter()
            .flatten()
            .find(|a| a.index == index)
            .cloned()
    }

    pub fn has_alive(&self) -> bool {
        self.alive.entries.read().as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Empty both buckets (tenant switch)
    pub fn reset(&self) {
        self.alive.begin();
        self.terminated.begin();
    }

    pub async fn refresh_alive(&self, tenant: Option<&TenantId>) -> Result<RefreshOutcome, LedgerError> {
        self.refresh(RegistryBucket::Alive, tenant).await
    }

    pub async fn refresh_terminated(&self, tenant: Option<&TenantId>) -> Result<RefreshOutcome, LedgerError> {
        self.refresh(RegistryBucket::Terminated, tenant).await
    }

    /// Refresh both buckets concurrently; the first error wins
    pub async fn refresh_all(&self, tenant: Option<&TenantId>) -> Result<(RefreshOutcome, RefreshOutcome), LedgerError> {
        let (alive, terminated) = tokio::join!(self.refresh_alive(tenant), self.refresh_terminated(tenant));
        Ok((alive?, terminated?))
    }

    async fn refresh(&self, kind: RegistryBucket, tenant: Option<&TenantId>) -> Result<RefreshOutcome, LedgerError> {
        let Some(tenant_id) = tenant else {
            debug!(bucket = ?kind, "No tenant selected, skipping registry refresh");
            return Ok(RefreshOutcome::Skipped);
        };

        let bucket = self.bucket(kind);
        let generation = bucket.begin();

        let fetched = match kind {
            RegistryBucket::Alive => self.ledger.list_alive(tenant_id).await?,
            RegistryBucket::Terminated => self.ledger.list_terminated(tenant_id).await?,
        };

        // Bucket membership is decided by the termination timestamp alone
        let agreements: Vec<Agreement> = fetched.into_iter().filter(|a| a.bucket() == kind).collect();
        let agreement_count = agreements.len();

        if !bucket.complete(generation, agreements) {
            debug!(tenant_id = %tenant_id, bucket = ?kind, generation, "Discarding stale registry refresh");
            self.event_bus.publish_agreement_event(AgreementEvent::StaleRefreshDiscarded {
                tenant_id: tenant_id.clone(),
                bucket: kind,
                generation,
                discarded_at: Utc::now(),
            });
            return Ok(RefreshOutcome::Discarded { generation });
        }

        info!(tenant_id = %tenant_id, bucket = ?kind, generation, agreement_count, "Registry refreshed");
        self.event_bus.publish_agreement_event(AgreementEvent::RegistryRefreshed {
            tenant_id: tenant_id.clone(),
            bucket: kind,
            generation,
            agreement_count,
            refreshed_at: Utc::now(),
        });

        Ok(RefreshOutcome::Applied { generation, agreement_count })
    }
}
