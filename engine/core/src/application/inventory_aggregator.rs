// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Inventory Aggregator
//!
//! Turns a tenant id into its ordered instance list with resolved capacity and
//! the derived [`CapacitySummary`].
//!
//! Per instance: fetch detail, then the flavor's vCPU count. If either lookup
//! fails the instance becomes the unresolved sentinel (`0` units, status
//! `None`) and aggregation carries on. Only a failure of the instance listing
//! itself aborts the aggregation.
//!
//! Resolution runs through an ordered `buffered` stream, so the output order
//! always matches the listing regardless of `concurrency`.
//!
//! [`CapacitySummary`]: crate::domain::inventory::CapacitySummary

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::events::InventoryEvent;
use crate::domain::inventory::{
    ComputeInstance, InstanceSummary, InventoryError, InventoryService, TenantCapacity,
};
use crate::domain::tenant::TenantId;
use crate::infrastructure::event_bus::EventBus;

pub struct InventoryAggregator {
    inventory: Arc<dyn InventoryService>,
    event_bus: Arc<EventBus>,
    concurrency: usize,
}

impl InventoryAggregator {
    /// `concurrency` is the number of instances resolved at once; `1` is
    /// strictly sequential. Zero is treated as one.
    pub fn new(inventory: Arc<dyn InventoryService>, event_bus: Arc<EventBus>, concurrency: usize) -> Self {
        Self {
            inventory,
            event_bus,
            concurrency: concurrency.max(1),
        }
    }

    pub fn inventory(&self) -> &Arc<dyn InventoryService> {
        &self.inventory
    }

    pub async fn aggregate(&self, tenant_id: &TenantId) -> Result<TenantCapacity, InventoryError> {
        let listing = self.inventory.list_instances(tenant_id).await?;
        debug!(tenant_id = %tenant_id, instances = listing.len(), "Resolving instance capacity");

        let instances: Vec<ComputeInstance> = stream::iter(listing.iter())
            .map(|summary| self.resolve(tenant_id, summary))
            .buffered(self.concurrency)
            .collect()
            .await;

        let capacity = TenantCapacity::new(tenant_id.clone(), instances);

        info!(
            tenant_id = %tenant_id,
            allocated = capacity.summary.allocated,
            available = capacity.summary.available,
            unresolved = capacity.unresolved_count(),
            "Capacity aggregated"
        );
        self.event_bus.publish_inventory_event(InventoryEvent::CapacityAggregated {
            tenant_id: tenant_id.clone(),
            summary: capacity.summary,
            instance_count: capacity.instances.len(),
            unresolved_count: capacity.unresolved_count(),
            aggregated_at: Utc::now(),
        });

        Ok(capacity)
    }

    async fn resolve(&self, tenant_id: &TenantId, summary: &InstanceSummary) -> ComputeInstance {
        match self.resolve_capacity(summary).await {
            Ok(instance) => instance,
            Err(e) => {
                warn!(tenant_id = %tenant_id, instance_id = %summary.id, error = %e, "Instance unresolved");
                self.event_bus.publish_inventory_event(InventoryEvent::InstanceUnresolved {
                    tenant_id: tenant_id.clone(),
                    instance_id: summary.id.clone(),
                    reason: e.to_string(),
                    failed_at: Utc::now(),
                });
                ComputeInstance::unresolved(summary)
            }
        }
    }

    async fn resolve_capacity(&self, summary: &InstanceSummary) -> Result<ComputeInstance, InventoryError> {
        let detail = self.inventory.get_instance(&summary.id).await?;
        let flavor = self.inventory.get_flavor(&detail.flavor_id).await?;

        Ok(ComputeInstance {
            id: summary.id.clone(),
            name: summary.name.clone(),
            capacity_units: flavor.vcpus,
            status: detail.status,
        })
    }
}
