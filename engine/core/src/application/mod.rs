// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod inventory_aggregator;
pub mod lifecycle;
pub mod registry_sync;
pub mod session_manager;

pub use inventory_aggregator::InventoryAggregator;
pub use lifecycle::{LifecycleController, LifecycleError, LifecycleSettings};
pub use registry_sync::{AgreementRegistry, RefreshOutcome};
pub use session_manager::SessionManager;
