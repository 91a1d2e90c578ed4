// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value objects, aggregates and ports of the agreement lifecycle.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Ledger- and vendor-agnostic model; infrastructure adapters
//!   implement the `InventoryService`, `LedgerGateway` and
//!   `WalletCapability` ports.

pub mod agreement;
pub mod engine_config;
pub mod events;
pub mod inventory;
pub mod ledger;
pub mod session;
pub mod tenant;
