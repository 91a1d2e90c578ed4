// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Cloud SLA Core
//!
//! Agreement lifecycle and resource-availability reconciliation engine.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Aggregates tenant compute inventory, drives the on-ledger
//!   agreement lifecycle and keeps the local alive/terminated registry in
//!   sync with the ledger.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
