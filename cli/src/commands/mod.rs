// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Cloud SLA CLI

pub mod agreement;
pub mod capacity;
pub mod config;
pub mod tenant;

pub use self::agreement::AgreementCommand;
pub use self::capacity::CapacityArgs;
pub use self::config::ConfigCommand;
pub use self::tenant::TenantCommand;
