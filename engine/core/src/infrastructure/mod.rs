// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod evm;
pub mod openstack_inventory;
