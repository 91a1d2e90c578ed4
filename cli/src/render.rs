// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Terminal rendering of capacity figures and agreement listings

use chrono::{DateTime, Utc};
use colored::Colorize;

use sla_core::domain::agreement::{format_ether, Agreement};
use sla_core::domain::inventory::{AvailabilityClass, TenantCapacity};
use sla_core::domain::ledger::TxReceipt;

pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub fn print_capacity(capacity: &TenantCapacity) {
    let status = match capacity.summary.classification() {
        AvailabilityClass::FullyAvailable => capacity.summary.classification().to_string().green(),
        AvailabilityClass::PartiallyAvailable => capacity.summary.classification().to_string().yellow(),
    };

    println!("{}", format!("Tenant {}", capacity.tenant_id).bold());
    println!("  Allocated vCPUs: {}", capacity.summary.allocated);
    println!("  Available vCPUs: {}", capacity.summary.available);
    println!("  Status:          {}", status);
    println!();

    if capacity.instances.is_empty() {
        println!("{}", "No instances".dimmed());
        return;
    }

    println!("{:<38} {:<24} {:>6} {}", "INSTANCE", "NAME", "VCPUS", "STATUS");
    for instance in &capacity.instances {
        let status = if instance.status.is_active() {
            instance.status.to_string().green()
        } else if instance.status.is_unresolved() {
            instance.status.to_string().red()
        } else {
            instance.status.to_string().normal()
        };
        println!(
            "{:<38} {:<24} {:>6} {}",
            instance.id,
            instance.name.as_deref().unwrap_or("-"),
            instance.capacity_units,
            status
        );
    }
}

/// One alive-table row; `row` is the 1-based display id
pub fn alive_row(row: usize, agreement: &Agreement) -> String {
    let actions: Vec<String> = agreement
        .offered_actions()
        .iter()
        .map(|a| a.to_string())
        .collect();
    format!(
        "{:<4} {:<6} {:<44} {:<24} {:>8} {:<11} {}",
        row,
        agreement.index.0,
        agreement.contract_address.to_string(),
        timestamp(&agreement.created_at),
        agreement.availability_target.to_string(),
        yes_no(agreement.subscribed),
        actions.join(", ")
    )
}

pub fn terminated_row(row: usize, agreement: &Agreement) -> String {
    format!(
        "{:<4} {:<44} {:<24} {:<24} {:>8} {:>12} {:>12} {}",
        row,
        agreement.contract_address.to_string(),
        timestamp(&agreement.created_at),
        agreement
            .terminated_at
            .as_ref()
            .map(timestamp)
            .unwrap_or_else(|| "-".to_string()),
        agreement.availability_target.to_string(),
        format_ether(agreement.subscription_amount),
        format_ether(agreement.compensation_amount),
        yes_no(agreement.completed)
    )
}

pub fn print_agreements(alive: &[Agreement], terminated: &[Agreement]) {
    println!("{}", "Alive agreements:".bold());
    if alive.is_empty() {
        println!("  {}", "(none)".dimmed());
    } else {
        println!(
            "{:<4} {:<6} {:<44} {:<24} {:>8} {:<11} {}",
            "#", "INDEX", "CONTRACT", "CREATED", "TARGET", "SUBSCRIBED", "ACTIONS"
        );
        for (i, agreement) in alive.iter().enumerate() {
            println!("{}", alive_row(i + 1, agreement));
        }
    }
    println!();

    println!("{}", "Terminated agreements:".bold());
    if terminated.is_empty() {
        println!("  {}", "(none)".dimmed());
    } else {
        println!(
            "{:<4} {:<44} {:<24} {:<24} {:>8} {:>12} {:>12} {}",
            "#", "CONTRACT", "CREATED", "TERMINATED", "TARGET", "STAKE (ETH)", "COMP (ETH)", "COMPLETED"
        );
        for (i, agreement) in terminated.iter().enumerate() {
            println!("{}", terminated_row(i + 1, agreement));
        }
    }
}

pub fn print_receipt(action: &str, receipt: &TxReceipt) {
    let block = receipt
        .block_number
        .map(|n| format!(" in block {}", n))
        .unwrap_or_default();
    println!("{}", format!("✓ {} confirmed{}", action, block).green());
    println!("  Transaction: {}", receipt.tx_hash);
}
