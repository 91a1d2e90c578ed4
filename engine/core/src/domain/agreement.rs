// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Agreement Aggregate (ledger-owned)
//!
//! An [`Agreement`] is the on-chain record of one tenant/provider SLA. The
//! engine never mutates one directly: termination timestamps, subscription,
//! completion and monetary amounts only change through ledger transactions
//! requested via the `LedgerGateway`.
//!
//! Bucket membership is a pure function of the termination timestamp, so an
//! agreement is always in exactly one of [`RegistryBucket::Alive`] or
//! [`RegistryBucket::Terminated`].

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::tenant::TenantId;

/// Wei per one unit of the ledger's native currency
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Agreement position in the parent contract, used by `terminateChildContract`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgreementIndex(pub u64);

impl std::fmt::Display for AgreementIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target availability percentage, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilityTarget(u8);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("availability target must be an integer between 0 and 100, got {0}")]
pub struct InvalidAvailabilityTarget(pub i64);

impl AvailabilityTarget {
    pub fn new(percent: i64) -> Result<Self, InvalidAvailabilityTarget> {
        if (0..=100).contains(&percent) {
            Ok(Self(percent as u8))
        } else {
            Err(InvalidAvailabilityTarget(percent))
        }
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for AvailabilityTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", f64::from(self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryBucket {
    Alive,
    Terminated,
}

/// Operator actions the lifecycle offers for an agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementAction {
    Subscribe,
    ReportUsage,
    Terminate,
}

impl std::fmt::Display for AgreementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribe => write!(f, "subscribe"),
            Self::ReportUsage => write!(f, "report"),
            Self::Terminate => write!(f, "terminate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub index: AgreementIndex,
    pub contract_address: Address,
    pub customer_id: TenantId,
    pub created_at: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub availability_target: AvailabilityTarget,
    pub subscribed: bool,
    /// Wei staked by the subscriber
    pub subscription_amount: U256,
    /// Wei paid out at settlement
    pub compensation_amount: U256,
    pub completed: bool,
}

impl Agreement {
    pub fn bucket(&self) -> RegistryBucket {
        if self.terminated_at.is_some() {
            RegistryBucket::Terminated
        } else {
            RegistryBucket::Alive
        }
    }

    pub fn is_alive(&self) -> bool {
        self.bucket() == RegistryBucket::Alive
    }

    /// Subscribed alive agreements can be monitored and terminated; an
    /// unsubscribed one can only be subscribed; terminated ones are history.
    pub fn offered_actions(&self) -> Vec<AgreementAction> {
        match (self.bucket(), self.subscribed) {
            (RegistryBucket::Terminated, _) => vec![],
            (RegistryBucket::Alive, true) => {
                vec![AgreementAction::ReportUsage, AgreementAction::Terminate]
            }
            (RegistryBucket::Alive, false) => vec![AgreementAction::Subscribe],
        }
    }

    pub fn offers(&self, action: AgreementAction) -> bool {
        self.offered_actions().contains(&action)
    }
}

/// Render a wei amount in whole ether with trailing zeros trimmed
pub fn format_ether(wei: U256) -> String {
    let unit = U256::from(WEI_PER_ETHER);
    let whole = wei / unit;
    let fraction = wei % unit;
    if fraction.is_zero() {
        return format!("{}.0", whole);
    }
    let digits = format!("{:0>18}", fraction.to_string());
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agreement(terminated: bool, subscribed: bool) -> Agreement {
        Agreement {
            index: AgreementIndex(0),
            contract_address: Address::repeat_byte(0x11),
            customer_id: TenantId::new("tenant-a"),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            terminated_at: terminated.then(|| DateTime::from_timestamp(1_700_100_000, 0).unwrap()),
            availability_target: AvailabilityTarget::new(99).unwrap(),
            subscribed,
            subscription_amount: U256::from(WEI_PER_ETHER),
            compensation_amount: U256::ZERO,
            completed: terminated,
        }
    }

    #[test]
    fn test_target_bounds() {
        assert!(AvailabilityTarget::new(0).is_ok());
        assert!(AvailabilityTarget::new(100).is_ok());
        assert_eq!(AvailabilityTarget::new(101), Err(InvalidAvailabilityTarget(101)));
        assert_eq!(AvailabilityTarget::new(-1), Err(InvalidAvailabilityTarget(-1)));
    }

    #[test]
    fn test_bucket_follows_termination_timestamp() {
        assert_eq!(agreement(false, true).bucket(), RegistryBucket::Alive);
        assert_eq!(agreement(true, true).bucket(), RegistryBucket::Terminated);
    }

    #[test]
    fn test_unsubscribed_only_offers_subscribe() {
        let a = agreement(false, false);
        assert_eq!(a.offered_actions(), vec![AgreementAction::Subscribe]);
        assert!(!a.offers(AgreementAction::ReportUsage));
        assert!(!a.offers(AgreementAction::Terminate));
    }

    #[test]
    fn test_subscribed_offers_report_and_terminate() {
        let a = agreement(false, true);
        assert!(a.offers(AgreementAction::ReportUsage));
        assert!(a.offers(AgreementAction::Terminate));
        assert!(!a.offers(AgreementAction::Subscribe));
        assert!(agreement(true, true).offered_actions().is_empty());
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(U256::from(WEI_PER_ETHER)), "1.0");
        assert_eq!(format_ether(U256::from(WEI_PER_ETHER / 4)), "0.25");
        assert_eq!(format_ether(U256::ZERO), "0.0");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
    }
}
