// Copyright (c) 2026 Cloud SLA Contributors
// SPDX-License-Identifier: AGPL-3.0

//! ABI bindings for the agreement contracts.
//!
//! The parent contract is the agreement factory and registry; each agreement
//! is a child contract deployed by it and addressed directly for `subscribe`
//! and `addUsageData`.

use alloy_primitives::U256;
use alloy_sol_types::sol;
use chrono::{DateTime, Utc};

use crate::domain::agreement::{Agreement, AgreementIndex, AvailabilityTarget};
use crate::domain::ledger::LedgerError;
use crate::domain::tenant::TenantId;

sol! {
    interface IParentContract {
        struct ChildContractInfo {
            uint256 id;
            address childContract;
            string customerId;
            uint256 serviceAvailabilityAgreement;
            uint256 allocatedVcpus;
            uint256 monitoringPeriod;
            uint256 createdDateTime;
            uint256 terminatedDateTime;
            bool subscribed;
            uint256 subscription;
            uint256 compensation;
            bool completed;
        }

        function createChildContract(
            string customerId,
            uint256 serviceAvailabilityAgreement,
            uint256 allocatedVcpus,
            uint256 monitoringPeriod
        ) external;

        function terminateChildContract(uint256 index) external;

        function getAliveContractsByCustomerId(string customerId)
            external view returns (ChildContractInfo[] memory);

        function getTerminatedContractsByCustomerId(string customerId)
            external view returns (ChildContractInfo[] memory);
    }

    interface IChildContract {
        function subscribe() external payable;

        function addUsageData(uint256 availableVcpus) external;
    }
}

fn to_u64(value: U256, field: &str) -> Result<u64, LedgerError> {
    u64::try_from(value).map_err(|_| LedgerError::Decode(format!("{} out of range: {}", field, value)))
}

fn to_timestamp(value: U256, field: &str) -> Result<DateTime<Utc>, LedgerError> {
    let secs = to_u64(value, field)?;
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| LedgerError::Decode(format!("{} is not a valid timestamp: {}", field, value)))
}

impl TryFrom<IParentContract::ChildContractInfo> for Agreement {
    type Error = LedgerError;

    fn try_from(info: IParentContract::ChildContractInfo) -> Result<Self, Self::Error> {
        let target = to_u64(info.serviceAvailabilityAgreement, "serviceAvailabilityAgreement")?;
        let availability_target = AvailabilityTarget::new(target as i64)
            .map_err(|e| LedgerError::Decode(e.to_string()))?;

        // A zero termination timestamp means "still alive"
        let terminated_at = if info.terminatedDateTime.is_zero() {
            None
        } else {
            Some(to_timestamp(info.terminatedDateTime, "terminatedDateTime")?)
        };

        Ok(Agreement {
            index: AgreementIndex(to_u64(info.id, "id")?),
            contract_address: info.childContract,
            customer_id: TenantId(info.customerId),
            created_at: to_timestamp(info.createdDateTime, "createdDateTime")?,
            terminated_at,
            availability_target,
            subscribed: info.subscribed,
            subscription_amount: info.subscription,
            compensation_amount: info.compensation,
            completed: info.completed,
        })
    }
}
