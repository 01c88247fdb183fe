//! Notifications recorded by a sale, mirroring the contract's events.

use crate::{Address, PoolId, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SaleEvent {
    Deposit {
        user: Address,
        amount: U256,
        pool_id: PoolId,
    },
    Harvest {
        user: Address,
        offering_amount: U256,
        excess_amount: U256,
        pool_id: PoolId,
    },
    AdminWithdraw {
        amount_lp: U256,
        amount_offering_token: U256,
    },
    AdminTokenRecovery {
        token: Address,
        amount: U256,
    },
    NewStartAndEndBlocks {
        start_block: u64,
        end_block: u64,
    },
    PoolParametersSet {
        offering_amount: U256,
        raising_amount: U256,
        pool_id: PoolId,
    },
}

impl SaleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SaleEvent::Deposit { .. } => "Deposit",
            SaleEvent::Harvest { .. } => "Harvest",
            SaleEvent::AdminWithdraw { .. } => "AdminWithdraw",
            SaleEvent::AdminTokenRecovery { .. } => "AdminTokenRecovery",
            SaleEvent::NewStartAndEndBlocks { .. } => "NewStartAndEndBlocks",
            SaleEvent::PoolParametersSet { .. } => "PoolParametersSet",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let ev = SaleEvent::NewStartAndEndBlocks {
            start_block: 5,
            end_block: 9,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "NewStartAndEndBlocks");
        assert_eq!(json["start_block"], 5);
        assert_eq!(ev.name(), "NewStartAndEndBlocks");
    }
}
