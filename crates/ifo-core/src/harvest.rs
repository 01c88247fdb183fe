// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO ENGINE - HARVEST STATE MACHINE
//
// Per (user, pool):  NotParticipated → Participated → Harvested
//
// Harvested is terminal. A harvest is planned against a read-only ledger,
// the resulting transfers are executed by the caller, and only then is the
// plan committed, so a failed transfer leaves the position claimable.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::allocation::{compute_allocation, Allocation};
use crate::error::IfoError;
use crate::pool::{PoolLedger, UserPoolPosition};
use crate::{math, Address, PoolId, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipationState {
    NotParticipated,
    Participated,
    Harvested,
}

impl ParticipationState {
    pub fn of(position: &UserPoolPosition) -> Self {
        if position.claimed {
            ParticipationState::Harvested
        } else if position.contributed.is_zero() {
            ParticipationState::NotParticipated
        } else {
            ParticipationState::Participated
        }
    }
}

/// Validated harvest waiting for its transfers to settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestPlan {
    pub user: Address,
    pub pool_id: PoolId,
    pub allocation: Allocation,
    new_sum_taxes_overflow: U256,
}

pub fn plan_harvest(
    ledger: &PoolLedger,
    user: Address,
    pool_id: PoolId,
    current_block: u64,
) -> Result<HarvestPlan, IfoError> {
    if !ledger.window().has_ended(current_block) {
        return Err(IfoError::TooEarly);
    }
    let pool = ledger.pool(pool_id)?;
    let position = ledger.position(user, pool_id);
    match ParticipationState::of(&position) {
        ParticipationState::NotParticipated => return Err(IfoError::NotParticipated),
        ParticipationState::Harvested => return Err(IfoError::AlreadyHarvested),
        ParticipationState::Participated => {}
    }

    let allocation = compute_allocation(pool, position.contributed)?;
    let new_sum_taxes_overflow = math::add(pool.sum_taxes_overflow, allocation.tax_amount)?;

    Ok(HarvestPlan {
        user,
        pool_id,
        allocation,
        new_sum_taxes_overflow,
    })
}

/// Flip the position to Harvested and book the retained tax.
pub fn commit_harvest(ledger: &mut PoolLedger, plan: &HarvestPlan) {
    ledger.mark_claimed(plan.user, plan.pool_id, plan.new_sum_taxes_overflow);
}
