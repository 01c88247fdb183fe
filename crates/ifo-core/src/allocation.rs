// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO ENGINE - ALLOCATION CALCULATOR
//
// Overflow-raise share algorithm (not first-come-first-served):
//
//   undersubscribed (total ≤ raising):
//     offering = contributed × offeringPool / raisingPool, refund = tax = 0
//
//   oversubscribed (total > raising):
//     offering   = contributed × offeringPool / total
//     pay        = contributed × raisingPool  / total
//     overflow   = contributed − pay
//     tax        = overflow × taxRate / 1e12        (taxed pools only)
//     refund     = overflow − tax
//
// Pure functions of stored state; every division truncates. The 1e12
// allocation fraction is a reporting value only and never feeds a payout.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::IfoError;
use crate::pool::Pool;
use crate::{math, precision, tax, U256};
use serde::{Deserialize, Serialize};

/// What a participant receives (and forfeits) when harvesting one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Allocation {
    /// Offering tokens owed.
    pub offering_amount: U256,
    /// Raise tokens returned (overflow net of tax).
    pub refunding_amount: U256,
    /// Raise tokens retained as overflow tax.
    pub tax_amount: U256,
}

/// Share of the pool's offering owed to a contributor, 1e12 = 100%.
pub fn user_allocation_fraction(contributed: U256, total_raised: U256) -> Result<U256, IfoError> {
    if total_raised.is_zero() {
        return Ok(U256::ZERO);
    }
    math::mul_div(contributed, precision(), total_raised)
}

/// Portion of a contribution actually spent buying offering tokens.
pub fn pay_amount(pool: &Pool, contributed: U256) -> Result<U256, IfoError> {
    if !pool.is_oversubscribed() {
        return Ok(contributed);
    }
    math::mul_div(contributed, pool.raising_amount, pool.total_raised)
}

/// Offering, refund and tax for `contributed` against the pool's current totals.
pub fn compute_allocation(pool: &Pool, contributed: U256) -> Result<Allocation, IfoError> {
    if contributed.is_zero() {
        return Ok(Allocation::default());
    }

    if pool.is_oversubscribed() {
        let offering_amount =
            math::mul_div(contributed, pool.offering_amount, pool.total_raised)?;
        let pay = pay_amount(pool, contributed)?;
        let overflow = math::sub(contributed, pay)?;

        let tax_amount = if pool.has_tax {
            tax::apply_rate(overflow, pool.tax_rate())?
        } else {
            U256::ZERO
        };
        let refunding_amount = math::sub(overflow, tax_amount)?;

        Ok(Allocation {
            offering_amount,
            refunding_amount,
            tax_amount,
        })
    } else {
        // Raising target of zero means the pool was never set: nothing is owed.
        if pool.raising_amount.is_zero() {
            return Ok(Allocation::default());
        }
        let offering_amount =
            math::mul_div(contributed, pool.offering_amount, pool.raising_amount)?;
        Ok(Allocation {
            offering_amount,
            refunding_amount: U256::ZERO,
            tax_amount: U256::ZERO,
        })
    }
}
