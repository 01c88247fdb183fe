// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO ENGINE - POOL LEDGER
//
// Authoritative record of pool configuration, the sale window and every
// user's contribution. Mutations are split into prepare (validate, compute
// new totals) and commit (infallible write) so a caller can run external
// transfers in between and abandon the change if they fail.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::IfoError;
use crate::tax::TaxSchedule;
use crate::{math, Address, PoolId, MAX_POOL_COUNT, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deposit/harvest window expressed in block numbers (never wall-clock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleWindow {
    pub start_block: u64,
    pub end_block: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalePhase {
    /// Before `start_block`: pools and window may still change.
    Pending,
    /// `start_block..=end_block`: deposits accepted.
    Active,
    /// After `end_block`: harvest open.
    Ended,
}

impl SaleWindow {
    pub fn new(start_block: u64, end_block: u64) -> Result<Self, IfoError> {
        if start_block >= end_block {
            return Err(IfoError::InvalidRange {
                start: start_block,
                end: end_block,
            });
        }
        Ok(Self {
            start_block,
            end_block,
        })
    }

    pub fn phase(&self, block: u64) -> SalePhase {
        if block < self.start_block {
            SalePhase::Pending
        } else if block <= self.end_block {
            SalePhase::Active
        } else {
            SalePhase::Ended
        }
    }

    pub fn has_started(&self, block: u64) -> bool {
        block >= self.start_block
    }

    pub fn has_ended(&self, block: u64) -> bool {
        block > self.end_block
    }
}

/// Administrative terms of a pool, as passed to `configure_pool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolTerms {
    pub offering_amount: U256,
    pub raising_amount: U256,
    /// 0 = uncapped
    pub cap_per_user: U256,
    pub has_tax: bool,
    pub tax_schedule: TaxSchedule,
}

impl PoolTerms {
    pub fn new(
        offering_amount: U256,
        raising_amount: U256,
        cap_per_user: U256,
        has_tax: bool,
    ) -> Self {
        Self {
            offering_amount,
            raising_amount,
            cap_per_user,
            has_tax,
            tax_schedule: TaxSchedule::default(),
        }
    }

    pub fn with_tax_schedule(mut self, schedule: TaxSchedule) -> Self {
        self.tax_schedule = schedule;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pool {
    pub offering_amount: U256,
    pub raising_amount: U256,
    pub cap_per_user: U256,
    pub has_tax: bool,
    pub tax_schedule: TaxSchedule,
    pub total_raised: U256,
    pub sum_taxes_overflow: U256,
}

impl Pool {
    /// Deposits require both amounts to be non-zero.
    pub fn is_set(&self) -> bool {
        !self.offering_amount.is_zero() && !self.raising_amount.is_zero()
    }

    pub fn is_oversubscribed(&self) -> bool {
        self.total_raised > self.raising_amount
    }

    /// Live overflow tax rate; zero for untaxed pools.
    pub fn tax_rate(&self) -> U256 {
        if !self.has_tax {
            return U256::ZERO;
        }
        self.tax_schedule
            .rate_for(self.total_raised, self.raising_amount)
    }
}

/// Read-only snapshot returned by the query surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub pool_id: PoolId,
    pub raising_amount: U256,
    pub offering_amount: U256,
    pub cap_per_user: U256,
    pub has_tax: bool,
    pub total_raised: U256,
    pub sum_taxes_overflow: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserPoolPosition {
    pub contributed: U256,
    pub claimed: bool,
}

/// Validated deposit waiting to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeposit {
    pub user: Address,
    pub pool_id: PoolId,
    pub amount: U256,
    pub new_contribution: U256,
    pub new_total_raised: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLedger {
    window: SaleWindow,
    pools: Vec<Pool>,
    positions: BTreeMap<(Address, PoolId), UserPoolPosition>,
    total_tokens_offered: U256,
}

impl PoolLedger {
    pub fn new(window: SaleWindow, pool_count: u8) -> Result<Self, IfoError> {
        let window = SaleWindow::new(window.start_block, window.end_block)?;
        if pool_count == 0 || pool_count > MAX_POOL_COUNT {
            return Err(IfoError::Config(format!(
                "pool count must be within 1..={}, got {}",
                MAX_POOL_COUNT, pool_count
            )));
        }
        Ok(Self {
            window,
            pools: vec![Pool::default(); pool_count as usize],
            positions: BTreeMap::new(),
            total_tokens_offered: U256::ZERO,
        })
    }

    pub fn window(&self) -> SaleWindow {
        self.window
    }

    pub fn pool_count(&self) -> u8 {
        self.pools.len() as u8
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn pool(&self, pool_id: PoolId) -> Result<&Pool, IfoError> {
        self.pools
            .get(pool_id as usize)
            .ok_or(IfoError::InvalidPool(pool_id))
    }

    pub fn pool_info(&self, pool_id: PoolId) -> Result<PoolInfo, IfoError> {
        let pool = self.pool(pool_id)?;
        Ok(PoolInfo {
            pool_id,
            raising_amount: pool.raising_amount,
            offering_amount: pool.offering_amount,
            cap_per_user: pool.cap_per_user,
            has_tax: pool.has_tax,
            total_raised: pool.total_raised,
            sum_taxes_overflow: pool.sum_taxes_overflow,
        })
    }

    /// Position of `user` in `pool_id`; an all-zero position if they never deposited.
    pub fn position(&self, user: Address, pool_id: PoolId) -> UserPoolPosition {
        self.positions
            .get(&(user, pool_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn participants(
        &self,
        pool_id: PoolId,
    ) -> impl Iterator<Item = (Address, &UserPoolPosition)> + '_ {
        self.positions
            .iter()
            .filter(move |((_, pid), _)| *pid == pool_id)
            .map(|((user, _), position)| (*user, position))
    }

    /// Sum of offering amounts across all pools (what must be escrowed).
    pub fn total_tokens_offered(&self) -> U256 {
        self.total_tokens_offered
    }

    pub fn configure_pool(
        &mut self,
        pool_id: PoolId,
        terms: PoolTerms,
        current_block: u64,
    ) -> Result<(), IfoError> {
        if self.window.has_started(current_block) {
            return Err(IfoError::SaleStarted);
        }
        let existing = self.pool(pool_id)?;
        terms.tax_schedule.validate()?;

        let mut total = U256::ZERO;
        for (pid, pool) in self.pools.iter().enumerate() {
            let offering = if pid == pool_id as usize {
                terms.offering_amount
            } else {
                pool.offering_amount
            };
            total = math::add(total, offering)?;
        }

        let updated = Pool {
            offering_amount: terms.offering_amount,
            raising_amount: terms.raising_amount,
            cap_per_user: terms.cap_per_user,
            has_tax: terms.has_tax,
            tax_schedule: terms.tax_schedule,
            total_raised: existing.total_raised,
            sum_taxes_overflow: existing.sum_taxes_overflow,
        };
        self.pools[pool_id as usize] = updated;
        self.total_tokens_offered = total;
        Ok(())
    }

    /// Move the sale window. Only allowed while the sale is pending.
    pub fn reschedule(
        &mut self,
        new_start: u64,
        new_end: u64,
        current_block: u64,
    ) -> Result<(), IfoError> {
        if self.window.has_started(current_block) {
            return Err(IfoError::SaleStarted);
        }
        let window = SaleWindow::new(new_start, new_end)?;
        if new_start <= current_block {
            return Err(IfoError::InvalidRange {
                start: new_start,
                end: new_end,
            });
        }
        self.window = window;
        Ok(())
    }

    /// Validate a deposit against the window, pool terms, escrow and user cap.
    ///
    /// `escrowed_offering` is the sale's current offering-token balance.
    pub fn prepare_deposit(
        &self,
        user: Address,
        pool_id: PoolId,
        amount: U256,
        current_block: u64,
        escrowed_offering: U256,
    ) -> Result<PendingDeposit, IfoError> {
        let pool = self.pool(pool_id)?;
        if !pool.is_set() {
            return Err(IfoError::PoolNotSet(pool_id));
        }
        if current_block < self.window.start_block {
            return Err(IfoError::TooEarly);
        }
        if current_block > self.window.end_block {
            return Err(IfoError::TooLate);
        }
        if amount.is_zero() {
            return Err(IfoError::InvalidAmount);
        }
        if escrowed_offering < self.total_tokens_offered {
            return Err(IfoError::NotFunded {
                required: self.total_tokens_offered,
                escrowed: escrowed_offering,
            });
        }

        let position = self.position(user, pool_id);
        let new_contribution = math::add(position.contributed, amount)?;
        if !pool.cap_per_user.is_zero() && new_contribution > pool.cap_per_user {
            return Err(IfoError::CapExceeded {
                cap: pool.cap_per_user,
                requested: new_contribution,
            });
        }
        let new_total_raised = math::add(pool.total_raised, amount)?;

        Ok(PendingDeposit {
            user,
            pool_id,
            amount,
            new_contribution,
            new_total_raised,
        })
    }

    pub fn commit_deposit(&mut self, pending: &PendingDeposit) {
        let entry = self
            .positions
            .entry((pending.user, pending.pool_id))
            .or_default();
        entry.contributed = pending.new_contribution;
        self.pools[pending.pool_id as usize].total_raised = pending.new_total_raised;
    }

    /// Ledger-only deposit: validate then commit in one step.
    pub fn record_deposit(
        &mut self,
        user: Address,
        pool_id: PoolId,
        amount: U256,
        current_block: u64,
        escrowed_offering: U256,
    ) -> Result<PendingDeposit, IfoError> {
        let pending =
            self.prepare_deposit(user, pool_id, amount, current_block, escrowed_offering)?;
        self.commit_deposit(&pending);
        Ok(pending)
    }

    pub(crate) fn mark_claimed(
        &mut self,
        user: Address,
        pool_id: PoolId,
        new_sum_taxes_overflow: U256,
    ) {
        if let Some(position) = self.positions.get_mut(&(user, pool_id)) {
            position.claimed = true;
        }
        self.pools[pool_id as usize].sum_taxes_overflow = new_sum_taxes_overflow;
    }

    /// Every configured pool must imply the same raise/offering price.
    pub fn check_price_consistency(&self) -> Result<(), IfoError> {
        check_price_consistency(
            self.pools
                .iter()
                .enumerate()
                .map(|(pid, p)| (pid as PoolId, p.offering_amount, p.raising_amount)),
        )
    }
}

/// Compare `raising / offering` across pools by cross-multiplication.
/// Pools with a zero amount are not configured and are skipped.
pub fn check_price_consistency<I>(pools: I) -> Result<(), IfoError>
where
    I: IntoIterator<Item = (PoolId, U256, U256)>,
{
    let mut reference: Option<(PoolId, U256, U256)> = None;
    for (pid, offering, raising) in pools {
        if offering.is_zero() || raising.is_zero() {
            continue;
        }
        match reference {
            None => reference = Some((pid, offering, raising)),
            Some((ref_pid, ref_offering, ref_raising)) => {
                let lhs = raising
                    .checked_mul(ref_offering)
                    .ok_or(IfoError::ArithmeticOverflow)?;
                let rhs = ref_raising
                    .checked_mul(offering)
                    .ok_or(IfoError::ArithmeticOverflow)?;
                if lhs != rhs {
                    return Err(IfoError::Inconsistent(format!(
                        "pool {} price differs from pool {}",
                        pid, ref_pid
                    )));
                }
            }
        }
    }
    Ok(())
}
