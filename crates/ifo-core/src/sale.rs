// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO ENGINE - SALE INSTANCE
//
// Aggregate owning one sale's pools, positions, window and event log behind a
// single RwLock. Every mutation (deposit, harvest, admin action) runs under
// the write lock from validation through token settlement to commit, so the
// sale behaves like a serially executed contract. Queries share the read lock.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::allocation::{compute_allocation, user_allocation_fraction, Allocation};
use crate::auth::{AdminAction, Authorizer};
use crate::chain::BlockOracle;
use crate::error::IfoError;
use crate::events::SaleEvent;
use crate::harvest::{commit_harvest, plan_harvest, ParticipationState};
use crate::pool::{PoolInfo, PoolLedger, SalePhase, SaleWindow, UserPoolPosition};
use crate::tokens::{TokenLedger, Transfer};
use crate::{Address, PoolId, U256};
use log::{debug, info};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Static identity of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleParams {
    /// Address holding the sale's escrowed tokens.
    pub address: Address,
    /// Token users commit (LP).
    pub raise_token: Address,
    /// Token being sold.
    pub offering_token: Address,
    pub window: SaleWindow,
    pub pool_count: u8,
}

pub(crate) struct SaleState {
    pub(crate) ledger: PoolLedger,
    pub(crate) events: Vec<SaleEvent>,
}

pub struct SaleInstance {
    address: Address,
    raise_token: Address,
    offering_token: Address,
    state: RwLock<SaleState>,
    pub(crate) tokens: Arc<dyn TokenLedger>,
    auth: Arc<dyn Authorizer>,
    clock: Arc<dyn BlockOracle>,
}

impl std::fmt::Debug for SaleInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SaleInstance")
            .field("address", &self.address)
            .field("raise_token", &self.raise_token)
            .field("offering_token", &self.offering_token)
            .finish_non_exhaustive()
    }
}

impl SaleInstance {
    pub fn new(
        params: SaleParams,
        tokens: Arc<dyn TokenLedger>,
        auth: Arc<dyn Authorizer>,
        clock: Arc<dyn BlockOracle>,
    ) -> Result<Self, IfoError> {
        if params.raise_token == params.offering_token {
            return Err(IfoError::InvalidToken(
                "raise token and offering token must be different".to_string(),
            ));
        }
        let ledger = PoolLedger::new(params.window, params.pool_count)?;
        info!(
            "IFO sale {} initialized: blocks {}..={}, {} pools",
            params.address, params.window.start_block, params.window.end_block, params.pool_count
        );
        Ok(Self {
            address: params.address,
            raise_token: params.raise_token,
            offering_token: params.offering_token,
            state: RwLock::new(SaleState {
                ledger,
                events: Vec::new(),
            }),
            tokens,
            auth,
            clock,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn raise_token(&self) -> Address {
        self.raise_token
    }

    pub fn offering_token(&self) -> Address {
        self.offering_token
    }

    pub fn current_block(&self) -> u64 {
        self.clock.current_block()
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, SaleState>, IfoError> {
        self.state.read().map_err(|_| IfoError::LockPoisoned)
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, SaleState>, IfoError> {
        self.state.write().map_err(|_| IfoError::LockPoisoned)
    }

    pub(crate) fn authorize(&self, caller: Address, action: AdminAction) -> Result<(), IfoError> {
        if self.auth.is_authorized(caller, action) {
            Ok(())
        } else {
            Err(IfoError::Unauthorized(caller))
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // USER OPERATIONS
    // ─────────────────────────────────────────────────────────────────

    /// Commit `amount` of the raise token from `user` into `pool_id`.
    pub fn deposit(&self, user: Address, pool_id: PoolId, amount: U256) -> Result<(), IfoError> {
        let mut state = self.write()?;
        let block = self.clock.current_block();
        let escrowed = self.tokens.balance_of(self.offering_token, self.address)?;

        let pending = state
            .ledger
            .prepare_deposit(user, pool_id, amount, block, escrowed)?;
        self.tokens.execute(&[Transfer::new(
            self.raise_token,
            user,
            self.address,
            amount,
        )])?;
        state.ledger.commit_deposit(&pending);
        state.events.push(SaleEvent::Deposit {
            user,
            amount,
            pool_id,
        });

        info!(
            "Deposit: {} committed {} to pool {} (pool total {})",
            user, amount, pool_id, pending.new_total_raised
        );
        Ok(())
    }

    /// Claim offering tokens and the overflow refund for one pool, exactly once.
    pub fn harvest(&self, user: Address, pool_id: PoolId) -> Result<Allocation, IfoError> {
        let mut state = self.write()?;
        let block = self.clock.current_block();
        let plan = plan_harvest(&state.ledger, user, pool_id, block)?;
        let allocation = plan.allocation;

        let mut transfers = Vec::with_capacity(2);
        if !allocation.offering_amount.is_zero() {
            transfers.push(Transfer::new(
                self.offering_token,
                self.address,
                user,
                allocation.offering_amount,
            ));
        }
        if !allocation.refunding_amount.is_zero() {
            transfers.push(Transfer::new(
                self.raise_token,
                self.address,
                user,
                allocation.refunding_amount,
            ));
        }
        if !transfers.is_empty() {
            self.tokens.execute(&transfers)?;
        }

        commit_harvest(&mut state.ledger, &plan);
        state.events.push(SaleEvent::Harvest {
            user,
            offering_amount: allocation.offering_amount,
            excess_amount: allocation.refunding_amount,
            pool_id,
        });

        info!(
            "Harvest: {} pool {} offering {} refund {} tax {}",
            user,
            pool_id,
            allocation.offering_amount,
            allocation.refunding_amount,
            allocation.tax_amount
        );
        Ok(allocation)
    }

    // ─────────────────────────────────────────────────────────────────
    // QUERIES
    // ─────────────────────────────────────────────────────────────────

    pub fn sale_window(&self) -> Result<SaleWindow, IfoError> {
        Ok(self.read()?.ledger.window())
    }

    pub fn phase(&self) -> Result<SalePhase, IfoError> {
        let window = self.sale_window()?;
        Ok(window.phase(self.clock.current_block()))
    }

    pub fn pool_count(&self) -> Result<u8, IfoError> {
        Ok(self.read()?.ledger.pool_count())
    }

    pub fn pool_info(&self, pool_id: PoolId) -> Result<PoolInfo, IfoError> {
        self.read()?.ledger.pool_info(pool_id)
    }

    /// Live overflow tax rate (1e12 fixed point), zero for untaxed pools.
    pub fn pool_tax_rate(&self, pool_id: PoolId) -> Result<U256, IfoError> {
        Ok(self.read()?.ledger.pool(pool_id)?.tax_rate())
    }

    pub fn total_tokens_offered(&self) -> Result<U256, IfoError> {
        Ok(self.read()?.ledger.total_tokens_offered())
    }

    pub fn user_allocation_fractions(
        &self,
        user: Address,
        pool_ids: &[PoolId],
    ) -> Result<Vec<U256>, IfoError> {
        let state = self.read()?;
        pool_ids
            .iter()
            .map(|&pid| {
                let pool = state.ledger.pool(pid)?;
                let position = state.ledger.position(user, pid);
                user_allocation_fraction(position.contributed, pool.total_raised)
            })
            .collect()
    }

    pub fn user_positions(
        &self,
        user: Address,
        pool_ids: &[PoolId],
    ) -> Result<Vec<UserPoolPosition>, IfoError> {
        let state = self.read()?;
        pool_ids
            .iter()
            .map(|&pid| {
                state.ledger.pool(pid)?;
                Ok(state.ledger.position(user, pid))
            })
            .collect()
    }

    /// Offering / refund / tax breakdown as it would be paid out right now.
    pub fn user_allocations(
        &self,
        user: Address,
        pool_ids: &[PoolId],
    ) -> Result<Vec<Allocation>, IfoError> {
        let state = self.read()?;
        let allocations: Result<Vec<Allocation>, IfoError> = pool_ids
            .iter()
            .map(|&pid| {
                let pool = state.ledger.pool(pid)?;
                let position = state.ledger.position(user, pid);
                compute_allocation(pool, position.contributed)
            })
            .collect();
        debug!("Allocation query for {} over pools {:?}", user, pool_ids);
        allocations
    }

    pub fn participation_state(
        &self,
        user: Address,
        pool_id: PoolId,
    ) -> Result<ParticipationState, IfoError> {
        let state = self.read()?;
        state.ledger.pool(pool_id)?;
        Ok(ParticipationState::of(&state.ledger.position(user, pool_id)))
    }

    /// Copy of the full ledger, for reporting and invariant checks.
    pub fn ledger_snapshot(&self) -> Result<PoolLedger, IfoError> {
        Ok(self.read()?.ledger.clone())
    }

    pub fn events(&self) -> Result<Vec<SaleEvent>, IfoError> {
        Ok(self.read()?.events.clone())
    }

    pub fn drain_events(&self) -> Result<Vec<SaleEvent>, IfoError> {
        Ok(std::mem::take(&mut self.write()?.events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SingleOwner;
    use crate::chain::ManualBlockClock;
    use crate::error::TokenError;
    use crate::pool::PoolTerms;
    use crate::tokens::InMemoryTokenLedger;
    use crate::units::ether;

    const START: u64 = 100;
    const END: u64 = 200;

    struct Fixture {
        sale: SaleInstance,
        tokens: Arc<InMemoryTokenLedger>,
        clock: Arc<ManualBlockClock>,
        admin: Address,
    }

    fn lp() -> Address {
        Address::repeat_byte(0x01)
    }

    fn oc() -> Address {
        Address::repeat_byte(0x02)
    }

    fn user(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    fn fixture() -> Fixture {
        let tokens = Arc::new(InMemoryTokenLedger::new());
        let clock = Arc::new(ManualBlockClock::new(1));
        let admin = user(0xad);
        let sale = SaleInstance::new(
            SaleParams {
                address: user(0x5a),
                raise_token: lp(),
                offering_token: oc(),
                window: SaleWindow::new(START, END).unwrap(),
                pool_count: 2,
            },
            tokens.clone(),
            Arc::new(SingleOwner(admin)),
            clock.clone(),
        )
        .unwrap();
        sale.configure_pool(
            admin,
            0,
            PoolTerms::new(
                ether("50").unwrap(),
                ether("5").unwrap(),
                ether("0.5").unwrap(),
                false,
            ),
        )
        .unwrap();
        sale.configure_pool(
            admin,
            1,
            PoolTerms::new(ether("1000").unwrap(), ether("100").unwrap(), U256::ZERO, true),
        )
        .unwrap();
        for b in 0x10..0x20 {
            tokens.mint(lp(), user(b), ether("1000").unwrap()).unwrap();
        }
        Fixture {
            sale,
            tokens,
            clock,
            admin,
        }
    }

    fn fund(f: &Fixture) {
        f.tokens
            .mint(oc(), f.sale.address(), ether("1050").unwrap())
            .unwrap();
    }

    #[test]
    fn test_tokens_must_differ() {
        let result = SaleInstance::new(
            SaleParams {
                address: user(0x5a),
                raise_token: lp(),
                offering_token: lp(),
                window: SaleWindow::new(START, END).unwrap(),
                pool_count: 2,
            },
            Arc::new(InMemoryTokenLedger::new()),
            Arc::new(SingleOwner(user(1))),
            Arc::new(ManualBlockClock::new(0)),
        );
        assert_eq!(result.unwrap_err().kind(), "InvalidToken");
    }

    #[test]
    fn test_deposit_requires_escrow() {
        let f = fixture();
        f.clock.advance_to(START);
        let err = f.sale.deposit(user(0x10), 0, ether("0.3").unwrap()).unwrap_err();
        assert_eq!(err.kind(), "NotFunded");

        // Funding only one pool's offering is still not enough
        f.tokens
            .mint(oc(), f.sale.address(), ether("1000").unwrap())
            .unwrap();
        let err = f.sale.deposit(user(0x10), 1, ether("0.3").unwrap()).unwrap_err();
        assert_eq!(err.kind(), "NotFunded");

        f.tokens
            .mint(oc(), f.sale.address(), ether("50").unwrap())
            .unwrap();
        assert!(f.sale.deposit(user(0x10), 0, ether("0.3").unwrap()).is_ok());
    }

    #[test]
    fn test_deposit_moves_tokens_and_records_event() {
        let f = fixture();
        fund(&f);
        f.clock.advance_to(START);
        f.sale.deposit(user(0x10), 0, ether("0.3").unwrap()).unwrap();

        assert_eq!(
            f.tokens.balance_of(lp(), f.sale.address()).unwrap(),
            ether("0.3").unwrap()
        );
        assert_eq!(
            f.sale.pool_info(0).unwrap().total_raised,
            ether("0.3").unwrap()
        );
        assert_eq!(
            f.sale.user_allocation_fractions(user(0x10), &[0]).unwrap(),
            vec![U256::from(crate::PRECISION)]
        );
        let events = f.sale.events().unwrap();
        assert_eq!(
            events.last(),
            Some(&SaleEvent::Deposit {
                user: user(0x10),
                amount: ether("0.3").unwrap(),
                pool_id: 0
            })
        );
    }

    #[test]
    fn test_deposit_without_raise_tokens_leaves_ledger_untouched() {
        let f = fixture();
        fund(&f);
        f.clock.advance_to(START);
        let broke = user(0x77);
        let err = f.sale.deposit(broke, 1, ether("1").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            IfoError::Transfer(TokenError::InsufficientBalance { .. })
        ));
        assert_eq!(f.sale.pool_info(1).unwrap().total_raised, U256::ZERO);
        assert_eq!(
            f.sale.participation_state(broke, 1).unwrap(),
            ParticipationState::NotParticipated
        );
    }

    #[test]
    fn test_harvest_exactly_once() {
        let f = fixture();
        fund(&f);
        f.clock.advance_to(START);
        f.sale.deposit(user(0x10), 1, ether("5").unwrap()).unwrap();
        f.sale.deposit(user(0x11), 1, ether("995").unwrap()).unwrap();

        f.clock.advance_to(END);
        assert_eq!(f.sale.harvest(user(0x10), 1), Err(IfoError::TooEarly));

        f.clock.advance_to(END + 1);
        let a = f.sale.harvest(user(0x10), 1).unwrap();
        assert_eq!(a.offering_amount, ether("5").unwrap());
        assert_eq!(a.refunding_amount, ether("4.455").unwrap());

        let oc_after = f.tokens.balance_of(oc(), user(0x10)).unwrap();
        let lp_after = f.tokens.balance_of(lp(), user(0x10)).unwrap();
        let events_after = f.sale.events().unwrap().len();

        assert_eq!(f.sale.harvest(user(0x10), 1), Err(IfoError::AlreadyHarvested));
        assert_eq!(f.tokens.balance_of(oc(), user(0x10)).unwrap(), oc_after);
        assert_eq!(f.tokens.balance_of(lp(), user(0x10)).unwrap(), lp_after);
        assert_eq!(f.sale.events().unwrap().len(), events_after);
        assert_eq!(
            f.sale.pool_info(1).unwrap().sum_taxes_overflow,
            ether("0.045").unwrap()
        );
    }

    #[test]
    fn test_failed_transfer_rolls_back_harvest() {
        let f = fixture();
        fund(&f);
        f.clock.advance_to(START);
        f.sale.deposit(user(0x10), 1, ether("500").unwrap()).unwrap();
        f.sale.deposit(user(0x11), 1, ether("500").unwrap()).unwrap();
        f.clock.advance_to(END + 1);

        // Refund leg fails: the offering leg must not be paid either
        f.tokens.set_paused(lp(), true).unwrap();
        let err = f.sale.harvest(user(0x10), 1).unwrap_err();
        assert_eq!(err.kind(), "Transfer");
        assert_eq!(f.tokens.balance_of(oc(), user(0x10)).unwrap(), U256::ZERO);
        assert_eq!(
            f.sale.participation_state(user(0x10), 1).unwrap(),
            ParticipationState::Participated
        );
        assert_eq!(f.sale.pool_info(1).unwrap().sum_taxes_overflow, U256::ZERO);

        f.tokens.set_paused(lp(), false).unwrap();
        assert!(f.sale.harvest(user(0x10), 1).is_ok());
        assert_eq!(
            f.sale.participation_state(user(0x10), 1).unwrap(),
            ParticipationState::Harvested
        );
    }

    #[test]
    fn test_batch_queries_reject_unknown_pool() {
        let f = fixture();
        assert_eq!(
            f.sale.user_positions(user(0x10), &[0, 1, 2]),
            Err(IfoError::InvalidPool(2))
        );
        assert_eq!(
            f.sale.user_allocations(user(0x10), &[0, 1]).unwrap(),
            vec![Allocation::default(), Allocation::default()]
        );
    }

    #[test]
    fn test_phase_follows_clock() {
        let f = fixture();
        assert_eq!(f.sale.phase().unwrap(), SalePhase::Pending);
        f.clock.advance_to(START);
        assert_eq!(f.sale.phase().unwrap(), SalePhase::Active);
        f.clock.advance_to(END + 1);
        assert_eq!(f.sale.phase().unwrap(), SalePhase::Ended);
        let _ = f.admin;
    }

    #[test]
    fn test_drain_events() {
        let f = fixture();
        // two PoolParametersSet events from the fixture
        assert_eq!(f.sale.drain_events().unwrap().len(), 2);
        assert!(f.sale.events().unwrap().is_empty());
    }
}
