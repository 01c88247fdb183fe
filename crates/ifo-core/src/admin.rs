// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO ENGINE - ADMINISTRATIVE OPERATIONS
//
// Owner-only controls of a sale: pool configuration and window changes while
// pending, plus withdrawal of raised funds and recovery of stray tokens.
// Authorization is checked before anything else.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::auth::AdminAction;
use crate::error::IfoError;
use crate::events::SaleEvent;
use crate::pool::PoolTerms;
use crate::sale::SaleInstance;
use crate::tokens::Transfer;
use crate::{Address, PoolId, U256};
use log::{info, warn};

impl SaleInstance {
    /// Set offering/raising amounts, user cap and tax flag of one pool.
    pub fn configure_pool(
        &self,
        caller: Address,
        pool_id: PoolId,
        terms: PoolTerms,
    ) -> Result<(), IfoError> {
        self.authorize(caller, AdminAction::ConfigurePool)?;
        let mut state = self.write()?;
        let block = self.current_block();

        let offering_amount = terms.offering_amount;
        let raising_amount = terms.raising_amount;
        state.ledger.configure_pool(pool_id, terms, block)?;
        state.events.push(SaleEvent::PoolParametersSet {
            offering_amount,
            raising_amount,
            pool_id,
        });

        if let Err(e) = state.ledger.check_price_consistency() {
            warn!("Pool {} configured with diverging price: {}", pool_id, e);
        }
        info!(
            "Pool {} set: offering {} for raising {} (total offered {})",
            pool_id,
            offering_amount,
            raising_amount,
            state.ledger.total_tokens_offered()
        );
        Ok(())
    }

    /// Move the sale window before it opens.
    pub fn update_sale_window(
        &self,
        caller: Address,
        start_block: u64,
        end_block: u64,
    ) -> Result<(), IfoError> {
        self.authorize(caller, AdminAction::UpdateSaleWindow)?;
        let mut state = self.write()?;
        let block = self.current_block();

        state.ledger.reschedule(start_block, end_block, block)?;
        state.events.push(SaleEvent::NewStartAndEndBlocks {
            start_block,
            end_block,
        });
        info!("Sale window moved to blocks {}..={}", start_block, end_block);
        Ok(())
    }

    /// Transfer raise and offering tokens held by the sale to the caller.
    ///
    /// Not gated on the sale phase; withdrawing while deposits or harvests
    /// are outstanding can leave the sale unable to pay participants.
    pub fn withdraw(
        &self,
        caller: Address,
        lp_amount: U256,
        offering_amount: U256,
    ) -> Result<(), IfoError> {
        self.authorize(caller, AdminAction::Withdraw)?;
        let mut state = self.write()?;
        let block = self.current_block();

        let sale = self.address();
        let lp_available = self.tokens.balance_of(self.raise_token(), sale)?;
        if lp_amount > lp_available {
            return Err(IfoError::InsufficientBalance {
                token: self.raise_token(),
                available: lp_available,
                requested: lp_amount,
            });
        }
        let offering_available = self.tokens.balance_of(self.offering_token(), sale)?;
        if offering_amount > offering_available {
            return Err(IfoError::InsufficientBalance {
                token: self.offering_token(),
                available: offering_available,
                requested: offering_amount,
            });
        }

        if !state.ledger.window().has_ended(block) {
            warn!(
                "Admin withdraw at block {} before sale end {}",
                block,
                state.ledger.window().end_block
            );
        }

        let mut transfers = Vec::with_capacity(2);
        if !lp_amount.is_zero() {
            transfers.push(Transfer::new(self.raise_token(), sale, caller, lp_amount));
        }
        if !offering_amount.is_zero() {
            transfers.push(Transfer::new(
                self.offering_token(),
                sale,
                caller,
                offering_amount,
            ));
        }
        if !transfers.is_empty() {
            self.tokens.execute(&transfers)?;
        }

        state.events.push(SaleEvent::AdminWithdraw {
            amount_lp: lp_amount,
            amount_offering_token: offering_amount,
        });
        info!(
            "Admin withdraw: {} LP, {} offering to {}",
            lp_amount, offering_amount, caller
        );
        Ok(())
    }

    /// Return tokens sent to the sale by mistake. Sale tokens are refused.
    pub fn recover_foreign_token(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), IfoError> {
        self.authorize(caller, AdminAction::RecoverToken)?;
        if token == self.raise_token() || token == self.offering_token() {
            return Err(IfoError::ForbiddenToken(token));
        }
        let mut state = self.write()?;

        self.tokens
            .execute(&[Transfer::new(token, self.address(), caller, amount)])?;
        state
            .events
            .push(SaleEvent::AdminTokenRecovery { token, amount });
        info!("Recovered {} of token {} to {}", amount, token, caller);
        Ok(())
    }
}
