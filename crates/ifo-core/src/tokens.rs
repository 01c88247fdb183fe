//! # Token Ledger Seam
//!
//! The sale never owns token balances; it asks a collaborator to move them.
//! A `TokenLedger` executes a batch of transfers all-or-nothing so deposits
//! and harvests can settle atomically with the ledger commit.
//!
//! `InMemoryTokenLedger` is the simulator implementation: balances keyed by
//! `(token, holder)`, mintable, with per-token pause for failure injection.

use crate::error::TokenError;
use crate::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

impl Transfer {
    pub fn new(token: Address, from: Address, to: Address, amount: U256) -> Self {
        Self {
            token,
            from,
            to,
            amount,
        }
    }
}

pub trait TokenLedger: Send + Sync {
    fn balance_of(&self, token: Address, holder: Address) -> Result<U256, TokenError>;

    /// Apply every transfer or none of them.
    fn execute(&self, transfers: &[Transfer]) -> Result<(), TokenError>;
}

#[derive(Debug, Default)]
struct Balances {
    balances: BTreeMap<(Address, Address), U256>,
    paused: BTreeSet<Address>,
}

#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    inner: Mutex<Balances>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&self, token: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        let mut inner = self.inner.lock().map_err(|_| TokenError::LockPoisoned)?;
        let balance = inner.balances.entry((token, to)).or_insert(U256::ZERO);
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }

    /// While paused every transfer of `token` is rejected.
    pub fn set_paused(&self, token: Address, paused: bool) -> Result<(), TokenError> {
        let mut inner = self.inner.lock().map_err(|_| TokenError::LockPoisoned)?;
        if paused {
            inner.paused.insert(token);
        } else {
            inner.paused.remove(&token);
        }
        Ok(())
    }

    /// Sum of all balances of `token`.
    pub fn supply_of(&self, token: Address) -> Result<U256, TokenError> {
        let inner = self.inner.lock().map_err(|_| TokenError::LockPoisoned)?;
        inner
            .balances
            .iter()
            .filter(|((t, _), _)| *t == token)
            .try_fold(U256::ZERO, |acc, (_, b)| {
                acc.checked_add(*b).ok_or(TokenError::Overflow)
            })
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, token: Address, holder: Address) -> Result<U256, TokenError> {
        let inner = self.inner.lock().map_err(|_| TokenError::LockPoisoned)?;
        Ok(inner
            .balances
            .get(&(token, holder))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    fn execute(&self, transfers: &[Transfer]) -> Result<(), TokenError> {
        let mut inner = self.inner.lock().map_err(|_| TokenError::LockPoisoned)?;

        // Stage every touched balance, validate the whole batch, then write back.
        let mut staged: BTreeMap<(Address, Address), U256> = BTreeMap::new();
        for t in transfers {
            if inner.paused.contains(&t.token) {
                return Err(TokenError::Paused(t.token));
            }
            for key in [(t.token, t.from), (t.token, t.to)] {
                if !staged.contains_key(&key) {
                    let current = inner.balances.get(&key).copied().unwrap_or(U256::ZERO);
                    staged.insert(key, current);
                }
            }

            let from_balance = staged[&(t.token, t.from)];
            let remaining =
                from_balance
                    .checked_sub(t.amount)
                    .ok_or(TokenError::InsufficientBalance {
                        token: t.token,
                        holder: t.from,
                        balance: from_balance,
                        needed: t.amount,
                    })?;
            staged.insert((t.token, t.from), remaining);

            let to_balance = staged[&(t.token, t.to)];
            let credited = to_balance
                .checked_add(t.amount)
                .ok_or(TokenError::Overflow)?;
            staged.insert((t.token, t.to), credited);
        }

        for (key, balance) in staged {
            inner.balances.insert(key, balance);
        }
        Ok(())
    }
}
