//! Authorization seam for administrative operations.
//!
//! The on-chain sale is `Ownable`; a simulator may instead plug in a set of
//! operators or any external role check.

use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminAction {
    ConfigurePool,
    UpdateSaleWindow,
    Withdraw,
    RecoverToken,
    CreateSale,
}

pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, caller: Address, action: AdminAction) -> bool;
}

/// Single owner allowed to perform every action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleOwner(pub Address);

impl Authorizer for SingleOwner {
    fn is_authorized(&self, caller: Address, _action: AdminAction) -> bool {
        caller == self.0
    }
}

/// Any member of the set may perform every action.
///
/// Membership is fixed at construction; build the complete set before
/// handing it to a sale or factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorSet {
    operators: BTreeSet<Address>,
}

impl OperatorSet {
    pub fn new<I: IntoIterator<Item = Address>>(operators: I) -> Self {
        Self {
            operators: operators.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl Authorizer for OperatorSet {
    fn is_authorized(&self, caller: Address, _action: AdminAction) -> bool {
        self.operators.contains(&caller)
    }
}
