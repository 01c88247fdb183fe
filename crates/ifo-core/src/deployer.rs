//! # Sale Factory
//!
//! Creates sale instances at deterministic addresses and keeps a registry of
//! them. The address of a sale is the last 20 bytes of
//! `keccak256(factory ‖ raise_token ‖ offering_token ‖ start_block)`, with the
//! start block encoded as a 32-byte big-endian word.

use crate::auth::{AdminAction, Authorizer, SingleOwner};
use crate::chain::BlockOracle;
use crate::error::IfoError;
use crate::pool::SaleWindow;
use crate::sale::{SaleInstance, SaleParams};
use crate::tokens::TokenLedger;
use crate::{Address, DEFAULT_POOL_COUNT, MAX_BUFFER_BLOCKS, U256};
use log::info;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum FactoryEvent {
    NewSaleContract { address: Address },
}

pub fn derive_sale_address(
    factory: Address,
    raise_token: Address,
    offering_token: Address,
    start_block: u64,
) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(factory.as_slice());
    hasher.update(raise_token.as_slice());
    hasher.update(offering_token.as_slice());
    hasher.update(U256::from(start_block).to_be_bytes::<32>());
    let digest = hasher.finalize();
    Address::from_slice(&digest[12..])
}

pub struct SaleFactory {
    address: Address,
    owner: Arc<dyn Authorizer>,
    tokens: Arc<dyn TokenLedger>,
    clock: Arc<dyn BlockOracle>,
    max_buffer_blocks: u64,
    pool_count: u8,
    sales: RwLock<BTreeMap<Address, Arc<SaleInstance>>>,
    events: RwLock<Vec<FactoryEvent>>,
}

impl SaleFactory {
    pub fn new(
        address: Address,
        owner: Arc<dyn Authorizer>,
        tokens: Arc<dyn TokenLedger>,
        clock: Arc<dyn BlockOracle>,
    ) -> Self {
        Self {
            address,
            owner,
            tokens,
            clock,
            max_buffer_blocks: MAX_BUFFER_BLOCKS,
            pool_count: DEFAULT_POOL_COUNT,
            sales: RwLock::new(BTreeMap::new()),
            events: RwLock::new(Vec::new()),
        }
    }

    pub fn with_max_buffer_blocks(mut self, blocks: u64) -> Self {
        self.max_buffer_blocks = blocks;
        self
    }

    pub fn with_pool_count(mut self, pool_count: u8) -> Self {
        self.pool_count = pool_count;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Deploy a new sale administered by `admin`.
    pub fn create_sale(
        &self,
        caller: Address,
        raise_token: Address,
        offering_token: Address,
        start_block: u64,
        end_block: u64,
        admin: Address,
    ) -> Result<Arc<SaleInstance>, IfoError> {
        if !self.owner.is_authorized(caller, AdminAction::CreateSale) {
            return Err(IfoError::Unauthorized(caller));
        }
        if raise_token == offering_token {
            return Err(IfoError::InvalidToken(
                "raise token and offering token must be different".to_string(),
            ));
        }

        let current = self.clock.current_block();
        let out_of_range = IfoError::InvalidRange {
            start: start_block,
            end: end_block,
        };
        if end_block >= current.saturating_add(self.max_buffer_blocks) {
            return Err(out_of_range);
        }
        if start_block >= end_block || start_block <= current {
            return Err(out_of_range);
        }

        let address = derive_sale_address(self.address, raise_token, offering_token, start_block);
        let mut sales = self.sales.write().map_err(|_| IfoError::LockPoisoned)?;
        if sales.contains_key(&address) {
            return Err(IfoError::SaleExists(address));
        }

        let sale = Arc::new(SaleInstance::new(
            SaleParams {
                address,
                raise_token,
                offering_token,
                window: SaleWindow::new(start_block, end_block)?,
                pool_count: self.pool_count,
            },
            self.tokens.clone(),
            Arc::new(SingleOwner(admin)),
            self.clock.clone(),
        )?);
        sales.insert(address, sale.clone());
        self.events
            .write()
            .map_err(|_| IfoError::LockPoisoned)?
            .push(FactoryEvent::NewSaleContract { address });

        info!(
            "Factory {} deployed sale {} (admin {}, blocks {}..={})",
            self.address, address, admin, start_block, end_block
        );
        Ok(sale)
    }

    pub fn sale(&self, address: Address) -> Result<Option<Arc<SaleInstance>>, IfoError> {
        let sales = self.sales.read().map_err(|_| IfoError::LockPoisoned)?;
        Ok(sales.get(&address).cloned())
    }

    pub fn sale_addresses(&self) -> Result<Vec<Address>, IfoError> {
        let sales = self.sales.read().map_err(|_| IfoError::LockPoisoned)?;
        Ok(sales.keys().copied().collect())
    }

    pub fn events(&self) -> Result<Vec<FactoryEvent>, IfoError> {
        Ok(self
            .events
            .read()
            .map_err(|_| IfoError::LockPoisoned)?
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ManualBlockClock;
    use crate::tokens::InMemoryTokenLedger;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    fn factory(block: u64) -> SaleFactory {
        SaleFactory::new(
            addr(0xfa),
            Arc::new(SingleOwner(addr(0xad))),
            Arc::new(InMemoryTokenLedger::new()),
            Arc::new(ManualBlockClock::new(block)),
        )
    }

    #[test]
    fn test_address_is_deterministic() {
        let a = derive_sale_address(addr(0xfa), addr(1), addr(2), 100);
        let b = derive_sale_address(addr(0xfa), addr(1), addr(2), 100);
        let c = derive_sale_address(addr(0xfa), addr(1), addr(2), 101);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, derive_sale_address(addr(0xfb), addr(1), addr(2), 100));
    }

    #[test]
    fn test_create_sale_registers_and_emits() {
        let f = factory(10);
        let sale = f
            .create_sale(addr(0xad), addr(1), addr(2), 100, 200, addr(0xcc))
            .unwrap();
        assert_eq!(sale.address(), derive_sale_address(addr(0xfa), addr(1), addr(2), 100));
        assert!(f.sale(sale.address()).unwrap().is_some());
        assert_eq!(
            f.events().unwrap(),
            vec![FactoryEvent::NewSaleContract {
                address: sale.address()
            }]
        );
        assert_eq!(sale.pool_count().unwrap(), DEFAULT_POOL_COUNT);
    }

    #[test]
    fn test_create_sale_rules() {
        let f = factory(10);
        let owner = addr(0xad);
        assert_eq!(
            f.create_sale(addr(0x01), addr(1), addr(2), 100, 200, owner)
                .unwrap_err(),
            IfoError::Unauthorized(addr(0x01))
        );
        assert_eq!(
            f.create_sale(owner, addr(1), addr(1), 100, 200, owner)
                .unwrap_err()
                .kind(),
            "InvalidToken"
        );
        // end beyond the buffer
        assert_eq!(
            f.create_sale(owner, addr(1), addr(2), 100, 10 + MAX_BUFFER_BLOCKS, owner)
                .unwrap_err()
                .kind(),
            "InvalidRange"
        );
        // start not after the current block
        assert_eq!(
            f.create_sale(owner, addr(1), addr(2), 10, 200, owner)
                .unwrap_err()
                .kind(),
            "InvalidRange"
        );
        assert_eq!(
            f.create_sale(owner, addr(1), addr(2), 200, 200, owner)
                .unwrap_err()
                .kind(),
            "InvalidRange"
        );
    }

    #[test]
    fn test_duplicate_sale_rejected() {
        let f = factory(10);
        let owner = addr(0xad);
        let sale = f
            .create_sale(owner, addr(1), addr(2), 100, 200, owner)
            .unwrap();
        assert_eq!(
            f.create_sale(owner, addr(1), addr(2), 100, 300, owner)
                .unwrap_err(),
            IfoError::SaleExists(sale.address())
        );
        assert_eq!(f.sale_addresses().unwrap().len(), 1);
    }

    #[test]
    fn test_sale_admin_is_not_factory_owner() {
        let f = factory(10);
        let sale = f
            .create_sale(addr(0xad), addr(1), addr(2), 100, 200, addr(0xcc))
            .unwrap();
        let terms = crate::pool::PoolTerms::new(
            U256::from(10u64),
            U256::from(1u64),
            U256::ZERO,
            false,
        );
        assert!(sale.configure_pool(addr(0xad), 0, terms.clone()).is_err());
        assert!(sale.configure_pool(addr(0xcc), 0, terms).is_ok());
    }
}
