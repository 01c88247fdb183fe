//! Fuzz target: random deposit/harvest sequences against one sale
//!
//! Drives a two-pool sale with arbitrary users, amounts and block jumps and
//! checks after every step:
//! 1. No panics, only Ok/Err
//! 2. Pool totals equal the sum of recorded contributions
//! 3. Token supplies never change (transfers only move balances)
//! 4. A harvest never hands back more raise token than was contributed
//!
//! Run: cargo +nightly fuzz run fuzz_sale_operations

#![no_main]
use arbitrary::Arbitrary;
use ifo_core::pool::PoolTerms;
use ifo_core::{
    Address, InMemoryTokenLedger, ManualBlockClock, SaleInstance, SaleParams, SaleWindow,
    SingleOwner, U256,
};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const USERS: u8 = 8;

#[derive(Arbitrary, Debug)]
enum Op {
    Deposit { user: u8, pool: u8, amount: u64 },
    Harvest { user: u8, pool: u8 },
    Mine { blocks: u8 },
}

#[derive(Arbitrary, Debug)]
struct FuzzSaleInput {
    offering: [u64; 2],
    raising: [u64; 2],
    cap: u64,
    taxed: bool,
    ops: Vec<Op>,
}

fn user(i: u8) -> Address {
    Address::with_last_byte(0x10 + i % USERS)
}

fuzz_target!(|input: FuzzSaleInput| {
    let admin = Address::with_last_byte(0xad);
    let lp = Address::with_last_byte(0x01);
    let oc = Address::with_last_byte(0x02);
    let tokens = Arc::new(InMemoryTokenLedger::new());
    let clock = Arc::new(ManualBlockClock::new(1));

    let Ok(window) = SaleWindow::new(10, 100) else {
        return;
    };
    let params = SaleParams {
        address: Address::with_last_byte(0x5a),
        raise_token: lp,
        offering_token: oc,
        window,
        pool_count: 2,
    };
    let auth = Arc::new(SingleOwner(admin));
    let Ok(sale) = SaleInstance::new(params, tokens.clone(), auth, clock.clone()) else {
        return;
    };

    for pid in 0..2u8 {
        let i = pid as usize;
        let cap = if pid == 0 { input.cap } else { 0 };
        let terms = PoolTerms::new(
            U256::from(input.offering[i]),
            U256::from(input.raising[i]),
            U256::from(cap),
            pid == 1 && input.taxed,
        );
        let _ = sale.configure_pool(admin, pid, terms);
    }

    let Ok(offered) = sale.total_tokens_offered() else {
        return;
    };
    let _ = tokens.mint(oc, sale.address(), offered);
    for i in 0..USERS {
        let _ = tokens.mint(lp, user(i), U256::from(u64::MAX));
    }
    let lp_supply = tokens.supply_of(lp).ok();
    let oc_supply = tokens.supply_of(oc).ok();

    let mut contributed = [[U256::ZERO; 2]; USERS as usize];

    for op in input.ops.iter().take(256) {
        match *op {
            Op::Deposit { user: u, pool, amount } => {
                if sale.deposit(user(u), pool, U256::from(amount)).is_ok() {
                    let slot = &mut contributed[(u % USERS) as usize][pool as usize];
                    *slot += U256::from(amount);
                }
            }
            Op::Harvest { user: u, pool } => {
                if let Ok(allocation) = sale.harvest(user(u), pool) {
                    let c = contributed[(u % USERS) as usize][pool as usize];
                    assert!(allocation.refunding_amount + allocation.tax_amount <= c);
                }
            }
            Op::Mine { blocks } => {
                clock.mine(blocks as u64);
            }
        }

        for pid in 0..2u8 {
            if let Ok(info) = sale.pool_info(pid) {
                let sum = contributed
                    .iter()
                    .fold(U256::ZERO, |acc, row| acc + row[pid as usize]);
                assert_eq!(info.total_raised, sum);
            }
        }
        assert_eq!(tokens.supply_of(lp).ok(), lp_supply);
        assert_eq!(tokens.supply_of(oc).ok(), oc_supply);
    }
});
