// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROPERTY-BASED TESTS - ifo-core
//
// Allocation and tax invariants over arbitrary pool terms and contributions.
// Run: cargo test --release -p ifo-core --test prop_allocation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use ifo_core::allocation::{compute_allocation, pay_amount, user_allocation_fraction};
use ifo_core::tax::{TaxSchedule, BASE_TAX_RATE};
use ifo_core::{precision, Pool, U256};
use proptest::prelude::*;

const MAX_AMOUNT: u128 = 1_000_000 * 1_000_000_000_000_000_000; // 1M tokens at 18 decimals

fn pool(offering: u128, raising: u128, contributions: &[u128], has_tax: bool) -> Pool {
    let total = contributions
        .iter()
        .fold(U256::ZERO, |acc, c| acc + U256::from(*c));
    Pool {
        offering_amount: U256::from(offering),
        raising_amount: U256::from(raising),
        cap_per_user: U256::ZERO,
        has_tax,
        tax_schedule: TaxSchedule::default(),
        total_raised: total,
        sum_taxes_overflow: U256::ZERO,
    }
}

fn contributions() -> impl Strategy<Value = Vec<u128>> {
    prop::collection::vec(1u128..=MAX_AMOUNT, 1..40)
}

// ─────────────────────────────────────────────────────────────────
// ALLOCATION PROPERTIES
// ─────────────────────────────────────────────────────────────────

proptest! {
    /// PROPERTY: A contribution is fully accounted for as pay + tax + refund
    #[test]
    fn prop_contribution_conserved(
        offering in 1u128..=MAX_AMOUNT,
        raising in 1u128..=MAX_AMOUNT,
        contribs in contributions(),
        has_tax in any::<bool>(),
    ) {
        let p = pool(offering, raising, &contribs, has_tax);
        for c in &contribs {
            let c = U256::from(*c);
            let a = compute_allocation(&p, c).unwrap();
            let pay = pay_amount(&p, c).unwrap();
            prop_assert_eq!(pay + a.tax_amount + a.refunding_amount, c);
            if !has_tax {
                prop_assert_eq!(a.tax_amount, U256::ZERO);
            }
        }
    }

    /// PROPERTY: The pool never hands out more offering tokens than it holds
    #[test]
    fn prop_offering_never_exceeds_pool(
        offering in 1u128..=MAX_AMOUNT,
        raising in 1u128..=MAX_AMOUNT,
        contribs in contributions(),
        has_tax in any::<bool>(),
    ) {
        let p = pool(offering, raising, &contribs, has_tax);
        let distributed = contribs.iter().fold(U256::ZERO, |acc, c| {
            acc + compute_allocation(&p, U256::from(*c)).unwrap().offering_amount
        });
        prop_assert!(
            distributed <= p.offering_amount,
            "distributed {} > offering {}", distributed, p.offering_amount
        );
    }

    /// PROPERTY: Undersubscribed pools refund nothing and charge no tax
    #[test]
    fn prop_undersubscribed_no_refund(
        offering in 1u128..=MAX_AMOUNT,
        contribs in contributions(),
    ) {
        let total: u128 = contribs.iter().sum();
        let p = pool(offering, total, &contribs, true);
        prop_assert!(!p.is_oversubscribed());
        for c in &contribs {
            let a = compute_allocation(&p, U256::from(*c)).unwrap();
            prop_assert_eq!(a.refunding_amount, U256::ZERO);
            prop_assert_eq!(a.tax_amount, U256::ZERO);
        }
    }

    /// PROPERTY: Oversubscribed pools collect the raising target, short by
    /// at most one unit per participant; each pay is contributed × raising / total
    #[test]
    fn prop_oversubscribed_pay_near_target(
        offering in 1u128..=MAX_AMOUNT,
        contribs in contributions(),
        divisor in 2u128..=1000,
    ) {
        let total: u128 = contribs.iter().sum();
        let raising = (total / divisor).max(1);
        prop_assume!(total > raising);
        let p = pool(offering, raising, &contribs, false);

        let mut paid = U256::ZERO;
        for c in &contribs {
            let c = U256::from(*c);
            let pay = pay_amount(&p, c).unwrap();
            prop_assert_eq!(pay, c * p.raising_amount / p.total_raised);
            let a = compute_allocation(&p, c).unwrap();
            prop_assert_eq!(a.offering_amount, c * p.offering_amount / p.total_raised);
            paid += pay;
        }
        let raising = U256::from(raising);
        prop_assert!(paid <= raising, "paid {} > raising {}", paid, raising);
        let bound = U256::from(contribs.len());
        prop_assert!(raising - paid <= bound, "shortfall {} > {}", raising - paid, bound);
    }

    /// PROPERTY: Allocation fractions of all participants never exceed 100%
    #[test]
    fn prop_fractions_bounded(contribs in contributions()) {
        let total = contribs.iter().fold(U256::ZERO, |acc, c| acc + U256::from(*c));
        let sum = contribs.iter().fold(U256::ZERO, |acc, c| {
            acc + user_allocation_fraction(U256::from(*c), total).unwrap()
        });
        prop_assert!(sum <= precision());
    }

    /// PROPERTY: Computing an allocation twice yields the same result
    #[test]
    fn prop_allocation_idempotent(
        offering in 1u128..=MAX_AMOUNT,
        raising in 1u128..=MAX_AMOUNT,
        contribs in contributions(),
    ) {
        let p = pool(offering, raising, &contribs, true);
        let c = U256::from(contribs[0]);
        prop_assert_eq!(compute_allocation(&p, c).unwrap(), compute_allocation(&p, c).unwrap());
    }
}

// ─────────────────────────────────────────────────────────────────
// TAX SCHEDULE PROPERTIES
// ─────────────────────────────────────────────────────────────────

proptest! {
    /// PROPERTY: The tax rate never increases as oversubscription grows
    #[test]
    fn prop_tax_rate_non_increasing(
        raising in 1u64..=1_000_000,
        total in 0u64..=1_000_000_000,
        extra in 0u64..=1_000_000_000,
    ) {
        let schedule = TaxSchedule::default();
        let r1 = schedule.rate_for(U256::from(total), U256::from(raising));
        let r2 = schedule.rate_for(U256::from(total) + U256::from(extra), U256::from(raising));
        prop_assert!(r2 <= r1, "rate rose from {} to {}", r1, r2);
        prop_assert!(r1 <= U256::from(BASE_TAX_RATE));
    }

    /// PROPERTY: Tax never exceeds the overflow it is taken from
    #[test]
    fn prop_tax_bounded_by_overflow(
        offering in 1u128..=MAX_AMOUNT,
        contribs in contributions(),
        divisor in 2u128..=5000,
    ) {
        let total: u128 = contribs.iter().sum();
        let raising = (total / divisor).max(1);
        let p = pool(offering, raising, &contribs, true);
        for c in &contribs {
            let c = U256::from(*c);
            let a = compute_allocation(&p, c).unwrap();
            let overflow = c - pay_amount(&p, c).unwrap();
            prop_assert!(a.tax_amount <= overflow);
        }
    }
}
