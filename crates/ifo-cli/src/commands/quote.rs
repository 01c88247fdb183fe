use crate::print_info;
use colored::*;
use ifo_core::allocation::{compute_allocation, pay_amount, user_allocation_fraction};
use ifo_core::units::{display_ether, parse_amount};
use ifo_core::{Allocation, IfoError, Pool, TaxSchedule, U256, PRECISION};

pub struct Quote {
    pub fraction: U256,
    pub pay: U256,
    pub tax_rate: U256,
    pub allocation: Allocation,
}

pub fn quote(
    offering: U256,
    raising: U256,
    total: U256,
    contributed: U256,
    has_tax: bool,
) -> Result<Quote, IfoError> {
    if contributed > total {
        return Err(IfoError::Config(format!(
            "contribution {} exceeds pool total {}",
            contributed, total
        )));
    }
    let pool = Pool {
        offering_amount: offering,
        raising_amount: raising,
        cap_per_user: U256::ZERO,
        has_tax,
        tax_schedule: TaxSchedule::default(),
        total_raised: total,
        sum_taxes_overflow: U256::ZERO,
    };
    Ok(Quote {
        fraction: user_allocation_fraction(contributed, total)?,
        pay: pay_amount(&pool, contributed)?,
        tax_rate: pool.tax_rate(),
        allocation: compute_allocation(&pool, contributed)?,
    })
}

pub fn handle(
    offering: &str,
    raising: &str,
    total: &str,
    contributed: &str,
    has_tax: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let total_amount = parse_amount(total)?;
    let raising_amount = parse_amount(raising)?;
    let q = quote(
        parse_amount(offering)?,
        raising_amount,
        total_amount,
        parse_amount(contributed)?,
        has_tax,
    )?;

    print_info(if total_amount > raising_amount {
        "Pool is oversubscribed"
    } else {
        "Pool is not oversubscribed"
    });
    println!();
    println!(
        "{} {}",
        "Allocation:".bold(),
        format!("{}%", percent(q.fraction)).cyan()
    );
    println!("{} {} LP", "Spent:".bold(), display_ether(q.pay));
    println!(
        "{} {}",
        "Offering tokens:".bold(),
        display_ether(q.allocation.offering_amount).green()
    );
    println!(
        "{} {} LP",
        "Refund:".bold(),
        display_ether(q.allocation.refunding_amount).green()
    );
    println!(
        "{} {} LP (rate {}%)",
        "Overflow tax:".bold(),
        display_ether(q.allocation.tax_amount).yellow(),
        percent(q.tax_rate)
    );
    Ok(())
}

/// 1e12 fixed point rendered as a percentage.
pub(crate) fn percent(value: U256) -> String {
    // value / 1e12 * 100 = value / 1e10
    let scale = U256::from(PRECISION / 100);
    let whole = value / scale;
    let frac = value % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let digits = format!("{:0>10}", frac.to_string());
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
