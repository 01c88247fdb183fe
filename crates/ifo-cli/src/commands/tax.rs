use super::quote::percent;
use colored::*;
use ifo_core::units::{display_ether, parse_amount};
use ifo_core::{TaxSchedule, U256};

pub fn handle(total: &str, raising: &str) -> Result<(), Box<dyn std::error::Error>> {
    let total = parse_amount(total)?;
    let raising = parse_amount(raising)?;
    if raising.is_zero() {
        return Err("raising amount must be > 0".into());
    }

    let schedule = TaxSchedule::default();
    let rate = schedule.rate_for(total, raising);
    let ratio = total / raising;

    println!(
        "{} {} / {} = {}x",
        "Oversubscription:".bold(),
        display_ether(total),
        display_ether(raising),
        ratio
    );
    println!(
        "{} {}% ({} / 1e12)",
        "Overflow tax rate:".bold(),
        percent(rate).green(),
        rate
    );
    println!();
    println!("{}", "Schedule".bold().underline());
    for tier in &schedule.tiers {
        let active = ratio >= U256::from(tier.min_ratio) && rate == U256::from(tier.rate);
        let line = format!(
            "  ratio >= {:<6} {}%",
            tier.min_ratio,
            percent(U256::from(tier.rate))
        );
        if active {
            println!("{}", line.cyan().bold());
        } else {
            println!("{}", line);
        }
    }
    let base = format!("  otherwise       {}%", percent(U256::from(schedule.base_rate)));
    if rate == U256::from(schedule.base_rate) {
        println!("{}", base.cyan().bold());
    } else {
        println!("{}", base);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_raising_rejected() {
        assert!(handle("100", "0").is_err());
    }

    #[test]
    fn test_handle_accepts_ether_amounts() {
        assert!(handle("1500 ether", "1 ether").is_ok());
    }
}
