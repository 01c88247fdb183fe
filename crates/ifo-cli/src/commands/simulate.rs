use crate::{print_error, print_info, print_success};
use colored::*;
use ifo_core::scenario::{Scenario, ScenarioReport, EXPECT_OK};
use ifo_core::units::display_ether;
use log::debug;
use std::path::Path;

/// Two-pool demo sale shipped with the CLI.
pub const DEMO_SCENARIO: &str = include_str!("../../../../demos/two_pool_ifo.toml");

pub fn handle(path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = Scenario::load_from_file(path)?;
    debug!(
        "Loaded scenario '{}' from {} ({} accounts)",
        scenario.sale.name,
        path.display(),
        scenario.accounts.len()
    );
    if !json {
        print_info(&format!(
            "Replaying {} ({} steps)...",
            path.display(),
            scenario.steps.len()
        ));
    }

    let report = scenario.run()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.passed() {
        return Err(format!(
            "{} step(s) did not match their expected outcome",
            report.mismatches.len()
        )
        .into());
    }
    Ok(())
}

pub fn write_demo(output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if output.exists() {
        return Err(format!("{} already exists", output.display()).into());
    }
    std::fs::write(output, DEMO_SCENARIO)?;
    print_success(&format!("Demo scenario written to {}", output.display()));
    Ok(())
}

fn print_report(report: &ScenarioReport) {
    println!();
    println!("{} {}", "Scenario:".bold(), report.name.cyan());
    println!("{} {}", "Sale:".bold(), report.sale.to_string().green());
    println!("{} {}", "Final block:".bold(), report.final_block);

    println!();
    println!("{}", "Steps".bold().underline());
    for outcome in &report.outcomes {
        let mismatch = report.mismatches.iter().find(|m| m.index == outcome.index);
        let marker = match mismatch {
            Some(_) => "✗".red().bold(),
            None if outcome.result == EXPECT_OK => "✓".green().bold(),
            None => "•".yellow().bold(),
        };
        let mut line = format!(
            "{} #{:<3} @{:<6} {:<15} {}",
            marker, outcome.index, outcome.block, outcome.action, outcome.result
        );
        if let Some(a) = &outcome.allocation {
            line.push_str(&format!(
                "  offering={} refund={} tax={}",
                display_ether(a.offering_amount),
                display_ether(a.refunding_amount),
                display_ether(a.tax_amount)
            ));
        }
        if let Some(m) = mismatch {
            line.push_str(&format!("  (expected {})", m.expected));
        }
        println!("{}", line);
    }

    println!();
    println!("{}", "Pools".bold().underline());
    for pool in &report.pools {
        println!(
            "  pool {}: raised {} / {} LP, offering {}, taxes {}{}",
            pool.pool_id,
            display_ether(pool.total_raised).cyan(),
            display_ether(pool.raising_amount),
            display_ether(pool.offering_amount),
            display_ether(pool.sum_taxes_overflow).yellow(),
            if pool.has_tax { "" } else { " (no tax)" }
        );
    }

    println!();
    println!("{}", "Balances".bold().underline());
    for balance in &report.balances {
        println!(
            "  {:<10} LP {:>20}  offering {:>20}",
            balance.name,
            display_ether(balance.lp),
            display_ether(balance.offering)
        );
    }

    println!();
    println!("{} {}", "Events:".bold(), report.events.len());
    println!("{} {}", "State digest:".bold(), report.state_digest);
    if report.passed() {
        print_success("All expectations met");
    } else {
        for m in &report.mismatches {
            print_error(&format!(
                "step #{} [{}]: expected {}, got {}",
                m.index, m.action, m.expected, m.actual
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_demo_scenario_parses() {
        let scenario = Scenario::from_toml_str(DEMO_SCENARIO).unwrap();
        assert!(!scenario.steps.is_empty());
    }

    #[test]
    fn test_write_demo_then_simulate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.toml");
        write_demo(&path).unwrap();
        assert!(write_demo(&path).is_err(), "must not overwrite");
        handle(&path, true).unwrap();
    }
}
