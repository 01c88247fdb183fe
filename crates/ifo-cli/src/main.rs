// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO CLI - Sale Simulator & Allocation Calculator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "ifo-cli")]
#[command(about = "IFO CLI - Proportional Allocation Sale Simulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter (reads RUST_LOG env var, defaults to info)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file against an in-memory sale
    Simulate {
        /// Scenario TOML file
        scenario: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute offering, refund and tax for one contribution
    Quote {
        /// Offering tokens in the pool (atomic units or "<n> ether")
        #[arg(long)]
        offering: String,

        /// Raising target of the pool
        #[arg(long)]
        raising: String,

        /// Total raised in the pool
        #[arg(long)]
        total: String,

        /// The user's contribution
        #[arg(long)]
        contributed: String,

        /// Apply the overflow tax schedule
        #[arg(long)]
        tax: bool,
    },

    /// Show the overflow tax rate for a pool's totals
    TaxRate {
        /// Total raised in the pool
        #[arg(long)]
        total: String,

        /// Raising target of the pool
        #[arg(long)]
        raising: String,
    },

    /// Write the bundled two-pool demo scenario
    InitScenario {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(&cli.log);

    let machine_output = matches!(cli.command, Commands::Simulate { json: true, .. });
    if !machine_output {
        print_banner();
    }

    match cli.command {
        Commands::Simulate { scenario, json } => commands::simulate::handle(&scenario, json)?,
        Commands::Quote {
            offering,
            raising,
            total,
            contributed,
            tax,
        } => commands::quote::handle(&offering, &raising, &total, &contributed, tax)?,
        Commands::TaxRate { total, raising } => commands::tax::handle(&total, &raising)?,
        Commands::InitScenario { output } => commands::simulate::write_demo(&output)?,
    }

    Ok(())
}

/// Route `log` records from the engine through a stderr fmt subscriber.
fn init_logging(filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // A second init (tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_banner() {
    println!(
        "{}",
        "╔═══════════════════════════════════════════════╗".cyan()
    );
    println!(
        "{}",
        "║        IFO ENGINE - SIMULATOR CLI v0.1.0      ║"
            .cyan()
            .bold()
    );
    println!(
        "{}",
        "║   Overflow Raise | Pro-Rata | Overflow Tax    ║".cyan()
    );
    println!(
        "{}",
        "╚═══════════════════════════════════════════════╝".cyan()
    );
    println!();
}

fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

// ─────────────────────────────────────────────────────────────────
// UNIT TESTS
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    // ── CLI Argument Parsing ────────────────────────────────────

    #[test]
    fn test_cli_simulate() {
        let cli = Cli::try_parse_from(["ifo-cli", "simulate", "demo.toml", "--json"]);
        assert!(cli.is_ok(), "Failed to parse: {:?}", cli.err());
        match cli.unwrap().command {
            Commands::Simulate { scenario, json } => {
                assert_eq!(scenario, PathBuf::from("demo.toml"));
                assert!(json);
            }
            _ => panic!("Expected Simulate"),
        }
    }

    #[test]
    fn test_cli_quote() {
        let cli = Cli::try_parse_from([
            "ifo-cli",
            "quote",
            "--offering",
            "1000 ether",
            "--raising",
            "100 ether",
            "--total",
            "1000 ether",
            "--contributed",
            "5 ether",
            "--tax",
        ]);
        assert!(cli.is_ok(), "Failed to parse: {:?}", cli.err());
        match cli.unwrap().command {
            Commands::Quote {
                offering,
                contributed,
                tax,
                ..
            } => {
                assert_eq!(offering, "1000 ether");
                assert_eq!(contributed, "5 ether");
                assert!(tax);
            }
            _ => panic!("Expected Quote"),
        }
    }

    #[test]
    fn test_cli_tax_rate() {
        let cli = Cli::try_parse_from(["ifo-cli", "tax-rate", "--total", "500", "--raising", "1"]);
        assert!(cli.is_ok());
        match cli.unwrap().command {
            Commands::TaxRate { total, raising } => {
                assert_eq!(total, "500");
                assert_eq!(raising, "1");
            }
            _ => panic!("Expected TaxRate"),
        }
    }

    #[test]
    fn test_cli_init_scenario() {
        let cli = Cli::try_parse_from(["ifo-cli", "init-scenario", "-o", "/tmp/s.toml"]);
        assert!(cli.is_ok());
        match cli.unwrap().command {
            Commands::InitScenario { output } => {
                assert_eq!(output, PathBuf::from("/tmp/s.toml"))
            }
            _ => panic!("Expected InitScenario"),
        }
    }

    #[test]
    fn test_cli_quote_requires_amounts() {
        assert!(Cli::try_parse_from(["ifo-cli", "quote", "--offering", "1"]).is_err());
    }
}
