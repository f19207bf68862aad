mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::acquisition::CashflowArgs;
use commands::incentives::IncentivesArgs;
use commands::portfolio::{PortfolioArgs, QuoteArgs};
use commands::savings::SavingsArgs;
use commands::tariff::{BillArgs, DetectRateArgs, FutureRateArgs};

/// Solar + storage project economics
#[derive(Parser)]
#[command(
    name = "solar-econ",
    version,
    about = "Solar + storage project economics calculations",
    long_about = "A CLI for tariff billing, net-metering savings, incentive waterfalls, \
                  25-year acquisition cashflows and portfolio roll-ups, computed with \
                  decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// JSON rate table replacing the built-in schedules
    #[arg(long, global = true)]
    rates: Option<String>,

    /// Emit debug diagnostics on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bill one month of consumption on a rate schedule
    Bill(BillArgs),
    /// Suggest a rate code for a load profile
    DetectRate(DetectRateArgs),
    /// Project a schedule's energy rate and reference bill forward
    FutureRate(FutureRateArgs),
    /// Print the active rate table
    Rates,
    /// Estimate annual net-metering savings
    Savings(SavingsArgs),
    /// Reduce gross cost to net investment
    Incentives(IncentivesArgs),
    /// Simulate cumulative cashflow for cash, loan and lease
    Cashflow(CashflowArgs),
    /// Roll up a portfolio of sites
    Portfolio(PortfolioArgs),
    /// Price the evaluation and engineering services
    Quote(QuoteArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("solar_econ_core={default},solar_econ={default}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rates = cli.rates.as_deref();
    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Bill(args) => commands::tariff::run_bill(args, rates),
        Commands::DetectRate(args) => commands::tariff::run_detect_rate(args),
        Commands::FutureRate(args) => commands::tariff::run_future_rate(args, rates),
        Commands::Rates => commands::tariff::run_rates(rates),
        Commands::Savings(args) => commands::savings::run_savings(args, rates),
        Commands::Incentives(args) => commands::incentives::run_incentives(args),
        Commands::Cashflow(args) => commands::acquisition::run_cashflow(args),
        Commands::Portfolio(args) => commands::portfolio::run_portfolio(args),
        Commands::Quote(args) => commands::portfolio::run_quote(args),
        Commands::Version => {
            println!("solar-econ {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
