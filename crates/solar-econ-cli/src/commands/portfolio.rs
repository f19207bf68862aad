use clap::Args;
use serde_json::Value;

use solar_econ_core::portfolio::pricing::{self, QuoteInput, ServicePricing};
use solar_econ_core::portfolio::rollup::{self, PortfolioInput};

use crate::input;

/// Arguments for the portfolio roll-up
#[derive(Args)]
pub struct PortfolioArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let portfolio_input: PortfolioInput = input::read_input(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for portfolio roll-up")?;

    let result = rollup::roll_up(&portfolio_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the services quote
#[derive(Args)]
pub struct QuoteArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Number of buildings to evaluate
    #[arg(long)]
    pub buildings: Option<u32>,
}

pub fn run_quote(args: QuoteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let quote_input: QuoteInput = match input::read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => QuoteInput {
            building_count: args
                .buildings
                .ok_or("--buildings is required (or provide --input)")?,
            pricing: ServicePricing::default(),
        },
    };

    let result = pricing::price_quote(&quote_input)?;
    Ok(serde_json::to_value(result)?)
}
