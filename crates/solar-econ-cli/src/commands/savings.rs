use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use solar_econ_core::savings::estimator::{self, SavingsInput};
use solar_econ_core::tariff::schedule::RateCode;

use crate::input;
use crate::input::rates::load_rate_table;

/// Arguments for the net-metering savings estimate
#[derive(Args)]
pub struct SavingsArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Annual solar production (kWh)
    #[arg(long)]
    pub production: Option<Decimal>,

    /// Annual building consumption before solar (kWh)
    #[arg(long)]
    pub consumption: Option<Decimal>,

    /// Rate code (D, G, M or L)
    #[arg(long)]
    pub rate: Option<RateCode>,

    /// Monthly peak demand (kW)
    #[arg(long)]
    pub peak: Option<Decimal>,
}

pub fn run_savings(args: SavingsArgs, rates: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let table = load_rate_table(rates)?;
    let savings_input: SavingsInput = match input::read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => SavingsInput {
            annual_production_kwh: args
                .production
                .ok_or("--production is required (or provide --input)")?,
            rate_code: args.rate.ok_or("--rate is required (or provide --input)")?,
            annual_consumption_kwh: args
                .consumption
                .ok_or("--consumption is required (or provide --input)")?,
            peak_demand_kw: args.peak,
        },
    };

    let result = estimator::estimate_annual_savings(&table, &savings_input)?;
    Ok(serde_json::to_value(result)?)
}
