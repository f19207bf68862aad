use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use solar_econ_core::tariff::billing::{self, BillingInput};
use solar_econ_core::tariff::schedule::RateCode;

use crate::input;
use crate::input::rates::load_rate_table;

/// Arguments for a single-period bill
#[derive(Args)]
pub struct BillArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Energy consumed in the month (kWh)
    #[arg(long)]
    pub consumption: Option<Decimal>,

    /// Rate code (D, G, M or L)
    #[arg(long)]
    pub rate: Option<RateCode>,

    /// Peak demand in the month (kW)
    #[arg(long)]
    pub peak: Option<Decimal>,
}

pub fn run_bill(args: BillArgs, rates: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let table = load_rate_table(rates)?;
    let billing_input: BillingInput = match input::read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => BillingInput {
            consumption_kwh: args
                .consumption
                .ok_or("--consumption is required (or provide --input)")?,
            rate_code: args.rate.ok_or("--rate is required (or provide --input)")?,
            peak_demand_kw: args.peak,
        },
    };

    let result = billing::compute_billing_cost(&table, &billing_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for rate-code detection
#[derive(Args)]
pub struct DetectRateArgs {
    /// Monthly consumption (kWh)
    #[arg(long)]
    pub consumption: Decimal,

    /// Peak demand (kW); consumption thresholds apply without it
    #[arg(long)]
    pub peak: Option<Decimal>,
}

pub fn run_detect_rate(args: DetectRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let detection = billing::detect_rate(args.consumption, args.peak);
    Ok(serde_json::to_value(detection)?)
}

/// Arguments for a future-rate projection
#[derive(Args)]
pub struct FutureRateArgs {
    /// Rate code (D, G, M or L)
    #[arg(long)]
    pub rate: RateCode,

    /// Years ahead to project
    #[arg(long, default_value_t = 1)]
    pub years: u32,
}

pub fn run_future_rate(args: FutureRateArgs, rates: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let table = load_rate_table(rates)?;
    let projection = billing::project_future_rate(&table, args.rate, args.years)?;
    Ok(serde_json::to_value(projection)?)
}

pub fn run_rates(rates: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let table = load_rate_table(rates)?;
    let schedules: Vec<_> = table.iter().collect();
    Ok(serde_json::to_value(schedules)?)
}
