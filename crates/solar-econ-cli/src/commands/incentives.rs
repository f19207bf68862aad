use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use solar_econ_core::incentives::waterfall::{self, IncentiveInput};

use crate::input;

/// Arguments for the incentive waterfall
#[derive(Args)]
pub struct IncentivesArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Fully-installed gross cost
    #[arg(long)]
    pub gross: Option<Decimal>,

    /// Utility incentive on the solar array (already capped)
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub solar_incentive: Decimal,

    /// Utility incentive on the battery (already capped)
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub battery_incentive: Decimal,

    /// Federal investment tax credit
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub federal: Decimal,

    /// Present value of the depreciation tax shield
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub tax_shield: Decimal,
}

pub fn run_incentives(args: IncentivesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let incentive_input: IncentiveInput = match input::read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => IncentiveInput {
            gross_cost: args.gross.ok_or("--gross is required (or provide --input)")?,
            utility_solar_incentive: args.solar_incentive,
            utility_battery_incentive: args.battery_incentive,
            federal_incentive: args.federal,
            tax_shield: args.tax_shield,
        },
    };

    let result = waterfall::net_investment(&incentive_input)?;
    Ok(serde_json::to_value(result)?)
}
