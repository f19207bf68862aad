use clap::Args;
use serde_json::Value;

use solar_econ_core::acquisition::cashflow::{self, AcquisitionInput};

use crate::input;

/// Arguments for the acquisition cashflow simulation
#[derive(Args)]
pub struct CashflowArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Print only the yearly cumulative series
    #[arg(long)]
    pub series_only: bool,
}

pub fn run_cashflow(args: CashflowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let acquisition_input: AcquisitionInput = input::read_input(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for cashflow simulation")?;

    let result = cashflow::simulate(&acquisition_input)?;
    if args.series_only {
        return Ok(serde_json::to_value(result.result.series)?);
    }
    Ok(serde_json::to_value(result)?)
}
