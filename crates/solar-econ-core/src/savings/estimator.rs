use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::tariff::billing::bill;
use crate::tariff::schedule::{RateCode, RateTable};
use crate::time_value::safe_div;
use crate::types::{with_metadata, ComputationOutput, Kw, Kwh, Money};
use crate::SolarEconResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsInput {
    /// Expected solar production over a year (kWh)
    pub annual_production_kwh: Kwh,
    pub rate_code: RateCode,
    /// Building consumption over a year before solar (kWh)
    pub annual_consumption_kwh: Kwh,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_demand_kw: Option<Kw>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualSavingsEstimate {
    pub rate_code: RateCode,
    pub monthly_consumption_kwh: Kwh,
    pub monthly_production_kwh: Kwh,
    /// Consumption left to bill after the solar offset, never negative
    pub monthly_net_consumption_kwh: Kwh,
    pub monthly_cost_without_solar: Money,
    pub monthly_cost_with_solar: Money,
    pub annual_savings: Money,
    pub monthly_savings_avg: Money,
    /// Share of the pre-solar bill avoided, in percentage points
    pub savings_percent: Decimal,
    /// Annual savings per kWh produced
    pub effective_value_per_kwh: Decimal,
    /// Production beyond consumption; not valued by this estimate
    pub annual_surplus_kwh: Kwh,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Estimate bill savings from a solar production profile under net metering.
///
/// Works on monthly averages to match the tariff's billing period: the
/// schedule is billed once on full consumption and once on consumption net of
/// production, and the monthly difference is annualized.
pub fn estimate_annual_savings(
    rates: &RateTable,
    input: &SavingsInput,
) -> SolarEconResult<ComputationOutput<AnnualSavingsEstimate>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let schedule = rates.schedule(input.rate_code);

    let monthly_consumption = input.annual_consumption_kwh / MONTHS_PER_YEAR;
    let monthly_production = input.annual_production_kwh / MONTHS_PER_YEAR;
    let monthly_net = (monthly_consumption - monthly_production).max(Decimal::ZERO);

    let without_solar = bill(schedule, monthly_consumption, input.peak_demand_kw);
    let with_solar = bill(schedule, monthly_net, input.peak_demand_kw);

    let monthly_savings = without_solar.total_cost - with_solar.total_cost;
    let annual_savings = monthly_savings * MONTHS_PER_YEAR;

    let savings_percent = safe_div(monthly_savings, without_solar.total_cost) * dec!(100);
    let effective_value_per_kwh = safe_div(annual_savings, input.annual_production_kwh);

    let annual_surplus_kwh =
        (input.annual_production_kwh - input.annual_consumption_kwh.max(Decimal::ZERO)).max(Decimal::ZERO);
    if annual_surplus_kwh > Decimal::ZERO {
        warnings.push(format!(
            "Production exceeds consumption by {annual_surplus_kwh} kWh/yr; surplus export is not valued in this estimate"
        ));
    }
    if input.annual_production_kwh < Decimal::ZERO || input.annual_consumption_kwh < Decimal::ZERO {
        warnings.push("Negative production or consumption input; results are degenerate".into());
    }

    tracing::debug!(
        rate = %input.rate_code,
        annual_savings = %annual_savings,
        "annual savings estimated"
    );

    let output = AnnualSavingsEstimate {
        rate_code: input.rate_code,
        monthly_consumption_kwh: monthly_consumption,
        monthly_production_kwh: monthly_production,
        monthly_net_consumption_kwh: monthly_net,
        monthly_cost_without_solar: without_solar.total_cost,
        monthly_cost_with_solar: with_solar.total_cost,
        annual_savings,
        monthly_savings_avg: monthly_savings,
        savings_percent,
        effective_value_per_kwh,
        annual_surplus_kwh,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Net-metering savings estimate (monthly average billing, with vs without solar)",
        &serde_json::json!({
            "rate_code": input.rate_code,
            "annual_consumption_kwh": input.annual_consumption_kwh.to_string(),
            "annual_production_kwh": input.annual_production_kwh.to_string(),
            "billing_periods_per_year": 12,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(production: Decimal, consumption: Decimal) -> SavingsInput {
        SavingsInput {
            annual_production_kwh: production,
            rate_code: RateCode::G,
            annual_consumption_kwh: consumption,
            peak_demand_kw: Some(dec!(80)),
        }
    }

    #[test]
    fn test_zero_production_yields_zero_savings() {
        let out = estimate_annual_savings(RateTable::standard(), &input(Decimal::ZERO, dec!(120000))).unwrap();
        assert_eq!(out.result.annual_savings, Decimal::ZERO);
        assert_eq!(out.result.effective_value_per_kwh, Decimal::ZERO);
        assert_eq!(out.result.savings_percent, Decimal::ZERO);
    }

    #[test]
    fn test_savings_match_manual_block_math() {
        // G: 15,090 kWh @ 11.933¢ then 9.184¢. Monthly consumption 20,000,
        // production 6,000 => net 14,000 stays inside block 1.
        let out = estimate_annual_savings(RateTable::standard(), &input(dec!(72000), dec!(240000))).unwrap();
        let r = &out.result;
        let without = dec!(15090) * dec!(0.11933) + dec!(4910) * dec!(0.09184);
        let with = dec!(14000) * dec!(0.11933);
        assert_eq!(r.monthly_savings_avg, without - with);
        assert_eq!(r.annual_savings, (without - with) * dec!(12));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_demand_charge_cancels_between_scenarios() {
        let with_peak = estimate_annual_savings(RateTable::standard(), &input(dec!(60000), dec!(240000))).unwrap();
        let mut no_peak_input = input(dec!(60000), dec!(240000));
        no_peak_input.peak_demand_kw = None;
        let no_peak = estimate_annual_savings(RateTable::standard(), &no_peak_input).unwrap();
        assert_eq!(with_peak.result.annual_savings, no_peak.result.annual_savings);
    }

    #[test]
    fn test_oversized_array_never_bills_negative_consumption() {
        let out = estimate_annual_savings(RateTable::standard(), &input(dec!(300000), dec!(120000))).unwrap();
        let r = &out.result;
        assert_eq!(r.monthly_net_consumption_kwh, Decimal::ZERO);
        assert_eq!(r.annual_surplus_kwh, dec!(180000));
        // Only the fixed charge and demand remain on the bill
        assert_eq!(r.monthly_cost_with_solar, dec!(14.57) + dec!(30) * dec!(21.261));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_effective_value_per_kwh() {
        let out = estimate_annual_savings(RateTable::standard(), &input(dec!(12000), dec!(120000))).unwrap();
        let r = &out.result;
        assert_eq!(r.effective_value_per_kwh, r.annual_savings / dec!(12000));
        assert!(r.savings_percent > Decimal::ZERO && r.savings_percent < dec!(100));
    }
}
