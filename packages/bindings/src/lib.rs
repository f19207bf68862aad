use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde_json::Value;

use solar_econ_core::tariff::schedule::{RateCode, RateTable};
use solar_econ_core::SolarEconError;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse a JSON argument, reporting an unknown rate code as such.
fn parse<T: DeserializeOwned>(json: &str) -> NapiResult<T> {
    serde_json::from_str(json)
        .map_err(SolarEconError::from)
        .map_err(to_napi_error)
}

/// Built-in rate table unless the caller passes one as JSON.
fn rate_table(rates_json: Option<String>) -> NapiResult<RateTable> {
    match rates_json {
        Some(json) => RateTable::from_json(&json).map_err(to_napi_error),
        None => Ok(RateTable::standard().clone()),
    }
}

// ---------------------------------------------------------------------------
// Tariff
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_billing_cost(input_json: String, rates_json: Option<String>) -> NapiResult<String> {
    let rates = rate_table(rates_json)?;
    let input: solar_econ_core::tariff::billing::BillingInput =
        parse(&input_json)?;
    let output = solar_econ_core::tariff::billing::compute_billing_cost(&rates, &input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Takes `{ "monthly_consumption_kwh": .., "peak_demand_kw": .. }`.
#[napi]
pub fn detect_rate_code(input_json: String) -> NapiResult<String> {
    let input: Value = parse(&input_json)?;
    let consumption = serde_json::from_value(input["monthly_consumption_kwh"].clone())
        .map_err(to_napi_error)?;
    let peak = match input.get("peak_demand_kw") {
        Some(v) if !v.is_null() => Some(serde_json::from_value(v.clone()).map_err(to_napi_error)?),
        _ => None,
    };
    let detection = solar_econ_core::tariff::billing::detect_rate(consumption, peak);
    serde_json::to_string(&detection).map_err(to_napi_error)
}

#[napi]
pub fn project_future_rate(rate_code: String, years_ahead: u32, rates_json: Option<String>) -> NapiResult<String> {
    let rates = rate_table(rates_json)?;
    let code: RateCode = rate_code.parse().map_err(to_napi_error)?;
    let projection = solar_econ_core::tariff::billing::project_future_rate(&rates, code, years_ahead)
        .map_err(to_napi_error)?;
    serde_json::to_string(&projection).map_err(to_napi_error)
}

#[napi]
pub fn standard_rate_table() -> NapiResult<String> {
    serde_json::to_string(RateTable::standard()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Savings
// ---------------------------------------------------------------------------

#[napi]
pub fn estimate_annual_savings(input_json: String, rates_json: Option<String>) -> NapiResult<String> {
    let rates = rate_table(rates_json)?;
    let input: solar_econ_core::savings::estimator::SavingsInput =
        parse(&input_json)?;
    let output = solar_econ_core::savings::estimator::estimate_annual_savings(&rates, &input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Incentives & acquisition
// ---------------------------------------------------------------------------

#[napi]
pub fn net_investment(input_json: String) -> NapiResult<String> {
    let input: solar_econ_core::incentives::waterfall::IncentiveInput =
        parse(&input_json)?;
    let output =
        solar_econ_core::incentives::waterfall::net_investment(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn simulate_acquisition(input_json: String) -> NapiResult<String> {
    let input: solar_econ_core::acquisition::cashflow::AcquisitionInput =
        parse(&input_json)?;
    let output =
        solar_econ_core::acquisition::cashflow::simulate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[napi]
pub fn roll_up_portfolio(input_json: String) -> NapiResult<String> {
    let input: solar_econ_core::portfolio::rollup::PortfolioInput =
        parse(&input_json)?;
    let output = solar_econ_core::portfolio::rollup::roll_up(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn quote_services(input_json: String) -> NapiResult<String> {
    let input: solar_econ_core::portfolio::pricing::QuoteInput =
        parse(&input_json)?;
    let output = solar_econ_core::portfolio::pricing::price_quote(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
