use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SolarEconError;
use crate::tariff::schedule::{RateCode, RateSchedule, RateTable};
use crate::time_value::{compound_factor, safe_div};
use crate::types::{with_metadata, ComputationOutput, Kw, Kwh, Money, Rate};
use crate::SolarEconResult;

/// Reference month used when quoting a projected monthly bill.
pub const REFERENCE_MONTHLY_KWH: Decimal = dec!(10000);

// Peak-demand classification thresholds (kW)
const LARGE_POWER_MIN_KW: Decimal = dec!(5000);
const MEDIUM_POWER_MIN_KW: Decimal = dec!(100);
const SMALL_COMMERCIAL_ABOVE_KW: Decimal = dec!(50);

// Monthly-consumption fallback thresholds (kWh)
const LARGE_POWER_MIN_KWH: Decimal = dec!(3000000);
const MEDIUM_POWER_MIN_KWH: Decimal = dec!(30000);
const SMALL_COMMERCIAL_ABOVE_KWH: Decimal = dec!(6000);

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingInput {
    /// Energy consumed in the billing period (kWh)
    pub consumption_kwh: Kwh,
    pub rate_code: RateCode,
    /// Peak power draw in the period, if metered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_demand_kw: Option<Kw>,
}

/// Energy charged within one block of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockCharge {
    /// 1-based position of the block in the schedule
    pub block: usize,
    pub kwh: Kwh,
    pub rate_cents_per_kwh: Decimal,
    pub cost: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingResult {
    pub rate_code: RateCode,
    pub consumption_kwh: Kwh,
    pub billable_demand_kw: Kw,
    pub fixed_cost: Money,
    pub energy_cost: Money,
    pub demand_cost: Money,
    pub total_cost: Money,
    /// total_cost / consumption_kwh, zero when nothing was consumed
    pub effective_rate_per_kwh: Decimal,
    pub blocks: Vec<BlockCharge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionBasis {
    PeakDemand,
    MonthlyConsumption,
}

/// Advisory tariff classification for a load profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateDetection {
    pub rate_code: RateCode,
    pub basis: DetectionBasis,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureRate {
    pub rate_code: RateCode,
    pub years_ahead: u32,
    pub escalation: Rate,
    /// First-block energy rate after escalation (¢/kWh)
    pub rate_cents_per_kwh: Decimal,
    /// Escalated bill for a REFERENCE_MONTHLY_KWH month
    pub reference_monthly_cost: Money,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Price one billing period against a rate table.
pub fn compute_billing_cost(
    rates: &RateTable,
    input: &BillingInput,
) -> SolarEconResult<ComputationOutput<BillingResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.consumption_kwh < Decimal::ZERO {
        warnings.push(format!(
            "Negative consumption ({} kWh) billed as zero",
            input.consumption_kwh
        ));
    }

    let schedule = rates.schedule(input.rate_code);
    let result = bill(schedule, input.consumption_kwh, input.peak_demand_kw);

    if let (Some(peak), Some(max_kw)) = (input.peak_demand_kw, schedule.typical_load_kw.max_kw) {
        if peak > max_kw {
            warnings.push(format!(
                "Peak demand of {peak} kW exceeds the typical range for rate {} (max {max_kw} kW)",
                schedule.code
            ));
        }
    }

    tracing::debug!(
        rate = %input.rate_code,
        consumption_kwh = %input.consumption_kwh,
        total = %result.total_cost,
        "billing cost computed"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Block tariff billing (fixed + tiered energy + demand)",
        &serde_json::json!({
            "rate_code": schedule.code,
            "fixed_monthly_charge": schedule.fixed_monthly_charge.to_string(),
            "block_count": schedule.energy_blocks.len(),
            "has_demand_charge": schedule.demand_charge.is_some(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// Bill a single period on a schedule. Negative consumption is billed as
/// zero kWh; the fixed charge always applies.
pub fn bill(schedule: &RateSchedule, consumption_kwh: Kwh, peak_demand_kw: Option<Kw>) -> BillingResult {
    let consumption = consumption_kwh.max(Decimal::ZERO);

    let mut remaining = consumption;
    let mut energy_cost = Decimal::ZERO;
    let mut blocks = Vec::with_capacity(schedule.energy_blocks.len());
    let last = schedule.energy_blocks.len().saturating_sub(1);

    for (i, block) in schedule.energy_blocks.iter().enumerate() {
        if remaining <= Decimal::ZERO {
            break;
        }
        // The final block absorbs everything left, whatever its ceiling says.
        let kwh = match block.ceiling_kwh {
            Some(ceiling) if i < last => remaining.min(ceiling),
            _ => remaining,
        };
        let cost = kwh * block.rate_cents_per_kwh / dec!(100);
        energy_cost += cost;
        remaining -= kwh;
        blocks.push(BlockCharge {
            block: i + 1,
            kwh,
            rate_cents_per_kwh: block.rate_cents_per_kwh,
            cost,
        });
    }

    let (billable_demand_kw, demand_cost) = match (&schedule.demand_charge, peak_demand_kw) {
        (Some(charge), Some(peak)) => {
            let billable = (peak - charge.minimum_kw).max(Decimal::ZERO);
            (billable, billable * charge.rate_per_kw)
        }
        _ => (Decimal::ZERO, Decimal::ZERO),
    };

    let fixed_cost = schedule.fixed_monthly_charge;
    let total_cost = fixed_cost + energy_cost + demand_cost;

    BillingResult {
        rate_code: schedule.code,
        consumption_kwh: consumption,
        billable_demand_kw,
        fixed_cost,
        energy_cost,
        demand_cost,
        total_cost,
        effective_rate_per_kwh: safe_div(total_cost, consumption),
        blocks,
    }
}

/// Suggest a tariff class for a load. Advisory only; a user-chosen code
/// always wins.
pub fn detect_rate_code(monthly_consumption_kwh: Kwh, peak_demand_kw: Option<Kw>) -> RateCode {
    detect_rate(monthly_consumption_kwh, peak_demand_kw).rate_code
}

/// Same as [`detect_rate_code`], with the threshold that decided it.
///
/// A missing or non-positive peak counts as unknown and falls back to the
/// consumption thresholds.
pub fn detect_rate(monthly_consumption_kwh: Kwh, peak_demand_kw: Option<Kw>) -> RateDetection {
    match peak_demand_kw.filter(|p| *p > Decimal::ZERO) {
        Some(peak) => {
            let (rate_code, threshold) = if peak >= LARGE_POWER_MIN_KW {
                (RateCode::L, format!(">= {LARGE_POWER_MIN_KW} kW"))
            } else if peak >= MEDIUM_POWER_MIN_KW {
                (RateCode::M, format!(">= {MEDIUM_POWER_MIN_KW} kW"))
            } else if peak > SMALL_COMMERCIAL_ABOVE_KW {
                (RateCode::G, format!("> {SMALL_COMMERCIAL_ABOVE_KW} kW"))
            } else {
                (RateCode::D, format!("<= {SMALL_COMMERCIAL_ABOVE_KW} kW"))
            };
            RateDetection {
                rate_code,
                basis: DetectionBasis::PeakDemand,
                reason: format!("peak demand {peak} kW {threshold}"),
            }
        }
        None => {
            let kwh = monthly_consumption_kwh;
            let (rate_code, threshold) = if kwh >= LARGE_POWER_MIN_KWH {
                (RateCode::L, format!(">= {LARGE_POWER_MIN_KWH} kWh"))
            } else if kwh >= MEDIUM_POWER_MIN_KWH {
                (RateCode::M, format!(">= {MEDIUM_POWER_MIN_KWH} kWh"))
            } else if kwh > SMALL_COMMERCIAL_ABOVE_KWH {
                (RateCode::G, format!("> {SMALL_COMMERCIAL_ABOVE_KWH} kWh"))
            } else {
                (RateCode::D, format!("<= {SMALL_COMMERCIAL_ABOVE_KWH} kWh"))
            };
            RateDetection {
                rate_code,
                basis: DetectionBasis::MonthlyConsumption,
                reason: format!("monthly consumption {kwh} kWh {threshold} (peak demand unknown)"),
            }
        }
    }
}

/// Escalate a schedule's first-block rate and reference monthly bill by its
/// own escalation assumption. For display and sensitivity only.
///
/// A horizon long enough to overflow the escalation factor is `InvalidInput`.
pub fn project_future_rate(
    rates: &RateTable,
    rate_code: RateCode,
    years_ahead: u32,
) -> SolarEconResult<FutureRate> {
    let schedule = rates.schedule(rate_code);
    let factor = compound_factor(schedule.annual_escalation, years_ahead).map_err(|_| {
        SolarEconError::InvalidInput {
            field: "years_ahead".into(),
            reason: format!(
                "{years_ahead} years of {} escalation overflows",
                schedule.annual_escalation
            ),
        }
    })?;
    let reference = bill(schedule, REFERENCE_MONTHLY_KWH, None);

    let escalate = |amount: Decimal| {
        amount.checked_mul(factor).ok_or_else(|| SolarEconError::InvalidInput {
            field: "years_ahead".into(),
            reason: format!("escalating {amount} over {years_ahead} years overflows"),
        })
    };

    Ok(FutureRate {
        rate_code,
        years_ahead,
        escalation: schedule.annual_escalation,
        rate_cents_per_kwh: escalate(schedule.first_block_rate())?,
        reference_monthly_cost: escalate(reference.total_cost)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
