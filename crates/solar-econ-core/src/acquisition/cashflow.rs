use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::acquisition::financing::{lease_schedule, loan_schedule, FinancingTerms, LeaseSchedule, LoanSchedule};
use crate::error::SolarEconError;
use crate::incentives::waterfall::IncentiveInput;
use crate::time_value::round_currency;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::SolarEconResult;

/// Projection horizon in years (year 0 is the acquisition date).
pub const HORIZON_YEARS: u32 = 25;

/// Share of a utility incentive treated as available at signing where the
/// track only receives part of it up front.
const UPFRONT_SHARE: Decimal = dec!(0.5);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// A cumulative cashflow figure already produced by a detailed simulation
/// (degradation and inflation baked in).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecomputedCashflow {
    pub year: u32,
    pub cumulative: Money,
}

/// Per-site simulation output consumed read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFinancials {
    /// Turnkey price; zero means unknown and falls back to `net_cost`
    #[serde(default)]
    pub gross_cost: Money,
    #[serde(default)]
    pub utility_solar_incentive: Money,
    #[serde(default)]
    pub utility_battery_incentive: Money,
    #[serde(default)]
    pub federal_incentive: Money,
    #[serde(default)]
    pub tax_shield: Money,
    #[serde(default)]
    pub net_cost: Money,
    /// First-year savings, when they differ from steady state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year1_savings: Option<Money>,
    /// Steady-state annual savings
    #[serde(default)]
    pub annual_savings: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precomputed_cashflows: Option<Vec<PrecomputedCashflow>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcquisitionInput {
    pub financials: ProjectFinancials,
    #[serde(default)]
    pub financing: FinancingTerms,
    /// Yearly value of exported surplus energy, added to every track
    #[serde(default)]
    pub annual_surplus_revenue: Money,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeCashflowPoint {
    pub year: u32,
    pub cash: Money,
    pub loan: Money,
    pub lease: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    /// Year-0 position before any savings
    pub initial_position: Money,
    /// Cumulative position at the end of the horizon
    pub final_position: Money,
    /// Financing payments made within the horizon
    pub payments_in_horizon: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionCashflowResult {
    /// Years 0..=HORIZON_YEARS, rounded to whole currency units
    pub series: Vec<CumulativeCashflowPoint>,
    pub cash_payback_year: Option<u32>,
    pub loan_payback_year: Option<u32>,
    pub lease_payback_year: Option<u32>,
    pub cash: TrackSummary,
    pub loan: TrackSummary,
    pub lease: TrackSummary,
    pub loan_terms: LoanSchedule,
    pub lease_terms: LeaseSchedule,
    /// The cash track followed caller-supplied cumulative rows
    pub used_precomputed_cashflows: bool,
    /// Capital cost the tracks were built on
    pub capital_basis: Money,
}

// ---------------------------------------------------------------------------
// Year-advance strategies for the cash track
// ---------------------------------------------------------------------------

/// Moves the cash track from one year-end to the next.
trait YearAdvance {
    fn advance(&self, year: u32, previous: Money, year_flow: Money) -> Money;
}

/// Previous position plus this year's savings and receipts.
struct SimplifiedAdvance;

impl YearAdvance for SimplifiedAdvance {
    fn advance(&self, _year: u32, previous: Money, year_flow: Money) -> Money {
        previous + year_flow
    }
}

/// Caller rows taken verbatim; uncovered years continue the simplified rule.
struct PrecomputedAdvance {
    rows: Vec<Option<Money>>,
}

impl PrecomputedAdvance {
    fn from_rows(rows: &[PrecomputedCashflow]) -> SolarEconResult<Self> {
        let mut by_year = vec![None; HORIZON_YEARS as usize + 1];
        // Year 0 is always computed from the capital basis, so a full
        // 0..=HORIZON_YEARS series is accepted and its first row skipped.
        for row in rows.iter().filter(|r| r.year != 0) {
            if row.year > HORIZON_YEARS {
                return Err(SolarEconError::InvalidInput {
                    field: "precomputed_cashflows".into(),
                    reason: format!("year {} is past the {HORIZON_YEARS}-year horizon", row.year),
                });
            }
            let slot = &mut by_year[row.year as usize];
            if slot.is_some() {
                return Err(SolarEconError::InvalidInput {
                    field: "precomputed_cashflows".into(),
                    reason: format!("year {} appears more than once", row.year),
                });
            }
            *slot = Some(row.cumulative);
        }
        Ok(Self { rows: by_year })
    }

    fn covered_years(&self) -> usize {
        self.rows.iter().filter(|r| r.is_some()).count()
    }
}

impl YearAdvance for PrecomputedAdvance {
    fn advance(&self, year: u32, previous: Money, year_flow: Money) -> Money {
        match self.rows.get(year as usize).copied().flatten() {
            Some(cumulative) => cumulative,
            None => previous + year_flow,
        }
    }
}

// ---------------------------------------------------------------------------
// Track state
// ---------------------------------------------------------------------------

struct Track {
    initial: Money,
    running: Money,
    payments: Money,
    payback_year: Option<u32>,
}

impl Track {
    fn starting_at(position: Money) -> Self {
        Self {
            initial: position,
            running: position,
            payments: Decimal::ZERO,
            payback_year: None,
        }
    }

    fn pay(&mut self, amount: Money) {
        self.running -= amount;
        self.payments += amount;
    }

    /// First non-negative year wins; later crossings never overwrite it.
    fn mark_payback(&mut self, year: u32) {
        if self.payback_year.is_none() && self.running >= Decimal::ZERO {
            self.payback_year = Some(year);
        }
    }

    fn summary(&self) -> TrackSummary {
        TrackSummary {
            initial_position: round_currency(self.initial),
            final_position: round_currency(self.running),
            payments_in_horizon: round_currency(self.payments),
        }
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Project cumulative cashflow over the horizon for cash purchase, term loan
/// and capital lease, and find each track's payback year.
///
/// Incentive timing differs per track: the cash buyer receives half of the
/// battery incentive at signing and the rest in year 1, the loan track
/// receives the full battery incentive in year 1, and the lease track is
/// credited half of both utility incentives at signing with the remaining
/// half of the solar incentive in year 1. Every track receives the tax
/// shield in year 1 and the federal credit in year 2.
pub fn simulate(input: &AcquisitionInput) -> SolarEconResult<ComputationOutput<AcquisitionCashflowResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let fin = &input.financials;
    let terms = &input.financing;
    validate_terms(terms, &mut warnings);

    let incentives = capital_basis(fin, &mut warnings);
    let gross = incentives.gross_cost;
    let solar = incentives.utility_solar_incentive;
    let battery = incentives.utility_battery_incentive;

    let loan_terms = loan_schedule(gross, terms)?;
    let lease_terms = lease_schedule(gross, terms)?;

    let precomputed = match fin.precomputed_cashflows.as_deref() {
        Some(rows) if !rows.is_empty() => Some(PrecomputedAdvance::from_rows(rows)?),
        _ => None,
    };
    let advance: &dyn YearAdvance = match precomputed {
        Some(ref p) => p as &dyn YearAdvance,
        None => &SimplifiedAdvance,
    };
    if let Some(ref p) = precomputed {
        if p.covered_years() < HORIZON_YEARS as usize {
            warnings.push(format!(
                "Pre-computed cashflows cover {} of {HORIZON_YEARS} years; remaining cash-track years use simplified savings",
                p.covered_years()
            ));
        }
    }

    let mut cash = Track::starting_at(-(gross - solar - UPFRONT_SHARE * battery));
    let mut loan = Track::starting_at(-loan_terms.down_payment);
    let mut lease = Track::starting_at(UPFRONT_SHARE * solar + UPFRONT_SHARE * battery);

    let mut series = Vec::with_capacity(HORIZON_YEARS as usize + 1);
    series.push(point(0, &cash, &loan, &lease));

    for year in 1..=HORIZON_YEARS {
        let savings = savings_for_year(fin, year) + input.annual_surplus_revenue;

        let (cash_receipts, loan_receipts, lease_receipts) = match year {
            1 => (
                (Decimal::ONE - UPFRONT_SHARE) * battery + incentives.tax_shield,
                battery + incentives.tax_shield,
                (Decimal::ONE - UPFRONT_SHARE) * solar + incentives.tax_shield,
            ),
            2 => (
                incentives.federal_incentive,
                incentives.federal_incentive,
                incentives.federal_incentive,
            ),
            _ => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };

        cash.running = advance.advance(year, cash.running, savings + cash_receipts);

        loan.running += savings + loan_receipts;
        if year <= loan_terms.term_years {
            loan.pay(loan_terms.annual_payment);
        }

        lease.running += savings + lease_receipts;
        if year <= lease_terms.term_years {
            lease.pay(lease_terms.annual_payment);
        }

        cash.mark_payback(year);
        loan.mark_payback(year);
        lease.mark_payback(year);

        series.push(point(year, &cash, &loan, &lease));
    }

    for (label, track) in [("cash", &cash), ("loan", &loan), ("lease", &lease)] {
        if track.payback_year.is_none() {
            warnings.push(format!("The {label} track does not pay back within {HORIZON_YEARS} years"));
        }
    }

    tracing::debug!(
        gross = %gross,
        cash_payback = ?cash.payback_year,
        loan_payback = ?loan.payback_year,
        lease_payback = ?lease.payback_year,
        "acquisition cashflows simulated"
    );

    let output = AcquisitionCashflowResult {
        series,
        cash_payback_year: cash.payback_year,
        loan_payback_year: loan.payback_year,
        lease_payback_year: lease.payback_year,
        cash: cash.summary(),
        loan: loan.summary(),
        lease: lease.summary(),
        loan_terms,
        lease_terms,
        used_precomputed_cashflows: precomputed.is_some(),
        capital_basis: gross,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "25-year cumulative cashflow: cash purchase, term loan, capital lease",
        &serde_json::json!({
            "horizon_years": HORIZON_YEARS,
            "financing": terms,
            "annual_surplus_revenue": input.annual_surplus_revenue.to_string(),
            "upfront_incentive_share": UPFRONT_SHARE.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Gross cost and incentives the tracks are built on. Without a gross cost
/// the system is treated as self-financed at net price with no incentives.
fn capital_basis(fin: &ProjectFinancials, warnings: &mut Vec<String>) -> IncentiveInput {
    if fin.gross_cost.is_zero() {
        warnings.push("Gross cost missing; modelling at net cost without incentives".into());
        return IncentiveInput {
            gross_cost: fin.net_cost,
            ..IncentiveInput::default()
        };
    }

    let incentives = IncentiveInput {
        gross_cost: fin.gross_cost,
        utility_solar_incentive: fin.utility_solar_incentive,
        utility_battery_incentive: fin.utility_battery_incentive,
        federal_incentive: fin.federal_incentive,
        tax_shield: fin.tax_shield,
    };
    if !fin.net_cost.is_zero() && incentives.net_cost() != fin.net_cost {
        warnings.push(format!(
            "Supplied net cost {} differs from the incentive waterfall result {}",
            fin.net_cost,
            incentives.net_cost()
        ));
    }
    incentives
}

fn savings_for_year(fin: &ProjectFinancials, year: u32) -> Money {
    match (year, fin.year1_savings) {
        (1, Some(first)) => first,
        _ => fin.annual_savings,
    }
}

fn validate_terms(terms: &FinancingTerms, warnings: &mut Vec<String>) {
    if terms.loan_down_payment_pct < Decimal::ZERO || terms.loan_down_payment_pct > dec!(100) {
        warnings.push(format!(
            "Loan down payment of {}% is outside 0-100%",
            terms.loan_down_payment_pct
        ));
    }
    if terms.loan_interest_rate > Decimal::ONE || terms.lease_implicit_rate > Decimal::ONE {
        warnings.push("Financing rates above 100% look like percentages; rates are decimals".into());
    }
}

fn point(year: u32, cash: &Track, loan: &Track, lease: &Track) -> CumulativeCashflowPoint {
    CumulativeCashflowPoint {
        year,
        cash: round_currency(cash.running),
        loan: round_currency(loan.running),
        lease: round_currency(lease.running),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
