use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SolarEconError;
use crate::time_value::amortized_payment;
use crate::types::{Money, Rate};
use crate::SolarEconResult;

const MONTHS_PER_YEAR: u32 = 12;

/// Loan and lease terms offered alongside an outright purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancingTerms {
    /// Down payment in percentage points of gross cost (30 = 30%)
    pub loan_down_payment_pct: Decimal,
    /// Annual nominal loan rate (decimal)
    pub loan_interest_rate: Rate,
    pub loan_term_years: u32,
    /// Annual rate implicit in the lease (decimal)
    pub lease_implicit_rate: Rate,
    pub lease_term_years: u32,
}

impl Default for FinancingTerms {
    fn default() -> Self {
        Self {
            loan_down_payment_pct: dec!(20),
            loan_interest_rate: dec!(0.065),
            loan_term_years: 10,
            lease_implicit_rate: dec!(0.075),
            lease_term_years: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSchedule {
    pub down_payment: Money,
    pub financed_amount: Money,
    pub monthly_payment: Money,
    pub annual_payment: Money,
    pub term_years: u32,
    pub total_payments: Money,
    pub total_interest: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseSchedule {
    pub leased_amount: Money,
    pub monthly_payment: Money,
    pub annual_payment: Money,
    pub term_years: u32,
    pub total_payments: Money,
}

/// Monthly amortization annualized (×12), returned as `(monthly, annual)`.
/// Zero rate is straight-line.
pub fn annual_payment(principal: Money, annual_rate: Rate, term_years: u32, field: &str) -> SolarEconResult<(Money, Money)> {
    if term_years == 0 && !principal.is_zero() {
        return Err(SolarEconError::InvalidInput {
            field: field.into(),
            reason: "Term must be at least 1 year when a balance is financed".into(),
        });
    }
    if annual_rate.is_zero() {
        // Straight-line; dividing by years keeps whole-year totals exact
        let annual = amortized_payment(principal, Decimal::ZERO, term_years)?;
        return Ok((annual / Decimal::from(MONTHS_PER_YEAR), annual));
    }
    let periodic_rate = annual_rate / Decimal::from(MONTHS_PER_YEAR);
    let monthly = amortized_payment(principal, periodic_rate, term_years * MONTHS_PER_YEAR)?;
    Ok((monthly, monthly * Decimal::from(MONTHS_PER_YEAR)))
}

/// Down payment on gross cost, remainder amortized over the loan term.
pub fn loan_schedule(gross_cost: Money, terms: &FinancingTerms) -> SolarEconResult<LoanSchedule> {
    let down_payment = terms.loan_down_payment_pct / dec!(100) * gross_cost;
    let financed_amount = gross_cost - down_payment;
    let (monthly_payment, annual) = annual_payment(
        financed_amount,
        terms.loan_interest_rate,
        terms.loan_term_years,
        "loan_term_years",
    )?;
    let total_payments = annual * Decimal::from(terms.loan_term_years);

    Ok(LoanSchedule {
        down_payment,
        financed_amount,
        monthly_payment,
        annual_payment: annual,
        term_years: terms.loan_term_years,
        total_payments,
        total_interest: total_payments - financed_amount,
    })
}

/// The full gross cost amortized at the lease's implicit rate.
pub fn lease_schedule(gross_cost: Money, terms: &FinancingTerms) -> SolarEconResult<LeaseSchedule> {
    let (monthly_payment, annual) = annual_payment(
        gross_cost,
        terms.lease_implicit_rate,
        terms.lease_term_years,
        "lease_term_years",
    )?;

    Ok(LeaseSchedule {
        leased_amount: gross_cost,
        monthly_payment,
        annual_payment: annual,
        term_years: terms.lease_term_years,
        total_payments: annual * Decimal::from(terms.lease_term_years),
    })
}
