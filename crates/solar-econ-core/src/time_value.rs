use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

use crate::error::SolarEconError;
use crate::types::{Money, Rate};
use crate::SolarEconResult;

/// Level payment that retires `principal` over `periods` at `periodic_rate`.
///
/// Standard amortizing-loan formula `P·r·(1+r)^n / ((1+r)^n − 1)`. A rate of
/// exactly zero takes the straight-line branch `P / n`.
pub fn amortized_payment(principal: Money, periodic_rate: Rate, periods: u32) -> SolarEconResult<Money> {
    if periods == 0 {
        if principal.is_zero() {
            return Ok(Decimal::ZERO);
        }
        return Err(SolarEconError::InvalidInput {
            field: "periods".into(),
            reason: "Number of periods must be > 0 to amortize a non-zero balance".into(),
        });
    }

    if periodic_rate.is_zero() {
        return Ok(principal / Decimal::from(periods));
    }

    let factor = compound_factor(periodic_rate, periods)?;
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(SolarEconError::DivisionByZero {
            context: "amortization annuity factor".into(),
        });
    }

    principal
        .checked_mul(periodic_rate)
        .and_then(|p| p.checked_mul(factor))
        .and_then(|p| p.checked_div(denominator))
        .ok_or_else(|| SolarEconError::InvalidInput {
            field: "periodic_rate".into(),
            reason: format!("payment on {principal} at {periodic_rate} over {periods} periods overflows"),
        })
}

/// `(1 + rate)^periods`. Fails with `InvalidInput` instead of overflowing,
/// which is how a rate given in percent (7.5 for 7.5%) usually shows up.
pub fn compound_factor(rate: Rate, periods: u32) -> SolarEconResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powu(u64::from(periods))
        .ok_or_else(|| SolarEconError::InvalidInput {
            field: "rate".into(),
            reason: format!("(1 + {rate})^{periods} overflows; rates are decimals (0.075 = 7.5%)"),
        })
}

/// Round to the nearest whole currency unit, halves away from zero.
pub fn round_currency(amount: Money) -> Money {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator`, or zero when the denominator is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amortized_payment_zero_rate_is_straight_line() {
        let result = amortized_payment(dec!(72000), Decimal::ZERO, 120).unwrap();
        assert_eq!(result, dec!(600));
    }

    #[test]
    fn test_amortized_payment_textbook() {
        // 100,000 over 360 months at 6%/12 => ~599.55
        let result = amortized_payment(dec!(100000), dec!(0.005), 360).unwrap();
        assert!((result - dec!(599.55)).abs() < dec!(0.01), "got {result}");
    }

    #[test]
    fn test_amortized_payment_zero_periods() {
        assert!(amortized_payment(dec!(1000), dec!(0.01), 0).is_err());
        assert_eq!(amortized_payment(Decimal::ZERO, dec!(0.01), 0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_compound_factor() {
        assert_eq!(compound_factor(dec!(0.10), 2).unwrap(), dec!(1.21));
        assert_eq!(compound_factor(dec!(0.03), 0).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_compound_factor_overflow_is_an_error() {
        assert!(matches!(
            compound_factor(dec!(0.625), 180),
            Err(SolarEconError::InvalidInput { .. })
        ));
        assert!(compound_factor(dec!(0.03), 100_000).is_err());
    }

    #[test]
    fn test_amortized_payment_with_percent_rate_fails() {
        // 7.5 entered instead of 0.075, monthly over 15 years
        let result = amortized_payment(dec!(100000), dec!(7.5) / dec!(12), 180);
        assert!(matches!(result, Err(SolarEconError::InvalidInput { .. })));
    }

    #[test]
    fn test_round_currency_midpoint() {
        assert_eq!(round_currency(dec!(2.5)), dec!(3));
        assert_eq!(round_currency(dec!(-2.5)), dec!(-3));
        assert_eq!(round_currency(dec!(-1234.49)), dec!(-1234));
    }

    #[test]
    fn test_safe_div_zero_denominator() {
        assert_eq!(safe_div(dec!(10), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(safe_div(dec!(10), dec!(4)), dec!(2.5));
    }
}
