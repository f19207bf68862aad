use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::time_value::safe_div;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::SolarEconResult;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// Capital cost and the incentives deducted from it. Utility amounts arrive
/// already capped by the program rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncentiveInput {
    /// Fully-installed turnkey price
    pub gross_cost: Money,
    #[serde(default)]
    pub utility_solar_incentive: Money,
    #[serde(default)]
    pub utility_battery_incentive: Money,
    /// Federal investment tax credit
    #[serde(default)]
    pub federal_incentive: Money,
    /// Present value of the accelerated capital-cost allowance
    #[serde(default)]
    pub tax_shield: Money,
}

impl IncentiveInput {
    pub fn utility_incentive(&self) -> Money {
        self.utility_solar_incentive + self.utility_battery_incentive
    }

    /// Net investment after every deduction. Not clamped at zero.
    pub fn net_cost(&self) -> Money {
        self.gross_cost - self.utility_incentive() - self.federal_incentive - self.tax_shield
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallStep {
    pub order: u32,
    pub label: String,
    /// Signed movement applied at this step (deductions are negative)
    pub amount: Money,
    /// Running cost after this step
    pub running_total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncentiveWaterfall {
    pub gross_cost: Money,
    pub utility_incentive: Money,
    pub federal_incentive: Money,
    pub tax_shield: Money,
    pub total_incentives: Money,
    pub net_investment: Money,
    /// total_incentives / gross_cost
    pub incentive_share: Decimal,
    /// Net investment below zero means the inputs are inconsistent upstream
    pub is_negative: bool,
    pub steps: Vec<WaterfallStep>,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Reduce gross capital cost to net investment in the fixed order: utility
/// incentive, federal tax credit, depreciation tax shield.
pub fn net_investment(input: &IncentiveInput) -> SolarEconResult<ComputationOutput<IncentiveWaterfall>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let deductions = [
        ("Utility incentive", input.utility_incentive()),
        ("Federal investment tax credit", input.federal_incentive),
        ("Depreciation tax shield", input.tax_shield),
    ];

    let mut steps = Vec::with_capacity(deductions.len() + 2);
    let mut running = input.gross_cost;
    steps.push(WaterfallStep {
        order: 1,
        label: "Gross installed cost".into(),
        amount: input.gross_cost,
        running_total: running,
    });

    for (i, (label, amount)) in deductions.iter().enumerate() {
        if *amount < Decimal::ZERO {
            warnings.push(format!("{label} is negative ({amount})"));
        }
        running -= *amount;
        steps.push(WaterfallStep {
            order: i as u32 + 2,
            label: (*label).to_string(),
            amount: -*amount,
            running_total: running,
        });
    }

    let net = input.net_cost();
    steps.push(WaterfallStep {
        order: steps.len() as u32 + 1,
        label: "Net investment".into(),
        amount: net,
        running_total: net,
    });

    let is_negative = net < Decimal::ZERO;
    if is_negative {
        warnings.push(format!(
            "Incentives exceed gross cost: net investment is {net}. Check upstream incentive caps"
        ));
    }

    let total_incentives = input.utility_incentive() + input.federal_incentive + input.tax_shield;

    tracing::debug!(gross = %input.gross_cost, net = %net, "incentive waterfall applied");

    let output = IncentiveWaterfall {
        gross_cost: input.gross_cost,
        utility_incentive: input.utility_incentive(),
        federal_incentive: input.federal_incentive,
        tax_shield: input.tax_shield,
        total_incentives,
        net_investment: net,
        incentive_share: safe_div(total_incentives, input.gross_cost),
        is_negative,
        steps,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Incentive waterfall (gross - utility - federal ITC - tax shield)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> IncentiveInput {
        IncentiveInput {
            gross_cost: dec!(250000),
            utility_solar_incentive: dec!(40000),
            utility_battery_incentive: dec!(10000),
            federal_incentive: dec!(60000),
            tax_shield: dec!(35000),
        }
    }

    #[test]
    fn test_net_is_exact_identity() {
        let out = net_investment(&sample()).unwrap();
        assert_eq!(out.result.net_investment, dec!(105000));
        assert_eq!(out.result.total_incentives, dec!(145000));
        assert!(!out.result.is_negative);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_steps_follow_fixed_order() {
        let out = net_investment(&sample()).unwrap();
        let labels: Vec<&str> = out.result.steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Gross installed cost",
                "Utility incentive",
                "Federal investment tax credit",
                "Depreciation tax shield",
                "Net investment",
            ]
        );
        let running: Vec<Decimal> = out.result.steps.iter().map(|s| s.running_total).collect();
        assert_eq!(
            running,
            vec![dec!(250000), dec!(200000), dec!(140000), dec!(105000), dec!(105000)]
        );
    }

    #[test]
    fn test_negative_net_is_surfaced_not_floored() {
        let mut input = sample();
        input.federal_incentive = dec!(200000);
        let out = net_investment(&input).unwrap();
        assert_eq!(out.result.net_investment, dec!(-35000));
        assert!(out.result.is_negative);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_zero_gross_share_is_zero() {
        let out = net_investment(&IncentiveInput::default()).unwrap();
        assert_eq!(out.result.incentive_share, Decimal::ZERO);
        assert_eq!(out.result.net_investment, Decimal::ZERO);
    }
}
