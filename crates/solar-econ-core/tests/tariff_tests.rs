use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use solar_econ_core::savings::estimator::{estimate_annual_savings, SavingsInput};
use solar_econ_core::tariff::billing::{
    bill, compute_billing_cost, detect_rate, detect_rate_code, project_future_rate, BillingInput,
    DetectionBasis, REFERENCE_MONTHLY_KWH,
};
use solar_econ_core::tariff::schedule::{EnergyBlock, LoadRange, RateCode, RateSchedule, RateTable};
use solar_econ_core::SolarEconError;

fn consumption_grid() -> Vec<Decimal> {
    vec![
        dec!(0),
        dec!(1),
        dec!(500),
        dec!(1199),
        dec!(1200),
        dec!(1201),
        dec!(6000),
        dec!(15090),
        dec!(15091),
        dec!(50000),
        dec!(209999),
        dec!(210000),
        dec!(210001),
        dec!(1000000),
        dec!(5000000),
    ]
}

fn peak_grid() -> Vec<Option<Decimal>> {
    vec![
        None,
        Some(dec!(0)),
        Some(dec!(10)),
        Some(dec!(50)),
        Some(dec!(50.5)),
        Some(dec!(100)),
        Some(dec!(750)),
        Some(dec!(5000)),
        Some(dec!(12000)),
    ]
}

fn two_block_schedule() -> RateSchedule {
    RateSchedule {
        code: RateCode::D,
        description: "Two-block test tariff".into(),
        fixed_monthly_charge: Decimal::ZERO,
        energy_blocks: vec![
            EnergyBlock {
                ceiling_kwh: Some(dec!(1000)),
                rate_cents_per_kwh: dec!(10),
            },
            EnergyBlock {
                ceiling_kwh: None,
                rate_cents_per_kwh: dec!(7),
            },
        ],
        demand_charge: None,
        typical_load_kw: LoadRange {
            min_kw: Decimal::ZERO,
            max_kw: None,
        },
        annual_escalation: Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Billing
// ---------------------------------------------------------------------------

#[test]
fn test_billing_is_monotone_in_consumption_for_every_schedule() {
    let rates = RateTable::standard();
    for schedule in rates.iter() {
        for peak in peak_grid() {
            let mut previous = Decimal::MIN;
            for kwh in consumption_grid() {
                let total = bill(schedule, kwh, peak).total_cost;
                assert!(
                    total >= previous,
                    "rate {} peak {:?}: cost fell from {} to {} at {} kWh",
                    schedule.code,
                    peak,
                    previous,
                    total,
                    kwh
                );
                previous = total;
            }
        }
    }
}

#[test]
fn test_billing_is_monotone_in_peak_demand_for_every_schedule() {
    let rates = RateTable::standard();
    for schedule in rates.iter() {
        for kwh in consumption_grid() {
            let mut previous = Decimal::MIN;
            for peak in peak_grid().into_iter().flatten() {
                let total = bill(schedule, kwh, Some(peak)).total_cost;
                assert!(
                    total >= previous,
                    "rate {} at {} kWh: cost fell at {} kW",
                    schedule.code,
                    kwh,
                    peak
                );
                previous = total;
            }
        }
    }
}

#[test]
fn test_block_boundary_split() {
    let result = bill(&two_block_schedule(), dec!(1500), None);
    assert_eq!(result.total_cost, dec!(135.00));
    assert_eq!(result.blocks.len(), 2);
    assert_eq!(result.blocks[0].kwh, dec!(1000));
    assert_eq!(result.blocks[0].cost, dec!(100));
    assert_eq!(result.blocks[1].kwh, dec!(500));
    assert_eq!(result.blocks[1].cost, dec!(35));
    assert_eq!(result.effective_rate_per_kwh, dec!(0.09));
}

#[test]
fn test_exactly_at_ceiling_stays_in_first_block() {
    let result = bill(&two_block_schedule(), dec!(1000), None);
    assert_eq!(result.total_cost, dec!(100));
    assert_eq!(result.blocks.len(), 1);
}

#[test]
fn test_residential_bill_has_no_demand_cost() {
    let out = compute_billing_cost(
        RateTable::standard(),
        &BillingInput {
            consumption_kwh: dec!(2000),
            rate_code: RateCode::D,
            peak_demand_kw: Some(dec!(30)),
        },
    )
    .unwrap();
    let r = &out.result;
    assert_eq!(r.demand_cost, Decimal::ZERO);
    // 14.04 + 1200 × 0.06905 + 800 × 0.10652
    assert_eq!(r.total_cost, dec!(14.04) + dec!(82.86) + dec!(85.216));
    assert!(out.warnings.is_empty());
}

#[test]
fn test_small_commercial_demand_above_floor() {
    let out = compute_billing_cost(
        RateTable::standard(),
        &BillingInput {
            consumption_kwh: dec!(10000),
            rate_code: RateCode::G,
            peak_demand_kw: Some(dec!(80)),
        },
    )
    .unwrap();
    assert_eq!(out.result.billable_demand_kw, dec!(30));
    assert_eq!(out.result.demand_cost, dec!(637.83));
}

#[test]
fn test_zero_consumption_bills_fixed_charge_only() {
    let out = compute_billing_cost(
        RateTable::standard(),
        &BillingInput {
            consumption_kwh: Decimal::ZERO,
            rate_code: RateCode::G,
            peak_demand_kw: None,
        },
    )
    .unwrap();
    assert_eq!(out.result.total_cost, dec!(14.57));
    assert_eq!(out.result.effective_rate_per_kwh, Decimal::ZERO);
}

#[test]
fn test_negative_consumption_is_degenerate_but_defined() {
    let out = compute_billing_cost(
        RateTable::standard(),
        &BillingInput {
            consumption_kwh: dec!(-500),
            rate_code: RateCode::D,
            peak_demand_kw: None,
        },
    )
    .unwrap();
    assert_eq!(out.result.energy_cost, Decimal::ZERO);
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_unknown_rate_code_in_json_is_rejected() {
    let err = serde_json::from_str::<BillingInput>(r#"{"consumption_kwh": "1000", "rate_code": "X"}"#)
        .map_err(SolarEconError::from)
        .unwrap_err();
    assert!(matches!(err, SolarEconError::UnknownRateCode(ref c) if c == "X"));

    let parsed: BillingInput =
        serde_json::from_str(r#"{"consumption_kwh": "1000", "rate_code": "m"}"#).unwrap();
    assert_eq!(parsed.rate_code, RateCode::M);
}

#[test]
fn test_lookup_unknown_code_fails_fast() {
    let err = RateTable::standard().lookup("Z").unwrap_err();
    assert!(matches!(err, SolarEconError::UnknownRateCode(ref c) if c == "Z"));
}

// ---------------------------------------------------------------------------
// Configured rate tables
// ---------------------------------------------------------------------------

#[test]
fn test_standard_table_survives_json_round_trip_and_validation() {
    let json = serde_json::to_string(RateTable::standard()).unwrap();
    let table = RateTable::from_json(&json).unwrap();
    assert_eq!(&table, RateTable::standard());
}

#[test]
fn test_configured_table_with_bounded_last_block_is_rejected() {
    let mut table = RateTable::standard().clone();
    table.l.energy_blocks[0].ceiling_kwh = Some(dec!(100));
    let json = serde_json::to_string(&table).unwrap();
    assert!(matches!(
        RateTable::from_json(&json),
        Err(SolarEconError::InvalidRateSchedule { .. })
    ));
}

#[test]
fn test_configured_table_with_unknown_code_reports_the_code() {
    let json = serde_json::to_string(RateTable::standard())
        .unwrap()
        .replacen(r#""code":"M""#, r#""code":"Q""#, 1);
    assert!(matches!(
        RateTable::from_json(&json),
        Err(SolarEconError::UnknownRateCode(ref c)) if c == "Q"
    ));
}

#[test]
fn test_configured_table_with_mismatched_code_is_rejected() {
    let mut table = RateTable::standard().clone();
    table.g.code = RateCode::M;
    assert!(table.validate().is_err());
}

// ---------------------------------------------------------------------------
// Rate detection and projection
// ---------------------------------------------------------------------------

#[test]
fn test_detection_by_peak_demand() {
    assert_eq!(detect_rate_code(dec!(1), Some(dec!(6000))), RateCode::L);
    assert_eq!(detect_rate_code(dec!(1), Some(dec!(5000))), RateCode::L);
    assert_eq!(detect_rate_code(dec!(1), Some(dec!(100))), RateCode::M);
    assert_eq!(detect_rate_code(dec!(1), Some(dec!(50.1))), RateCode::G);
    assert_eq!(detect_rate_code(dec!(1), Some(dec!(50))), RateCode::D);
}

#[test]
fn test_detection_falls_back_to_consumption() {
    let d = detect_rate(dec!(40000), None);
    assert_eq!(d.rate_code, RateCode::M);
    assert_eq!(d.basis, DetectionBasis::MonthlyConsumption);

    let d = detect_rate(dec!(40000), Some(Decimal::ZERO));
    assert_eq!(d.basis, DetectionBasis::MonthlyConsumption);

    assert_eq!(detect_rate_code(dec!(6000), None), RateCode::D);
    assert_eq!(detect_rate_code(dec!(6001), None), RateCode::G);
    assert_eq!(detect_rate_code(dec!(3000000), None), RateCode::L);
}

#[test]
fn test_future_rate_at_year_zero_matches_current() {
    let rates = RateTable::standard();
    let f = project_future_rate(rates, RateCode::M, 0).unwrap();
    assert_eq!(f.rate_cents_per_kwh, dec!(5.567));
    let current = bill(rates.schedule(RateCode::M), REFERENCE_MONTHLY_KWH, None).total_cost;
    assert_eq!(f.reference_monthly_cost, current);
}

#[test]
fn test_future_rate_escalates_with_years() {
    let rates = RateTable::standard();
    let mut previous = Decimal::ZERO;
    for years in 0..=10 {
        let f = project_future_rate(rates, RateCode::D, years).unwrap();
        assert!(f.rate_cents_per_kwh > previous);
        previous = f.rate_cents_per_kwh;
    }
}

// ---------------------------------------------------------------------------
// Savings estimate
// ---------------------------------------------------------------------------

#[test]
fn test_zero_production_gives_zero_savings() {
    for code in RateCode::ALL {
        let out = estimate_annual_savings(
            RateTable::standard(),
            &SavingsInput {
                annual_production_kwh: Decimal::ZERO,
                rate_code: code,
                annual_consumption_kwh: dec!(240000),
                peak_demand_kw: Some(dec!(120)),
            },
        )
        .unwrap();
        assert_eq!(out.result.annual_savings, Decimal::ZERO, "rate {code}");
        assert_eq!(out.result.effective_value_per_kwh, Decimal::ZERO, "rate {code}");
    }
}

#[test]
fn test_savings_never_exceed_energy_bill() {
    let out = estimate_annual_savings(
        RateTable::standard(),
        &SavingsInput {
            annual_production_kwh: dec!(500000),
            rate_code: RateCode::G,
            annual_consumption_kwh: dec!(120000),
            peak_demand_kw: Some(dec!(70)),
        },
    )
    .unwrap();
    let r = &out.result;
    assert_eq!(r.monthly_net_consumption_kwh, Decimal::ZERO);
    // Fixed and demand charges remain after a full offset
    assert_eq!(r.monthly_cost_with_solar, dec!(14.57) + dec!(20) * dec!(21.261));
    assert_eq!(r.annual_surplus_kwh, dec!(380000));
    assert!(!out.warnings.is_empty());
}

#[test]
fn test_savings_grow_with_production() {
    let mut previous = Decimal::MIN;
    for production in [dec!(0), dec!(12000), dec!(60000), dec!(180000), dec!(600000)] {
        let out = estimate_annual_savings(
            RateTable::standard(),
            &SavingsInput {
                annual_production_kwh: production,
                rate_code: RateCode::M,
                annual_consumption_kwh: dec!(3000000),
                peak_demand_kw: Some(dec!(900)),
            },
        )
        .unwrap();
        assert!(out.result.annual_savings >= previous);
        previous = out.result.annual_savings;
    }
}
