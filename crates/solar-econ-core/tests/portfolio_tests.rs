use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use solar_econ_core::portfolio::pricing::{price_quote, quote_services, QuoteInput, ServicePricing};
use solar_econ_core::portfolio::rollup::{
    roll_up, PortfolioInput, PortfolioSite, PortfolioSiteOverride, SiteSimulation, ValueSource,
};

fn site(id: &str, capex: Decimal, irr: Decimal) -> PortfolioSite {
    PortfolioSite {
        site_id: id.into(),
        name: Some(format!("Building {id}")),
        latest_simulation: Some(SiteSimulation {
            pv_size_kwp: Some(dec!(250)),
            battery_capacity_kwh: Some(dec!(100)),
            capex_net: Some(capex),
            npv: Some(dec!(50000)),
            irr: Some(irr),
            annual_savings: Some(dec!(20000)),
            co2_avoided_tonnes: Some(dec!(2)),
            ..SiteSimulation::default()
        }),
        overrides: PortfolioSiteOverride::default(),
    }
}

fn portfolio_of(count: usize) -> PortfolioInput {
    PortfolioInput {
        portfolio_name: format!("{count} sites"),
        sites: (0..count)
            .map(|i| site(&i.to_string(), dec!(100000), dec!(0.08)))
            .collect(),
        pricing: ServicePricing::default(),
    }
}

#[test]
fn test_volume_discount_tiers_by_site_count() {
    let expected = [
        (4, Decimal::ZERO),
        (5, dec!(0.05)),
        (12, dec!(0.10)),
        (20, dec!(0.15)),
    ];
    for (count, discount) in expected {
        let out = roll_up(&portfolio_of(count)).unwrap();
        assert_eq!(out.result.volume_discount, discount, "{count} sites");
        assert_eq!(
            out.result.discounted_capex,
            Decimal::from(count) * dec!(100000) * (Decimal::ONE - discount),
            "{count} sites"
        );
    }
}

#[test]
fn test_quote_for_twelve_buildings() {
    let out = price_quote(&QuoteInput {
        building_count: 12,
        pricing: ServicePricing::default(),
    })
    .unwrap();
    let q = &out.result;
    assert_eq!(q.subtotal_before_discount, dec!(42600));
    assert_eq!(q.subtotal, dec!(38340));
    assert_eq!(q.gst, dec!(1917));
    assert_eq!(q.qst, dec!(3824.415));
    assert_eq!(q.total, dec!(44081.415));
}

#[test]
fn test_rollup_quote_matches_standalone_quote() {
    let out = roll_up(&portfolio_of(7)).unwrap();
    let standalone = quote_services(7, &ServicePricing::default()).unwrap();
    assert_eq!(out.result.services_quote, standalone);
}

#[test]
fn test_zero_capex_site_does_not_corrupt_weighted_irr() {
    let mut free_site = site("free", Decimal::ZERO, dec!(0.90));
    free_site.overrides.annual_savings = Some(dec!(1000));
    let input = PortfolioInput {
        portfolio_name: "mixed".into(),
        sites: vec![
            site("a", dec!(100000), dec!(0.10)),
            site("b", dec!(300000), dec!(0.06)),
            free_site,
        ],
        pricing: ServicePricing::default(),
    };
    let out = roll_up(&input).unwrap();
    assert_eq!(out.result.weighted_irr, dec!(0.07));
    assert_eq!(out.result.sites_with_simulations, 3);
}

#[test]
fn test_overrides_take_precedence_in_totals() {
    let mut overridden = site("o", dec!(100000), dec!(0.08));
    overridden.overrides = PortfolioSiteOverride {
        pv_size_kwp: Some(dec!(400)),
        net_capex: Some(dec!(150000)),
        ..PortfolioSiteOverride::default()
    };
    let input = PortfolioInput {
        portfolio_name: "override".into(),
        sites: vec![overridden, site("plain", dec!(100000), dec!(0.08))],
        pricing: ServicePricing::default(),
    };
    let out = roll_up(&input).unwrap();
    let r = &out.result;
    assert_eq!(r.total_pv_kwp, dec!(650));
    assert_eq!(r.total_net_capex, dec!(250000));
    assert_eq!(r.sites[0].pv_size_kwp.source, ValueSource::Override);
    assert_eq!(r.sites[0].npv.source, ValueSource::Simulation);
    assert_eq!(r.sites[1].net_capex.source, ValueSource::Simulation);
}

#[test]
fn test_site_without_simulation_counts_only_for_tier() {
    let mut input = portfolio_of(4);
    input.sites.push(PortfolioSite {
        site_id: "pending".into(),
        name: None,
        latest_simulation: None,
        overrides: PortfolioSiteOverride::default(),
    });
    let out = roll_up(&input).unwrap();
    let r = &out.result;
    assert_eq!(r.site_count, 5);
    assert_eq!(r.sites_with_simulations, 4);
    assert_eq!(r.volume_discount, dec!(0.05));
    assert_eq!(r.total_net_capex, dec!(400000));
    assert_eq!(r.total_co2_avoided_tonnes, dec!(8));
    assert!(!r.sites[4].has_usable_data);
}

#[test]
fn test_portfolio_from_json() {
    let json = r#"{
        "portfolio_name": "json",
        "sites": [
            {"site_id": "a", "latest_simulation": {"capex_net": "80000", "irr": "0.1"}},
            {"site_id": "b", "overrides": {"net_capex": "20000", "irr": "0.2"}},
            {"site_id": "c"}
        ]
    }"#;
    let input: PortfolioInput = serde_json::from_str(json).unwrap();
    let out = roll_up(&input).unwrap();
    assert_eq!(out.result.sites_with_simulations, 2);
    assert_eq!(out.result.total_net_capex, dec!(100000));
    // (0.1 × 80k + 0.2 × 20k) / 100k
    assert_eq!(out.result.weighted_irr, dec!(0.12));
    assert_eq!(out.result.services_quote.building_count, 3);
}
