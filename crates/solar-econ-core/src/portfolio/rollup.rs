use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::portfolio::pricing::{quote_services, volume_discount, ServicePricing, ServicesQuote};
use crate::time_value::safe_div;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::SolarEconResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Latest simulation for a site, as stored by the simulation service.
/// Any figure may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSimulation {
    pub pv_size_kwp: Option<Decimal>,
    pub battery_capacity_kwh: Option<Decimal>,
    pub battery_power_kw: Option<Decimal>,
    pub capex_gross: Option<Money>,
    pub capex_net: Option<Money>,
    pub npv: Option<Money>,
    pub irr: Option<Rate>,
    pub annual_savings: Option<Money>,
    pub co2_avoided_tonnes: Option<Decimal>,
}

/// Portfolio-level adjustments that take precedence over the simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSiteOverride {
    pub pv_size_kwp: Option<Decimal>,
    pub battery_capacity_kwh: Option<Decimal>,
    pub net_capex: Option<Money>,
    pub npv: Option<Money>,
    pub irr: Option<Rate>,
    pub annual_savings: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSite {
    pub site_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_simulation: Option<SiteSimulation>,
    #[serde(default)]
    pub overrides: PortfolioSiteOverride,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInput {
    #[serde(default)]
    pub portfolio_name: String,
    pub sites: Vec<PortfolioSite>,
    #[serde(default)]
    pub pricing: ServicePricing,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Override,
    Simulation,
    Default,
}

/// A value together with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    pub value: Decimal,
    pub source: ValueSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSite {
    pub site_id: String,
    pub pv_size_kwp: Resolved,
    pub battery_capacity_kwh: Resolved,
    pub net_capex: Resolved,
    pub npv: Resolved,
    pub irr: Resolved,
    pub annual_savings: Resolved,
    pub co2_avoided_tonnes: Decimal,
    /// Counted in the portfolio totals: a simulation is present, or a
    /// headline figure is non-zero or overridden
    pub has_usable_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRollup {
    /// Every site, with or without data; drives the discount tier
    pub site_count: usize,
    pub sites_with_simulations: usize,
    pub total_pv_kwp: Decimal,
    pub total_battery_kwh: Decimal,
    pub total_net_capex: Money,
    pub total_npv: Money,
    /// Σ(irr × net capex) / Σ net capex
    pub weighted_irr: Rate,
    pub total_annual_savings: Money,
    pub total_co2_avoided_tonnes: Decimal,
    pub volume_discount: Rate,
    /// total_net_capex × (1 − volume_discount)
    pub discounted_capex: Money,
    pub sites: Vec<ResolvedSite>,
    pub services_quote: ServicesQuote,
}

// ---------------------------------------------------------------------------
// Value resolution: override, then simulation, then zero
// ---------------------------------------------------------------------------

fn resolve(override_value: Option<Decimal>, simulated: Option<Decimal>) -> Resolved {
    match (override_value, simulated) {
        (Some(value), _) => Resolved {
            value,
            source: ValueSource::Override,
        },
        (None, Some(value)) => Resolved {
            value,
            source: ValueSource::Simulation,
        },
        (None, None) => Resolved {
            value: Decimal::ZERO,
            source: ValueSource::Default,
        },
    }
}

impl PortfolioSite {
    fn simulated<F>(&self, field: F) -> Option<Decimal>
    where
        F: Fn(&SiteSimulation) -> Option<Decimal>,
    {
        self.latest_simulation.as_ref().and_then(field)
    }

    pub fn pv_size_kwp(&self) -> Resolved {
        resolve(self.overrides.pv_size_kwp, self.simulated(|s| s.pv_size_kwp))
    }

    pub fn battery_capacity_kwh(&self) -> Resolved {
        resolve(
            self.overrides.battery_capacity_kwh,
            self.simulated(|s| s.battery_capacity_kwh),
        )
    }

    pub fn net_capex(&self) -> Resolved {
        resolve(self.overrides.net_capex, self.simulated(|s| s.capex_net))
    }

    pub fn npv(&self) -> Resolved {
        resolve(self.overrides.npv, self.simulated(|s| s.npv))
    }

    pub fn irr(&self) -> Resolved {
        resolve(self.overrides.irr, self.simulated(|s| s.irr))
    }

    pub fn annual_savings(&self) -> Resolved {
        resolve(self.overrides.annual_savings, self.simulated(|s| s.annual_savings))
    }

    /// Not overridable at portfolio level.
    pub fn co2_avoided_tonnes(&self) -> Decimal {
        self.simulated(|s| s.co2_avoided_tonnes).unwrap_or(Decimal::ZERO)
    }

    fn resolved(&self) -> ResolvedSite {
        let pv = self.pv_size_kwp();
        let capex = self.net_capex();
        let npv = self.npv();
        let savings = self.annual_savings();

        let any_nonzero = [pv, capex, npv, savings].iter().any(|r| !r.value.is_zero());
        let any_override = self.overrides.pv_size_kwp.is_some()
            || self.overrides.net_capex.is_some()
            || self.overrides.npv.is_some()
            || self.overrides.annual_savings.is_some();

        ResolvedSite {
            site_id: self.site_id.clone(),
            pv_size_kwp: pv,
            battery_capacity_kwh: self.battery_capacity_kwh(),
            net_capex: capex,
            npv,
            irr: self.irr(),
            annual_savings: savings,
            co2_avoided_tonnes: self.co2_avoided_tonnes(),
            has_usable_data: self.latest_simulation.is_some() || any_nonzero || any_override,
        }
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Aggregate a portfolio of sites into totals, a capex-weighted IRR, the
/// count-based volume discount and the services quote.
///
/// Sites without usable data are listed but excluded from every total and
/// from `sites_with_simulations`; they still count toward the tier.
pub fn roll_up(input: &PortfolioInput) -> SolarEconResult<ComputationOutput<PortfolioRollup>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let sites: Vec<ResolvedSite> = input.sites.iter().map(PortfolioSite::resolved).collect();

    let mut sites_with_simulations = 0usize;
    let mut total_pv_kwp = Decimal::ZERO;
    let mut total_battery_kwh = Decimal::ZERO;
    let mut total_net_capex = Decimal::ZERO;
    let mut total_npv = Decimal::ZERO;
    let mut total_annual_savings = Decimal::ZERO;
    let mut total_co2 = Decimal::ZERO;
    let mut irr_weighted_sum = Decimal::ZERO;

    for site in &sites {
        if !site.has_usable_data {
            warnings.push(format!("Site {} has no usable data and is excluded from totals", site.site_id));
            continue;
        }
        if site.net_capex.value < Decimal::ZERO {
            warnings.push(format!(
                "Site {} has negative net capex ({})",
                site.site_id, site.net_capex.value
            ));
        }

        sites_with_simulations += 1;
        total_pv_kwp += site.pv_size_kwp.value;
        total_battery_kwh += site.battery_capacity_kwh.value;
        total_net_capex += site.net_capex.value;
        total_npv += site.npv.value;
        total_annual_savings += site.annual_savings.value;
        total_co2 += site.co2_avoided_tonnes;
        irr_weighted_sum += site.irr.value * site.net_capex.value;
    }

    let weighted_irr = safe_div(irr_weighted_sum, total_net_capex);
    let site_count = input.sites.len();
    let discount = volume_discount(site_count);
    let discounted_capex = total_net_capex * (Decimal::ONE - discount);

    let building_count = u32::try_from(site_count).unwrap_or(u32::MAX);
    let services_quote = quote_services(building_count, &input.pricing)?;

    tracing::debug!(
        portfolio = %input.portfolio_name,
        site_count,
        sites_with_simulations,
        total_net_capex = %total_net_capex,
        "portfolio rolled up"
    );

    let output = PortfolioRollup {
        site_count,
        sites_with_simulations,
        total_pv_kwp,
        total_battery_kwh,
        total_net_capex,
        total_npv,
        weighted_irr,
        total_annual_savings,
        total_co2_avoided_tonnes: total_co2,
        volume_discount: discount,
        discounted_capex,
        sites,
        services_quote,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio roll-up (override > simulation > zero, capex-weighted IRR, count-based volume tiers)",
        &serde_json::json!({
            "portfolio_name": input.portfolio_name,
            "site_count": site_count,
            "pricing": input.pricing,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
