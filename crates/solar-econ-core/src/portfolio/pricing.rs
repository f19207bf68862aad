use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SolarEconError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::SolarEconResult;

/// Count-based volume discount tiers, highest first. A portfolio qualifies
/// for a tier once it has at least `min_sites` sites.
pub const VOLUME_DISCOUNT_TIERS: [(usize, Rate); 3] = [
    (20, dec!(0.15)),
    (10, dec!(0.10)),
    (5, dec!(0.05)),
];

/// Unit prices and sales taxes for the evaluation/engineering service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicePricing {
    /// Per travel day
    pub travel_day_rate: Money,
    /// Buildings one travel day covers
    pub buildings_per_travel_day: u32,
    /// Per building
    pub site_visit_rate: Money,
    /// Per building
    pub evaluation_rate: Money,
    /// Per building
    pub drawings_rate: Money,
    /// Federal goods and services tax
    pub gst_rate: Rate,
    /// Provincial sales tax
    pub qst_rate: Rate,
}

impl Default for ServicePricing {
    fn default() -> Self {
        Self {
            travel_day_rate: dec!(150),
            buildings_per_travel_day: 3,
            site_visit_rate: dec!(600),
            evaluation_rate: dec!(1000),
            drawings_rate: dec!(1900),
            gst_rate: dec!(0.05),
            qst_rate: dec!(0.09975),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteInput {
    pub building_count: u32,
    #[serde(default)]
    pub pricing: ServicePricing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicesQuote {
    pub building_count: u32,
    pub travel_days: u32,
    pub travel_cost: Money,
    pub site_visit_cost: Money,
    pub evaluation_cost: Money,
    pub drawings_cost: Money,
    pub subtotal_before_discount: Money,
    pub discount_rate: Rate,
    pub discount_amount: Money,
    /// After discount, before tax
    pub subtotal: Money,
    pub gst: Money,
    pub qst: Money,
    pub total: Money,
}

/// Discount for a portfolio of `site_count` sites.
pub fn volume_discount(site_count: usize) -> Rate {
    VOLUME_DISCOUNT_TIERS
        .iter()
        .find(|(min_sites, _)| site_count >= *min_sites)
        .map(|(_, discount)| *discount)
        .unwrap_or(Decimal::ZERO)
}

/// Price the service for `building_count` buildings.
///
/// The volume discount comes off the line-item sum before tax, and GST and
/// QST are each charged on the discounted subtotal (QST is not levied on
/// GST).
pub fn quote_services(building_count: u32, pricing: &ServicePricing) -> SolarEconResult<ServicesQuote> {
    if pricing.buildings_per_travel_day == 0 {
        return Err(SolarEconError::InvalidInput {
            field: "buildings_per_travel_day".into(),
            reason: "Must be at least 1".into(),
        });
    }

    let n = Decimal::from(building_count);
    let travel_days = building_count.div_ceil(pricing.buildings_per_travel_day);

    let travel_cost = Decimal::from(travel_days) * pricing.travel_day_rate;
    let site_visit_cost = n * pricing.site_visit_rate;
    let evaluation_cost = n * pricing.evaluation_rate;
    let drawings_cost = n * pricing.drawings_rate;
    let subtotal_before_discount = travel_cost + site_visit_cost + evaluation_cost + drawings_cost;

    let discount_rate = volume_discount(building_count as usize);
    let discount_amount = subtotal_before_discount * discount_rate;
    let subtotal = subtotal_before_discount - discount_amount;

    let gst = subtotal * pricing.gst_rate;
    let qst = subtotal * pricing.qst_rate;
    let total = subtotal + gst + qst;

    Ok(ServicesQuote {
        building_count,
        travel_days,
        travel_cost,
        site_visit_cost,
        evaluation_cost,
        drawings_cost,
        subtotal_before_discount,
        discount_rate,
        discount_amount,
        subtotal,
        gst,
        qst,
        total,
    })
}

/// [`quote_services`] wrapped in the standard output envelope.
pub fn price_quote(input: &QuoteInput) -> SolarEconResult<ComputationOutput<ServicesQuote>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let quote = quote_services(input.building_count, &input.pricing)?;
    if input.building_count == 0 {
        warnings.push("Quote requested for zero buildings".to_string());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Services quote (line items, volume discount, then GST and QST on the discounted subtotal)",
        &input.pricing,
        warnings,
        elapsed,
        quote,
    ))
}
