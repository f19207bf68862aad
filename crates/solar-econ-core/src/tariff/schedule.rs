use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::SolarEconError;
use crate::types::{Kw, Kwh, Money, Rate};
use crate::SolarEconResult;

// ---------------------------------------------------------------------------
// Rate codes
// ---------------------------------------------------------------------------

/// Utility tariff class. The set is closed: every schedule in a
/// [`RateTable`] is keyed by exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RateCode {
    /// Residential
    D,
    /// Small commercial (general service, small power)
    G,
    /// Medium power
    M,
    /// Large power
    L,
}

impl RateCode {
    pub const ALL: [RateCode; 4] = [RateCode::D, RateCode::G, RateCode::M, RateCode::L];

    pub fn as_str(&self) -> &'static str {
        match self {
            RateCode::D => "D",
            RateCode::G => "G",
            RateCode::M => "M",
            RateCode::L => "L",
        }
    }
}

impl fmt::Display for RateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateCode {
    type Err = SolarEconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D" => Ok(RateCode::D),
            "G" => Ok(RateCode::G),
            "M" => Ok(RateCode::M),
            "L" => Ok(RateCode::L),
            _ => Err(SolarEconError::UnknownRateCode(s.to_string())),
        }
    }
}

impl TryFrom<String> for RateCode {
    type Error = SolarEconError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RateCode> for String {
    fn from(code: RateCode) -> Self {
        code.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Schedule definition
// ---------------------------------------------------------------------------

/// One energy tier. Blocks are consumed in the order they appear in the
/// schedule, each up to its ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyBlock {
    /// Monthly kWh absorbed by this block; `None` for the final, unbounded block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling_kwh: Option<Kwh>,
    /// Energy price in cents per kWh
    pub rate_cents_per_kwh: Decimal,
}

/// Monthly charge on peak power draw above a billable floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandCharge {
    /// $ per billable kW
    pub rate_per_kw: Money,
    /// Peak demand below this floor is not billed
    pub minimum_kw: Kw,
}

/// Range of peak loads a tariff class is normally applied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRange {
    pub min_kw: Kw,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_kw: Option<Kw>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    pub code: RateCode,
    pub description: String,
    /// Fixed charge per monthly billing period
    pub fixed_monthly_charge: Money,
    /// Ordered energy tiers; the order is part of the tariff
    pub energy_blocks: Vec<EnergyBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand_charge: Option<DemandCharge>,
    pub typical_load_kw: LoadRange,
    /// Assumed annual tariff escalation (decimal)
    pub annual_escalation: Rate,
}

impl RateSchedule {
    /// Rate of the first energy block, in cents per kWh.
    pub fn first_block_rate(&self) -> Decimal {
        self.energy_blocks
            .first()
            .map(|b| b.rate_cents_per_kwh)
            .unwrap_or(Decimal::ZERO)
    }

    /// Check the structural rules a configured schedule must satisfy.
    pub fn validate(&self) -> SolarEconResult<()> {
        let invalid = |reason: String| SolarEconError::InvalidRateSchedule {
            code: self.code.to_string(),
            reason,
        };

        if self.energy_blocks.is_empty() {
            return Err(invalid("at least one energy block is required".into()));
        }

        let last = self.energy_blocks.len() - 1;
        for (i, block) in self.energy_blocks.iter().enumerate() {
            if block.rate_cents_per_kwh < Decimal::ZERO {
                return Err(invalid(format!("block {} has a negative rate", i + 1)));
            }
            match block.ceiling_kwh {
                None if i != last => {
                    return Err(invalid(format!(
                        "block {} is unbounded but is not the final block",
                        i + 1
                    )));
                }
                Some(_) if i == last => {
                    return Err(invalid("the final block must be unbounded".into()));
                }
                Some(c) if c <= Decimal::ZERO => {
                    return Err(invalid(format!("block {} ceiling must be positive", i + 1)));
                }
                _ => {}
            }
        }

        if self.fixed_monthly_charge < Decimal::ZERO {
            return Err(invalid("fixed monthly charge cannot be negative".into()));
        }

        if let Some(ref demand) = self.demand_charge {
            if demand.rate_per_kw < Decimal::ZERO || demand.minimum_kw < Decimal::ZERO {
                return Err(invalid("demand charge terms cannot be negative".into()));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rate table
// ---------------------------------------------------------------------------

static STANDARD_RATES: LazyLock<RateTable> = LazyLock::new(RateTable::build_standard);

/// One schedule per [`RateCode`]. Loaded once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    #[serde(rename = "D")]
    pub d: RateSchedule,
    #[serde(rename = "G")]
    pub g: RateSchedule,
    #[serde(rename = "M")]
    pub m: RateSchedule,
    #[serde(rename = "L")]
    pub l: RateSchedule,
}

impl RateTable {
    /// The built-in schedules, shared for the life of the process.
    pub fn standard() -> &'static RateTable {
        &STANDARD_RATES
    }

    /// Parse a table from JSON configuration and validate every schedule.
    pub fn from_json(json: &str) -> SolarEconResult<RateTable> {
        let table: RateTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn schedule(&self, code: RateCode) -> &RateSchedule {
        match code {
            RateCode::D => &self.d,
            RateCode::G => &self.g,
            RateCode::M => &self.m,
            RateCode::L => &self.l,
        }
    }

    /// Resolve a free-form code. Unknown codes are an error, never a default.
    pub fn lookup(&self, code: &str) -> SolarEconResult<&RateSchedule> {
        let code: RateCode = code.parse()?;
        Ok(self.schedule(code))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RateSchedule> {
        RateCode::ALL.into_iter().map(move |c| self.schedule(c))
    }

    pub fn validate(&self) -> SolarEconResult<()> {
        for code in RateCode::ALL {
            let schedule = self.schedule(code);
            if schedule.code != code {
                return Err(SolarEconError::InvalidRateSchedule {
                    code: code.to_string(),
                    reason: format!("entry is declared as rate {}", schedule.code),
                });
            }
            schedule.validate()?;
        }
        Ok(())
    }

    fn build_standard() -> RateTable {
        RateTable {
            d: RateSchedule {
                code: RateCode::D,
                description: "Residential".into(),
                fixed_monthly_charge: dec!(14.04),
                energy_blocks: vec![
                    EnergyBlock {
                        ceiling_kwh: Some(dec!(1200)),
                        rate_cents_per_kwh: dec!(6.905),
                    },
                    EnergyBlock {
                        ceiling_kwh: None,
                        rate_cents_per_kwh: dec!(10.652),
                    },
                ],
                demand_charge: None,
                typical_load_kw: LoadRange {
                    min_kw: Decimal::ZERO,
                    max_kw: Some(dec!(50)),
                },
                annual_escalation: dec!(0.03),
            },
            g: RateSchedule {
                code: RateCode::G,
                description: "Small commercial".into(),
                fixed_monthly_charge: dec!(14.57),
                energy_blocks: vec![
                    EnergyBlock {
                        ceiling_kwh: Some(dec!(15090)),
                        rate_cents_per_kwh: dec!(11.933),
                    },
                    EnergyBlock {
                        ceiling_kwh: None,
                        rate_cents_per_kwh: dec!(9.184),
                    },
                ],
                demand_charge: Some(DemandCharge {
                    rate_per_kw: dec!(21.261),
                    minimum_kw: dec!(50),
                }),
                typical_load_kw: LoadRange {
                    min_kw: dec!(50),
                    max_kw: Some(dec!(100)),
                },
                annual_escalation: dec!(0.03),
            },
            m: RateSchedule {
                code: RateCode::M,
                description: "Medium power".into(),
                fixed_monthly_charge: Decimal::ZERO,
                energy_blocks: vec![
                    EnergyBlock {
                        ceiling_kwh: Some(dec!(210000)),
                        rate_cents_per_kwh: dec!(5.567),
                    },
                    EnergyBlock {
                        ceiling_kwh: None,
                        rate_cents_per_kwh: dec!(4.128),
                    },
                ],
                demand_charge: Some(DemandCharge {
                    rate_per_kw: dec!(17.573),
                    minimum_kw: Decimal::ZERO,
                }),
                typical_load_kw: LoadRange {
                    min_kw: dec!(100),
                    max_kw: Some(dec!(5000)),
                },
                annual_escalation: dec!(0.03),
            },
            l: RateSchedule {
                code: RateCode::L,
                description: "Large power".into(),
                fixed_monthly_charge: Decimal::ZERO,
                energy_blocks: vec![EnergyBlock {
                    ceiling_kwh: None,
                    rate_cents_per_kwh: dec!(3.580),
                }],
                demand_charge: Some(DemandCharge {
                    rate_per_kw: dec!(14.476),
                    minimum_kw: Decimal::ZERO,
                }),
                typical_load_kw: LoadRange {
                    min_kw: dec!(5000),
                    max_kw: None,
                },
                annual_escalation: dec!(0.025),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_codes() {
        assert_eq!("D".parse::<RateCode>().unwrap(), RateCode::D);
        assert_eq!(" m ".parse::<RateCode>().unwrap(), RateCode::M);
    }

    #[test]
    fn test_parse_unknown_code_fails() {
        match "X".parse::<RateCode>() {
            Err(SolarEconError::UnknownRateCode(code)) => assert_eq!(code, "X"),
            other => panic!("expected UnknownRateCode, got {other:?}"),
        }
    }

    #[test]
    fn test_lookup_unknown_code_never_defaults() {
        let table = RateTable::standard();
        assert!(matches!(
            table.lookup("Z"),
            Err(SolarEconError::UnknownRateCode(_))
        ));
        assert_eq!(table.lookup("g").unwrap().code, RateCode::G);
    }

    #[test]
    fn test_standard_table_is_valid() {
        RateTable::standard().validate().unwrap();
        assert_eq!(RateTable::standard().iter().count(), 4);
    }

    #[test]
    fn test_validate_rejects_bounded_final_block() {
        let mut table = RateTable::standard().clone();
        table.l.energy_blocks[0].ceiling_kwh = Some(dec!(1000));
        assert!(matches!(
            table.validate(),
            Err(SolarEconError::InvalidRateSchedule { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_misplaced_unbounded_block() {
        let mut table = RateTable::standard().clone();
        table.d.energy_blocks[0].ceiling_kwh = None;
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_key() {
        let mut table = RateTable::standard().clone();
        table.g.code = RateCode::M;
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_table_json_round_trip_via_config() {
        let json = serde_json::to_string(RateTable::standard()).unwrap();
        let parsed = RateTable::from_json(&json).unwrap();
        assert_eq!(&parsed, RateTable::standard());
    }

    #[test]
    fn test_config_with_unknown_code_is_rejected() {
        let json = serde_json::to_string(RateTable::standard())
            .unwrap()
            .replacen("\"code\":\"D\"", "\"code\":\"Q\"", 1);
        assert!(RateTable::from_json(&json).is_err());
    }
}
