//! Unit normalisation for energy consumption and energy prices.
//!
//! Reference tables quote diesel in litres, hydrogen in kilograms and
//! electricity in kWh. Every record is brought onto a kWh basis before any
//! cost is composed:
//! 1. **Consumption** -- kWh/km.
//! 2. **Energy cost** -- EUR/kWh.
//!
//! Canonical records pass through unchanged, so normalising twice is a no-op.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::PhysicalConstants;
use crate::error::TcoError;
use crate::types::{div, mul, Money, ModelYear, Technology};
use crate::TcoResult;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Unit of an energy consumption figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConsumptionUnit {
    KwhPerKm,
    KwhPer100Km,
    LitersDieselPer100Km,
    KgH2Per100Km,
}

impl ConsumptionUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            ConsumptionUnit::KwhPerKm => "kWh/km",
            ConsumptionUnit::KwhPer100Km => "kWh/100km",
            ConsumptionUnit::LitersDieselPer100Km => "l/100km",
            ConsumptionUnit::KgH2Per100Km => "kg H2/100km",
        }
    }

    pub fn is_canonical(&self) -> bool {
        *self == ConsumptionUnit::KwhPerKm
    }
}

impl FromStr for ConsumptionUnit {
    type Err = TcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.to_lowercase().as_str() {
            "kwh/km" => Ok(ConsumptionUnit::KwhPerKm),
            "kwh/100km" => Ok(ConsumptionUnit::KwhPer100Km),
            "l/100km" => Ok(ConsumptionUnit::LitersDieselPer100Km),
            "kgh2/100km" | "kg/100km" => Ok(ConsumptionUnit::KgH2Per100Km),
            _ => Err(TcoError::UnsupportedUnit {
                kind: "consumption".into(),
                unit: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ConsumptionUnit {
    type Error = TcoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ConsumptionUnit> for String {
    fn from(u: ConsumptionUnit) -> Self {
        u.symbol().to_string()
    }
}

impl fmt::Display for ConsumptionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unit of an energy price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EnergyCostUnit {
    EurPerKwh,
    EurPerLiterDiesel,
    EurPerKgH2,
}

impl EnergyCostUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            EnergyCostUnit::EurPerKwh => "€/kWh",
            EnergyCostUnit::EurPerLiterDiesel => "€/l Diesel",
            EnergyCostUnit::EurPerKgH2 => "€/kg H2",
        }
    }

    pub fn is_canonical(&self) -> bool {
        *self == EnergyCostUnit::EurPerKwh
    }
}

impl FromStr for EnergyCostUnit {
    type Err = TcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let lowered = compact.to_lowercase().replace("eur", "€");
        match lowered.as_str() {
            "€/kwh" => Ok(EnergyCostUnit::EurPerKwh),
            "€/ldiesel" | "€/l" => Ok(EnergyCostUnit::EurPerLiterDiesel),
            "€/kgh2" | "€/kg" => Ok(EnergyCostUnit::EurPerKgH2),
            _ => Err(TcoError::UnsupportedUnit {
                kind: "energy cost".into(),
                unit: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for EnergyCostUnit {
    type Error = TcoError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EnergyCostUnit> for String {
    fn from(u: EnergyCostUnit) -> Self {
        u.symbol().to_string()
    }
}

impl fmt::Display for EnergyCostUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Energy consumption of one technology in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub technology: Technology,
    pub year: ModelYear,
    pub value: Decimal,
    pub unit: ConsumptionUnit,
}

/// Energy price paid by one technology in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyCostRecord {
    pub technology: Technology,
    pub year: ModelYear,
    pub value: Decimal,
    pub unit: EnergyCostUnit,
}

/// Country-specific electricity price replacing the table price for grid-charged trucks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricityPriceOverride {
    /// Country or market the price was taken from (informational).
    pub country: String,
    /// Price in EUR per kWh.
    pub price_per_kwh: Money,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert a consumption record to kWh/km.
pub fn normalize_consumption(
    record: &ConsumptionRecord,
    constants: &PhysicalConstants,
) -> TcoResult<ConsumptionRecord> {
    let per_km = || div(record.value, dec!(100), "consumption per km");
    let value = match record.unit {
        ConsumptionUnit::KwhPerKm => record.value,
        ConsumptionUnit::KwhPer100Km => per_km()?,
        ConsumptionUnit::LitersDieselPer100Km => mul(
            per_km()?,
            constants.diesel_calorific_value_kwh_per_l,
            "diesel consumption in kWh",
        )?,
        ConsumptionUnit::KgH2Per100Km => mul(
            per_km()?,
            constants.hydrogen_energy_density_kwh_per_kg,
            "hydrogen consumption in kWh",
        )?,
    };
    Ok(ConsumptionRecord {
        value,
        unit: ConsumptionUnit::KwhPerKm,
        ..record.clone()
    })
}

/// Convert an energy price to EUR/kWh.
///
/// For grid-charged technologies an electricity override replaces the table
/// price outright; it is already quoted per kWh.
pub fn normalize_energy_cost(
    record: &EnergyCostRecord,
    constants: &PhysicalConstants,
    electricity_override: Option<&ElectricityPriceOverride>,
) -> TcoResult<EnergyCostRecord> {
    if let Some(ov) = electricity_override {
        if ov.price_per_kwh < Decimal::ZERO {
            return Err(TcoError::InvalidInput {
                field: "electricity_override.price_per_kwh".into(),
                reason: "Electricity price cannot be negative".into(),
            });
        }
        if record.technology.uses_grid_electricity() {
            return Ok(EnergyCostRecord {
                value: ov.price_per_kwh,
                unit: EnergyCostUnit::EurPerKwh,
                ..record.clone()
            });
        }
    }

    let value = match record.unit {
        EnergyCostUnit::EurPerKwh => record.value,
        EnergyCostUnit::EurPerLiterDiesel => div(
            record.value,
            constants.diesel_calorific_value_kwh_per_l,
            "diesel price per kWh",
        )?,
        EnergyCostUnit::EurPerKgH2 => div(
            record.value,
            constants.hydrogen_energy_density_kwh_per_kg,
            "hydrogen price per kWh",
        )?,
    };
    Ok(EnergyCostRecord {
        value,
        unit: EnergyCostUnit::EurPerKwh,
        ..record.clone()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn year() -> ModelYear {
        ModelYear::try_from(2025).unwrap()
    }

    fn diesel_consumption() -> ConsumptionRecord {
        ConsumptionRecord {
            technology: Technology::Icev,
            year: year(),
            value: dec!(30),
            unit: ConsumptionUnit::LitersDieselPer100Km,
        }
    }

    #[test]
    fn test_diesel_litres_to_kwh_per_km() {
        let c = PhysicalConstants::default();
        let out = normalize_consumption(&diesel_consumption(), &c).unwrap();
        // 30 / 100 * 9.921 = 2.9763
        assert_eq!(out.value, dec!(2.9763));
        assert_eq!(out.unit, ConsumptionUnit::KwhPerKm);
        assert_eq!(out.technology, Technology::Icev);
    }

    #[test]
    fn test_normalizing_twice_is_noop() {
        let c = PhysicalConstants::default();
        let once = normalize_consumption(&diesel_consumption(), &c).unwrap();
        let twice = normalize_consumption(&once, &c).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_hydrogen_consumption() {
        let c = PhysicalConstants::default();
        let rec = ConsumptionRecord {
            technology: Technology::Fcev,
            year: year(),
            value: dec!(8),
            unit: ConsumptionUnit::KgH2Per100Km,
        };
        // 8 / 100 * 33.33 = 2.6664
        assert_eq!(normalize_consumption(&rec, &c).unwrap().value, dec!(2.6664));
    }

    #[test]
    fn test_canonical_consumption_unchanged() {
        let c = PhysicalConstants::default();
        let rec = ConsumptionRecord {
            technology: Technology::Bev,
            year: year(),
            value: dec!(1.25),
            unit: ConsumptionUnit::KwhPerKm,
        };
        assert_eq!(normalize_consumption(&rec, &c).unwrap(), rec);
    }

    #[test]
    fn test_kwh_per_100km_divided_by_hundred() {
        let c = PhysicalConstants::default();
        let rec = ConsumptionRecord {
            technology: Technology::OcBev,
            year: year(),
            value: dec!(118),
            unit: ConsumptionUnit::KwhPer100Km,
        };
        let out = normalize_consumption(&rec, &c).unwrap();
        assert_eq!(out.value, dec!(1.18));
        assert_eq!(out.unit, ConsumptionUnit::KwhPerKm);
        assert_eq!(
            "kWh / 100 km".parse::<ConsumptionUnit>().unwrap(),
            ConsumptionUnit::KwhPer100Km
        );
    }

    #[test]
    fn test_oversized_consumption_reports_overflow() {
        let c = PhysicalConstants {
            diesel_calorific_value_kwh_per_l: dec!(1000),
            ..Default::default()
        };
        let rec = ConsumptionRecord {
            technology: Technology::Icev,
            year: year(),
            value: Decimal::MAX,
            unit: ConsumptionUnit::LitersDieselPer100Km,
        };
        let err = normalize_consumption(&rec, &c).unwrap_err();
        assert!(matches!(err, TcoError::ArithmeticOverflow { .. }), "{err}");
    }

    #[test]
    fn test_diesel_price_per_kwh() {
        let c = PhysicalConstants::default();
        let rec = EnergyCostRecord {
            technology: Technology::Icev,
            year: year(),
            value: dec!(1.5),
            unit: EnergyCostUnit::EurPerLiterDiesel,
        };
        let out = normalize_energy_cost(&rec, &c, None).unwrap();
        assert!((out.value - dec!(0.15119)).abs() < dec!(0.00001));
        assert_eq!(out.unit, EnergyCostUnit::EurPerKwh);
        let again = normalize_energy_cost(&out, &c, None).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn test_hydrogen_price_per_kwh() {
        let c = PhysicalConstants::default();
        let rec = EnergyCostRecord {
            technology: Technology::Fcev,
            year: year(),
            value: dec!(6.666),
            unit: EnergyCostUnit::EurPerKgH2,
        };
        let out = normalize_energy_cost(&rec, &c, None).unwrap();
        // 6.666 / 33.33 = 0.2
        assert_eq!(out.value, dec!(0.2));
    }

    #[test]
    fn test_electricity_override_applies_to_grid_technologies() {
        let c = PhysicalConstants::default();
        let ov = ElectricityPriceOverride {
            country: "FR".into(),
            price_per_kwh: dec!(0.18),
        };
        for tech in [Technology::Bev, Technology::OcBev] {
            let rec = EnergyCostRecord {
                technology: tech,
                year: year(),
                value: dec!(0.25),
                unit: EnergyCostUnit::EurPerKwh,
            };
            let out = normalize_energy_cost(&rec, &c, Some(&ov)).unwrap();
            assert_eq!(out.value, dec!(0.18));
        }
    }

    #[test]
    fn test_electricity_override_ignored_for_hydrogen() {
        let c = PhysicalConstants::default();
        let ov = ElectricityPriceOverride {
            country: "FR".into(),
            price_per_kwh: dec!(0.18),
        };
        let rec = EnergyCostRecord {
            technology: Technology::Fcev,
            year: year(),
            value: dec!(6.666),
            unit: EnergyCostUnit::EurPerKgH2,
        };
        let out = normalize_energy_cost(&rec, &c, Some(&ov)).unwrap();
        assert_eq!(out.value, dec!(0.2));
    }

    #[test]
    fn test_negative_override_rejected() {
        let c = PhysicalConstants::default();
        let ov = ElectricityPriceOverride {
            country: "DE".into(),
            price_per_kwh: dec!(-0.1),
        };
        let rec = EnergyCostRecord {
            technology: Technology::Bev,
            year: year(),
            value: dec!(0.25),
            unit: EnergyCostUnit::EurPerKwh,
        };
        assert!(normalize_energy_cost(&rec, &c, Some(&ov)).is_err());
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!(
            "l/100 km".parse::<ConsumptionUnit>().unwrap(),
            ConsumptionUnit::LitersDieselPer100Km
        );
        assert_eq!(
            "EUR/kg H2".parse::<EnergyCostUnit>().unwrap(),
            EnergyCostUnit::EurPerKgH2
        );
        assert_eq!(
            "kg/100km".parse::<ConsumptionUnit>().unwrap(),
            ConsumptionUnit::KgH2Per100Km
        );
        let err = "gal/mi".parse::<ConsumptionUnit>().unwrap_err();
        assert!(matches!(err, TcoError::UnsupportedUnit { .. }));
        assert!("$/MMBtu".parse::<EnergyCostUnit>().is_err());
    }

    #[test]
    fn test_unit_serde_uses_symbols() {
        let json = serde_json::to_string(&EnergyCostUnit::EurPerLiterDiesel).unwrap();
        assert_eq!(json, "\"€/l Diesel\"");
        let unit: ConsumptionUnit = serde_json::from_str("\"kg H2/100km\"").unwrap();
        assert_eq!(unit, ConsumptionUnit::KgH2Per100Km);
    }
}
