//! Physical constants and input bounds.
//!
//! Both are plain data with defaults so a deployment can override them from a
//! configuration file without touching the cost arithmetic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::TcoError;
use crate::types::{div, Money, Rate, Years};
use crate::TcoResult;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

/// Conversion factors between energy carriers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Energy content of diesel (kWh per litre).
    pub diesel_calorific_value_kwh_per_l: Decimal,
    /// Tailpipe CO2 from burning one litre of diesel (kg).
    pub diesel_co2_kg_per_l: Decimal,
    /// Energy content of hydrogen (kWh per kg).
    pub hydrogen_energy_density_kwh_per_kg: Decimal,
    /// Share of annual mileage driven on tolled roads.
    pub toll_mileage_share: Rate,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            diesel_calorific_value_kwh_per_l: dec!(9.921),
            diesel_co2_kg_per_l: dec!(2.65),
            hydrogen_energy_density_kwh_per_kg: dec!(33.33),
            toll_mileage_share: dec!(0.9),
        }
    }
}

impl PhysicalConstants {
    /// Diesel emission factor in kg CO2 per kWh of fuel energy.
    pub fn diesel_co2_kg_per_kwh(&self) -> TcoResult<Decimal> {
        div(
            self.diesel_co2_kg_per_l,
            self.diesel_calorific_value_kwh_per_l,
            "diesel emission factor",
        )
    }

    pub fn validate(&self) -> TcoResult<()> {
        if self.diesel_calorific_value_kwh_per_l <= Decimal::ZERO {
            return Err(TcoError::InvalidInput {
                field: "diesel_calorific_value_kwh_per_l".into(),
                reason: "Calorific value must be positive".into(),
            });
        }
        if self.hydrogen_energy_density_kwh_per_kg <= Decimal::ZERO {
            return Err(TcoError::InvalidInput {
                field: "hydrogen_energy_density_kwh_per_kg".into(),
                reason: "Energy density must be positive".into(),
            });
        }
        if self.diesel_co2_kg_per_l < Decimal::ZERO {
            return Err(TcoError::InvalidInput {
                field: "diesel_co2_kg_per_l".into(),
                reason: "Emission factor cannot be negative".into(),
            });
        }
        if self.toll_mileage_share < Decimal::ZERO || self.toll_mileage_share > Decimal::ONE {
            return Err(TcoError::InvalidInput {
                field: "toll_mileage_share".into(),
                reason: "Toll mileage share must be between 0 and 1".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Input bounds
// ---------------------------------------------------------------------------

/// Closed interval a user-supplied value must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl ValueRange {
    pub const fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min && value <= self.max
    }

    /// Reject `value` unless it lies in the range.
    pub fn check(&self, field: &str, value: Decimal) -> TcoResult<()> {
        if self.contains(value) {
            return Ok(());
        }
        Err(TcoError::InvalidInput {
            field: field.into(),
            reason: format!("Must be between {} and {}", self.min, self.max),
        })
    }

    fn validate(&self, field: &str) -> TcoResult<()> {
        if self.min < Decimal::ZERO || self.min > self.max {
            return Err(TcoError::InvalidInput {
                field: format!("{field} bounds"),
                reason: format!(
                    "Invalid range {}..={}; must be non-negative and ordered",
                    self.min, self.max
                ),
            });
        }
        Ok(())
    }
}

/// Accepted ranges for per-technology overrides, in the reference table's
/// unit for each technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideBounds {
    pub purchase_cost: ValueRange,
    /// Annual figure.
    pub maintenance_repair: ValueRange,
    /// kWh/km, l/100km or kg H2/100km.
    pub consumption: ValueRange,
    /// EUR/kWh, EUR/l or EUR/kg H2. Also bounds the electricity price override.
    pub energy_cost: ValueRange,
    /// EUR per tolled km.
    pub toll_rate: ValueRange,
    /// Annual figure.
    pub infrastructure: ValueRange,
}

impl Default for OverrideBounds {
    fn default() -> Self {
        Self {
            purchase_cost: ValueRange::new(dec!(50000), dec!(1000000)),
            maintenance_repair: ValueRange::new(dec!(2000), dec!(1000000)),
            consumption: ValueRange::new(Decimal::ZERO, dec!(50)),
            energy_cost: ValueRange::new(Decimal::ZERO, dec!(10)),
            toll_rate: ValueRange::new(Decimal::ZERO, dec!(10)),
            infrastructure: ValueRange::new(Decimal::ZERO, dec!(1000000)),
        }
    }
}

impl OverrideBounds {
    pub fn validate(&self) -> TcoResult<()> {
        self.purchase_cost.validate("purchase_cost")?;
        self.maintenance_repair.validate("maintenance_repair")?;
        self.consumption.validate("consumption")?;
        self.energy_cost.validate("energy_cost")?;
        self.toll_rate.validate("toll_rate")?;
        self.infrastructure.validate("infrastructure")
    }
}

/// Accepted ranges for user-tunable policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBounds {
    pub min_observation_years: Years,
    pub max_observation_years: Years,
    /// Annual mileage range (km).
    pub min_annual_mileage: Decimal,
    pub max_annual_mileage: Decimal,
    /// CO2 price range (EUR per tonne CO2e).
    pub max_co2_price: Money,
    pub overrides: OverrideBounds,
}

impl Default for InputBounds {
    fn default() -> Self {
        Self {
            min_observation_years: 1,
            max_observation_years: 20,
            min_annual_mileage: dec!(10000),
            max_annual_mileage: dec!(300000),
            max_co2_price: dec!(300),
            overrides: OverrideBounds::default(),
        }
    }
}

impl InputBounds {
    /// Deployments limited to a five-year holding period.
    pub fn short_horizon() -> Self {
        Self {
            max_observation_years: 5,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> TcoResult<()> {
        if self.min_observation_years == 0
            || self.min_observation_years > self.max_observation_years
        {
            return Err(TcoError::InvalidInput {
                field: "observation_years bounds".into(),
                reason: format!(
                    "Invalid range {}..={}; minimum must be at least 1 and not above maximum",
                    self.min_observation_years, self.max_observation_years
                ),
            });
        }
        if self.min_annual_mileage < Decimal::ZERO
            || self.min_annual_mileage > self.max_annual_mileage
        {
            return Err(TcoError::InvalidInput {
                field: "annual_mileage bounds".into(),
                reason: "Mileage range must be non-negative and ordered".into(),
            });
        }
        if self.max_co2_price < Decimal::ZERO {
            return Err(TcoError::InvalidInput {
                field: "max_co2_price".into(),
                reason: "Upper CO2 price bound cannot be negative".into(),
            });
        }
        self.overrides.validate()
    }
}

/// Complete calculator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcoConfig {
    pub constants: PhysicalConstants,
    pub bounds: InputBounds,
}

impl TcoConfig {
    pub fn validate(&self) -> TcoResult<()> {
        self.constants.validate()?;
        self.bounds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_emission_factor() {
        let c = PhysicalConstants::default();
        // 2.65 / 9.921 ≈ 0.26711 kg/kWh
        let factor = c.diesel_co2_kg_per_kwh().unwrap();
        assert!((factor - dec!(0.26711)).abs() < dec!(0.00001));
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(TcoConfig::default().validate().is_ok());
        assert!(InputBounds::short_horizon().validate().is_ok());
    }

    #[test]
    fn test_zero_calorific_value_rejected() {
        let c = PhysicalConstants {
            diesel_calorific_value_kwh_per_l: Decimal::ZERO,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_toll_share_above_one_rejected() {
        let c = PhysicalConstants {
            toll_mileage_share: dec!(1.1),
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_inverted_period_bounds_rejected() {
        let b = InputBounds {
            min_observation_years: 10,
            max_observation_years: 5,
            ..Default::default()
        };
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_override_range_check() {
        let bounds = OverrideBounds::default();
        assert!(bounds.purchase_cost.check("purchase_cost", dec!(150000)).is_ok());
        assert!(bounds.purchase_cost.check("purchase_cost", dec!(1000000)).is_ok());
        let err = bounds
            .purchase_cost
            .check("purchase_cost", dec!(1000001))
            .unwrap_err();
        assert!(matches!(err, TcoError::InvalidInput { ref field, .. } if field == "purchase_cost"));
        assert!(bounds.consumption.check("consumption", dec!(-0.1)).is_err());
    }

    #[test]
    fn test_inverted_override_bounds_rejected() {
        let b = InputBounds {
            overrides: OverrideBounds {
                energy_cost: ValueRange::new(dec!(5), dec!(1)),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "constants": { "toll_mileage_share": "0.8" } }"#;
        let cfg: TcoConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.constants.toll_mileage_share, dec!(0.8));
        assert_eq!(cfg.constants.diesel_calorific_value_kwh_per_l, dec!(9.921));
        assert_eq!(cfg.bounds.max_observation_years, 20);
        assert_eq!(cfg.bounds.overrides.energy_cost.max, dec!(10));
    }
}
