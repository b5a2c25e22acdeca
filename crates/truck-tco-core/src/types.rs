use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TcoError;
use crate::TcoResult;

/// All monetary values (EUR). Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.8 = 80%). Never as percentages.
pub type Rate = Decimal;

/// Holding period length in whole years.
pub type Years = u32;

// ---------------------------------------------------------------------------
// Technology
// ---------------------------------------------------------------------------

/// Truck drivetrain technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Technology {
    /// Internal combustion engine running on diesel. The subsidy baseline.
    #[serde(rename = "ICEV")]
    Icev,
    /// Battery-electric.
    #[serde(rename = "BEV")]
    Bev,
    /// Hydrogen fuel-cell.
    #[serde(rename = "FCEV")]
    Fcev,
    /// Battery-electric with overhead catenary infrastructure.
    #[serde(rename = "OC-BEV")]
    OcBev,
}

impl Technology {
    pub const ALL: [Technology; 4] = [
        Technology::Icev,
        Technology::Bev,
        Technology::Fcev,
        Technology::OcBev,
    ];

    /// The combustion technology every subsidy gap is measured against.
    pub const BASELINE: Technology = Technology::Icev;

    pub fn code(&self) -> &'static str {
        match self {
            Technology::Icev => "ICEV",
            Technology::Bev => "BEV",
            Technology::Fcev => "FCEV",
            Technology::OcBev => "OC-BEV",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Technology::Icev => "Internal combustion engine w/ Diesel (ICEV)",
            Technology::Bev => "Battery-electric (BEV)",
            Technology::Fcev => "Fuel-cell (FCEV)",
            Technology::OcBev => "Battery electric w/ overhead catenary infrastructure (OC-BEV)",
        }
    }

    pub fn is_baseline(&self) -> bool {
        *self == Self::BASELINE
    }

    /// Technologies charged from the grid, eligible for a country electricity price.
    pub fn uses_grid_electricity(&self) -> bool {
        matches!(self, Technology::Bev | Technology::OcBev)
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Technology {
    type Err = TcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('_', "-").as_str() {
            "ICEV" => Ok(Technology::Icev),
            "BEV" => Ok(Technology::Bev),
            "FCEV" => Ok(Technology::Fcev),
            "OC-BEV" | "OCBEV" => Ok(Technology::OcBev),
            _ => Err(TcoError::InvalidInput {
                field: "technology".into(),
                reason: format!("Unknown technology '{s}'. Expected one of: ICEV, BEV, FCEV, OC-BEV"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Weight class and year
// ---------------------------------------------------------------------------

/// Gross vehicle weight class in metric tons.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum WeightClass {
    T10,
    T20,
    #[default]
    T40,
}

impl WeightClass {
    pub const ALL: [WeightClass; 3] = [WeightClass::T10, WeightClass::T20, WeightClass::T40];

    pub fn tons(&self) -> u32 {
        match self {
            WeightClass::T10 => 10,
            WeightClass::T20 => 20,
            WeightClass::T40 => 40,
        }
    }
}

impl TryFrom<u32> for WeightClass {
    type Error = TcoError;

    fn try_from(tons: u32) -> Result<Self, Self::Error> {
        match tons {
            10 => Ok(WeightClass::T10),
            20 => Ok(WeightClass::T20),
            40 => Ok(WeightClass::T40),
            _ => Err(TcoError::InvalidInput {
                field: "weight_class".into(),
                reason: format!("Unsupported weight class {tons} t. Expected 10, 20 or 40"),
            }),
        }
    }
}

impl From<WeightClass> for u32 {
    fn from(w: WeightClass) -> Self {
        w.tons()
    }
}

impl fmt::Display for WeightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} t", self.tons())
    }
}

impl FromStr for WeightClass {
    type Err = TcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('t').trim();
        let tons: u32 = trimmed.parse().map_err(|_| TcoError::InvalidInput {
            field: "weight_class".into(),
            reason: format!("'{s}' is not a weight in metric tons"),
        })?;
        WeightClass::try_from(tons)
    }
}

/// One of the preset scenario years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ModelYear(u32);

impl ModelYear {
    pub const PRESETS: [u32; 5] = [2020, 2025, 2030, 2040, 2050];

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = ModelYear> {
        Self::PRESETS.into_iter().map(ModelYear)
    }
}

impl Default for ModelYear {
    fn default() -> Self {
        ModelYear(2025)
    }
}

impl TryFrom<u32> for ModelYear {
    type Error = TcoError;

    fn try_from(year: u32) -> Result<Self, Self::Error> {
        if Self::PRESETS.contains(&year) {
            Ok(ModelYear(year))
        } else {
            Err(TcoError::InvalidInput {
                field: "year".into(),
                reason: format!("Year {year} is not a preset. Expected one of: {:?}", Self::PRESETS),
            })
        }
    }
}

impl From<ModelYear> for u32 {
    fn from(y: ModelYear) -> Self {
        y.0
    }
}

impl fmt::Display for ModelYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModelYear {
    type Err = TcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let year: u32 = s.trim().parse().map_err(|_| TcoError::InvalidInput {
            field: "year".into(),
            reason: format!("'{s}' is not a year"),
        })?;
        ModelYear::try_from(year)
    }
}

// ---------------------------------------------------------------------------
// Cost types
// ---------------------------------------------------------------------------

/// Line item category of a technology's cost of ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostType {
    #[serde(alias = "Purchase cost")]
    PurchaseCost,
    #[serde(alias = "Maintenance & repair")]
    MaintenanceRepair,
    #[serde(alias = "Fuel")]
    FuelOrElectricity,
    #[serde(rename = "co2_price", alias = "CO2 price")]
    Co2Price,
    #[serde(alias = "Toll")]
    Toll,
    #[serde(alias = "Infrastructure")]
    Infrastructure,
    /// Signed correction already absorbed into purchase and infrastructure cost.
    #[serde(alias = "Subsidy")]
    Subsidy,
}

impl CostType {
    pub fn label(&self) -> &'static str {
        match self {
            CostType::PurchaseCost => "Purchase cost",
            CostType::MaintenanceRepair => "Maintenance & repair",
            CostType::FuelOrElectricity => "Fuel / electricity",
            CostType::Co2Price => "CO2 price",
            CostType::Toll => "Toll",
            CostType::Infrastructure => "Infrastructure",
            CostType::Subsidy => "Subsidy",
        }
    }

    /// Whether the composed amount is an annual figure.
    pub fn is_recurring(&self) -> bool {
        !matches!(self, CostType::PurchaseCost | CostType::Subsidy)
    }

    /// Whether the amount counts towards the technology's total.
    pub fn counts_towards_total(&self) -> bool {
        *self != CostType::Subsidy
    }
}

impl fmt::Display for CostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Checked arithmetic
// ---------------------------------------------------------------------------

/// `a * b`, or `ArithmeticOverflow` naming `context`.
pub(crate) fn mul(a: Decimal, b: Decimal, context: &str) -> TcoResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(context))
}

/// `a / b`; a zero divisor is reported as overflow too.
pub(crate) fn div(a: Decimal, b: Decimal, context: &str) -> TcoResult<Decimal> {
    a.checked_div(b).ok_or_else(|| overflow(context))
}

pub(crate) fn add(a: Decimal, b: Decimal, context: &str) -> TcoResult<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(context))
}

pub(crate) fn sub(a: Decimal, b: Decimal, context: &str) -> TcoResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| overflow(context))
}

fn overflow(context: &str) -> TcoError {
    TcoError::ArithmeticOverflow {
        context: context.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Output envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
