//! Baseline reference tables.
//!
//! Five keyed tables feed the cost composition: vehicle cost line items,
//! energy consumption, energy cost, toll rates and the CO2 price path. Every
//! key maps to exactly one row; duplicates are rejected when the tables are
//! built. Rows without a weight class apply to every class, and a row for the
//! requested class takes precedence over the generic one.
//!
//! Tables are read-only once loaded. Lookups never substitute defaults: a
//! missing key is a `TcoError::MissingReference`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TcoError;
use crate::normalize::{ConsumptionRecord, ConsumptionUnit, EnergyCostRecord};
use crate::types::{CostType, ModelYear, Money, Technology, WeightClass};
use crate::TcoResult;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// One line of the vehicle cost table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleCostRow {
    pub technology: Technology,
    pub year: ModelYear,
    #[serde(default)]
    pub weight_class: Option<WeightClass>,
    pub cost_type: CostType,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Money,
    /// Whether `amount` is an annual figure.
    pub recurring: bool,
}

/// One line of the energy consumption table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRow {
    pub technology: Technology,
    pub year: ModelYear,
    #[serde(default)]
    pub weight_class: Option<WeightClass>,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    pub unit: ConsumptionUnit,
}

/// One line of the energy cost table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyCostRow {
    pub technology: Technology,
    pub year: ModelYear,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    pub unit: crate::normalize::EnergyCostUnit,
}

/// One line of the toll table (EUR per tolled km).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TollRow {
    pub technology: Technology,
    pub year: ModelYear,
    #[serde(default)]
    pub weight_class: Option<WeightClass>,
    #[serde(with = "rust_decimal::serde::str")]
    pub rate_per_km: Money,
}

/// One line of the CO2 price path (EUR per tonne CO2e).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Co2PriceRow {
    pub year: ModelYear,
    #[serde(with = "rust_decimal::serde::str")]
    pub price_per_tonne: Money,
}

/// Row-oriented form of the reference data, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTables {
    pub vehicle_cost: Vec<VehicleCostRow>,
    pub energy_consumption: Vec<ConsumptionRow>,
    pub energy_cost: Vec<EnergyCostRow>,
    pub toll: Vec<TollRow>,
    pub co2_price: Vec<Co2PriceRow>,
}

/// Amount and recurrence of a vehicle cost line item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleCostEntry {
    pub amount: Money,
    pub recurring: bool,
}

type VehicleCostKey = (Technology, ModelYear, Option<WeightClass>, CostType);
type ClassKey = (Technology, ModelYear, Option<WeightClass>);

// ---------------------------------------------------------------------------
// Keyed reference data
// ---------------------------------------------------------------------------

/// Keyed, validated reference tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReferenceTables", into = "ReferenceTables")]
pub struct ReferenceData {
    vehicle_cost: BTreeMap<VehicleCostKey, VehicleCostEntry>,
    consumption: BTreeMap<ClassKey, ConsumptionRow>,
    energy_cost: BTreeMap<(Technology, ModelYear), EnergyCostRow>,
    toll: BTreeMap<ClassKey, Money>,
    co2_price: BTreeMap<ModelYear, Money>,
}

fn insert_unique<K: Ord, V>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    table: &str,
    describe: impl FnOnce() -> String,
) -> TcoResult<()> {
    if map.contains_key(&key) {
        return Err(TcoError::DuplicateReference {
            table: table.into(),
            key: describe(),
        });
    }
    map.insert(key, value);
    Ok(())
}

fn require_non_negative(
    value: Decimal,
    table: &str,
    key: impl FnOnce() -> String,
) -> TcoResult<()> {
    if value < Decimal::ZERO {
        return Err(TcoError::InvalidInput {
            field: format!("{table} {}", key()),
            reason: "Reference values cannot be negative".into(),
        });
    }
    Ok(())
}

fn describe_class(tech: Technology, year: ModelYear, class: Option<WeightClass>) -> String {
    match class {
        Some(w) => format!("{tech} / {year} / {w}"),
        None => format!("{tech} / {year} / any weight class"),
    }
}

impl ReferenceData {
    /// Build keyed tables from rows, rejecting duplicate keys and negative values.
    pub fn from_tables(tables: ReferenceTables) -> TcoResult<Self> {
        let mut data = ReferenceData::default();

        for row in tables.vehicle_cost {
            let describe = || {
                format!(
                    "{} / {}",
                    describe_class(row.technology, row.year, row.weight_class),
                    row.cost_type
                )
            };
            require_non_negative(row.amount, "vehicle_cost", describe)?;
            if row.recurring != row.cost_type.is_recurring() {
                return Err(TcoError::InvalidInput {
                    field: format!("vehicle_cost {}", describe()),
                    reason: format!(
                        "{} must be flagged recurring = {}",
                        row.cost_type,
                        row.cost_type.is_recurring()
                    ),
                });
            }
            insert_unique(
                &mut data.vehicle_cost,
                (row.technology, row.year, row.weight_class, row.cost_type),
                VehicleCostEntry {
                    amount: row.amount,
                    recurring: row.recurring,
                },
                "vehicle_cost",
                describe,
            )?;
        }

        for row in tables.energy_consumption {
            let describe = || describe_class(row.technology, row.year, row.weight_class);
            require_non_negative(row.value, "energy_consumption", describe)?;
            insert_unique(
                &mut data.consumption,
                (row.technology, row.year, row.weight_class),
                row.clone(),
                "energy_consumption",
                describe,
            )?;
        }

        for row in tables.energy_cost {
            let describe = || format!("{} / {}", row.technology, row.year);
            require_non_negative(row.value, "energy_cost", describe)?;
            insert_unique(
                &mut data.energy_cost,
                (row.technology, row.year),
                row.clone(),
                "energy_cost",
                describe,
            )?;
        }

        for row in tables.toll {
            let describe = || describe_class(row.technology, row.year, row.weight_class);
            require_non_negative(row.rate_per_km, "toll", describe)?;
            insert_unique(
                &mut data.toll,
                (row.technology, row.year, row.weight_class),
                row.rate_per_km,
                "toll",
                describe,
            )?;
        }

        for row in tables.co2_price {
            let describe = || row.year.to_string();
            require_non_negative(row.price_per_tonne, "co2_price", describe)?;
            insert_unique(
                &mut data.co2_price,
                row.year,
                row.price_per_tonne,
                "co2_price",
                describe,
            )?;
        }

        debug!(
            vehicle_cost = data.vehicle_cost.len(),
            energy_consumption = data.consumption.len(),
            energy_cost = data.energy_cost.len(),
            toll = data.toll.len(),
            co2_price = data.co2_price.len(),
            "reference tables built"
        );
        Ok(data)
    }

    /// Flatten back into rows (sorted by key).
    pub fn to_tables(&self) -> ReferenceTables {
        ReferenceTables {
            vehicle_cost: self
                .vehicle_cost
                .iter()
                .map(|(&(technology, year, weight_class, cost_type), e)| VehicleCostRow {
                    technology,
                    year,
                    weight_class,
                    cost_type,
                    amount: e.amount,
                    recurring: e.recurring,
                })
                .collect(),
            energy_consumption: self.consumption.values().cloned().collect(),
            energy_cost: self.energy_cost.values().cloned().collect(),
            toll: self
                .toll
                .iter()
                .map(|(&(technology, year, weight_class), &rate_per_km)| TollRow {
                    technology,
                    year,
                    weight_class,
                    rate_per_km,
                })
                .collect(),
            co2_price: self
                .co2_price
                .iter()
                .map(|(&year, &price_per_tonne)| Co2PriceRow {
                    year,
                    price_per_tonne,
                })
                .collect(),
        }
    }

    /// Rows that apply to one year and weight class, for display.
    pub fn snapshot(&self, year: ModelYear, weight_class: WeightClass) -> ReferenceTables {
        let applies =
            |y: ModelYear, w: Option<WeightClass>| y == year && w.map_or(true, |w| w == weight_class);
        let all = self.to_tables();
        ReferenceTables {
            vehicle_cost: all
                .vehicle_cost
                .into_iter()
                .filter(|r| applies(r.year, r.weight_class))
                .collect(),
            energy_consumption: all
                .energy_consumption
                .into_iter()
                .filter(|r| applies(r.year, r.weight_class))
                .collect(),
            energy_cost: all
                .energy_cost
                .into_iter()
                .filter(|r| r.year == year)
                .collect(),
            toll: all
                .toll
                .into_iter()
                .filter(|r| applies(r.year, r.weight_class))
                .collect(),
            co2_price: all.co2_price.into_iter().filter(|r| r.year == year).collect(),
        }
    }

    // -- lookups -------------------------------------------------------------

    pub fn vehicle_cost(
        &self,
        technology: Technology,
        year: ModelYear,
        weight_class: WeightClass,
        cost_type: CostType,
    ) -> TcoResult<VehicleCostEntry> {
        self.vehicle_cost
            .get(&(technology, year, Some(weight_class), cost_type))
            .or_else(|| self.vehicle_cost.get(&(technology, year, None, cost_type)))
            .copied()
            .ok_or_else(|| TcoError::MissingReference {
                table: "vehicle_cost".into(),
                key: format!("{technology} / {year} / {weight_class} / {cost_type}"),
            })
    }

    pub fn consumption(
        &self,
        technology: Technology,
        year: ModelYear,
        weight_class: WeightClass,
    ) -> TcoResult<ConsumptionRecord> {
        self.consumption
            .get(&(technology, year, Some(weight_class)))
            .or_else(|| self.consumption.get(&(technology, year, None)))
            .map(|row| ConsumptionRecord {
                technology,
                year,
                value: row.value,
                unit: row.unit,
            })
            .ok_or_else(|| TcoError::MissingReference {
                table: "energy_consumption".into(),
                key: format!("{technology} / {year} / {weight_class}"),
            })
    }

    pub fn energy_cost(&self, technology: Technology, year: ModelYear) -> TcoResult<EnergyCostRecord> {
        self.energy_cost
            .get(&(technology, year))
            .map(|row| EnergyCostRecord {
                technology,
                year,
                value: row.value,
                unit: row.unit,
            })
            .ok_or_else(|| TcoError::MissingReference {
                table: "energy_cost".into(),
                key: format!("{technology} / {year}"),
            })
    }

    pub fn toll_rate(
        &self,
        technology: Technology,
        year: ModelYear,
        weight_class: WeightClass,
    ) -> TcoResult<Money> {
        self.toll
            .get(&(technology, year, Some(weight_class)))
            .or_else(|| self.toll.get(&(technology, year, None)))
            .copied()
            .ok_or_else(|| TcoError::MissingReference {
                table: "toll".into(),
                key: format!("{technology} / {year} / {weight_class}"),
            })
    }

    pub fn co2_price(&self, year: ModelYear) -> TcoResult<Money> {
        self.co2_price
            .get(&year)
            .copied()
            .ok_or_else(|| TcoError::MissingReference {
                table: "co2_price".into(),
                key: year.to_string(),
            })
    }
}

impl TryFrom<ReferenceTables> for ReferenceData {
    type Error = TcoError;

    fn try_from(tables: ReferenceTables) -> Result<Self, Self::Error> {
        ReferenceData::from_tables(tables)
    }
}

impl From<ReferenceData> for ReferenceTables {
    fn from(data: ReferenceData) -> Self {
        data.to_tables()
    }
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

#[cfg(feature = "csv")]
mod csv_loader {
    use std::io::Read;
    use std::path::Path;

    use serde::de::DeserializeOwned;
    use tracing::debug;

    use super::{ReferenceData, ReferenceTables};
    use crate::error::TcoError;
    use crate::TcoResult;

    pub const VEHICLE_COST_FILE: &str = "vehicle_cost.csv";
    pub const ENERGY_CONSUMPTION_FILE: &str = "energy_consumption.csv";
    pub const ENERGY_COST_FILE: &str = "energy_cost.csv";
    pub const TOLL_FILE: &str = "toll.csv";
    pub const CO2_PRICE_FILE: &str = "co2_price.csv";

    const BUILTIN_VEHICLE_COST: &str = include_str!("../data/vehicle_cost.csv");
    const BUILTIN_ENERGY_CONSUMPTION: &str = include_str!("../data/energy_consumption.csv");
    const BUILTIN_ENERGY_COST: &str = include_str!("../data/energy_cost.csv");
    const BUILTIN_TOLL: &str = include_str!("../data/toll.csv");
    const BUILTIN_CO2_PRICE: &str = include_str!("../data/co2_price.csv");

    fn read_rows<T: DeserializeOwned, R: Read>(reader: R, table: &str) -> TcoResult<Vec<T>> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);
        let mut rows = Vec::new();
        for (i, record) in rdr.deserialize().enumerate() {
            let row: T = record.map_err(|e| {
                TcoError::ReferenceData(format!("{table}, data row {}: {e}", i + 1))
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    impl ReferenceData {
        /// Parse the five tables from CSV sources.
        pub fn from_csv_readers<R1, R2, R3, R4, R5>(
            vehicle_cost: R1,
            energy_consumption: R2,
            energy_cost: R3,
            toll: R4,
            co2_price: R5,
        ) -> TcoResult<Self>
        where
            R1: Read,
            R2: Read,
            R3: Read,
            R4: Read,
            R5: Read,
        {
            let tables = ReferenceTables {
                vehicle_cost: read_rows(vehicle_cost, "vehicle_cost")?,
                energy_consumption: read_rows(energy_consumption, "energy_consumption")?,
                energy_cost: read_rows(energy_cost, "energy_cost")?,
                toll: read_rows(toll, "toll")?,
                co2_price: read_rows(co2_price, "co2_price")?,
            };
            ReferenceData::from_tables(tables)
        }

        /// Load a directory holding one CSV file per table.
        pub fn from_csv_dir(dir: impl AsRef<Path>) -> TcoResult<Self> {
            let dir = dir.as_ref();
            let open = |name: &str| {
                let path = dir.join(name);
                std::fs::File::open(&path).map_err(|e| {
                    TcoError::ReferenceData(format!("Failed to open '{}': {e}", path.display()))
                })
            };
            debug!(dir = %dir.display(), "loading reference tables");
            ReferenceData::from_csv_readers(
                open(VEHICLE_COST_FILE)?,
                open(ENERGY_CONSUMPTION_FILE)?,
                open(ENERGY_COST_FILE)?,
                open(TOLL_FILE)?,
                open(CO2_PRICE_FILE)?,
            )
        }

        /// Sample dataset for long-haul, regional and urban trucks shipped with the crate.
        pub fn builtin() -> TcoResult<Self> {
            ReferenceData::from_csv_readers(
                BUILTIN_VEHICLE_COST.as_bytes(),
                BUILTIN_ENERGY_CONSUMPTION.as_bytes(),
                BUILTIN_ENERGY_COST.as_bytes(),
                BUILTIN_TOLL.as_bytes(),
                BUILTIN_CO2_PRICE.as_bytes(),
            )
        }
    }
}

#[cfg(feature = "csv")]
pub use csv_loader::{
    CO2_PRICE_FILE, ENERGY_CONSUMPTION_FILE, ENERGY_COST_FILE, TOLL_FILE, VEHICLE_COST_FILE,
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
