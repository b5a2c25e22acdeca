use clap::{Args, ValueEnum};
use serde_json::{json, Value};

use truck_tco_core::{ModelYear, WeightClass};

use crate::input;

#[derive(Debug, Clone, ValueEnum)]
pub enum ReferenceTable {
    VehicleCost,
    EnergyConsumption,
    EnergyCost,
    Toll,
    Co2Price,
}

/// Arguments for printing reference data
#[derive(Args)]
pub struct ReferenceArgs {
    /// Scenario year
    #[arg(long, default_value = "2025")]
    pub year: ModelYear,

    /// Weight class in metric tons
    #[arg(long, default_value = "40")]
    pub weight_class: WeightClass,

    /// Print a single table instead of all five
    #[arg(long)]
    pub table: Option<ReferenceTable>,

    /// Directory with reference CSV tables (bundled dataset if omitted)
    #[arg(long)]
    pub reference: Option<String>,
}

pub fn run_reference(args: ReferenceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let reference = input::config::load_reference(args.reference.as_deref())?;
    let snapshot = reference.snapshot(args.year, args.weight_class);

    let value = match args.table {
        None => json!({ "result": snapshot }),
        Some(ReferenceTable::VehicleCost) => json!({ "results": snapshot.vehicle_cost }),
        Some(ReferenceTable::EnergyConsumption) => {
            json!({ "results": snapshot.energy_consumption })
        }
        Some(ReferenceTable::EnergyCost) => json!({ "results": snapshot.energy_cost }),
        Some(ReferenceTable::Toll) => json!({ "results": snapshot.toll }),
        Some(ReferenceTable::Co2Price) => json!({ "results": snapshot.co2_price }),
    };
    Ok(value)
}
