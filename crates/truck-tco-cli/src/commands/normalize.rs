use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use truck_tco_core::normalize::{
    normalize_consumption, normalize_energy_cost, ConsumptionRecord, ConsumptionUnit,
    ElectricityPriceOverride, EnergyCostRecord, EnergyCostUnit,
};
use truck_tco_core::{with_metadata, ModelYear, Technology};

use crate::input;

/// Arguments for unit normalisation
#[derive(Args)]
pub struct NormalizeArgs {
    /// Technology the values belong to
    #[arg(long)]
    pub technology: Technology,

    /// Scenario year
    #[arg(long, default_value = "2025")]
    pub year: ModelYear,

    /// Energy consumption value
    #[arg(long)]
    pub consumption: Option<Decimal>,

    /// Unit of --consumption (kWh/km, kWh/100km, l/100km, kg H2/100km)
    #[arg(long)]
    pub consumption_unit: Option<ConsumptionUnit>,

    /// Energy price value
    #[arg(long)]
    pub energy_cost: Option<Decimal>,

    /// Unit of --energy-cost (€/kWh, €/l Diesel, €/kg H2; "eur" works for "€")
    #[arg(long)]
    pub energy_cost_unit: Option<EnergyCostUnit>,

    /// Electricity price in EUR/kWh replacing --energy-cost for BEV and OC-BEV
    #[arg(long)]
    pub electricity_price: Option<Decimal>,

    /// Path to YAML configuration (physical constants)
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Debug, Serialize)]
struct NormalizeOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    consumption: Option<Converted<ConsumptionRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy_cost: Option<Converted<EnergyCostRecord>>,
}

#[derive(Debug, Serialize)]
struct Converted<T> {
    input: T,
    normalized: T,
}

/// Unit a technology is usually quoted in.
fn native_consumption_unit(technology: Technology) -> ConsumptionUnit {
    match technology {
        Technology::Icev => ConsumptionUnit::LitersDieselPer100Km,
        Technology::Fcev => ConsumptionUnit::KgH2Per100Km,
        Technology::Bev | Technology::OcBev => ConsumptionUnit::KwhPerKm,
    }
}

fn native_energy_cost_unit(technology: Technology) -> EnergyCostUnit {
    match technology {
        Technology::Icev => EnergyCostUnit::EurPerLiterDiesel,
        Technology::Fcev => EnergyCostUnit::EurPerKgH2,
        Technology::Bev | Technology::OcBev => EnergyCostUnit::EurPerKwh,
    }
}

pub fn run_normalize(args: NormalizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let config = input::config::load_config(args.config.as_deref())?;
    let constants = &config.constants;
    let mut warnings = Vec::new();

    if args.consumption.is_none() && args.energy_cost.is_none() {
        return Err("Provide --consumption and/or --energy-cost".into());
    }

    let consumption = match args.consumption {
        Some(value) => {
            let record = ConsumptionRecord {
                technology: args.technology,
                year: args.year,
                value,
                unit: args
                    .consumption_unit
                    .unwrap_or_else(|| native_consumption_unit(args.technology)),
            };
            Some(Converted {
                normalized: normalize_consumption(&record, constants)?,
                input: record,
            })
        }
        None => None,
    };

    let electricity_override = args.electricity_price.map(|price_per_kwh| ElectricityPriceOverride {
        country: "custom".into(),
        price_per_kwh,
    });
    if electricity_override.is_some() && !args.technology.uses_grid_electricity() {
        warnings.push(format!(
            "Electricity price ignored; {} is not grid-charged",
            args.technology
        ));
    }

    let energy_cost = match args.energy_cost {
        Some(value) => {
            let record = EnergyCostRecord {
                technology: args.technology,
                year: args.year,
                value,
                unit: args
                    .energy_cost_unit
                    .unwrap_or_else(|| native_energy_cost_unit(args.technology)),
            };
            let normalized =
                normalize_energy_cost(&record, constants, electricity_override.as_ref())?;
            Some(Converted {
                input: record,
                normalized,
            })
        }
        None => None,
    };

    let output = NormalizeOutput {
        consumption,
        energy_cost,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    let result = with_metadata(
        "Unit normalisation to kWh/km and EUR/kWh",
        constants,
        warnings,
        elapsed,
        output,
    );
    Ok(serde_json::to_value(result)?)
}
