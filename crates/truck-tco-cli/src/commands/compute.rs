use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use truck_tco_core::normalize::ElectricityPriceOverride;
use truck_tco_core::pipeline::{self, TcoRequest};
use truck_tco_core::{ModelYear, Technology, WeightClass};

use crate::input;

/// Arguments for a TCO comparison
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ComputeArgs {
    /// Technologies to compare, in display order (e.g. BEV,FCEV,ICEV)
    #[arg(long, value_delimiter = ',')]
    pub technologies: Vec<Technology>,

    /// Scenario year (2020, 2025, 2030, 2040 or 2050)
    #[arg(long)]
    pub year: Option<ModelYear>,

    /// Weight class in metric tons (10, 20 or 40)
    #[arg(long)]
    pub weight_class: Option<WeightClass>,

    /// CO2 price in EUR per tonne CO2e (reference path for the year if omitted)
    #[arg(long)]
    pub co2_price: Option<Decimal>,

    /// Share of the extra CAPEX over diesel that is subsidised (e.g. 0.8)
    #[arg(long)]
    pub subsidy_rate: Option<Decimal>,

    /// Observation period in years
    #[arg(long)]
    pub years: Option<u32>,

    /// Residual value as a share of the purchase price (e.g. 0.1)
    #[arg(long)]
    pub residual_value: Option<Decimal>,

    /// Annual mileage in km
    #[arg(long)]
    pub mileage: Option<Decimal>,

    /// Electricity price in EUR/kWh replacing the table price for BEV and OC-BEV
    #[arg(long)]
    pub electricity_price: Option<Decimal>,

    /// Country or market the electricity price comes from
    #[arg(long, default_value = "custom")]
    pub country: String,

    /// Override a reference value, e.g. BEV.purchase_cost=150000 (repeatable)
    #[arg(long = "set", value_name = "TECH.FIELD=VALUE")]
    pub overrides: Vec<String>,

    /// Directory with reference CSV tables (bundled dataset if omitted)
    #[arg(long)]
    pub reference: Option<String>,

    /// Path to YAML configuration (constants and input bounds)
    #[arg(long)]
    pub config: Option<String>,

    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_compute(args: ComputeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = input::config::load_config(args.config.as_deref())?;
    let reference = input::config::load_reference(args.reference.as_deref())?;

    let request: TcoRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(request) = input::stdin::read_stdin::<TcoRequest>()? {
        request
    } else {
        request_from_flags(&args)?
    };
    debug!(technologies = ?request.technologies, year = %request.year, "running compute");

    let result = pipeline::compute(&reference, &config, &request)?;
    Ok(serde_json::to_value(result)?)
}

fn request_from_flags(args: &ComputeArgs) -> Result<TcoRequest, Box<dyn std::error::Error>> {
    let mut request = TcoRequest::default();
    if !args.technologies.is_empty() {
        request.technologies = args.technologies.clone();
    }
    if let Some(year) = args.year {
        request.year = year;
    }
    if let Some(class) = args.weight_class {
        request.weight_class = class;
    }

    let policy = &mut request.policy;
    if args.co2_price.is_some() {
        policy.co2_price_per_tonne = args.co2_price;
    }
    if let Some(rate) = args.subsidy_rate {
        policy.subsidy_rate = rate;
    }
    if let Some(years) = args.years {
        policy.observation_years = years;
    }
    if let Some(residual) = args.residual_value {
        policy.residual_value = residual;
    }
    if let Some(mileage) = args.mileage {
        policy.annual_mileage = mileage;
    }

    if let Some(price) = args.electricity_price {
        request.electricity_override = Some(ElectricityPriceOverride {
            country: args.country.clone(),
            price_per_kwh: price,
        });
    }

    for assignment in &args.overrides {
        apply_override(&mut request, assignment)?;
    }
    Ok(request)
}

/// Apply one `TECH.field=value` override to the request's assumptions.
fn apply_override(request: &mut TcoRequest, assignment: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (target, value) = assignment
        .split_once('=')
        .ok_or_else(|| format!("Override '{assignment}' must look like TECH.field=value"))?;
    let (tech, field) = target
        .split_once('.')
        .ok_or_else(|| format!("Override '{assignment}' must name a technology and a field"))?;

    let technology: Technology = tech.parse()?;
    let value: Decimal = value
        .trim()
        .parse()
        .map_err(|e| format!("Override '{assignment}': {e}"))?;

    let assumptions = request.assumptions.entry(technology).or_default();
    let slot = match field.trim() {
        "purchase_cost" => &mut assumptions.purchase_cost,
        "maintenance_repair" => &mut assumptions.maintenance_repair,
        "consumption" => &mut assumptions.consumption,
        "energy_cost" => &mut assumptions.energy_cost,
        "toll_rate" => &mut assumptions.toll_rate,
        "infrastructure" => &mut assumptions.infrastructure,
        other => {
            return Err(format!(
                "Unknown override field '{other}'. Expected one of: purchase_cost, \
                 maintenance_repair, consumption, energy_cost, toll_rate, infrastructure"
            )
            .into())
        }
    };
    *slot = Some(value);
    Ok(())
}
