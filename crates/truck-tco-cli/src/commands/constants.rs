use clap::Args;
use serde_json::{json, Value};

use crate::input;

/// Arguments for printing the active configuration
#[derive(Args)]
pub struct ConstantsArgs {
    /// Path to YAML configuration (defaults apply to anything it omits)
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_constants(args: ConstantsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = input::config::load_config(args.config.as_deref())?;
    let emission_factor = config.constants.diesel_co2_kg_per_kwh()?;
    Ok(json!({
        "result": {
            "diesel_co2_kg_per_kwh": emission_factor,
            "constants": config.constants,
            "bounds": config.bounds,
        }
    }))
}
