use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;

use truck_tco_core::config::TcoConfig;
use truck_tco_core::normalize::{ConsumptionRecord, ElectricityPriceOverride, EnergyCostRecord};
use truck_tco_core::pipeline::TcoRequest;
use truck_tco_core::reference::ReferenceData;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: DeserializeOwned>(json: &str) -> NapiResult<T> {
    serde_json::from_str(json).map_err(to_napi_error)
}

/// Parse an optional JSON config, falling back to defaults.
fn parse_config(config_json: Option<String>) -> NapiResult<TcoConfig> {
    let config = match config_json {
        Some(json) => parse::<TcoConfig>(&json)?,
        None => TcoConfig::default(),
    };
    config.validate().map_err(to_napi_error)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// TCO
// ---------------------------------------------------------------------------

/// Compute a cost breakdown against the bundled reference dataset.
#[napi]
pub fn compute_tco(request_json: String, config_json: Option<String>) -> NapiResult<String> {
    let request: TcoRequest = parse(&request_json)?;
    let config = parse_config(config_json)?;
    let reference = ReferenceData::builtin().map_err(to_napi_error)?;
    let output = truck_tco_core::pipeline::compute(&reference, &config, &request)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Compute a cost breakdown against caller-supplied reference tables.
///
/// `reference_json` holds the five tables as arrays of rows, with decimal
/// amounts as strings.
#[napi]
pub fn compute_tco_with_reference(
    request_json: String,
    reference_json: String,
    config_json: Option<String>,
) -> NapiResult<String> {
    let request: TcoRequest = parse(&request_json)?;
    let reference: ReferenceData = parse(&reference_json)?;
    let config = parse_config(config_json)?;
    let output = truck_tco_core::pipeline::compute(&reference, &config, &request)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

#[napi]
pub fn normalize_consumption(
    record_json: String,
    config_json: Option<String>,
) -> NapiResult<String> {
    let record: ConsumptionRecord = parse(&record_json)?;
    let config = parse_config(config_json)?;
    let output = truck_tco_core::normalize::normalize_consumption(&record, &config.constants)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn normalize_energy_cost(
    record_json: String,
    override_json: Option<String>,
    config_json: Option<String>,
) -> NapiResult<String> {
    let record: EnergyCostRecord = parse(&record_json)?;
    let electricity_override: Option<ElectricityPriceOverride> =
        override_json.as_deref().map(parse::<ElectricityPriceOverride>).transpose()?;
    let config = parse_config(config_json)?;
    let output = truck_tco_core::normalize::normalize_energy_cost(
        &record,
        &config.constants,
        electricity_override.as_ref(),
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
