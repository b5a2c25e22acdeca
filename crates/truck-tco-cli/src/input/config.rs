use tracing::info;

use truck_tco_core::config::TcoConfig;
use truck_tco_core::reference::ReferenceData;

use super::file;

/// Calculator configuration from a YAML file, or the built-in defaults.
pub fn load_config(path: Option<&str>) -> Result<TcoConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => {
            info!(path = p, "loading configuration");
            file::read_yaml::<TcoConfig>(p)?
        }
        None => TcoConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Reference tables from a CSV directory, or the bundled dataset.
pub fn load_reference(dir: Option<&str>) -> Result<ReferenceData, Box<dyn std::error::Error>> {
    match dir {
        Some(d) => {
            let dir = file::resolve_dir(d)?;
            info!(dir = %dir.display(), "loading reference data");
            Ok(ReferenceData::from_csv_dir(dir)?)
        }
        None => Ok(ReferenceData::builtin()?),
    }
}
