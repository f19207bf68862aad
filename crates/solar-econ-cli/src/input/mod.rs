pub mod file;
pub mod rates;
pub mod stdin;

use serde::de::DeserializeOwned;
use solar_econ_core::SolarEconError;

/// Resolve a command's input from `--input`, then piped stdin.
pub fn read_input<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_json(path)?));
    }
    match stdin::read_stdin()? {
        Some(data) => Ok(Some(serde_json::from_value(data).map_err(SolarEconError::from)?)),
        None => Ok(None),
    }
}
