use std::borrow::Cow;

use solar_econ_core::tariff::schedule::RateTable;

use super::file;

/// The built-in table, or the validated table in `path` when given.
pub fn load_rate_table(path: Option<&str>) -> Result<Cow<'static, RateTable>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(Cow::Borrowed(RateTable::standard()));
    };
    let (canonical, contents) = file::read_text(path)?;
    let table = RateTable::from_json(&contents)
        .map_err(|e| format!("Invalid rate table '{}': {}", canonical.display(), e))?;
    tracing::debug!(path = %canonical.display(), "loaded rate table");
    Ok(Cow::Owned(table))
}
