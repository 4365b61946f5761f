//! Loading the bootstrap configuration from disk

use anyhow::{Context, Result};
use capa_iam_bootstrap::ConfigurationSpec;
use std::path::Path;

/// Load a configuration file, or the defaults when no file is given.
///
/// `.toml` files are parsed as TOML; anything else is parsed as JSON.
pub fn load_spec(path: Option<&Path>) -> Result<ConfigurationSpec> {
    let Some(path) = path else {
        log::debug!("No configuration file given, using defaults");
        return Ok(ConfigurationSpec::default());
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    log::debug!("Loaded configuration from {}", path.display());

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML configuration {}", path.display()))
    } else {
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON configuration {}", path.display()))
    }
}
