pub mod config;
pub mod densify;
pub mod grid;
pub mod pyramid;

use std::path::Path;

use anyhow::{Context, Result};
use densiflow_core::params::FlowConfig;
use tracing::debug;

/// Read a TOML config, or fall back to defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<FlowConfig> {
    let Some(path) = path else {
        return Ok(FlowConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: FlowConfig =
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?;
    debug!(path = %path.display(), ?config, "Loaded config");
    Ok(config)
}
