//! Configuration file loading and validation.

use std::path::Path;

use crate::error::ConfigError;
use crate::types::TechConfig;

/// Name of the configuration file looked up in a run directory.
pub const CONFIG_FILE: &str = "techlib.toml";

/// Loads and validates `techlib.toml` from a run directory.
pub fn load_config(dir: &Path) -> Result<TechConfig, ConfigError> {
    load_config_from_path(&dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_from_path(path: &Path) -> Result<TechConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<TechConfig, ConfigError> {
    let config: TechConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates value ranges and cross-field consistency.
fn validate_config(config: &TechConfig) -> Result<(), ConfigError> {
    if !(config.run.clock_period_ns > 0.0) {
        return Err(ConfigError::out_of_range(
            "run.clock_period_ns",
            format!("must be positive, got {}", config.run.clock_period_ns),
        ));
    }
    if config.run.workers == 0 {
        return Err(ConfigError::out_of_range("run.workers", "must be at least 1"));
    }
    if config.backend.timeout_secs == 0 {
        return Err(ConfigError::out_of_range("backend.timeout_secs", "must be at least 1"));
    }
    let device = &config.device;
    if device.dsp_x_sizes.len() != device.dsp_y_sizes.len() {
        return Err(ConfigError::UnpairedDspTables {
            x: device.dsp_x_sizes.len(),
            y: device.dsp_y_sizes.len(),
        });
    }
    if device.bram_bitsize_max == 0 {
        return Err(ConfigError::out_of_range("device.bram_bitsize_max", "must be positive"));
    }

    let spec = &config.specialization;
    if spec.concrete_widths.is_empty() {
        return Err(ConfigError::Empty("specialization.concrete_widths"));
    }
    if spec.template_widths.iter().chain(&spec.concrete_widths).any(|&w| w == 0) {
        return Err(ConfigError::out_of_range(
            "specialization",
            "widths must be positive",
        ));
    }
    if spec.characterizing_constant.parse::<u64>().is_err() {
        return Err(ConfigError::out_of_range(
            "specialization.characterizing_constant",
            format!("'{}' is not an unsigned 64-bit value", spec.characterizing_constant),
        ));
    }

    if config.correction.baseline_cell.is_empty() {
        return Err(ConfigError::Empty("correction.baseline_cell"));
    }
    if config.correction.relative_connection_offset < 0.0 {
        return Err(ConfigError::out_of_range(
            "correction.relative_connection_offset",
            "must not be negative",
        ));
    }
    Ok(())
}
