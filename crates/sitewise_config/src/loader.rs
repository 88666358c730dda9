//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SitewiseConfig;
use std::path::Path;

/// The configuration file name looked up in a run directory.
pub const CONFIG_FILE: &str = "sitewise.toml";

/// Loads and validates `sitewise.toml` from a run directory.
pub fn load_config(dir: &Path) -> Result<SitewiseConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `sitewise.toml` configuration from a string.
///
/// Global swap passes are raised to at least 1 and the tolerance to at
/// least 0.01.
pub fn load_config_from_str(content: &str) -> Result<SitewiseConfig, ConfigError> {
    let mut config: SitewiseConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    normalize(&mut config);
    Ok(config)
}

pub(crate) fn normalize(config: &mut SitewiseConfig) {
    config.global_swap.passes = config.global_swap.passes.max(1);
    config.global_swap.tolerance = config.global_swap.tolerance.max(0.01);
}

/// Rejects values the placer cannot work with.
pub(crate) fn validate_config(config: &SitewiseConfig) -> Result<(), ConfigError> {
    let lg = &config.legalizer;
    if lg.max_displacement_x <= 0 || lg.max_displacement_y <= 0 {
        return Err(ConfigError::ValidationError(
            "displacement limits must be positive".to_string(),
        ));
    }
    if lg.bin_search_width <= 0 {
        return Err(ConfigError::ValidationError(
            "bin_search_width must be positive".to_string(),
        ));
    }
    if config.padding.left < 0 || config.padding.right < 0 {
        return Err(ConfigError::ValidationError(
            "padding must not be negative".to_string(),
        ));
    }
    for (name, value) in [
        ("groups.refine_percent", config.groups.refine_percent),
        ("groups.brick_utilization", config.groups.brick_utilization),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be in (0, 1], got {value}"
            )));
        }
    }
    if config.shift.boundary_margin < 0 {
        return Err(ConfigError::ValidationError(
            "shift.boundary_margin must not be negative".to_string(),
        ));
    }
    if config.global_swap.tolerance < 0.0 {
        return Err(ConfigError::ValidationError(
            "global_swap.tolerance must not be negative".to_string(),
        ));
    }
    Ok(())
}
