//! Profile resolution: overlaying a named profile onto the base settings.

use crate::error::ConfigError;
use crate::loader::{normalize, validate_config};
use crate::types::SitewiseConfig;

/// Returns a copy of `config` with the overrides of profile `name` applied.
///
/// The result is validated again, so a profile cannot introduce values the
/// loader would have rejected.
pub fn resolve_profile(config: &SitewiseConfig, name: &str) -> Result<SitewiseConfig, ConfigError> {
    let overlay = config
        .profiles
        .get(name)
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;

    let mut resolved = config.clone();
    let lg = &mut resolved.legalizer;
    if let Some(v) = overlay.max_displacement_x {
        lg.max_displacement_x = v;
    }
    if let Some(v) = overlay.max_displacement_y {
        lg.max_displacement_y = v;
    }
    if let Some(v) = overlay.bin_search_width {
        lg.bin_search_width = v;
    }
    if let Some(v) = overlay.disallow_one_site_gaps {
        lg.disallow_one_site_gaps = v;
    }
    if let Some(v) = overlay.passes {
        resolved.global_swap.passes = v;
    }
    if let Some(v) = overlay.tolerance {
        resolved.global_swap.tolerance = v;
    }
    if let Some(v) = overlay.rounds {
        resolved.groups.rounds = v;
    }
    if let Some(v) = overlay.seed {
        resolved.run.seed = v;
    }

    validate_config(&resolved)?;
    normalize(&mut resolved);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    const BASE: &str = r#"
[legalizer]
max_displacement_x = 300

[global_swap]
passes = 4

[profiles.fast]
passes = 1
max_displacement_x = 50

[profiles.broken]
bin_search_width = 0
"#;

    #[test]
    fn overlay_replaces_only_set_fields() {
        let config = load_config_from_str(BASE).unwrap();
        let fast = resolve_profile(&config, "fast").unwrap();
        assert_eq!(fast.global_swap.passes, 1);
        assert_eq!(fast.legalizer.max_displacement_x, 50);
        assert_eq!(fast.legalizer.max_displacement_y, 100);
        // base untouched
        assert_eq!(config.global_swap.passes, 4);
    }

    #[test]
    fn unknown_profile_errors() {
        let config = load_config_from_str(BASE).unwrap();
        let err = resolve_profile(&config, "nonexistent").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile(_)));
    }

    #[test]
    fn overlay_is_validated() {
        let config = load_config_from_str(BASE).unwrap();
        let err = resolve_profile(&config, "broken").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
