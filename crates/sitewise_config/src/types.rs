//! Configuration types deserialized from `sitewise.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The top-level placer configuration parsed from `sitewise.toml`.
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SitewiseConfig {
    /// Search limits for the legalizer.
    #[serde(default)]
    pub legalizer: LegalizerConfig,
    /// Default cell padding.
    #[serde(default)]
    pub padding: PaddingConfig,
    /// Group (region) placement tuning.
    #[serde(default)]
    pub groups: GroupConfig,
    /// Shift-move fallback tuning.
    #[serde(default)]
    pub shift: ShiftConfig,
    /// Global swap optimizer tuning.
    #[serde(default)]
    pub global_swap: GlobalSwapConfig,
    /// Run-wide settings.
    #[serde(default)]
    pub run: RunConfig,
    /// Named overlays applied with [`resolve_profile`](crate::resolve_profile).
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileOverlay>,
}

/// Displacement caps and probing parameters for the nearest-site search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegalizerConfig {
    /// Maximum horizontal displacement, in sites.
    pub max_displacement_x: i32,
    /// Maximum vertical displacement, in rows of the smallest layer.
    pub max_displacement_y: i32,
    /// Width of one scan band, in sites.
    pub bin_search_width: i32,
    /// Reject placements that leave a one-site gap next to a neighbor.
    pub disallow_one_site_gaps: bool,
}

impl Default for LegalizerConfig {
    fn default() -> Self {
        Self {
            max_displacement_x: 500,
            max_displacement_y: 100,
            bin_search_width: 10,
            disallow_one_site_gaps: false,
        }
    }
}

/// Padding applied to every movable standard cell, in sites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaddingConfig {
    /// Sites reserved to the left of each cell.
    pub left: i32,
    /// Sites reserved to the right of each cell.
    pub right: i32,
}

/// Tuning for group placement, refinement and random swapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupConfig {
    /// Fraction of the most-displaced group cells revisited by refinement.
    pub refine_percent: f64,
    /// Number of refine plus random-swap rounds.
    pub rounds: u32,
    /// A round stops early when refinement moves fewer cells than this.
    pub min_refine_moves: u32,
    /// A round stops early when random swapping swaps fewer pairs than this.
    pub min_swap_moves: u32,
    /// Random swap attempts per group cell.
    pub swaps_per_cell: u32,
    /// Utilization above which brick placement seeks the global edge.
    pub brick_utilization: f64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            refine_percent: 0.05,
            rounds: 3,
            min_refine_moves: 10,
            min_swap_moves: 100,
            swaps_per_cell: 100,
            brick_utilization: 0.95,
        }
    }
}

/// Tuning for the shift-move fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShiftConfig {
    /// Extra margin around the target, in cell widths and heights, whose
    /// cells are evicted and re-placed.
    pub boundary_margin: i32,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self { boundary_margin: 3 }
    }
}

/// Tuning for the wirelength-driven global swap pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalSwapConfig {
    /// Maximum number of passes.
    pub passes: u32,
    /// Relative improvement below which passes stop.
    pub tolerance: f64,
    /// Nets with at least this many pins are ignored.
    pub skip_nets_larger_than: usize,
}

impl Default for GlobalSwapConfig {
    fn default() -> Self {
        Self {
            passes: 1,
            tolerance: 0.01,
            skip_nets_larger_than: 100,
        }
    }
}

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Seed of the random generator shared by shuffles and random swaps.
    pub seed: u64,
    /// How collected diagnostics are rendered.
    pub diagnostics: DiagnosticFormat,
    /// ANSI colors in text diagnostics.
    pub color: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 777,
            diagnostics: DiagnosticFormat::Text,
            color: false,
        }
    }
}

/// Output format for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticFormat {
    /// Human-readable terminal text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// A named set of overrides; unset fields keep the base configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileOverlay {
    /// Overrides `legalizer.max_displacement_x`.
    pub max_displacement_x: Option<i32>,
    /// Overrides `legalizer.max_displacement_y`.
    pub max_displacement_y: Option<i32>,
    /// Overrides `legalizer.bin_search_width`.
    pub bin_search_width: Option<i32>,
    /// Overrides `legalizer.disallow_one_site_gaps`.
    pub disallow_one_site_gaps: Option<bool>,
    /// Overrides `global_swap.passes`.
    pub passes: Option<u32>,
    /// Overrides `global_swap.tolerance`.
    pub tolerance: Option<f64>,
    /// Overrides `groups.rounds`.
    pub rounds: Option<u32>,
    /// Overrides `run.seed`.
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = SitewiseConfig::default();
        assert_eq!(cfg.legalizer.max_displacement_x, 500);
        assert_eq!(cfg.legalizer.max_displacement_y, 100);
        assert_eq!(cfg.legalizer.bin_search_width, 10);
        assert!(!cfg.legalizer.disallow_one_site_gaps);
        assert_eq!(cfg.groups.rounds, 3);
        assert_eq!(cfg.shift.boundary_margin, 3);
        assert_eq!(cfg.global_swap.passes, 1);
        assert_eq!(cfg.run.seed, 777);
        assert_eq!(cfg.run.diagnostics, DiagnosticFormat::Text);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: SitewiseConfig = toml::from_str("[legalizer]\nbin_search_width = 4\n").unwrap();
        assert_eq!(cfg.legalizer.bin_search_width, 4);
        assert_eq!(cfg.legalizer.max_displacement_x, 500);
    }

    #[test]
    fn diagnostic_format_is_lowercase() {
        let cfg: SitewiseConfig = toml::from_str("[run]\ndiagnostics = \"json\"\n").unwrap();
        assert_eq!(cfg.run.diagnostics, DiagnosticFormat::Json);
        assert!(toml::from_str::<SitewiseConfig>("[run]\ndiagnostics = \"xml\"\n").is_err());
    }
}
