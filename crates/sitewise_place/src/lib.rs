//! Detailed placement for row-based designs.
//!
//! This crate takes a [`Design`] whose instances sit at approximate (global
//! placement) locations and moves every movable instance onto a legal site:
//! inside the core, aligned to sites and rows, free of overlaps, and inside
//! its group's regions. It then shortens wirelength with moves and swaps
//! that keep the placement legal.
//!
//! # Pipeline
//!
//! 1. **Import**: core-relative cells, groups and nets from the [`Design`]
//! 2. **Grid**: one occupancy layer per row structure, fixed cells painted
//! 3. **Place**: group members by region (bricks when a group is too full),
//!    then every other cell by diamond search, with a shift move fallback
//! 4. **Global swap**: journaled moves/swaps toward each cell's optimal region
//! 5. **Write back**: changed origins only
//!
//! # Usage
//!
//! ```ignore
//! use sitewise_place::place_design;
//!
//! let report = place_design(&mut design, &config, &sink)?;
//! assert!(report.violations.is_empty());
//! ```

#![warn(missing_docs)]

pub mod cell;
pub mod check;
pub mod data;
pub mod detailed;
pub mod error;
pub mod grid;
pub mod ids;
mod import;
mod legalize;
pub mod network;
pub mod observer;
pub mod padding;
mod place;
pub mod placer;
pub mod region;
pub mod report;

pub use cell::{Cell, CellState, Group};
pub use check::Violation;
pub use data::{
    Design, GroupDef, Instance, InstanceKind, NetDef, NetPin, Orient, PatternEntry, Row, Site,
    SiteClass,
};
pub use detailed::{DetailedEngine, GlobalSwapSummary, Journal, JournalAction, SegmentTable};
pub use error::{PlaceError, PlaceResult};
pub use grid::{Grid, LayerKey, PixelPt};
pub use ids::{CellId, GroupId, NetId, PinId, SegmentId, SiteId};
pub use observer::PlacementObserver;
pub use placer::Placer;
pub use report::{DisplacementStats, PlacementReport};

use sitewise_config::{DiagnosticFormat, SitewiseConfig};
use sitewise_diagnostics::{DiagnosticRenderer, DiagnosticSink, JsonRenderer, TerminalRenderer};

/// Runs the complete flow on a design and writes the result back into it.
///
/// Fatal errors are also emitted to `sink` as error diagnostics before they
/// are returned.
pub fn place_design(
    design: &mut Design,
    config: &SitewiseConfig,
    sink: &DiagnosticSink,
) -> PlaceResult<PlacementReport> {
    run(design, config, sink).inspect_err(|err| sink.emit(err.to_diagnostic()))
}

/// Renders every diagnostic collected in `sink` in the format selected by
/// `run.diagnostics`.
pub fn render_diagnostics(sink: &DiagnosticSink, config: &SitewiseConfig) -> String {
    let diags = sink.diagnostics();
    match config.run.diagnostics {
        DiagnosticFormat::Text => TerminalRenderer::new(config.run.color).render_all(&diags),
        DiagnosticFormat::Json => JsonRenderer.render_all(&diags),
    }
}

fn run(
    design: &mut Design,
    config: &SitewiseConfig,
    sink: &DiagnosticSink,
) -> PlaceResult<PlacementReport> {
    let mut placer = Placer::new(design, config)?;
    placer.detailed_placement(sink)?;
    let swaps = placer.optimize_wirelength(sink)?;
    placer.write_back(design);
    Ok(placer.report(&swaps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewise_common::{Point, Rect};

    fn design() -> Design {
        let mut d = Design::new(Rect::new(1000, 2000, 2000, 2500));
        let site = d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(site, 5);
        for i in 0..6 {
            d.add_instance(Instance::std_cell(
                format!("c{i}"),
                site,
                30,
                100,
                Point::new(1400 + i * 7, 2210),
            ));
        }
        d
    }

    #[test]
    fn flow_legalizes_and_writes_back() {
        let mut d = design();
        let sink = DiagnosticSink::new();
        let report = place_design(&mut d, &SitewiseConfig::default(), &sink).unwrap();
        assert_eq!(report.placed, 6);
        assert!(report.failures.is_empty());
        assert!(report.violations.is_empty());
        for inst in &d.instances {
            assert_eq!((inst.location.x - 1000) % 10, 0);
            assert_eq!((inst.location.y - 2000) % 100, 0);
        }
        assert!(!sink.has_errors());
    }

    #[test]
    fn fatal_error_is_also_a_diagnostic() {
        let mut d = design();
        d.instances[0].site = None;
        let sink = DiagnosticSink::new();
        let err = place_design(&mut d, &SitewiseConfig::default(), &sink).unwrap_err();
        assert!(matches!(err, PlaceError::MissingSite { .. }));
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.to_string(), "E219");
        assert_eq!(diags[0].instance.as_deref(), Some("c0"));
    }

    #[test]
    fn collected_diagnostics_render_as_text_or_json() {
        let mut d = design();
        d.instances[0].site = None;
        let sink = DiagnosticSink::new();
        let mut config = SitewiseConfig::default();
        place_design(&mut d, &config, &sink).unwrap_err();

        let text = render_diagnostics(&sink, &config);
        assert!(text.starts_with("error[E219]: "), "{text}");
        assert!(text.contains("  --> instance c0\n"));

        config.run.diagnostics = DiagnosticFormat::Json;
        let json = render_diagnostics(&sink, &config);
        assert_eq!(json.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(json.trim()).unwrap();
        assert_eq!(value["instance"], "c0");
        assert_eq!(value["severity"], "Error");
    }
}
