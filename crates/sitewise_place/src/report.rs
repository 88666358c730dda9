//! End-of-run placement summary.

use crate::check::Violation;
use crate::detailed::GlobalSwapSummary;
use crate::placer::Placer;
use serde::Serialize;

/// Displacement from the initial locations, in database units.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DisplacementStats {
    /// Sum of horizontal displacements.
    pub total_x: i64,
    /// Sum of vertical displacements.
    pub total_y: i64,
    /// Largest horizontal displacement.
    pub max_x: i64,
    /// Largest vertical displacement.
    pub max_y: i64,
}

/// What a placement run did.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlacementReport {
    /// Movable cells placed.
    pub placed: usize,
    /// Names of the cells that could not be placed.
    pub failures: Vec<String>,
    /// Displacement of the placed movable cells.
    pub displacement: DisplacementStats,
    /// Wirelength before wirelength optimization.
    pub hpwl_before: i64,
    /// Wirelength at the end of the run.
    pub hpwl_after: i64,
    /// Accepted global moves.
    pub moves: usize,
    /// Accepted global swaps.
    pub swaps: usize,
    /// Legality problems found in the final placement.
    pub violations: Vec<Violation>,
}

impl Placer {
    /// Displacement statistics over the placed movable cells.
    pub fn displacement_stats(&self) -> DisplacementStats {
        let mut stats = DisplacementStats::default();
        for cell in self.cells.iter().filter(|c| c.placed && !c.fixed) {
            let dx = (cell.x as i64 - cell.init.x as i64).abs();
            let dy = (cell.y as i64 - cell.init.y as i64).abs();
            stats.total_x += dx;
            stats.total_y += dy;
            stats.max_x = stats.max_x.max(dx);
            stats.max_y = stats.max_y.max(dy);
        }
        stats
    }

    /// Builds the run report from the current state.
    pub fn report(&self, swaps: &GlobalSwapSummary) -> PlacementReport {
        PlacementReport {
            placed: self.cells.iter().filter(|c| c.placed && !c.fixed).count(),
            failures: self.failures.iter().map(|&id| self.cell(id).name.clone()).collect(),
            displacement: self.displacement_stats(),
            hpwl_before: swaps.hpwl_before,
            hpwl_after: self.hpwl(),
            moves: swaps.moves,
            swaps: swaps.swaps,
            violations: self.check_placement(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Design, Instance, Site};
    use crate::ids::SiteId;
    use sitewise_common::{Point, Rect};
    use sitewise_config::SitewiseConfig;
    use sitewise_diagnostics::DiagnosticSink;

    const SITE: SiteId = SiteId::from_raw(0);

    #[test]
    fn stats_sum_and_max_per_axis() {
        let mut d = Design::new(Rect::new(0, 0, 1000, 300));
        d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(SITE, 3);
        for name in ["a", "b"] {
            d.add_instance(Instance::std_cell(name, SITE, 20, 100, Point::new(400, 100)));
        }
        let mut placer = Placer::new(&d, &SitewiseConfig::default()).unwrap();
        placer.detailed_placement(&DiagnosticSink::new()).unwrap();

        let stats = placer.displacement_stats();
        let dx: Vec<i64> = placer.cells().iter().map(|c| (c.x - c.init.x).abs() as i64).collect();
        let dy: Vec<i64> = placer.cells().iter().map(|c| (c.y - c.init.y).abs() as i64).collect();
        assert_eq!(stats.total_x, dx.iter().sum::<i64>());
        assert_eq!(stats.total_y, dy.iter().sum::<i64>());
        assert_eq!(stats.max_x, dx.iter().copied().max().unwrap());
        assert_eq!(stats.max_y, dy.iter().copied().max().unwrap());
        assert!(stats.total_x + stats.total_y > 0);

        let report = placer.report(&GlobalSwapSummary::default());
        assert_eq!(report.placed, 2);
        assert!(report.failures.is_empty());
        assert!(report.violations.is_empty());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["placed"], 2);
    }
}
