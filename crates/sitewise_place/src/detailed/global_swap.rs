//! Global swap: moves each cell toward the optimal region of its nets.

use super::hpwl::{hpwl_delta, total_hpwl};
use super::DetailedEngine;
use crate::error::PlaceResult;
use crate::ids::CellId;
use rand::seq::SliceRandom;
use sitewise_common::div_floor;
use sitewise_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

/// Outcome of [`DetailedEngine::global_swap`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalSwapSummary {
    /// Passes run.
    pub passes: u32,
    /// Total wirelength before the first pass.
    pub hpwl_before: i64,
    /// Total wirelength after the last pass.
    pub hpwl_after: i64,
    /// Accepted moves.
    pub moves: usize,
    /// Accepted swaps.
    pub swaps: usize,
}

/// Target box `[x_min, x_max] x [y_min, y_max]` for a cell origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Range {
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
}

/// Clips `[lo, hi]` to the reach `[reach_lo, reach_hi]` around `at`. When the
/// two do not meet, the result spans from `at` to the reach edge facing the
/// range.
fn clip(lo: i32, hi: i32, at: i32, reach_lo: i32, reach_hi: i32) -> (i32, i32) {
    if reach_hi <= lo {
        (at, reach_hi)
    } else if reach_lo >= hi {
        (reach_lo, at)
    } else {
        (lo.max(reach_lo), hi.min(reach_hi))
    }
}

impl DetailedEngine<'_> {
    /// Runs global swap passes until the configured pass count is reached or
    /// a pass improves wirelength by less than the tolerance.
    ///
    /// Emits one N306 note per pass and an N307 summary.
    pub fn global_swap(&mut self, sink: &DiagnosticSink) -> PlaceResult<GlobalSwapSummary> {
        let config = self.placer.config.global_swap.clone();
        let passes = config.passes.max(1);
        let tolerance = config.tolerance.max(0.01);
        let start = self.wirelength();

        let mut summary = GlobalSwapSummary {
            hpwl_before: start,
            hpwl_after: start,
            ..Default::default()
        };
        for pass in 1..=passes {
            let last = summary.hpwl_after;
            self.global_swap_pass(config.skip_nets_larger_than)?;
            let curr = self.wirelength();
            summary.passes = pass;
            summary.hpwl_after = curr;
            sink.emit(Diagnostic::note(
                DiagnosticCode::note(306),
                format!("Pass {pass:3} of global swaps; hpwl is {:.6e}", curr as f64),
            ));
            if last == 0 || (curr - last).abs() as f64 / last as f64 <= tolerance {
                break;
            }
        }

        let end = summary.hpwl_after;
        let improvement = if start == 0 {
            0.0
        } else {
            (start - end) as f64 / start as f64 * 100.0
        };
        sink.emit(Diagnostic::note(
            DiagnosticCode::note(307),
            format!(
                "End of global swaps; objective is {:.6e}, improvement is {improvement:.2} percent",
                end as f64
            ),
        ));
        summary.moves = self.moves;
        summary.swaps = self.swaps;
        Ok(summary)
    }

    fn wirelength(&self) -> i64 {
        total_hpwl(&self.placer.cells, &self.placer.network)
    }

    fn global_swap_pass(&mut self, skip: usize) -> PlaceResult<()> {
        self.segments.resort(&self.placer.cells);
        let grid = &self.placer.grid;
        let key = grid.smallest_layer();
        let mut candidates: Vec<CellId> = self
            .placer
            .cells
            .iter()
            .filter(|c| !c.fixed && c.placed && c.layer == key && grid.grid_height(c) == 1)
            .map(|c| c.id)
            .collect();
        candidates.shuffle(&mut self.placer.rng);

        for id in candidates {
            let Some(kind) = self.generate(id, skip)? else {
                continue;
            };
            let original = self.journal.original_positions();
            let (before, after) = hpwl_delta(
                &self.placer.cells,
                &self.placer.network,
                &mut self.stamps,
                &original,
                skip,
            );
            if after <= before {
                self.accept()?;
                match kind {
                    CandidateKind::Move => self.moves += 1,
                    CandidateKind::Swap => self.swaps += 1,
                }
            } else {
                self.reject()?;
            }
        }
        Ok(())
    }

    /// Composes a candidate moving `id` into its optimal region, trying a
    /// move before a swap. The candidate is left open.
    fn generate(&mut self, id: CellId, skip: usize) -> PlaceResult<Option<CandidateKind>> {
        let Some(range) = self.optimal_range(id, skip) else {
            return Ok(None);
        };
        let grid = &self.placer.grid;
        let cell = self.placer.cell(id);
        let (x, y) = (cell.x, cell.y);
        if (range.x_min..=range.x_max).contains(&x) && (range.y_min..=range.y_max).contains(&y) {
            return Ok(None);
        }

        let legalizer = &self.placer.config.legalizer;
        let reach_x = legalizer.max_displacement_x * grid.site_width();
        let reach_y = legalizer.max_displacement_y * grid.row_height();
        let (x_min, x_max) = clip(range.x_min, range.x_max, x, x - reach_x, x + reach_x);
        let (y_min, y_max) = clip(range.y_min, range.y_max, y, y - reach_y, y + reach_y);

        if self.segments.of_cell(id).len() != 1 {
            return Ok(None);
        }
        let xj = div_floor(x_min + x_max, 2);
        let yj = div_floor(y_min + y_max, 2);
        let row = self.closest_row(yj);
        let Some(target) = self.segments.at(row, grid.grid_x(xj)) else {
            return Ok(None);
        };
        if self.segments.segment(target).group != cell.group {
            return Ok(None);
        }

        if self.try_move(id, target, xj)? {
            return Ok(Some(CandidateKind::Move));
        }
        if self.try_swap(id, target, xj)? {
            return Ok(Some(CandidateKind::Swap));
        }
        Ok(None)
    }

    /// Reference-layer row whose bottom is nearest to `y`.
    fn closest_row(&self, y: i32) -> i32 {
        let info = self.placer.grid.info(self.placer.grid.smallest_layer());
        let (row, bottom) = info.pattern.row_at(y);
        let next = info.pattern.row_bottom(row + 1);
        let row = if next - y < y - bottom { row + 1 } else { row };
        row.clamp(0, (info.row_count - 1).max(0))
    }

    /// Box of origins that minimizes the wirelength of the cell's nets.
    ///
    /// Each net contributes the box of its other pins, shifted by this pin's
    /// offset and clamped to the core. The result spans the two median
    /// edges. Nets with one pin or more than `skip` pins are ignored.
    fn optimal_range(&self, id: CellId, skip: usize) -> Option<Range> {
        let network = &self.placer.network;
        let cells = &self.placer.cells;
        let core = self.placer.grid.core();
        let (width, height) = (core.dx(), core.dy());

        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for &pin in network.cell_pins(id) {
            let own = network.pin(pin);
            let pins = &network.net(own.net).pins;
            if pins.len() <= 1 || pins.len() > skip {
                continue;
            }
            let mut others = pins.iter().filter(|&&p| p != pin).map(|&p| {
                let p = network.pin(p);
                let at = cells[p.cell.index()].location();
                (at.x + p.offset.x, at.y + p.offset.y)
            });
            let Some((x0, y0)) = others.next() else {
                continue;
            };
            let (mut lx, mut hx, mut ly, mut hy) = (x0, x0, y0, y0);
            for (px, py) in others {
                lx = lx.min(px);
                hx = hx.max(px);
                ly = ly.min(py);
                hy = hy.max(py);
            }
            let clamp_x = |v: i32| (v - own.offset.x).clamp(0, width);
            let clamp_y = |v: i32| (v - own.offset.y).clamp(0, height);
            xs.extend([clamp_x(lx), clamp_x(hx)]);
            ys.extend([clamp_y(ly), clamp_y(hy)]);
        }
        if xs.is_empty() {
            return None;
        }
        xs.sort_unstable();
        ys.sort_unstable();
        let mid = xs.len() / 2;
        Some(Range {
            x_min: xs[mid - 1],
            x_max: xs[mid],
            y_min: ys[mid - 1],
            y_max: ys[mid],
        })
    }
}

/// What the open candidate did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CandidateKind {
    Move,
    Swap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Design, Instance, NetDef, NetPin, Site};
    use crate::grid::PixelPt;
    use crate::ids::SiteId;
    use crate::placer::Placer;
    use sitewise_common::{Point, Rect};
    use sitewise_config::SitewiseConfig;

    const SITE: SiteId = SiteId::from_raw(0);

    #[test]
    fn clip_follows_the_reach() {
        assert_eq!(clip(800, 900, 0, -50, 50), (0, 50));
        assert_eq!(clip(-900, -800, 0, -50, 50), (-50, 0));
        assert_eq!(clip(-10, 900, 0, -50, 50), (-10, 50));
    }

    /// `a` starts at the left edge; its two nets pull it toward fixed
    /// anchors at x = 800 and x = 900.
    fn pulled() -> (Placer, CellId) {
        let mut d = Design::new(Rect::new(0, 0, 1000, 300));
        d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(SITE, 3);
        let a = d.add_instance(Instance::std_cell("a", SITE, 10, 100, Point::new(0, 0)));
        let mut anchors = Vec::new();
        for (name, x) in [("f1", 800), ("f2", 900)] {
            let mut inst = Instance::std_cell(name, SITE, 10, 100, Point::new(x, 0));
            inst.fixed = true;
            anchors.push(d.add_instance(inst));
        }
        for (i, &anchor) in anchors.iter().enumerate() {
            d.add_net(NetDef {
                name: format!("n{i}"),
                pins: vec![
                    NetPin { instance: a, offset: Point::new(0, 0) },
                    NetPin { instance: anchor, offset: Point::new(0, 0) },
                ],
            });
        }
        let mut cfg = SitewiseConfig::default();
        cfg.global_swap.passes = 3;
        let mut placer = Placer::new(&d, &cfg).unwrap();
        let key = placer.grid().smallest_layer();
        placer.paint(a, PixelPt { layer: key, x: 0, y: 0 }).unwrap();
        (placer, a)
    }

    #[test]
    fn range_spans_the_median_edges() {
        let (mut placer, a) = pulled();
        let engine = DetailedEngine::new(&mut placer);
        let range = engine.optimal_range(a, 100).unwrap();
        assert_eq!(
            range,
            Range {
                x_min: 800,
                x_max: 900,
                y_min: 0,
                y_max: 0
            }
        );
        assert_eq!(engine.optimal_range(a, 1), None);
    }

    #[test]
    fn cell_moves_between_its_anchors() {
        let (mut placer, a) = pulled();
        let sink = DiagnosticSink::new();
        let summary = placer.optimize_wirelength(&sink).unwrap();

        assert_eq!(placer.cell(a).location(), Point::new(850, 0));
        assert_eq!(summary.hpwl_before, 1700);
        assert_eq!(summary.hpwl_after, 100);
        assert_eq!(summary.moves, 1);
        assert_eq!(summary.swaps, 0);
        assert_eq!(summary.passes, 2);
        assert!(placer.check_placement().is_empty());

        let codes: Vec<String> = sink
            .diagnostics()
            .iter()
            .map(|d| d.code.to_string())
            .collect();
        assert_eq!(codes, ["N306", "N306", "N307"]);
        let last = sink.diagnostics().pop().unwrap();
        assert!(last.message.contains("improvement is 94.12 percent"));
    }

    #[test]
    fn wirelength_never_increases_across_passes() {
        let mut d = Design::new(Rect::new(0, 0, 500, 300));
        d.add_site(Site::core("core", 10, 100));
        d.add_uniform_rows(SITE, 3);
        let ids: Vec<CellId> = (0..12)
            .map(|i| {
                d.add_instance(Instance::std_cell(
                    format!("c{i}"),
                    SITE,
                    20,
                    100,
                    Point::new((i % 4) * 120, (i / 4) * 100),
                ))
            })
            .collect();
        for i in 0..12 {
            d.add_net(NetDef {
                name: format!("n{i}"),
                pins: vec![
                    NetPin { instance: ids[i], offset: Point::new(5, 50) },
                    NetPin { instance: ids[(i * 7 + 3) % 12], offset: Point::new(15, 50) },
                    NetPin { instance: ids[(i * 5 + 1) % 12], offset: Point::new(0, 0) },
                ],
            });
        }
        let mut cfg = SitewiseConfig::default();
        cfg.global_swap.passes = 4;
        let mut placer = Placer::new(&d, &cfg).unwrap();
        placer.detailed_placement(&DiagnosticSink::new()).unwrap();
        assert!(placer.check_placement().is_empty());

        let sink = DiagnosticSink::new();
        let before = placer.hpwl();
        let summary = placer.optimize_wirelength(&sink).unwrap();
        assert_eq!(summary.hpwl_before, before);
        assert!(summary.hpwl_after <= before);
        assert_eq!(summary.hpwl_after, placer.hpwl());
        assert!(placer.check_placement().is_empty());
        assert!(placer.cells().iter().all(|c| c.placed));
    }
}
