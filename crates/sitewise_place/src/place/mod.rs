//! Placement drivers.
//!
//! [`Placer::detailed_placement`] places group members first (see
//! [`groups`]) and then every remaining movable cell in a fixed order,
//! falling back to a shift move when the direct search fails. [`refine`]
//! holds the displacement-driven moves and swaps used inside groups.

mod groups;
mod refine;

use crate::error::{PlaceError, PlaceResult};
use crate::ids::CellId;
use crate::placer::Placer;
use sitewise_common::Point;
use sitewise_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use std::collections::BTreeSet;

impl Placer {
    /// Runs detailed placement.
    ///
    /// Cells that cannot be legalized are recorded in
    /// [`failures`](Placer::failures) and reported as one warning at the
    /// end; the run carries on without them.
    pub fn detailed_placement(&mut self, sink: &DiagnosticSink) -> PlaceResult<()> {
        if let Some(observer) = self.observer() {
            observer.start_placement();
        }
        self.failures.clear();
        if !self.groups.is_empty() {
            self.place_groups(sink)?;
        }
        self.place()?;
        self.report_failures(sink);
        if let Some(observer) = self.observer() {
            observer.end_placement();
        }
        Ok(())
    }

    /// Places every movable, ungrouped cell not yet placed. Multi-row cells
    /// go first.
    fn place(&mut self) -> PlaceResult<()> {
        let mut order = Vec::new();
        for cell in &self.cells {
            if cell.fixed || cell.in_group() || cell.placed {
                continue;
            }
            if !self.grid.cell_fits_in_core(cell) {
                return Err(PlaceError::CellOutsideCore {
                    instance: cell.name.clone(),
                });
            }
            order.push(cell.id);
        }
        self.sort_for_placement(&mut order);

        let (multi, single): (Vec<CellId>, Vec<CellId>) =
            order.into_iter().partition(|&id| self.is_multi_row(id));
        for id in multi.into_iter().chain(single) {
            if !self.cells[id.index()].placed && !self.map_move(id)? {
                self.shift_move(id)?;
            }
        }
        Ok(())
    }

    /// Largest area first, then closest to the core center, then by name.
    pub(crate) fn sort_for_placement(&self, ids: &mut [CellId]) {
        let core = self.grid.core();
        let center = Point::new(core.dx() / 2, core.dy() / 2);
        ids.sort_by(|&a, &b| {
            let (a, b) = (self.cell(a), self.cell(b));
            b.area()
                .cmp(&a.area())
                .then_with(|| {
                    let da = a.location().manhattan(center);
                    let db = b.location().manhattan(center);
                    da.cmp(&db)
                })
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    /// A cell taller than the smallest row.
    pub(crate) fn is_multi_row(&self, id: CellId) -> bool {
        self.cell(id).height > self.grid.row_height()
    }

    /// Searches from the cell's own legal starting point and paints the
    /// result. Returns `false` if no site was found.
    pub(crate) fn map_move(&mut self, id: CellId) -> PlaceResult<bool> {
        let start = self.initial_legal_grid_pt(self.cell(id), true);
        self.map_move_to(id, start)
    }

    /// Searches from padded grid location `start` and paints the result.
    pub(crate) fn map_move_to(&mut self, id: CellId, start: Point) -> PlaceResult<bool> {
        match self.diamond_search(self.cell(id), start.x, start.y) {
            Some(pt) => {
                self.paint(id, pt)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Evicts the movable cells around the cell's starting point, places the
    /// cell, then re-places the evicted cells.
    ///
    /// Only neighbors with the same group membership as the cell are
    /// evicted. Any cell left unplaced is recorded as a failure.
    fn shift_move(&mut self, id: CellId) -> PlaceResult<()> {
        let cell = self.cell(id);
        let start = self.initial_legal_grid_pt(cell, true);
        let margin = self.config.shift.boundary_margin;
        let margin_width = self.grid.grid_padded_width(cell) * margin;
        let key = cell.layer;
        let in_group = cell.in_group();

        let mut around = BTreeSet::new();
        for x in start.x - margin_width..start.x + margin_width {
            for y in start.y - margin..start.y + margin {
                if let Some(other) = self.grid.pixel(key, x, y).and_then(|p| p.cell) {
                    if !self.cells[other.index()].fixed {
                        around.insert(other);
                    }
                }
            }
        }
        let evicted: Vec<CellId> = around
            .into_iter()
            .filter(|&other| self.cell(other).in_group() == in_group)
            .collect();
        for &other in &evicted {
            self.erase(other);
        }

        if !self.map_move(id)? {
            self.failures.push(id);
        }
        for other in evicted {
            if !self.map_move(other)? {
                self.failures.push(other);
            }
        }
        Ok(())
    }

    fn report_failures(&self, sink: &DiagnosticSink) {
        if self.failures.is_empty() {
            return;
        }
        let mut diag = Diagnostic::warning(
            DiagnosticCode::warning(34),
            format!("{} instances could not be placed", self.failures.len()),
        );
        for id in &self.failures {
            diag = diag.with_note(format!("unplaced: {}", self.cell(*id).name));
        }
        sink.emit(diag);
    }
}
