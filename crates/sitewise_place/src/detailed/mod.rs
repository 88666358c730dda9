//! Journaled move and swap engine for wirelength optimization.
//!
//! A candidate is composed from primitive actions (erase, paint, segment
//! edits) that take effect immediately and are logged in the [`Journal`].
//! Once the candidate is scored the caller either accepts it, which only
//! drops the log, or rejects it, which reverts the log newest action first
//! and leaves grid, segments and cells exactly as they were.

mod global_swap;
pub mod hpwl;
pub mod journal;
pub mod segment;

pub use global_swap::GlobalSwapSummary;
pub use journal::{Journal, JournalAction};
pub use segment::{Segment, SegmentTable};

use crate::cell::Cell;
use crate::error::PlaceResult;
use crate::ids::{CellId, SegmentId};
use crate::placer::Placer;
use hpwl::NetStamps;
use sitewise_common::{div_round, InternalError};
use std::collections::BTreeSet;

/// Move/swap engine borrowing a placer for the duration of an optimization.
pub struct DetailedEngine<'a> {
    placer: &'a mut Placer,
    segments: SegmentTable,
    journal: Journal,
    stamps: NetStamps,
    moves: usize,
    swaps: usize,
}

impl<'a> DetailedEngine<'a> {
    /// Builds the segment table from the placer's current placement.
    pub fn new(placer: &'a mut Placer) -> Self {
        let segments = SegmentTable::build(&placer.grid, &placer.cells);
        let stamps = NetStamps::new(placer.network.net_count());
        Self {
            placer,
            segments,
            journal: Journal::new(),
            stamps,
            moves: 0,
            swaps: 0,
        }
    }

    /// The underlying placer.
    pub fn placer(&self) -> &Placer {
        self.placer
    }

    /// Current segments.
    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    /// The open candidate's log.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Opens a candidate.
    pub fn begin(&mut self) -> PlaceResult<()> {
        self.journal.begin()
    }

    /// Keeps the open candidate and reports the painted cells to the
    /// observer.
    pub fn accept(&mut self) -> PlaceResult<()> {
        if !self.journal.is_open() {
            return Err(InternalError::new("accept without an open candidate").into());
        }
        let painted: BTreeSet<CellId> = self
            .journal
            .close()
            .into_iter()
            .filter(|a| matches!(a, JournalAction::Paint { .. }))
            .map(|a| a.cell())
            .collect();
        if let Some(observer) = self.placer.observer() {
            for id in painted {
                observer.place_instance(self.placer.cell(id));
            }
        }
        Ok(())
    }

    /// Reverts the open candidate.
    pub fn reject(&mut self) -> PlaceResult<()> {
        if !self.journal.is_open() {
            return Err(InternalError::new("reject without an open candidate").into());
        }
        for action in self.journal.close().into_iter().rev() {
            match action {
                JournalAction::Erase { changes, .. } | JournalAction::Paint { changes, .. } => {
                    self.placer.grid.apply_changes(&changes, false);
                }
                JournalAction::SetPosition { cell, before, .. } => {
                    self.placer.cells[cell.index()].restore(before);
                }
                JournalAction::SegmentRemove {
                    cell,
                    segment,
                    index,
                } => self.segments.insert_at(cell, segment, index),
                JournalAction::SegmentInsert { cell, segment, .. } => {
                    self.segments.remove(cell, segment);
                }
            }
        }
        Ok(())
    }

    fn erase(&mut self, id: CellId) -> PlaceResult<()> {
        let placer = &mut *self.placer;
        let before = placer.cells[id.index()].state();
        let changes = placer.grid.erase_pixel(&mut placer.cells, id);
        let after = placer.cells[id.index()].state();
        self.journal.push(JournalAction::Erase { cell: id, changes })?;
        self.journal.push(JournalAction::SetPosition {
            cell: id,
            before,
            after,
        })
    }

    fn paint(&mut self, id: CellId, x: i32, y: i32) -> PlaceResult<()> {
        let placer = &mut *self.placer;
        let before = placer.cells[id.index()].state();
        let changes = match placer.grid.paint_pixel(&mut placer.cells, id, x, y) {
            Ok(changes) => changes,
            Err(err) => {
                self.reject()?;
                return Err(err);
            }
        };
        let after = placer.cells[id.index()].state();
        self.journal.push(JournalAction::Paint { cell: id, changes })?;
        self.journal.push(JournalAction::SetPosition {
            cell: id,
            before,
            after,
        })
    }

    /// Takes a cell out of every segment it sits on.
    fn detach(&mut self, id: CellId) -> PlaceResult<()> {
        for segment in self.segments.of_cell(id).to_vec() {
            if let Some(index) = self.segments.remove(id, segment) {
                self.journal.push(JournalAction::SegmentRemove {
                    cell: id,
                    segment,
                    index,
                })?;
            }
        }
        Ok(())
    }

    fn attach(&mut self, id: CellId, segment: SegmentId) -> PlaceResult<()> {
        let index = self
            .segments
            .insert_sorted(&self.placer.cells, id, segment);
        self.journal.push(JournalAction::SegmentInsert {
            cell: id,
            segment,
            index,
        })
    }

    /// Paints at `(x, y)` if the footprint is legal; otherwise rejects the
    /// candidate.
    fn paint_checked(&mut self, id: CellId, x: i32, y: i32) -> PlaceResult<bool> {
        let cell = self.placer.cell(id);
        let x_end = x + self.placer.grid.grid_padded_width(cell);
        let y_end = y + self.placer.grid.grid_height(cell);
        if !self.placer.check_pixels(cell, x, y, x_end, y_end) {
            self.reject()?;
            return Ok(false);
        }
        self.paint(id, x, y)?;
        Ok(true)
    }

    /// Single-row cell on the reference layer sitting on exactly one
    /// segment.
    fn is_movable_single(&self, id: CellId) -> bool {
        let grid = &self.placer.grid;
        let cell = self.placer.cell(id);
        !cell.fixed
            && cell.placed
            && cell.layer == grid.smallest_layer()
            && grid.grid_height(cell) == 1
            && self.segments.of_cell(id).len() == 1
    }

    /// Padded site column for origin `x`, clamped so the cell fits in `[lo, hi)`.
    fn column_in_gap(&self, id: CellId, x: i32, (lo, hi): (i32, i32)) -> Option<i32> {
        let grid = &self.placer.grid;
        let cell = self.placer.cell(id);
        let width = grid.grid_padded_width(cell);
        if hi - lo < width {
            return None;
        }
        let col = div_round(x, grid.site_width()) - grid.padding().pad_left(cell);
        Some(col.clamp(lo, hi - width))
    }

    /// Moves a cell into the free space of `target` nearest to origin `x`.
    ///
    /// On success the candidate stays open for the caller to score and
    /// accept or reject. On failure nothing is left pending.
    pub fn try_move(&mut self, id: CellId, target: SegmentId, x: i32) -> PlaceResult<bool> {
        if !self.is_movable_single(id) {
            return Ok(false);
        }
        let grid = &self.placer.grid;
        let cell = self.placer.cell(id);
        let center = 2 * x as i64 + cell.width as i64;
        let gap = self
            .segments
            .gap(grid, &self.placer.cells, target, center, &[id]);
        let Some(col) = self.column_in_gap(id, x, gap) else {
            return Ok(false);
        };
        let row = self.segments.segment(target).row;
        if col == grid.grid_padded_x(cell) && row == grid.cell_grid_y(cell) {
            return Ok(false);
        }

        self.begin()?;
        self.erase(id)?;
        self.detach(id)?;
        if !self.paint_checked(id, col, row)? {
            return Ok(false);
        }
        self.attach(id, target)?;
        Ok(true)
    }

    /// Exchanges a cell with the cell of `target` under origin `x`.
    ///
    /// Both cells must be single-row cells of the same height and group.
    /// Each lands in the free space around the other's old spot. The
    /// candidate is left open on success, as for [`try_move`](Self::try_move).
    pub fn try_swap(&mut self, id: CellId, target: SegmentId, x: i32) -> PlaceResult<bool> {
        if !self.is_movable_single(id) {
            return Ok(false);
        }
        let grid = &self.placer.grid;
        let cells = &self.placer.cells;
        let cell = &cells[id.index()];
        let col = div_round(x, grid.site_width()) - grid.padding().pad_left(cell);
        let Some(other) = self.segments.segment(target).cells().iter().copied().find(|&c| {
            let c = &cells[c.index()];
            c.id != id && grid.grid_padded_x(c) <= col && col < grid.grid_padded_end_x(c)
        }) else {
            return Ok(false);
        };
        let partner = &cells[other.index()];
        if !self.is_movable_single(other)
            || partner.layer != cell.layer
            || partner.group != cell.group
            || partner.height != cell.height
        {
            return Ok(false);
        }
        let source = self.segments.of_cell(id)[0];

        let both = [id, other];
        let center = |c: &Cell| 2 * c.x as i64 + c.width as i64;
        let gap_a = self.segments.gap(grid, cells, target, center(partner), &both);
        let gap_b = self.segments.gap(grid, cells, source, center(cell), &both);
        let (Some(col_a), Some(col_b)) = (
            self.column_in_gap(id, partner.x, gap_a),
            self.column_in_gap(other, cell.x, gap_b),
        ) else {
            return Ok(false);
        };
        let row_a = self.segments.segment(target).row;
        let row_b = self.segments.segment(source).row;

        self.begin()?;
        self.erase(id)?;
        self.erase(other)?;
        self.detach(id)?;
        self.detach(other)?;
        if !self.paint_checked(id, col_a, row_a)? || !self.paint_checked(other, col_b, row_b)? {
            return Ok(false);
        }
        self.attach(id, target)?;
        self.attach(other, source)?;
        Ok(true)
    }

    /// Moves accepted so far.
    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Swaps accepted so far.
    pub fn swaps(&self) -> usize {
        self.swaps
    }
}

impl Placer {
    /// Total half-perimeter wirelength at the current locations.
    pub fn hpwl(&self) -> i64 {
        hpwl::total_hpwl(&self.cells, &self.network)
    }

    /// Runs global swap passes over the current placement.
    ///
    /// The placement must be legal; every accepted candidate keeps it legal.
    pub fn optimize_wirelength(
        &mut self,
        sink: &sitewise_diagnostics::DiagnosticSink,
    ) -> PlaceResult<GlobalSwapSummary> {
        DetailedEngine::new(self).global_swap(sink)
    }
}
