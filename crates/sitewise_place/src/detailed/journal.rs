//! Reversible log of the mutations that make up one candidate move.

use crate::cell::CellState;
use crate::error::{PlaceError, PlaceResult};
use crate::grid::PixelChange;
use crate::ids::{CellId, SegmentId};
use sitewise_common::{InternalError, Point};
use std::collections::BTreeMap;

/// One recorded mutation. Each variant carries what is needed to revert it.
#[derive(Clone, Debug, PartialEq)]
pub enum JournalAction {
    /// Pixels released by erasing a cell.
    Erase {
        /// Erased cell.
        cell: CellId,
        /// Pixel changes made by the erase.
        changes: Vec<PixelChange>,
    },
    /// Pixels claimed by painting a cell.
    Paint {
        /// Painted cell.
        cell: CellId,
        /// Pixel changes made by the paint.
        changes: Vec<PixelChange>,
    },
    /// A change of a cell's placement state.
    SetPosition {
        /// Cell whose state changed.
        cell: CellId,
        /// State before the change.
        before: CellState,
        /// State after the change.
        after: CellState,
    },
    /// A cell taken out of a segment.
    SegmentRemove {
        /// Removed cell.
        cell: CellId,
        /// Segment it was removed from.
        segment: SegmentId,
        /// Position it held in the segment.
        index: usize,
    },
    /// A cell added to a segment.
    SegmentInsert {
        /// Inserted cell.
        cell: CellId,
        /// Segment it was added to.
        segment: SegmentId,
        /// Position it was inserted at.
        index: usize,
    },
}

impl JournalAction {
    /// The cell the action applies to.
    pub fn cell(&self) -> CellId {
        match self {
            JournalAction::Erase { cell, .. }
            | JournalAction::Paint { cell, .. }
            | JournalAction::SetPosition { cell, .. }
            | JournalAction::SegmentRemove { cell, .. }
            | JournalAction::SegmentInsert { cell, .. } => *cell,
        }
    }
}

/// The action log of the candidate currently being composed.
///
/// At most one candidate is open at a time. It ends by being accepted
/// (the log is dropped) or rejected (the caller reverts the log, newest
/// action first).
#[derive(Debug, Default)]
pub struct Journal {
    actions: Vec<JournalAction>,
    open: bool,
}

impl Journal {
    /// Creates an empty, closed journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new candidate.
    ///
    /// Fails with [`PlaceError::PendingTransaction`] if the previous
    /// candidate was neither accepted nor rejected.
    pub fn begin(&mut self) -> PlaceResult<()> {
        if self.open || !self.actions.is_empty() {
            return Err(PlaceError::PendingTransaction);
        }
        self.open = true;
        Ok(())
    }

    /// Returns `true` while a candidate is being composed.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Records an action of the open candidate.
    pub fn push(&mut self, action: JournalAction) -> PlaceResult<()> {
        if !self.open {
            return Err(InternalError::new(format!(
                "journal action for cell {} outside a candidate",
                action.cell()
            ))
            .into());
        }
        self.actions.push(action);
        Ok(())
    }

    /// Recorded actions, oldest first.
    pub fn actions(&self) -> &[JournalAction] {
        &self.actions
    }

    /// Number of recorded actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Location each touched cell had before the candidate started.
    pub fn original_positions(&self) -> BTreeMap<CellId, Point> {
        let mut positions = BTreeMap::new();
        for action in &self.actions {
            if let JournalAction::SetPosition { cell, before, .. } = action {
                positions
                    .entry(*cell)
                    .or_insert(Point::new(before.x, before.y));
            }
        }
        positions
    }

    /// Closes the candidate and hands back its actions.
    pub(crate) fn close(&mut self) -> Vec<JournalAction> {
        self.open = false;
        std::mem::take(&mut self.actions)
    }
}
