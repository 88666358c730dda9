//! Fatal placement errors and their diagnostic codes.

use sitewise_common::InternalError;
use sitewise_diagnostics::{Diagnostic, DiagnosticCode};

/// Result type for fallible placement operations.
pub type PlaceResult<T> = Result<T, PlaceError>;

/// Conditions that abort a placement run.
///
/// Ordinary negative outcomes (no site found, a move that does not improve)
/// are not errors; they are reported as `Option`/`bool`.
#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    /// The design has no usable rows.
    #[error("no rows found")]
    NoRows,

    /// Hybrid and non-hybrid rows appear in the same design.
    #[error("mixing hybrid and non-hybrid rows is unsupported")]
    MixedHybridRows,

    /// No layer could be chosen as the reference layer.
    #[error("cannot find a non-hybrid grid to use for placement")]
    NoNonHybridLayer,

    /// A movable instance cannot fit inside the row area at any position.
    #[error("instance {instance} does not fit inside the ROW core area")]
    CellOutsideCore {
        /// Instance name.
        instance: String,
    },

    /// A standard cell has no site.
    #[error("instance {instance} has no site")]
    MissingSite {
        /// Instance name.
        instance: String,
    },

    /// A standard cell's site is not used by any row.
    #[error("instance {instance} with height {height} is taller than any row")]
    CellTallerThanRows {
        /// Instance name.
        instance: String,
        /// Instance height in database units.
        height: i32,
    },

    /// A paint would overwrite another cell.
    #[error("cannot paint instance {instance}: grid is already occupied by {other}")]
    PaintOccupied {
        /// Instance being painted.
        instance: String,
        /// Instance already occupying the pixel.
        other: String,
    },

    /// A paint would overwrite a cell that lives on another layer.
    #[error("cannot paint instance {instance}: layer {layer} is already occupied by {other}")]
    LayerOccupied {
        /// Instance being painted.
        instance: String,
        /// Instance already occupying the pixel.
        other: String,
        /// Index of the occupied layer.
        layer: usize,
    },

    /// A candidate move was started while another one was still open.
    #[error("a candidate move was started before the previous one was accepted or rejected")]
    PendingTransaction,

    /// An internal invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl PlaceError {
    /// Returns the diagnostic code reported for this error.
    pub fn code(&self) -> DiagnosticCode {
        let number = match self {
            PlaceError::NoRows => 12,
            PlaceError::MixedHybridRows => 49,
            PlaceError::NoNonHybridLayer => 128,
            PlaceError::CellOutsideCore { .. } => 15,
            PlaceError::MissingSite { .. } => 219,
            PlaceError::CellTallerThanRows { .. } => 44,
            PlaceError::PaintOccupied { .. } => 13,
            PlaceError::LayerOccupied { .. } => 41,
            PlaceError::PendingTransaction => 100,
            PlaceError::Internal(_) => 999,
        };
        DiagnosticCode::error(number)
    }

    /// Converts the error into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            PlaceError::CellOutsideCore { instance }
            | PlaceError::MissingSite { instance }
            | PlaceError::CellTallerThanRows { instance, .. }
            | PlaceError::PaintOccupied { instance, .. }
            | PlaceError::LayerOccupied { instance, .. } => diag.with_instance(instance.clone()),
            _ => diag,
        }
    }
}
