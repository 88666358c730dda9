//! Callbacks for external debugging and visualization.

use crate::cell::Cell;

/// Receives notifications during placement.
///
/// Every method has an empty default. Observers only watch; nothing they do
/// can change a placement outcome.
pub trait PlacementObserver {
    /// Called before any cell is placed.
    fn start_placement(&self) {}

    /// Called after placement finishes.
    fn end_placement(&self) {}

    /// Called after a cell has been committed to the grid.
    fn place_instance(&self, _cell: &Cell) {}

    /// Called for every scan band probed by the bin search, with the band's
    /// padded footprint `[x, x_end) x [y, y_end)` in grid units.
    fn bin_search(&self, _cell: &Cell, _x: i32, _y: i32, _x_end: i32, _y_end: i32) {}
}
