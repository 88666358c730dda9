//! Site padding around movable standard cells.

use crate::cell::Cell;

/// Left/right padding in sites.
///
/// Applies to movable standard cells only. An instance override replaces the
/// global default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Padding {
    left: i32,
    right: i32,
}

impl Padding {
    /// Creates a padding with the given global default.
    pub fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    fn pads(&self, cell: &Cell) -> (i32, i32) {
        if cell.fixed || !cell.is_std_cell() {
            return (0, 0);
        }
        cell.pad_override.unwrap_or((self.left, self.right))
    }

    /// Padding to the left of `cell`, in sites.
    pub fn pad_left(&self, cell: &Cell) -> i32 {
        self.pads(cell).0
    }

    /// Padding to the right of `cell`, in sites.
    pub fn pad_right(&self, cell: &Cell) -> i32 {
        self.pads(cell).1
    }

    /// Width of `cell` including padding, in database units.
    pub fn padded_width(&self, cell: &Cell, site_width: i32) -> i32 {
        let (l, r) = self.pads(cell);
        cell.width + (l + r) * site_width
    }
}
