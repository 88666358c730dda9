//! Row patterns: how a layer's rows stack vertically.

use crate::data::Orient;
use crate::ids::SiteId;
use sitewise_common::div_floor;

/// One row of a pattern.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PatternRow {
    /// Site used by the row.
    pub site: SiteId,
    /// Row orientation.
    pub orient: Orient,
    /// Row height in database units.
    pub height: i32,
}

/// Vertical structure of a grid layer.
///
/// A uniform layer repeats one row height. A hybrid layer repeats a sequence
/// of rows of possibly different heights; the parent layer of a hybrid
/// pattern is a hybrid layer with a single (tall) row.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RowPattern {
    /// Every row has the same site and height.
    Uniform(PatternRow),
    /// Rows cycle through the entries.
    Hybrid(Vec<PatternRow>),
}

impl RowPattern {
    /// Entries of one pattern period.
    pub fn entries(&self) -> &[PatternRow] {
        match self {
            RowPattern::Uniform(row) => std::slice::from_ref(row),
            RowPattern::Hybrid(rows) => rows,
        }
    }

    /// Number of rows in one period.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if the pattern has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Returns `true` for hybrid patterns.
    pub fn is_hybrid(&self) -> bool {
        matches!(self, RowPattern::Hybrid(_))
    }

    /// Height of one full period.
    pub fn total_height(&self) -> i32 {
        self.entries().iter().map(|r| r.height).sum()
    }

    /// The pattern row used by grid row `row`.
    pub fn entry_at_row(&self, row: i32) -> &PatternRow {
        let entries = self.entries();
        &entries[row.rem_euclid(entries.len() as i32) as usize]
    }

    /// Site of grid row `row`.
    pub fn site_at_row(&self, row: i32) -> SiteId {
        self.entry_at_row(row).site
    }

    /// Height of grid row `row`.
    pub fn row_height(&self, row: i32) -> i32 {
        self.entry_at_row(row).height
    }

    /// Bottom coordinate of grid row `row`.
    pub fn row_bottom(&self, row: i32) -> i32 {
        let len = self.len() as i32;
        let periods = div_floor(row, len);
        let rest = row.rem_euclid(len) as usize;
        let partial: i32 = self.entries()[..rest].iter().map(|r| r.height).sum();
        periods * self.total_height() + partial
    }

    /// Row containing `y`, rounding down, with that row's bottom coordinate.
    pub fn row_at(&self, y: i32) -> (i32, i32) {
        let total = self.total_height();
        let periods = div_floor(y, total);
        let mut bottom = periods * total;
        let mut index = 0;
        for row in self.entries() {
            if bottom >= y || bottom + row.height > y {
                break;
            }
            bottom += row.height;
            index += 1;
        }
        (periods * self.len() as i32 + index, bottom)
    }

    /// First row boundary at or above `y`, with its coordinate.
    pub fn row_end_at(&self, y: i32) -> (i32, i32) {
        let total = self.total_height();
        let periods = div_floor(y, total);
        let mut top = periods * total;
        let mut index = 0;
        for row in self.entries() {
            if top >= y {
                break;
            }
            top += row.height;
            index += 1;
        }
        (periods * self.len() as i32 + index, top)
    }
}
