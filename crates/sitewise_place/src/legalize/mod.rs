//! Nearest-legal-site search.
//!
//! [`point`] turns a desired location into a legal starting point (inside
//! the core, on a site and row, off macros and hopeless pixels). [`search`]
//! then finds the closest free footprint around that point with a diamond
//! of bin searches.

mod point;
mod search;

/// Grid-unit bounds of one diamond search, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SearchWindow {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl SearchWindow {
    fn contains_x(&self, x: i32) -> bool {
        x >= self.x_min && x <= self.x_max
    }
}
