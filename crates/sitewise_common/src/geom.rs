//! Axis-aligned integer geometry in database units.
//!
//! All placement coordinates are integers. Rectangles are stored as
//! `[min, max]` corner pairs; whether an edge is inclusive depends on the
//! query used and is stated on each method.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in database units.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Creates a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to `other`.
    pub fn manhattan(self, other: Point) -> i64 {
        (self.x as i64 - other.x as i64).abs() + (self.y as i64 - other.y as i64).abs()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle in database units.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x_min: i32,
    /// Bottom edge.
    pub y_min: i32,
    /// Right edge.
    pub x_max: i32,
    /// Top edge.
    pub y_max: i32,
}

impl Rect {
    /// Creates a rectangle from two corners, normalizing their order.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x_min: x1.min(x2),
            y_min: y1.min(y2),
            x_max: x1.max(x2),
            y_max: y1.max(y2),
        }
    }

    /// Creates a rectangle from an origin and a size.
    pub fn from_origin(origin: Point, width: i32, height: i32) -> Self {
        Self::new(origin.x, origin.y, origin.x + width, origin.y + height)
    }

    /// Width of the rectangle.
    pub fn dx(&self) -> i32 {
        self.x_max - self.x_min
    }

    /// Height of the rectangle.
    pub fn dy(&self) -> i32 {
        self.y_max - self.y_min
    }

    /// Area of the rectangle.
    pub fn area(&self) -> i64 {
        self.dx() as i64 * self.dy() as i64
    }

    /// Lower-left corner.
    pub fn ll(&self) -> Point {
        Point::new(self.x_min, self.y_min)
    }

    /// Returns `true` if `p` lies inside or on the boundary.
    pub fn intersects_point(&self, p: Point) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    /// Returns `true` if the interiors of the two rectangles overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x_min < other.x_max
            && other.x_min < self.x_max
            && self.y_min < other.y_max
            && other.y_min < self.y_max
    }

    /// Returns `true` if `other` lies entirely within this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x_min >= self.x_min
            && other.x_max <= self.x_max
            && other.y_min >= self.y_min
            && other.y_max <= self.y_max
    }

    /// Clamps `p` into the rectangle (boundary inclusive).
    pub fn closest_pt_inside(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.x_min, self.x_max.max(self.x_min)),
            p.y.clamp(self.y_min, self.y_max.max(self.y_min)),
        )
    }

    /// Grows the rectangle to include `other`.
    pub fn merge(&mut self, other: &Rect) {
        self.x_min = self.x_min.min(other.x_min);
        self.y_min = self.y_min.min(other.y_min);
        self.x_max = self.x_max.max(other.x_max);
        self.y_max = self.y_max.max(other.y_max);
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) - ({}, {})",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

/// Floor division that rounds toward negative infinity.
pub fn div_floor(dividend: i32, divisor: i32) -> i32 {
    let q = dividend / divisor;
    if dividend % divisor != 0 && ((dividend < 0) != (divisor < 0)) {
        q - 1
    } else {
        q
    }
}

/// Ceiling division that rounds toward positive infinity.
pub fn div_ceil(dividend: i32, divisor: i32) -> i32 {
    -div_floor(-dividend, divisor)
}

/// Division rounded to the nearest integer, halves away from zero.
pub fn div_round(dividend: i32, divisor: i32) -> i32 {
    (dividend as f64 / divisor as f64).round() as i32
}
