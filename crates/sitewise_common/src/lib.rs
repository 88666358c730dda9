//! Shared foundational types used across the sitewise placer.
//!
//! This crate provides integer geometry on the placement grid (points,
//! rectangles, rounding division helpers) and the common internal error type.

#![warn(missing_docs)]

pub mod geom;
pub mod result;

pub use geom::{div_ceil, div_floor, div_round, Point, Rect};
pub use result::InternalError;
