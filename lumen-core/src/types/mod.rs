//! Shared value types for the Lumen stack.

pub mod geometry;

pub use geometry::{Point, Rect, Size};
