//! Geometric primitives like points, sizes, and rectangles.

use num_traits::{Num, Zero};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

// --- Generic Point<T> ---

/// Represents a 2D point with generic coordinates.
///
/// # Type Parameters
///
/// * `T`: The numeric type for the coordinates (e.g., `i32`, `f32`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize + Num + Copy",
    deserialize = "T: Deserialize<'de> + Num + Copy"
))]
pub struct Point<T: Num + Copy> {
    /// The x-coordinate of the point.
    pub x: T,
    /// The y-coordinate of the point.
    pub y: T,
}

impl<T: Num + Copy + Eq> Eq for Point<T> {}
impl<T: Num + Copy + std::hash::Hash> std::hash::Hash for Point<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
    }
}

impl<T: Num + Copy> Point<T> {
    /// Creates a new point with the given coordinates.
    pub const fn new(x: T, y: T) -> Self {
        Point { x, y }
    }
}

impl<T: Num + Copy + Add<Output = T>> Add for Point<T> {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Point {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl<T: Num + Copy + Sub<Output = T>> Sub for Point<T> {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Point {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

// --- Generic Size<T> ---

/// Represents a 2D size (width and height) with generic dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize + Num + Copy",
    deserialize = "T: Deserialize<'de> + Num + Copy"
))]
pub struct Size<T: Num + Copy> {
    /// The width component of the size.
    pub width: T,
    /// The height component of the size.
    pub height: T,
}

impl<T: Num + Copy + Eq> Eq for Size<T> {}
impl<T: Num + Copy + std::hash::Hash> std::hash::Hash for Size<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.width.hash(state);
        self.height.hash(state);
    }
}

impl<T: Num + Copy> Size<T> {
    /// Creates a new size with the given width and height.
    pub const fn new(width: T, height: T) -> Self {
        Size { width, height }
    }

    /// Checks if the area is zero (width or height is zero).
    pub fn is_empty(&self) -> bool
    where
        T: Zero + PartialEq,
    {
        self.width.is_zero() || self.height.is_zero()
    }
}

// --- Generic Rect<T> ---

/// Represents a 2D rectangle defined by an origin point and a size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize + Num + Copy",
    deserialize = "T: Deserialize<'de> + Num + Copy"
))]
pub struct Rect<T: Num + Copy> {
    /// The origin point (top-left corner) of the rectangle.
    pub origin: Point<T>,
    /// The size (width and height) of the rectangle.
    pub size: Size<T>,
}

impl<T: Num + Copy + Eq> Eq for Rect<T> {}
impl<T: Num + Copy + std::hash::Hash> std::hash::Hash for Rect<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        self.size.hash(state);
    }
}

impl<T: Num + Copy> Rect<T> {
    /// Creates a new rectangle from an origin point and a size.
    pub const fn new(origin: Point<T>, size: Size<T>) -> Self {
        Rect { origin, size }
    }

    /// Creates a new rectangle from individual coordinate and dimension
    /// values.
    pub const fn from_coords(x: T, y: T, width: T, height: T) -> Self {
        Rect {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Returns the x-coordinate of the rectangle's origin (left edge).
    pub fn x(&self) -> T {
        self.origin.x
    }

    /// Returns the y-coordinate of the rectangle's origin (top edge).
    pub fn y(&self) -> T {
        self.origin.y
    }

    /// Returns the width of the rectangle.
    pub fn width(&self) -> T {
        self.size.width
    }

    /// Returns the height of the rectangle.
    pub fn height(&self) -> T {
        self.size.height
    }

    /// Calculates the x-coordinate of the right edge.
    pub fn right(&self) -> T {
        self.origin.x + self.size.width
    }

    /// Calculates the y-coordinate of the bottom edge.
    pub fn bottom(&self) -> T {
        self.origin.y + self.size.height
    }
}

impl<T: Num + Copy + PartialOrd + Zero> Rect<T> {
    /// Checks if the rectangle has zero area.
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Checks whether `point` lies within the rectangle (edges inclusive on
    /// the top/left, exclusive on the bottom/right).
    pub fn contains(&self, point: Point<T>) -> bool {
        point.x >= self.x() && point.x < self.right() && point.y >= self.y() && point.y < self.bottom()
    }

    /// Returns the intersection of `self` and `other`, or an empty rectangle
    /// at the origin when they do not overlap.
    pub fn intersection(&self, other: &Rect<T>) -> Rect<T> {
        let x1 = if self.x() > other.x() { self.x() } else { other.x() };
        let y1 = if self.y() > other.y() { self.y() } else { other.y() };
        let x2 = if self.right() < other.right() {
            self.right()
        } else {
            other.right()
        };
        let y2 = if self.bottom() < other.bottom() {
            self.bottom()
        } else {
            other.bottom()
        };

        if x2 > x1 && y2 > y1 {
            Rect::from_coords(x1, y1, x2 - x1, y2 - y1)
        } else {
            Rect::from_coords(T::zero(), T::zero(), T::zero(), T::zero())
        }
    }

    /// Returns the smallest rectangle containing both `self` and `other`.
    /// An empty rectangle contributes nothing to the union.
    pub fn union(&self, other: &Rect<T>) -> Rect<T> {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let x1 = if self.x() < other.x() { self.x() } else { other.x() };
        let y1 = if self.y() < other.y() { self.y() } else { other.y() };
        let x2 = if self.right() > other.right() {
            self.right()
        } else {
            other.right()
        };
        let y2 = if self.bottom() > other.bottom() {
            self.bottom()
        } else {
            other.bottom()
        };

        Rect::from_coords(x1, y1, x2 - x1, y2 - y1)
    }
}
