//! The board being filled.

use crate::geom::{self, Ring};
use geo::Polygon;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rectangular board with its lower-left corner at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Board {
    width: f64,
    height: f64,
}

impl Board {
    /// Creates a board of the given dimensions.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns the board width.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Returns the board height.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Returns the dimensions as `(width, height)`.
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Resizes the board.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Board outline in counter-clockwise order, starting at the lower-left
    /// corner, closed.
    pub fn ring(&self) -> Ring {
        vec![
            (0.0, 0.0),
            (self.width, 0.0),
            (self.width, self.height),
            (0.0, self.height),
            (0.0, 0.0),
        ]
    }

    /// Board outline as a kernel polygon.
    pub fn polygon(&self) -> Polygon<f64> {
        geom::rect_polygon(0.0, 0.0, self.width, self.height)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self {
            width: 2400.0,
            height: 1400.0,
        }
    }
}
