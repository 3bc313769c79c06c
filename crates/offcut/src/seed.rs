//! Initial placement seeding.
//!
//! The local search needs a feasible starting point; vertices of the free
//! region are the natural candidates, scored by a directional preference so
//! shapes accumulate toward a chosen board corner or edge.

use geo::{Area, Polygon};

use crate::geom;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Directional preference for the starting vertex. Each entry names the
/// linear score it maximizes over candidate vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PreferredPosition {
    /// Maximize −x + y.
    #[default]
    TopLeft,
    /// Maximize x + y.
    TopRight,
    /// Maximize −x − y.
    BottomLeft,
    /// Maximize x − y.
    BottomRight,
    /// Maximize −x.
    Left,
    /// Maximize x.
    Right,
    /// Maximize y.
    Top,
}

impl PreferredPosition {
    /// Score of a candidate vertex; higher wins.
    pub fn score(&self, p: (f64, f64)) -> f64 {
        match self {
            Self::TopLeft => -p.0 + p.1,
            Self::TopRight => p.0 + p.1,
            Self::BottomLeft => -p.0 - p.1,
            Self::BottomRight => p.0 - p.1,
            Self::Left => -p.0,
            Self::Right => p.0,
            Self::Top => p.1,
        }
    }
}

/// Picks the starting vertex from the free region.
///
/// With `small_first` the candidates are the exterior vertices of the
/// smallest-area free polygon, so small pockets get filled before the open
/// board; otherwise every ring (outer and inner) of every free polygon
/// contributes. Returns `None` when the region is empty.
pub fn select_start(
    region: &[Polygon<f64>],
    small_first: bool,
    pref: PreferredPosition,
) -> Option<(f64, f64)> {
    if region.is_empty() {
        return None;
    }
    let mut candidates: Vec<(f64, f64)> = Vec::new();
    if small_first {
        let smallest = region.iter().min_by(|a, b| {
            a.unsigned_area()
                .partial_cmp(&b.unsigned_area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        candidates.extend(geom::open_ring(smallest.exterior()));
    } else {
        for polygon in region {
            candidates.extend(geom::open_ring(polygon.exterior()));
            for interior in polygon.interiors() {
                candidates.extend(geom::open_ring(interior));
            }
        }
    }
    let mut best: Option<(f64, f64)> = None;
    let mut best_score = f64::NEG_INFINITY;
    for candidate in candidates {
        let score = pref.score(candidate);
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }
    best
}
