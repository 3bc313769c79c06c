//! The target shape and its pose.

use crate::circle::smallest_enclosing_circle;
use crate::error::{Error, Result};
use crate::geom::{self, Ring};
use geo::{Centroid, ConvexHull, MultiPolygon, Point, Polygon, Rotate, Simplify, Translate};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A candidate pose of the target shape: reference-point position plus
/// rotation angle in degrees (counter-clockwise, around the origin).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

impl Placement {
    /// Creates a placement.
    pub fn new(x: f64, y: f64, angle: f64) -> Self {
        Self { x, y, angle }
    }

    /// Returns the position component.
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// The polygon to be placed, normalized so the center of its smallest
/// enclosing circle sits at the origin. Pose is never baked into the stored
/// polygon; it is applied on demand.
#[derive(Debug, Clone)]
pub struct Shape {
    polygon: Polygon<f64>,
    centroid: (f64, f64),
    circle_center: (f64, f64),
    circle_radius: f64,
}

/// Simplification tolerance applied to incoming shape and hole outlines.
pub const SIMPLIFY_TOLERANCE: f64 = 1.0;

/// Decimal places incoming shape coordinates are rounded to.
const INPUT_DECIMALS: i32 = 5;

impl Shape {
    /// Builds a shape from its outline. The ring is rounded, simplified,
    /// winding-normalized and re-centered on its enclosing-circle center.
    pub fn from_ring(ring: &[(f64, f64)]) -> Result<Self> {
        if ring.len() < 3 {
            return Err(Error::InvalidPolygon("fewer than 3 vertices".into()));
        }
        let rounded = geom::round_ring(ring, INPUT_DECIMALS);
        let polygon = geom::polygon_from_ring(&rounded).simplify(&SIMPLIFY_TOLERANCE);
        let polygon = geom::orient_ccw(&polygon);
        let exterior = geom::closed_ring(polygon.exterior());
        let (cx, cy, radius) = smallest_enclosing_circle(&exterior);
        let polygon = polygon.translate(-cx, -cy);
        let centroid = polygon
            .centroid()
            .map(|c| (c.x(), c.y()))
            .unwrap_or((0.0, 0.0));
        Ok(Self {
            polygon,
            centroid,
            circle_center: (cx, cy),
            circle_radius: radius,
        })
    }

    /// The normalized polygon, enclosing-circle center at the origin.
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Centroid of the normalized polygon.
    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }

    /// Enclosing-circle center in the input coordinate frame.
    pub fn circle_center(&self) -> (f64, f64) {
        self.circle_center
    }

    /// Enclosing-circle radius.
    pub fn circle_radius(&self) -> f64 {
        self.circle_radius
    }

    /// The shape rotated about the origin by `angle` degrees.
    pub fn rotated(&self, angle: f64) -> Polygon<f64> {
        self.polygon
            .rotate_around_point(angle, Point::new(0.0, 0.0))
    }

    /// The shape at a full pose: rotated, then translated.
    pub fn oriented(&self, placement: &Placement) -> Polygon<f64> {
        self.rotated(placement.angle)
            .translate(placement.x, placement.y)
    }

    /// The convex hull of the normalized shape.
    pub fn hull(&self) -> Polygon<f64> {
        self.polygon.convex_hull()
    }

    /// The shape translated back into the input frame (default position).
    pub fn in_input_frame(&self) -> Polygon<f64> {
        self.polygon
            .translate(self.circle_center.0, self.circle_center.1)
    }

    /// The shape buffered outward by half the enclosing-circle radius; the
    /// soft-clearance outline used by the local search.
    pub fn inflated(&self) -> Result<MultiPolygon<f64>> {
        geom::dilate(&self.polygon, self.circle_radius / 2.0, 16)
    }

    /// Identity of the stored boundary, for NFP cache signatures.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for c in self.polygon.exterior().coords() {
            c.x.to_bits().hash(&mut hasher);
            c.y.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Outline at a pose as a closed coordinate ring.
    pub fn oriented_ring(&self, placement: &Placement) -> Ring {
        geom::closed_ring(self.oriented(placement).exterior())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::Area;

    fn square_at(x: f64, y: f64, side: f64) -> Ring {
        vec![(x, y), (x + side, y), (x + side, y + side), (x, y + side)]
    }

    #[test]
    fn normalization_centers_enclosing_circle() {
        let shape = Shape::from_ring(&square_at(100.0, 200.0, 10.0)).unwrap();
        assert_relative_eq!(shape.circle_center().0, 105.0, epsilon = 1e-6);
        assert_relative_eq!(shape.circle_center().1, 205.0, epsilon = 1e-6);
        assert_relative_eq!(
            shape.circle_radius(),
            5.0 * std::f64::consts::SQRT_2,
            epsilon = 1e-6
        );
        // The normalized square straddles the origin.
        assert_relative_eq!(shape.centroid().0, 0.0, epsilon = 1e-6);
        assert_relative_eq!(shape.centroid().1, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn oriented_round_trips() {
        let shape = Shape::from_ring(&square_at(0.0, 0.0, 10.0)).unwrap();
        let pose = Placement::new(40.0, 30.0, 90.0);
        let oriented = shape.oriented(&pose);
        let back = oriented
            .translate(-pose.x, -pose.y)
            .rotate_around_point(-pose.angle, Point::new(0.0, 0.0));
        let diff = crate::geom::try_difference(
            &crate::geom::to_multi(back),
            &crate::geom::to_multi(shape.polygon().clone()),
        )
        .unwrap();
        assert!(diff.unsigned_area() < 1e-6);
    }

    #[test]
    fn fingerprint_tracks_boundary() {
        let a = Shape::from_ring(&square_at(0.0, 0.0, 10.0)).unwrap();
        let b = Shape::from_ring(&square_at(50.0, 50.0, 10.0)).unwrap();
        let c = Shape::from_ring(&square_at(0.0, 0.0, 20.0)).unwrap();
        // Same boundary after normalization, regardless of input offset.
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(Shape::from_ring(&[(0.0, 0.0), (1.0, 1.0)]).is_err());
    }
}
