//! Thin wrapper over the 2-D geometry kernel.
//!
//! The engine consumes a small capability surface: ring/polygon conversion,
//! winding normalization, boolean set operations, outward buffering and
//! rectangle shrinking, simplification and containment tests. Everything is
//! backed by the `geo` crate. The boolean operations the kernel can fault on
//! are isolated behind `try_*` wrappers that report
//! [`Error::DegenerateGeometry`] instead of unwinding through the engine.

use crate::error::{Error, Result};
use geo::orient::{Direction, Orient};
use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon, Simplify};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A polygon ring as plain coordinate pairs, the exchange format of the
/// engine's public surface.
pub type Ring = Vec<(f64, f64)>;

/// Intersection areas below this are treated as "merely touching".
pub const AREA_EPS: f64 = 1e-9;

/// Builds a `LineString` from coordinate pairs.
pub fn line_string(points: &[(f64, f64)]) -> LineString<f64> {
    LineString::new(points.iter().map(|&(x, y)| Coord { x, y }).collect())
}

/// Builds a polygon from an outer ring. The kernel closes the ring itself.
pub fn polygon_from_ring(ring: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(line_string(ring), Vec::new())
}

/// Builds a polygon from an outer ring and interior rings.
pub fn polygon_from_rings(outer: &[(f64, f64)], inners: &[Vec<(f64, f64)>]) -> Polygon<f64> {
    Polygon::new(
        line_string(outer),
        inners.iter().map(|r| line_string(r)).collect(),
    )
}

/// Ring coordinates without the duplicate closing vertex.
pub fn open_ring(ls: &LineString<f64>) -> Ring {
    let mut pts: Ring = ls.coords().map(|c| (c.x, c.y)).collect();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

/// Ring coordinates with the closing vertex repeated, matching the kernel's
/// boundary-coordinate convention.
pub fn closed_ring(ls: &LineString<f64>) -> Ring {
    let mut pts: Ring = ls.coords().map(|c| (c.x, c.y)).collect();
    if pts.len() > 1 && pts.first() != pts.last() {
        pts.push(pts[0]);
    }
    pts
}

/// Rounds every coordinate to `decimals` decimal places. Negative values
/// round to tens, hundreds, and so on.
pub fn round_ring(ring: &[(f64, f64)], decimals: i32) -> Ring {
    let factor = 10f64.powi(decimals);
    ring.iter()
        .map(|&(x, y)| ((x * factor).round() / factor, (y * factor).round() / factor))
        .collect()
}

/// Truncates every coordinate toward zero.
pub fn int_ring(ring: &[(f64, f64)]) -> Ring {
    ring.iter().map(|&(x, y)| (x.trunc(), y.trunc())).collect()
}

/// Normalizes winding: exterior counter-clockwise, interiors clockwise.
pub fn orient_ccw(polygon: &Polygon<f64>) -> Polygon<f64> {
    polygon.orient(Direction::Default)
}

/// Shoelace area of an open ring; positive for counter-clockwise.
pub fn signed_ring_area(ring: &[(f64, f64)]) -> f64 {
    let n = ring.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += ring[i].0 * ring[j].1;
        area -= ring[j].0 * ring[i].1;
    }
    area / 2.0
}

/// Wraps a polygon into a single-member multi-polygon.
pub fn to_multi(polygon: Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon])
}

/// Counter-clockwise axis-aligned rectangle from its corner coordinates.
pub fn rect_polygon(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    polygon_from_ring(&[(min_x, min_y), (max_x, min_y), (max_x, max_y), (min_x, max_y)])
}

/// Shrinks an axis-aligned rectangle inward on all sides. Returns `None`
/// when the rectangle collapses.
pub fn shrink_rect(
    min: (f64, f64),
    max: (f64, f64),
    offset: f64,
) -> Option<Polygon<f64>> {
    let min_x = min.0 + offset;
    let min_y = min.1 + offset;
    let max_x = max.0 - offset;
    let max_y = max.1 - offset;
    if min_x >= max_x || min_y >= max_y {
        return None;
    }
    Some(rect_polygon(min_x, min_y, max_x, max_y))
}

fn kernel_op<F>(name: &str, op: F) -> Result<MultiPolygon<f64>>
where
    F: FnOnce() -> MultiPolygon<f64>,
{
    catch_unwind(AssertUnwindSafe(op))
        .map_err(|_| Error::DegenerateGeometry(format!("{name} faulted")))
}

/// Union of two regions, with kernel faults contained.
pub fn try_union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    kernel_op("union", || a.union(b))
}

/// Difference `a − b`, with kernel faults contained.
pub fn try_difference(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    kernel_op("difference", || a.difference(b))
}

/// Intersection of two regions, with kernel faults contained.
pub fn try_intersection(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>> {
    kernel_op("intersection", || a.intersection(b))
}

/// Area of the intersection of two polygons; kernel faults count as zero
/// overlap, which only ever under-reports a collision in the soft term.
pub fn overlap_area(a: &MultiPolygon<f64>, b: &Polygon<f64>) -> f64 {
    match try_intersection(a, &to_multi(b.clone())) {
        Ok(mp) => mp.unsigned_area(),
        Err(err) => {
            log::debug!(target: "offcut::geom", "overlap area fell back to 0: {err}");
            0.0
        }
    }
}

/// True when the interiors of two polygons overlap (not merely touch).
pub fn interiors_overlap(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    match try_intersection(&to_multi(a.clone()), &to_multi(b.clone())) {
        Ok(mp) => mp.unsigned_area() > AREA_EPS,
        Err(_) => false,
    }
}

/// Simplifies every member polygon with the given tolerance and drops
/// members whose area vanished.
pub fn simplified_parts(region: &MultiPolygon<f64>, tolerance: f64) -> Vec<Polygon<f64>> {
    region
        .simplify(&tolerance)
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > AREA_EPS)
        .collect()
}

/// Counter-clockwise circle approximation around `center`.
pub fn disc(center: (f64, f64), radius: f64, segments: usize) -> Polygon<f64> {
    let n = segments.max(8);
    let step = std::f64::consts::TAU / n as f64;
    let ring: Ring = (0..n)
        .map(|i| {
            let a = i as f64 * step;
            (center.0 + radius * a.cos(), center.1 + radius * a.sin())
        })
        .collect();
    polygon_from_ring(&ring)
}

/// Union of edge strips and vertex discs along a ring: the Minkowski sweep
/// of the ring with a disc of the given radius.
fn ring_strip(ring: &LineString<f64>, distance: f64, resolution: u32) -> Result<MultiPolygon<f64>> {
    let pts = open_ring(ring);
    let segments = (4 * resolution.max(1)) as usize;
    let mut acc = MultiPolygon::new(Vec::new());
    let n = pts.len();
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        let len = (dx * dx + dy * dy).sqrt();
        if len > f64::EPSILON {
            let nx = -dy / len * distance;
            let ny = dx / len * distance;
            let quad = orient_ccw(&polygon_from_ring(&[
                (a.0 + nx, a.1 + ny),
                (b.0 + nx, b.1 + ny),
                (b.0 - nx, b.1 - ny),
                (a.0 - nx, a.1 - ny),
            ]));
            acc = try_union(&acc, &to_multi(quad))?;
        }
        acc = try_union(&acc, &to_multi(disc(a, distance, segments)))?;
    }
    Ok(acc)
}

/// Buffers a polygon outward by `distance`. `resolution` is the number of
/// segments per quarter circle at vertices. Interior rings shrink by the
/// same distance and are dropped once they vanish. Non-positive distances
/// return the polygon unchanged.
pub fn dilate(
    polygon: &Polygon<f64>,
    distance: f64,
    resolution: u32,
) -> Result<MultiPolygon<f64>> {
    if distance <= 0.0 {
        return Ok(to_multi(polygon.clone()));
    }
    let shell = orient_ccw(&Polygon::new(polygon.exterior().clone(), Vec::new()));
    let sweep = ring_strip(polygon.exterior(), distance, resolution)?;
    let mut grown = try_union(&to_multi(shell), &sweep)?;
    for interior in polygon.interiors() {
        let pocket = to_multi(orient_ccw(&Polygon::new(interior.clone(), Vec::new())));
        let rim = ring_strip(interior, distance, resolution)?;
        let kept = try_difference(&pocket, &rim)?;
        if kept.unsigned_area() > AREA_EPS {
            grown = try_difference(&grown, &kept)?;
        }
    }
    Ok(grown)
}

/// Buffers every member of a region outward, unioning the results.
pub fn dilate_multi(
    region: &MultiPolygon<f64>,
    distance: f64,
    resolution: u32,
) -> Result<MultiPolygon<f64>> {
    if distance <= 0.0 {
        return Ok(region.clone());
    }
    let mut acc = MultiPolygon::new(Vec::new());
    for part in &region.0 {
        acc = try_union(&acc, &dilate(part, distance, resolution)?)?;
    }
    Ok(acc)
}

fn orient2d(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    robust::orient2d(
        robust::Coord { x: a.0, y: a.1 },
        robust::Coord { x: b.0, y: b.1 },
        robust::Coord { x: c.0, y: c.1 },
    )
}

fn segments_cross(p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), p4: (f64, f64)) -> bool {
    let d1 = orient2d(p3, p4, p1);
    let d2 = orient2d(p3, p4, p2);
    let d3 = orient2d(p1, p2, p3);
    let d4 = orient2d(p1, p2, p4);
    (d1 > 0.0 && d2 < 0.0 || d1 < 0.0 && d2 > 0.0)
        && (d3 > 0.0 && d4 < 0.0 || d3 < 0.0 && d4 > 0.0)
}

fn distinct_vertices(ring: &[(f64, f64)]) -> Ring {
    let mut pts = ring.to_vec();
    // Consecutive duplicates carry no geometry.
    pts.dedup();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

/// Detects proper self-intersections and pinch points in a ring.
/// Adjacent edges sharing an endpoint are fine; a bow-tie or a vertex the
/// boundary passes through twice is not.
pub fn is_ring_self_intersecting(ring: &[(f64, f64)]) -> bool {
    let pts = distinct_vertices(ring);
    let n = pts.len();
    if n < 3 {
        return true;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if pts[i] == pts[j] {
                return true;
            }
        }
    }
    for i in 0..n {
        let (a1, a2) = (pts[i], pts[(i + 1) % n]);
        for j in (i + 1)..n {
            // Skip edges sharing a vertex with edge i.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = (pts[j], pts[(j + 1) % n]);
            if segments_cross(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

/// Validates a ring as polygon input: enough vertices, finite coordinates,
/// non-vanishing area, no self-intersection.
pub fn validate_ring(ring: &[(f64, f64)]) -> Result<()> {
    let pts = distinct_vertices(ring);
    if pts.len() < 3 {
        return Err(Error::InvalidPolygon("fewer than 3 vertices".into()));
    }
    if pts.iter().any(|&(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(Error::InvalidPolygon("non-finite coordinate".into()));
    }
    if signed_ring_area(&pts).abs() <= AREA_EPS {
        return Err(Error::InvalidPolygon("vanishing area".into()));
    }
    if is_ring_self_intersecting(&pts) {
        return Err(Error::InvalidPolygon("self-intersecting ring".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(side: f64) -> Ring {
        vec![(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)]
    }

    #[test]
    fn union_of_overlapping_squares() {
        let a = to_multi(polygon_from_ring(&square(100.0)));
        let b = to_multi(polygon_from_ring(&[
            (50.0, 50.0),
            (150.0, 50.0),
            (150.0, 150.0),
            (50.0, 150.0),
        ]));
        let u = try_union(&a, &b).unwrap();
        assert_relative_eq!(u.unsigned_area(), 17_500.0, epsilon = 1e-6);
    }

    #[test]
    fn difference_can_split() {
        let wide = to_multi(polygon_from_ring(&[
            (0.0, 0.0),
            (30.0, 0.0),
            (30.0, 10.0),
            (0.0, 10.0),
        ]));
        let cut = to_multi(polygon_from_ring(&[
            (10.0, -5.0),
            (20.0, -5.0),
            (20.0, 15.0),
            (10.0, 15.0),
        ]));
        let parts = try_difference(&wide, &cut).unwrap();
        assert_eq!(parts.0.len(), 2);
        assert_relative_eq!(parts.unsigned_area(), 200.0, epsilon = 1e-6);
    }

    #[test]
    fn dilate_grows_a_square() {
        let d = dilate(&polygon_from_ring(&square(10.0)), 5.0, 8).unwrap();
        let area = d.unsigned_area();
        // Square + 4 edge strips + 4 quarter circles.
        let expected = 100.0 + 4.0 * 50.0 + std::f64::consts::PI * 25.0;
        assert_relative_eq!(area, expected, epsilon = 2.0);
    }

    #[test]
    fn dilate_zero_is_identity() {
        let p = polygon_from_ring(&square(10.0));
        let d = dilate(&p, 0.0, 8).unwrap();
        assert_relative_eq!(d.unsigned_area(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn shrink_rect_collapses() {
        assert!(shrink_rect((0.0, 0.0), (10.0, 10.0), 6.0).is_none());
        let r = shrink_rect((0.0, 0.0), (10.0, 10.0), 2.0).unwrap();
        assert_relative_eq!(r.unsigned_area(), 36.0, epsilon = 1e-9);
    }

    #[test]
    fn bow_tie_is_self_intersecting() {
        let bow = vec![(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)];
        assert!(is_ring_self_intersecting(&bow));
        assert!(!is_ring_self_intersecting(&square(10.0)));
    }

    #[test]
    fn validate_rejects_degenerate_rings() {
        assert!(validate_ring(&[(0.0, 0.0), (1.0, 0.0)]).is_err());
        assert!(validate_ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]).is_err());
        assert!(validate_ring(&square(10.0)).is_ok());
    }

    #[test]
    fn round_ring_handles_negative_decimals() {
        let r = round_ring(&[(12.34, 56.78)], 0);
        assert_eq!(r[0], (12.0, 57.0));
        let r = round_ring(&[(12.34, 56.78)], -1);
        assert_eq!(r[0], (10.0, 60.0));
    }
}
