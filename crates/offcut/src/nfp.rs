//! No-fit polygon providers.
//!
//! The NFP of a stationary and an orbiting polygon is the locus of
//! positions at which the orbiting polygon touches or overlaps the
//! stationary one. The construction itself is behind the [`NfpProvider`]
//! trait so an external library can be dropped in; [`MinkowskiNfp`] is the
//! built-in provider:
//!
//! - **Convex pair**: Minkowski sum by merging sorted edge vectors,
//!   O(n + m).
//! - **General case**: ear-clipping decomposition into triangles, pairwise
//!   convex sums, union of the partial results via `i_overlay`.

use crate::error::{Error, Result};
use crate::geom::signed_ring_area;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;

/// One loop of an NFP, without a duplicate closing vertex.
pub type Loop = Vec<(f64, f64)>;

/// Computes no-fit polygons from raw boundary loops.
///
/// Input loops are closed rings (first vertex repeated at the end is
/// accepted but not required). Returned loops are positioned in the
/// stationary polygon's frame and traced by the **first vertex** of the
/// orbiting ring; the first loop is the outer NFP boundary, any further
/// loops are enclosed pockets.
pub trait NfpProvider {
    /// Computes the NFP of `orbiting` around `stationary`, or fails.
    fn gen_nfp(&self, stationary: &[(f64, f64)], orbiting: &[(f64, f64)]) -> Result<Vec<Loop>>;
}

/// Built-in Minkowski-sum NFP construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinkowskiNfp;

impl NfpProvider for MinkowskiNfp {
    fn gen_nfp(&self, stationary: &[(f64, f64)], orbiting: &[(f64, f64)]) -> Result<Vec<Loop>> {
        let stat = strip_closing(stationary);
        let orb = strip_closing(orbiting);
        if stat.len() < 3 || orb.len() < 3 {
            return Err(Error::NfpFailure("loop with fewer than 3 vertices".into()));
        }
        let anchor = orb[0];
        let stat = ensure_ccw(&stat);
        let orb = ensure_ccw(&orb);

        let mut loops = if is_convex(&stat) && is_convex(&orb) {
            let reflected = reflect(&orb);
            vec![minkowski_sum_convex(&stat, &reflected)?]
        } else {
            general_nfp(&stat, &orb)?
        };
        for l in &mut loops {
            for p in l.iter_mut() {
                p.0 += anchor.0;
                p.1 += anchor.1;
            }
        }
        Ok(loops)
    }
}

fn strip_closing(ring: &[(f64, f64)]) -> Loop {
    let mut pts = ring.to_vec();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

fn ensure_ccw(ring: &[(f64, f64)]) -> Loop {
    if signed_ring_area(ring) < 0.0 {
        ring.iter().rev().copied().collect()
    } else {
        ring.to_vec()
    }
}

fn reflect(ring: &[(f64, f64)]) -> Loop {
    ensure_ccw(&ring.iter().map(|&(x, y)| (-x, -y)).collect::<Loop>())
}

fn orient2d(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    robust::orient2d(
        robust::Coord { x: a.0, y: a.1 },
        robust::Coord { x: b.0, y: b.1 },
        robust::Coord { x: c.0, y: c.1 },
    )
}

/// Convexity by sign consistency of consecutive turns.
fn is_convex(ring: &[(f64, f64)]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0i8;
    for i in 0..n {
        let turn = orient2d(ring[i], ring[(i + 1) % n], ring[(i + 2) % n]);
        if turn != 0.0 {
            let current = if turn > 0.0 { 1 } else { -1 };
            if sign == 0 {
                sign = current;
            } else if sign != current {
                return false;
            }
        }
    }
    true
}

fn edge_vectors(ring: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            (ring[j].0 - ring[i].0, ring[j].1 - ring[i].1)
        })
        .collect()
}

fn bottom_left_index(ring: &[(f64, f64)]) -> usize {
    let mut best = 0;
    for (i, &(x, y)) in ring.iter().enumerate() {
        let (bx, by) = ring[best];
        if y < by || (y == by && x < bx) {
            best = i;
        }
    }
    best
}

fn edge_angle(dx: f64, dy: f64) -> f64 {
    let a = dy.atan2(dx);
    if a < 0.0 {
        a + std::f64::consts::TAU
    } else {
        a
    }
}

/// Minkowski sum of two convex counter-clockwise polygons by merging their
/// edge vectors in angular order.
fn minkowski_sum_convex(a: &[(f64, f64)], b: &[(f64, f64)]) -> Result<Loop> {
    let edges_a = edge_vectors(a);
    let edges_b = edge_vectors(b);
    let start_a = bottom_left_index(a);
    let start_b = bottom_left_index(b);

    let mut merged = Vec::with_capacity(edges_a.len() + edges_b.len());
    let (mut i, mut j) = (0usize, 0usize);
    while i < edges_a.len() || j < edges_b.len() {
        if i >= edges_a.len() {
            merged.push(edges_b[(start_b + j) % edges_b.len()]);
            j += 1;
        } else if j >= edges_b.len() {
            merged.push(edges_a[(start_a + i) % edges_a.len()]);
            i += 1;
        } else {
            let ea = edges_a[(start_a + i) % edges_a.len()];
            let eb = edges_b[(start_b + j) % edges_b.len()];
            let (aa, ab) = (edge_angle(ea.0, ea.1), edge_angle(eb.0, eb.1));
            if aa <= ab + 1e-10 {
                merged.push(ea);
                i += 1;
            }
            if ab <= aa + 1e-10 {
                merged.push(eb);
                j += 1;
            }
        }
    }

    let mut current = (
        a[start_a].0 + b[start_b].0,
        a[start_a].1 + b[start_b].1,
    );
    let mut out = Vec::with_capacity(merged.len());
    out.push(current);
    for (dx, dy) in merged {
        current = (current.0 + dx, current.1 + dy);
        out.push(current);
    }
    if out.len() > 1 {
        let (first, last) = (out[0], out[out.len() - 1]);
        if (first.0 - last.0).abs() < 1e-10 && (first.1 - last.1).abs() < 1e-10 {
            out.pop();
        }
    }
    if out.len() < 3 {
        return Err(Error::NfpFailure("Minkowski sum collapsed".into()));
    }
    Ok(out)
}

fn point_in_triangle(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    orient2d(a, b, p) > 0.0 && orient2d(b, c, p) > 0.0 && orient2d(c, a, p) > 0.0
}

fn is_ear(ring: &[(f64, f64)], prev: usize, curr: usize, next: usize) -> bool {
    let (a, b, c) = (ring[prev], ring[curr], ring[next]);
    if orient2d(a, b, c) <= 0.0 {
        return false;
    }
    for (i, &p) in ring.iter().enumerate() {
        if i == prev || i == curr || i == next {
            continue;
        }
        if point_in_triangle(p, a, b, c) {
            return false;
        }
    }
    true
}

/// Ear-clipping triangulation of a counter-clockwise ring. Convex rings
/// come back whole; degenerate rings fall back to their convex hull.
fn triangulate(ring: &[(f64, f64)]) -> Vec<Loop> {
    if ring.len() < 3 {
        return Vec::new();
    }
    if is_convex(ring) {
        return vec![ring.to_vec()];
    }
    let mut vertices = ring.to_vec();
    let mut triangles = Vec::new();
    while vertices.len() > 3 {
        let n = vertices.len();
        let mut clipped = false;
        for i in 0..n {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;
            if is_ear(&vertices, prev, i, next) {
                triangles.push(vec![vertices[prev], vertices[i], vertices[next]]);
                vertices.remove(i);
                clipped = true;
                break;
            }
        }
        if !clipped {
            return vec![convex_hull(ring)];
        }
    }
    triangles.push(vertices);
    triangles
}

/// Monotone-chain convex hull, counter-clockwise.
fn convex_hull(points: &[(f64, f64)]) -> Loop {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let mut lower: Loop = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2
            && orient2d(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Loop = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2
            && orient2d(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// NFP for a non-convex pair: triangulate both, sum pairwise, union.
fn general_nfp(stat: &[(f64, f64)], orb: &[(f64, f64)]) -> Result<Vec<Loop>> {
    let stat_parts = triangulate(stat);
    let orb_parts = triangulate(orb);
    if stat_parts.is_empty() || orb_parts.is_empty() {
        let sum = minkowski_sum_convex(&convex_hull(stat), &reflect(&convex_hull(orb)))?;
        return Ok(vec![sum]);
    }

    let mut partials: Vec<Loop> = Vec::new();
    for s in &stat_parts {
        for o in &orb_parts {
            if let Ok(sum) = minkowski_sum_convex(s, &reflect(o)) {
                partials.push(sum);
            }
        }
    }
    if partials.is_empty() {
        let sum = minkowski_sum_convex(&convex_hull(stat), &reflect(&convex_hull(orb)))?;
        return Ok(vec![sum]);
    }
    union_loops(&partials)
}

/// Unions partial NFPs and returns the contours of the dominant shape,
/// outer boundary first.
fn union_loops(partials: &[Loop]) -> Result<Vec<Loop>> {
    let mut acc: Vec<Vec<[f64; 2]>> = vec![partials[0]
        .iter()
        .map(|&(x, y)| [x, y])
        .collect()];
    for partial in &partials[1..] {
        let clip: Vec<[f64; 2]> = partial.iter().map(|&(x, y)| [x, y]).collect();
        let shapes = acc.overlay(&[clip], OverlayRule::Union, FillRule::NonZero);
        let merged: Vec<Vec<[f64; 2]>> = shapes
            .into_iter()
            .flatten()
            .filter(|contour| contour.len() >= 3)
            .collect();
        if !merged.is_empty() {
            acc = merged;
        }
    }

    let contours: Vec<Loop> = acc
        .into_iter()
        .map(|contour| contour.into_iter().map(|[x, y]| (x, y)).collect())
        .collect();
    if contours.is_empty() {
        return Err(Error::NfpFailure("union of partial NFPs is empty".into()));
    }
    // Outer boundary is the contour with the largest absolute area; the
    // rest are enclosed pockets.
    let outer = contours
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            signed_ring_area(a)
                .abs()
                .partial_cmp(&signed_ring_area(b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut out = Vec::with_capacity(contours.len());
    out.push(contours[outer].clone());
    for (i, contour) in contours.into_iter().enumerate() {
        if i != outer {
            out.push(contour);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64, side: f64) -> Loop {
        vec![(x, y), (x + side, y), (x + side, y + side), (x, y + side)]
    }

    #[test]
    fn convex_pair_nfp_area() {
        // NFP of two axis-aligned squares is a square of summed side
        // lengths; traced by the orbiting ring's first vertex at (0, 0),
        // centered on the stationary square grown by the orbiting extents.
        let provider = MinkowskiNfp;
        let loops = provider
            .gen_nfp(&square(0.0, 0.0, 10.0), &square(0.0, 0.0, 4.0))
            .unwrap();
        assert_eq!(loops.len(), 1);
        assert_relative_eq!(
            signed_ring_area(&loops[0]).abs(),
            14.0 * 14.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn nfp_covers_touching_positions() {
        let provider = MinkowskiNfp;
        let loops = provider
            .gen_nfp(&square(0.0, 0.0, 10.0), &square(0.0, 0.0, 4.0))
            .unwrap();
        let outer = &loops[0];
        // Orbiting square's first vertex placed at the stationary square's
        // lower-left corner overlaps; far away it does not.
        let (min_x, min_y) = outer
            .iter()
            .fold((f64::MAX, f64::MAX), |acc, p| (acc.0.min(p.0), acc.1.min(p.1)));
        let (max_x, max_y) = outer
            .iter()
            .fold((f64::MIN, f64::MIN), |acc, p| (acc.0.max(p.0), acc.1.max(p.1)));
        assert!(min_x <= -4.0 + 1e-9 && min_y <= -4.0 + 1e-9);
        assert!(max_x >= 10.0 - 1e-9 && max_y >= 10.0 - 1e-9);
    }

    #[test]
    fn rejects_degenerate_loops() {
        let provider = MinkowskiNfp;
        assert!(provider
            .gen_nfp(&[(0.0, 0.0), (1.0, 0.0)], &square(0.0, 0.0, 4.0))
            .is_err());
    }

    #[test]
    fn non_convex_stationary_produces_a_loop() {
        let provider = MinkowskiNfp;
        let u_shape = vec![
            (0.0, 0.0),
            (30.0, 0.0),
            (30.0, 30.0),
            (20.0, 30.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (10.0, 30.0),
            (0.0, 30.0),
        ];
        let loops = provider.gen_nfp(&u_shape, &square(0.0, 0.0, 4.0)).unwrap();
        assert!(!loops.is_empty());
        assert!(loops[0].len() >= 3);
        // The outer loop must at least enclose the stationary outline's
        // bounding box.
        let area = signed_ring_area(&loops[0]).abs();
        assert!(area > 30.0 * 30.0);
    }

    #[test]
    fn hull_is_ccw_and_minimal() {
        let hull = convex_hull(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (5.0, 5.0),
        ]);
        assert_eq!(hull.len(), 4);
        assert!(signed_ring_area(&hull) > 0.0);
    }

    #[test]
    fn triangulation_covers_concave_ring() {
        let l_shape = vec![
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (10.0, 20.0),
            (0.0, 20.0),
        ];
        let tris = triangulate(&l_shape);
        let total: f64 = tris.iter().map(|t| signed_ring_area(t).abs()).sum();
        assert_relative_eq!(total, 300.0, epsilon = 1e-6);
    }
}
