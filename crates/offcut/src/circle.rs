//! Smallest enclosing circle.
//!
//! Incremental construction over a shuffled point sequence, expected linear
//! time. The circle center is the reference point every placement transform
//! is anchored to, so the computation lives here rather than behind a trait.
//!
//! ## References
//!
//! - Welzl, E. (1991). "Smallest enclosing disks (balls and ellipsoids)",
//!   LNCS 555.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// A circle as `(center_x, center_y, radius)`.
pub type Circle = (f64, f64, f64);

const RELATIVE_EPS: f64 = 1e-10;

fn contains(c: Circle, p: (f64, f64)) -> bool {
    let dx = p.0 - c.0;
    let dy = p.1 - c.1;
    (dx * dx + dy * dy).sqrt() <= c.2 * (1.0 + RELATIVE_EPS) + RELATIVE_EPS
}

fn from_diameter(a: (f64, f64), b: (f64, f64)) -> Circle {
    let cx = (a.0 + b.0) / 2.0;
    let cy = (a.1 + b.1) / 2.0;
    let r = ((a.0 - cx).powi(2) + (a.1 - cy).powi(2)).sqrt();
    (cx, cy, r)
}

fn circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<Circle> {
    // Relative to a midpoint for numerical stability.
    let ox = (a.0.min(b.0).min(c.0) + a.0.max(b.0).max(c.0)) / 2.0;
    let oy = (a.1.min(b.1).min(c.1) + a.1.max(b.1).max(c.1)) / 2.0;
    let (ax, ay) = (a.0 - ox, a.1 - oy);
    let (bx, by) = (b.0 - ox, b.1 - oy);
    let (cx, cy) = (c.0 - ox, c.1 - oy);
    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < f64::EPSILON {
        return None;
    }
    let x = ((ax * ax + ay * ay) * (by - cy)
        + (bx * bx + by * by) * (cy - ay)
        + (cx * cx + cy * cy) * (ay - by))
        / d;
    let y = ((ax * ax + ay * ay) * (cx - bx)
        + (bx * bx + by * by) * (ax - cx)
        + (cx * cx + cy * cy) * (bx - ax))
        / d;
    let center = (ox + x, oy + y);
    let r = [a, b, c]
        .iter()
        .map(|p| ((p.0 - center.0).powi(2) + (p.1 - center.1).powi(2)).sqrt())
        .fold(0.0, f64::max);
    Some((center.0, center.1, r))
}

fn with_two_points(points: &[(f64, f64)], p: (f64, f64), q: (f64, f64)) -> Circle {
    let base = from_diameter(p, q);
    let mut left: Option<Circle> = None;
    let mut right: Option<Circle> = None;
    let (px, py) = p;
    let (qx, qy) = q;
    for &r in points {
        if contains(base, r) {
            continue;
        }
        let cross = (qx - px) * (r.1 - py) - (qy - py) * (r.0 - px);
        let Some(c) = circumcircle(p, q, r) else {
            continue;
        };
        let c_cross = (qx - px) * (c.1 - py) - (qy - py) * (c.0 - px);
        if cross > 0.0 && left.map_or(true, |l| {
            c_cross > (qx - px) * (l.1 - py) - (qy - py) * (l.0 - px)
        }) {
            left = Some(c);
        } else if cross < 0.0 && right.map_or(true, |l| {
            c_cross < (qx - px) * (l.1 - py) - (qy - py) * (l.0 - px)
        }) {
            right = Some(c);
        }
    }
    match (left, right) {
        (None, None) => base,
        (Some(l), None) => l,
        (None, Some(r)) => r,
        (Some(l), Some(r)) => {
            if l.2 <= r.2 {
                l
            } else {
                r
            }
        }
    }
}

fn with_one_point(points: &[(f64, f64)], p: (f64, f64)) -> Circle {
    let mut c: Circle = (p.0, p.1, 0.0);
    for (i, &q) in points.iter().enumerate() {
        if !contains(c, q) {
            c = if c.2 == 0.0 {
                from_diameter(p, q)
            } else {
                with_two_points(&points[..=i], p, q)
            };
        }
    }
    c
}

/// Returns the smallest circle enclosing all points as
/// `(center_x, center_y, radius)`. An empty input yields a zero circle.
///
/// The shuffle seed is fixed so normalization of the same shape is
/// reproducible across runs; the result itself is order-independent.
pub fn smallest_enclosing_circle(points: &[(f64, f64)]) -> Circle {
    let mut pts = points.to_vec();
    pts.dedup();
    if pts.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let mut rng = StdRng::seed_from_u64(0x9E37_79B9_7F4A_7C15);
    pts.shuffle(&mut rng);
    let mut c: Option<Circle> = None;
    for i in 0..pts.len() {
        let p = pts[i];
        if c.map_or(true, |c| !contains(c, p)) {
            c = Some(with_one_point(&pts[..=i], p));
        }
    }
    c.unwrap_or((0.0, 0.0, 0.0))
}
