//! Free-region computation.
//!
//! The free region is the set of valid reference-point positions for the
//! target shape at its current rotation. Two interchangeable strategies:
//!
//! - **Circle approximation**: board shrunk by the enclosing-circle radius,
//!   holes grown by it. Conservative for non-circular shapes but
//!   rotation-invariant and independent of any NFP provider.
//! - **NFP-exact**: board shrunk to the rotated shape's inner-fit
//!   rectangle; each hole replaced by its no-fit polygon against the
//!   current orientation, cached per hole.
//!
//! NFP construction degenerates on near-duplicate vertices, so each hole
//! runs through a fixed chain of rounding/perturbation attempts; a hole
//! whose chain is exhausted degrades to its circle-grown region and is
//! reported in the outcome.

use crate::board::Board;
use crate::error::{Error, Result};
use crate::geom;
use crate::hole::{HoleId, HoleSet, NfpSignature};
use crate::nfp::NfpProvider;
use crate::shape::{Shape, SIMPLIFY_TOLERANCE};
use geo::{BoundingRect, ConvexHull, MultiPolygon, Polygon, Simplify, Translate};

const LOG_TARGET: &str = "offcut::free_region";

/// Offsets and toggles the computation depends on.
#[derive(Debug, Clone, Copy)]
pub struct RegionParams {
    /// Clearance kept from the board edge.
    pub edge_offset: f64,
    /// Clearance kept around every hole.
    pub hole_offset: f64,
    /// Use the convex hull of the shape as the orbiting outline.
    pub use_convex_hull: bool,
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            edge_offset: 0.0,
            hole_offset: 0.0,
            use_convex_hull: true,
        }
    }
}

/// Result of a free-region computation.
#[derive(Debug, Clone, Default)]
pub struct FreeRegionOutcome {
    /// Disjoint polygons of valid reference-point positions.
    pub polygons: Vec<Polygon<f64>>,
    /// Holes whose NFP chain was exhausted and which fell back to the
    /// circle approximation in this computation.
    pub degraded: Vec<HoleId>,
}

impl FreeRegionOutcome {
    /// True when no valid position exists.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// Recomputes the free region from scratch. With a provider the NFP-exact
/// strategy is used; without one the circle approximation covers every
/// hole.
pub fn compute(
    board: &Board,
    holes: &mut HoleSet,
    shape: &Shape,
    angle: f64,
    params: &RegionParams,
    provider: Option<&dyn NfpProvider>,
) -> Result<FreeRegionOutcome> {
    match provider {
        Some(p) => nfp_region(board, holes, shape, angle, params, p),
        None => circle_region(board, holes, shape, params),
    }
}

/// Region for the reference point alone, before any shape is set: the
/// circle strategy with a zero radius.
pub fn compute_without_shape(
    board: &Board,
    holes: &HoleSet,
    params: &RegionParams,
) -> Result<FreeRegionOutcome> {
    circle_region_with_radius(board, holes, 0.0, params)
}

/// Circle-approximation strategy for the whole board.
fn circle_region(
    board: &Board,
    holes: &HoleSet,
    shape: &Shape,
    params: &RegionParams,
) -> Result<FreeRegionOutcome> {
    circle_region_with_radius(board, holes, shape.circle_radius(), params)
}

fn circle_region_with_radius(
    board: &Board,
    holes: &HoleSet,
    radius: f64,
    params: &RegionParams,
) -> Result<FreeRegionOutcome> {
    let offset = radius + params.edge_offset;
    let region = if offset > 0.0 {
        let Some(shrunk) = geom::shrink_rect((0.0, 0.0), board.size(), offset) else {
            return Ok(FreeRegionOutcome::default());
        };
        shrunk
    } else {
        board.polygon()
    };
    let mut region = geom::to_multi(region);
    for hole in holes.iter() {
        let grown = geom::dilate(hole.polygon(), radius + params.hole_offset, 16)?;
        region = subtract_simplified(region, &grown)?;
    }
    Ok(FreeRegionOutcome {
        polygons: region.0,
        degraded: Vec::new(),
    })
}

/// A single hole grown by the enclosing-circle radius plus clearance.
fn circle_grown(
    hole: &Polygon<f64>,
    shape: &Shape,
    params: &RegionParams,
) -> Result<MultiPolygon<f64>> {
    geom::dilate(hole, shape.circle_radius() + params.hole_offset, 16)
}

/// NFP-exact strategy, degrading per hole when the attempt chain fails.
fn nfp_region(
    board: &Board,
    holes: &mut HoleSet,
    shape: &Shape,
    angle: f64,
    params: &RegionParams,
    provider: &dyn NfpProvider,
) -> Result<FreeRegionOutcome> {
    let rotated = shape.rotated(angle);
    let Some(bounds) = rotated.bounding_rect() else {
        return Ok(FreeRegionOutcome::default());
    };
    let (w, h) = board.size();
    // Inner-fit rectangle for the reference point at this rotation.
    let min = (-bounds.min().x, -bounds.min().y);
    let max = (w - bounds.max().x, h - bounds.max().y);
    if max.0 <= min.0 || max.1 <= min.1 {
        return Ok(FreeRegionOutcome::default());
    }
    let Some(shrunk) = geom::shrink_rect(min, max, params.edge_offset) else {
        return Ok(FreeRegionOutcome::default());
    };

    let mut region = geom::to_multi(shrunk);
    let mut degraded = Vec::new();
    for id in holes.ids() {
        let blocked = match nfp_for_hole(holes, id, shape, angle, params, provider) {
            Ok(nfp) => nfp,
            Err(err) => {
                log::error!(
                    target: LOG_TARGET,
                    "couldn't compute NFP for hole {id:?}, falling back to circle: {err}"
                );
                degraded.push(id);
                let outline = holes
                    .get(id)
                    .ok_or_else(|| Error::NfpFailure(format!("hole {id:?} vanished")))?
                    .polygon()
                    .clone();
                circle_grown(&outline, shape, params)?
            }
        };
        region = subtract_simplified(region, &blocked)?;
    }
    Ok(FreeRegionOutcome {
        polygons: region.0,
        degraded,
    })
}

fn subtract_simplified(
    region: MultiPolygon<f64>,
    blocked: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>> {
    let remaining = geom::try_difference(&region, blocked)?;
    Ok(MultiPolygon::new(geom::simplified_parts(
        &remaining,
        SIMPLIFY_TOLERANCE,
    )))
}

/// One rounding/perturbation configuration of the retry chain.
#[derive(Debug, Clone, Copy)]
struct NfpAttempt {
    /// Re-round the hole ring at this precision before the call.
    hole_decimals: Option<i32>,
    /// Cast both rings to integer coordinates.
    integer: bool,
    /// Nudge the hole ring's shared start/end vertex off its neighbors.
    perturb: bool,
}

/// The fixed fallback chain, tried in order until one attempt succeeds.
const ATTEMPTS: [NfpAttempt; 4] = [
    NfpAttempt { hole_decimals: None, integer: false, perturb: true },
    NfpAttempt { hole_decimals: Some(-1), integer: false, perturb: true },
    NfpAttempt { hole_decimals: None, integer: true, perturb: true },
    NfpAttempt { hole_decimals: None, integer: true, perturb: false },
];

/// Offset applied to the hole ring's start/end vertex to break the
/// degenerate shared-vertex configuration.
const PERTURBATION: (f64, f64) = (1.0, 1.0);

/// Cached-or-fresh NFP for one hole, dilated by the hole clearance and
/// translated into reference-point coordinates.
fn nfp_for_hole(
    holes: &mut HoleSet,
    id: HoleId,
    shape: &Shape,
    angle: f64,
    params: &RegionParams,
    provider: &dyn NfpProvider,
) -> Result<MultiPolygon<f64>> {
    let signature = NfpSignature::new(shape.fingerprint(), params.hole_offset, angle);
    let hole = holes
        .get(id)
        .ok_or_else(|| Error::NfpFailure(format!("hole {id:?} vanished")))?;
    if let Some(cached) = hole.cached_nfp(&signature) {
        return Ok(cached.clone());
    }

    let rotated = shape.rotated(angle);
    let orbiting_poly = if params.use_convex_hull {
        rotated.convex_hull()
    } else {
        rotated
    };
    let orbiting = geom::closed_ring(geom::orient_ccw(&orbiting_poly).exterior());
    let anchor = orbiting[0];

    let simplified = geom::orient_ccw(&hole.polygon().simplify(&SIMPLIFY_TOLERANCE));
    let base_ring = geom::round_ring(&geom::closed_ring(simplified.exterior()), 0);
    if base_ring.len() < 4 {
        // Simplification collapsed the hole outline.
        return Err(Error::NfpFailure("hole outline degenerated".into()));
    }

    for (attempt_no, attempt) in ATTEMPTS.iter().enumerate() {
        let mut stationary = match attempt.hole_decimals {
            Some(decimals) => geom::round_ring(&base_ring, decimals),
            None => base_ring.clone(),
        };
        let mut orbiting = orbiting.clone();
        if attempt.integer {
            stationary = geom::int_ring(&stationary);
            orbiting = geom::int_ring(&orbiting);
        }
        if attempt.perturb {
            let last = stationary.len() - 1;
            stationary[0].0 += PERTURBATION.0;
            stationary[0].1 += PERTURBATION.1;
            stationary[last] = stationary[0];
        }

        let loops = match provider.gen_nfp(&stationary, &orbiting) {
            Ok(loops) if !loops.is_empty() && loops[0].len() >= 3 => loops,
            Ok(_) => {
                log::debug!(
                    target: LOG_TARGET,
                    "NFP attempt {attempt_no} for hole {id:?} returned no usable outer loop"
                );
                continue;
            }
            Err(err) => {
                log::debug!(
                    target: LOG_TARGET,
                    "NFP attempt {attempt_no} for hole {id:?} failed: {err}"
                );
                continue;
            }
        };

        let discarded = loops[1..].iter().filter(|l| l.len() < 3).count();
        if discarded > 0 {
            log::warn!(
                target: LOG_TARGET,
                "discarding {discarded} degenerate interior loop(s) of the NFP for hole {id:?}"
            );
        }
        let interiors: Vec<Vec<(f64, f64)>> = loops[1..]
            .iter()
            .filter(|l| l.len() >= 3)
            .cloned()
            .collect();
        let nfp_polygon = geom::orient_ccw(&geom::polygon_from_rings(&loops[0], &interiors));

        let dilated = match geom::dilate(&nfp_polygon, params.hole_offset, 2) {
            Ok(mp) => mp,
            Err(err) => {
                log::debug!(
                    target: LOG_TARGET,
                    "dilating NFP attempt {attempt_no} for hole {id:?} failed: {err}"
                );
                continue;
            }
        };
        let positioned = dilated.translate(-anchor.0, -anchor.1);

        let hole = holes
            .get_mut(id)
            .ok_or_else(|| Error::NfpFailure(format!("hole {id:?} vanished")))?;
        hole.store_nfp(signature, positioned.clone());
        return Ok(positioned);
    }
    Err(Error::NfpFailure("all retry attempts exhausted".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfp::MinkowskiNfp;
    use geo::Area;

    fn shape_square(side: f64) -> Shape {
        Shape::from_ring(&[(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)]).unwrap()
    }

    #[test]
    fn empty_board_circle_region_is_shrunk_rect() {
        let board = Board::new(200.0, 100.0);
        let mut holes = HoleSet::new();
        let shape = shape_square(10.0);
        let outcome = compute(
            &board,
            &mut holes,
            &shape,
            0.0,
            &RegionParams::default(),
            None,
        )
        .unwrap();
        assert_eq!(outcome.polygons.len(), 1);
        let r = shape.circle_radius();
        let expected = (200.0 - 2.0 * r) * (100.0 - 2.0 * r);
        let area = outcome.polygons[0].unsigned_area();
        assert!((area - expected).abs() < 1.0, "area {area} vs {expected}");
    }

    #[test]
    fn empty_board_nfp_region_is_inner_fit_rect() {
        let board = Board::new(200.0, 100.0);
        let mut holes = HoleSet::new();
        let shape = shape_square(10.0);
        let provider = MinkowskiNfp;
        let outcome = compute(
            &board,
            &mut holes,
            &shape,
            0.0,
            &RegionParams::default(),
            Some(&provider),
        )
        .unwrap();
        assert_eq!(outcome.polygons.len(), 1);
        // Reference point can roam a (w - 10) x (h - 10) rectangle.
        let area = outcome.polygons[0].unsigned_area();
        assert!((area - 190.0 * 90.0).abs() < 1.0, "area {area}");
    }

    #[test]
    fn hole_blocks_more_under_circle_than_under_nfp() {
        let board = Board::new(400.0, 400.0);
        let shape = shape_square(20.0);
        let params = RegionParams::default();
        let hole_ring = [
            (180.0, 180.0),
            (220.0, 180.0),
            (220.0, 220.0),
            (180.0, 220.0),
        ];

        let mut holes = HoleSet::new();
        holes.add(&hole_ring);
        let circle = compute(&board, &mut holes, &shape, 0.0, &params, None).unwrap();

        let mut holes = HoleSet::new();
        holes.add(&hole_ring);
        let provider = MinkowskiNfp;
        let exact = compute(&board, &mut holes, &shape, 0.0, &params, Some(&provider)).unwrap();

        let circle_area: f64 = circle.polygons.iter().map(|p| p.unsigned_area()).sum();
        let exact_area: f64 = exact.polygons.iter().map(|p| p.unsigned_area()).sum();
        assert!(
            exact_area > circle_area,
            "NFP region {exact_area} should beat circle region {circle_area}"
        );
        assert!(exact.degraded.is_empty());
    }

    #[test]
    fn nfp_result_is_cached_per_hole() {
        let board = Board::new(400.0, 400.0);
        let shape = shape_square(20.0);
        let params = RegionParams::default();
        let mut holes = HoleSet::new();
        holes.add(&[
            (100.0, 100.0),
            (150.0, 100.0),
            (150.0, 150.0),
            (100.0, 150.0),
        ]);
        let provider = MinkowskiNfp;
        compute(&board, &mut holes, &shape, 0.0, &params, Some(&provider)).unwrap();
        let id = holes.ids()[0];
        assert_eq!(holes.get(id).unwrap().cached_nfp_count(), 1);
        // Another angle adds a second entry.
        compute(&board, &mut holes, &shape, 90.0, &params, Some(&provider)).unwrap();
        assert_eq!(holes.get(id).unwrap().cached_nfp_count(), 2);
    }

    #[test]
    fn oversized_shape_yields_empty_region() {
        let board = Board::new(50.0, 50.0);
        let mut holes = HoleSet::new();
        let shape = shape_square(80.0);
        let provider = MinkowskiNfp;
        let outcome = compute(
            &board,
            &mut holes,
            &shape,
            0.0,
            &RegionParams::default(),
            Some(&provider),
        )
        .unwrap();
        assert!(outcome.is_empty());
    }
}
