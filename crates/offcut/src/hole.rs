//! Obstacle polygons ("holes") and the set algebra that maintains them.
//!
//! A hole is either an original board defect or a previously placed shape.
//! The set keeps hole interiors pairwise disjoint: adding a polygon merges
//! it with everything it overlaps, subtracting one splits or removes what it
//! cuts. Every hole owns an NFP cache keyed by (shape boundary, hole offset,
//! rotation); merge and split always produce holes with fresh caches, so a
//! cache entry can never outlive the geometry it was computed for.

use crate::geom::{self, Ring};
use geo::{Area, Contains, MultiPolygon, Point, Polygon};
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable handle to a hole in a [`HoleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HoleId(u64);

/// What a hole stands for. The placed-shape fields are metadata only; the
/// set treats both kinds identically.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HoleKind {
    /// An original defect or reserved region of the board.
    Boundary,
    /// A shape committed at a pose.
    Placed {
        name: String,
        position: (f64, f64),
        angle: f64,
        /// The shape's default-frame origin carried to the pose.
        origin: (f64, f64),
    },
}

/// Filter for listing holes by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HoleFilter {
    Boundary,
    Placed,
    #[default]
    All,
}

/// Key for one cached NFP: shape boundary identity, hole offset and
/// rotation angle, quantized so lookups are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NfpSignature {
    shape: u64,
    hole_offset_millis: i64,
    angle_millideg: i64,
}

impl NfpSignature {
    /// Builds a signature from a shape fingerprint, hole offset and angle
    /// in degrees.
    pub fn new(shape_fingerprint: u64, hole_offset: f64, angle: f64) -> Self {
        Self {
            shape: shape_fingerprint,
            hole_offset_millis: (hole_offset * 1000.0).round() as i64,
            angle_millideg: (angle * 1000.0).round() as i64,
        }
    }
}

/// One obstacle polygon with its kind tag and NFP cache.
#[derive(Debug, Clone)]
pub struct Hole {
    id: HoleId,
    polygon: Polygon<f64>,
    kind: HoleKind,
    nfp_cache: HashMap<NfpSignature, MultiPolygon<f64>>,
}

impl Hole {
    fn new(id: HoleId, polygon: Polygon<f64>, kind: HoleKind) -> Self {
        Self {
            id,
            polygon,
            kind,
            nfp_cache: HashMap::new(),
        }
    }

    /// Returns the hole's handle.
    pub fn id(&self) -> HoleId {
        self.id
    }

    /// Returns the hole's outline.
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Returns the kind tag.
    pub fn kind(&self) -> &HoleKind {
        &self.kind
    }

    /// True for holes created from placed shapes.
    pub fn is_placed(&self) -> bool {
        matches!(self.kind, HoleKind::Placed { .. })
    }

    /// Looks up a cached NFP for the exact signature.
    pub fn cached_nfp(&self, signature: &NfpSignature) -> Option<&MultiPolygon<f64>> {
        self.nfp_cache.get(signature)
    }

    /// Stores an NFP under its signature.
    pub fn store_nfp(&mut self, signature: NfpSignature, nfp: MultiPolygon<f64>) {
        self.nfp_cache.insert(signature, nfp);
    }

    /// Drops every cached NFP.
    pub fn clear_nfp_cache(&mut self) {
        self.nfp_cache.clear();
    }

    /// Number of cached NFP entries.
    pub fn cached_nfp_count(&self) -> usize {
        self.nfp_cache.len()
    }
}

/// The set of all obstacle polygons on the board. Board-defect holes keep
/// insertion order and come before placed-shape holes in iteration, queries
/// and merge scans.
#[derive(Debug, Default)]
pub struct HoleSet {
    boundary: Vec<Hole>,
    placed: Vec<Hole>,
    next_id: u64,
}

impl HoleSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> HoleId {
        self.next_id += 1;
        HoleId(self.next_id)
    }

    /// Iterates over all holes, board defects first.
    pub fn iter(&self) -> impl Iterator<Item = &Hole> {
        self.boundary.iter().chain(self.placed.iter())
    }

    /// Number of holes.
    pub fn len(&self) -> usize {
        self.boundary.len() + self.placed.len()
    }

    /// True when the set holds no holes.
    pub fn is_empty(&self) -> bool {
        self.boundary.is_empty() && self.placed.is_empty()
    }

    /// Looks a hole up by handle.
    pub fn get(&self, id: HoleId) -> Option<&Hole> {
        self.iter().find(|h| h.id == id)
    }

    /// Mutable lookup by handle.
    pub fn get_mut(&mut self, id: HoleId) -> Option<&mut Hole> {
        self.boundary
            .iter_mut()
            .chain(self.placed.iter_mut())
            .find(|h| h.id == id)
    }

    /// Handles of all holes in iteration order.
    pub fn ids(&self) -> Vec<HoleId> {
        self.iter().map(|h| h.id).collect()
    }

    /// Adds a hole from its outline, merging it with every existing hole
    /// whose interior it overlaps. Returns `false` and leaves the set
    /// untouched when the outline is degenerate or self-intersecting.
    ///
    /// The merge scans the set as it existed when the call began; a union
    /// that newly overlaps an already-examined hole is not merged again in
    /// the same call.
    pub fn add(&mut self, ring: &[(f64, f64)]) -> bool {
        if geom::validate_ring(ring).is_err() {
            return false;
        }
        let mut merged = geom::orient_ccw(&geom::polygon_from_ring(ring));
        let snapshot = self.ids();
        let mut absorbed: Vec<HoleId> = Vec::new();
        for id in snapshot {
            let Some(hole) = self.get(id) else { continue };
            if !geom::interiors_overlap(&merged, &hole.polygon) {
                continue;
            }
            match geom::try_union(
                &geom::to_multi(merged.clone()),
                &geom::to_multi(hole.polygon.clone()),
            ) {
                Ok(union) => {
                    // Keep the outer boundary only; interiors produced by
                    // the union are discarded.
                    let Some(outer) = union
                        .0
                        .iter()
                        .max_by(|a, b| {
                            a.unsigned_area()
                                .partial_cmp(&b.unsigned_area())
                                .unwrap_or(std::cmp::Ordering::Equal)
                        })
                    else {
                        continue;
                    };
                    merged = Polygon::new(outer.exterior().clone(), Vec::new());
                    absorbed.push(id);
                }
                Err(err) => {
                    log::error!(
                        target: "offcut::holes",
                        "merging hole {id:?} failed, keeping it unmodified: {err}"
                    );
                }
            }
        }
        for id in absorbed {
            self.remove(id);
        }
        let id = self.fresh_id();
        self.boundary.push(Hole::new(id, merged, HoleKind::Boundary));
        true
    }

    /// Subtracts a polygon from the set. A cut fully inside an existing
    /// hole is a no-op; holes fully covered by the cut are removed; holes
    /// it crosses are replaced by their disjoint remainders, each inserted
    /// as a separate hole with an empty NFP cache.
    pub fn subtract(&mut self, ring: &[(f64, f64)]) {
        if ring.len() < 3 {
            return;
        }
        let cut = geom::orient_ccw(&geom::polygon_from_ring(ring));
        if self.iter().any(|h| h.polygon.contains(&cut)) {
            return;
        }
        let mut removed: Vec<HoleId> = Vec::new();
        let mut pieces: Vec<Polygon<f64>> = Vec::new();
        for id in self.ids() {
            let Some(hole) = self.get(id) else { continue };
            if cut.contains(&hole.polygon) {
                removed.push(id);
            } else if geom::interiors_overlap(&cut, &hole.polygon) {
                match geom::try_difference(
                    &geom::to_multi(hole.polygon.clone()),
                    &geom::to_multi(cut.clone()),
                ) {
                    Ok(remainder) => {
                        removed.push(id);
                        pieces.extend(
                            remainder
                                .0
                                .into_iter()
                                .filter(|p| p.unsigned_area() > geom::AREA_EPS),
                        );
                    }
                    Err(err) => {
                        log::error!(
                            target: "offcut::holes",
                            "splitting hole {id:?} failed, keeping it unmodified: {err}"
                        );
                    }
                }
            }
        }
        for id in removed {
            self.remove(id);
        }
        for piece in pieces {
            let id = self.fresh_id();
            self.boundary.push(Hole::new(id, piece, HoleKind::Boundary));
        }
    }

    /// Inserts a placed-shape hole directly.
    pub fn add_placed(
        &mut self,
        polygon: Polygon<f64>,
        name: impl Into<String>,
        position: (f64, f64),
        angle: f64,
        origin: (f64, f64),
    ) -> HoleId {
        let id = self.fresh_id();
        self.placed.push(Hole::new(
            id,
            polygon,
            HoleKind::Placed {
                name: name.into(),
                position,
                angle,
                origin,
            },
        ));
        id
    }

    /// Removes a hole by handle. Returns `true` when it existed.
    pub fn remove(&mut self, id: HoleId) -> bool {
        if let Some(pos) = self.boundary.iter().position(|h| h.id == id) {
            self.boundary.remove(pos);
            return true;
        }
        if let Some(pos) = self.placed.iter().position(|h| h.id == id) {
            self.placed.remove(pos);
            return true;
        }
        false
    }

    /// Linear scan for the first hole strictly containing the point.
    pub fn query(&self, point: (f64, f64)) -> Option<HoleId> {
        let p = Point::new(point.0, point.1);
        self.iter().find(|h| h.polygon.contains(&p)).map(|h| h.id)
    }

    /// Holes matching the filter, in iteration order.
    pub fn of_kind(&self, filter: HoleFilter) -> impl Iterator<Item = &Hole> {
        self.iter().filter(move |h| match filter {
            HoleFilter::Boundary => !h.is_placed(),
            HoleFilter::Placed => h.is_placed(),
            HoleFilter::All => true,
        })
    }

    /// Outlines of holes matching the filter, as closed rings.
    pub fn rings(&self, filter: HoleFilter) -> Vec<Ring> {
        self.of_kind(filter)
            .map(|h| geom::closed_ring(h.polygon.exterior()))
            .collect()
    }

    /// Names, positions and angles of placed-shape holes, sorted by x.
    pub fn placed_summaries(&self) -> Vec<(String, (f64, f64), f64)> {
        let mut out: Vec<(String, (f64, f64), f64)> = self
            .placed
            .iter()
            .filter_map(|h| match &h.kind {
                HoleKind::Placed {
                    name,
                    position,
                    angle,
                    ..
                } => Some((name.clone(), *position, *angle)),
                HoleKind::Boundary => None,
            })
            .collect();
        out.sort_by(|a, b| {
            a.1 .0
                .partial_cmp(&b.1 .0)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64, side: f64) -> Ring {
        vec![(x, y), (x + side, y), (x + side, y + side), (x, y + side)]
    }

    #[test]
    fn add_rejects_invalid_input() {
        let mut set = HoleSet::new();
        assert!(!set.add(&[(0.0, 0.0), (1.0, 0.0)]));
        let bow = vec![(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)];
        assert!(!set.add(&bow));
        assert!(set.is_empty());
    }

    #[test]
    fn overlapping_squares_merge_to_one() {
        let mut set = HoleSet::new();
        assert!(set.add(&square(0.0, 0.0, 100.0)));
        assert!(set.add(&square(50.0, 50.0, 100.0)));
        assert_eq!(set.len(), 1);
        let hole = set.iter().next().unwrap();
        assert_relative_eq!(hole.polygon().unsigned_area(), 17_500.0, epsilon = 1e-6);
    }

    #[test]
    fn touching_squares_stay_separate() {
        let mut set = HoleSet::new();
        assert!(set.add(&square(0.0, 0.0, 10.0)));
        assert!(set.add(&square(10.0, 0.0, 10.0)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn subtract_disjoint_is_a_no_op() {
        let mut set = HoleSet::new();
        set.add(&square(0.0, 0.0, 10.0));
        set.subtract(&square(100.0, 100.0, 10.0));
        assert_eq!(set.len(), 1);
        assert_relative_eq!(
            set.iter().next().unwrap().polygon().unsigned_area(),
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn subtract_contained_cut_is_a_no_op() {
        let mut set = HoleSet::new();
        set.add(&square(0.0, 0.0, 100.0));
        set.subtract(&square(10.0, 10.0, 5.0));
        assert_eq!(set.len(), 1);
        assert_relative_eq!(
            set.iter().next().unwrap().polygon().unsigned_area(),
            10_000.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn subtract_removes_covered_holes() {
        let mut set = HoleSet::new();
        set.add(&square(10.0, 10.0, 5.0));
        set.subtract(&square(0.0, 0.0, 100.0));
        assert!(set.is_empty());
    }

    #[test]
    fn subtract_splits_into_pieces() {
        let mut set = HoleSet::new();
        set.add(&[(0.0, 0.0), (30.0, 0.0), (30.0, 10.0), (0.0, 10.0)]);
        set.subtract(&[(10.0, -5.0), (20.0, -5.0), (20.0, 15.0), (10.0, 15.0)]);
        assert_eq!(set.len(), 2);
        let total: f64 = set.iter().map(|h| h.polygon().unsigned_area()).sum();
        assert_relative_eq!(total, 200.0, epsilon = 1e-6);
    }

    #[test]
    fn query_finds_containing_hole() {
        let mut set = HoleSet::new();
        set.add(&square(0.0, 0.0, 10.0));
        set.add(&square(20.0, 0.0, 10.0));
        let id = set.query((25.0, 5.0)).unwrap();
        let hole = set.get(id).unwrap();
        assert!(hole.polygon().contains(&Point::new(25.0, 5.0)));
        assert!(set.query((15.0, 5.0)).is_none());
    }

    #[test]
    fn merged_hole_has_a_fresh_cache() {
        let mut set = HoleSet::new();
        set.add(&square(0.0, 0.0, 100.0));
        let id = set.ids()[0];
        let sig = NfpSignature::new(42, 0.0, 0.0);
        set.get_mut(id)
            .unwrap()
            .store_nfp(sig, geo::MultiPolygon::new(Vec::new()));
        set.add(&square(50.0, 50.0, 100.0));
        assert_eq!(set.len(), 1);
        let merged = set.iter().next().unwrap();
        assert_eq!(merged.cached_nfp_count(), 0);
    }

    #[test]
    fn pairwise_interiors_stay_disjoint() {
        let mut set = HoleSet::new();
        set.add(&square(0.0, 0.0, 40.0));
        set.add(&square(30.0, 30.0, 40.0));
        set.add(&square(100.0, 0.0, 20.0));
        set.subtract(&square(-5.0, -5.0, 20.0));
        let holes: Vec<_> = set.iter().collect();
        for i in 0..holes.len() {
            for j in (i + 1)..holes.len() {
                assert!(
                    !geom::interiors_overlap(holes[i].polygon(), holes[j].polygon()),
                    "holes {i} and {j} overlap"
                );
            }
        }
    }
}
