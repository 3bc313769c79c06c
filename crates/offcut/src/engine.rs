//! The placement engine.
//!
//! Orchestrates one placement round: set the target shape, recompute the
//! free region for the current orientation, seed a starting position,
//! refine it with the local search, and finally commit the pose as a
//! permanent hole. The hole set is owned and mutated exclusively here;
//! everything is synchronous and single-threaded.

use crate::board::Board;
use crate::error::Result;
use crate::free_region::{self, FreeRegionOutcome, RegionParams};
use crate::geom::{self, Ring};
use crate::hole::{HoleFilter, HoleId, HoleSet};
use crate::local_search::{LocalSearch, NeighborMode};
use crate::nfp::{MinkowskiNfp, NfpProvider};
use crate::seed::{self, PreferredPosition};
use crate::shape::{Placement, Shape};
use geo::{Area, ConvexHull, Point, Polygon, Rotate, Translate};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "offcut::engine";

/// Engine configuration. All values can also be adjusted between rounds
/// through [`PlacementEngine::config_mut`]; they take effect at the next
/// [`PlacementEngine::begin`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Clearance kept from the board edge.
    pub edge_offset: f64,
    /// Clearance kept around every hole.
    pub hole_offset: f64,
    /// Directional preference for the starting vertex.
    pub preferred_pos: PreferredPosition,
    /// Seed from the smallest free polygon first.
    pub small_first: bool,
    /// Work with the convex hull of the shape for NFPs and commits.
    pub use_convex_hull: bool,
    /// Use the NFP-exact strategy when a provider is available.
    pub use_nfp: bool,
    /// Neighbor distribution for the local search.
    pub neighbor_mode: NeighborMode,
    /// Seed for the local-search RNG; entropy when `None`.
    pub prng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            edge_offset: 0.0,
            hole_offset: 0.0,
            preferred_pos: PreferredPosition::TopLeft,
            small_first: true,
            use_convex_hull: true,
            use_nfp: true,
            neighbor_mode: NeighborMode::Uniform,
            prng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the board-edge clearance.
    pub fn with_edge_offset(mut self, offset: f64) -> Self {
        self.edge_offset = offset;
        self
    }

    /// Sets the per-hole clearance.
    pub fn with_hole_offset(mut self, offset: f64) -> Self {
        self.hole_offset = offset;
        self
    }

    /// Sets the directional seeding preference.
    pub fn with_preferred_pos(mut self, pref: PreferredPosition) -> Self {
        self.preferred_pos = pref;
        self
    }

    /// Toggles smallest-pocket-first seeding.
    pub fn with_small_first(mut self, small_first: bool) -> Self {
        self.small_first = small_first;
        self
    }

    /// Toggles convex-hull treatment of the shape.
    pub fn with_convex_hull(mut self, use_hull: bool) -> Self {
        self.use_convex_hull = use_hull;
        self
    }

    /// Toggles the NFP-exact strategy.
    pub fn with_nfp(mut self, use_nfp: bool) -> Self {
        self.use_nfp = use_nfp;
        self
    }

    /// Sets the neighbor distribution.
    pub fn with_neighbor_mode(mut self, mode: NeighborMode) -> Self {
        self.neighbor_mode = mode;
        self
    }

    /// Fixes the local-search RNG seed.
    pub fn with_prng_seed(mut self, seed: u64) -> Self {
        self.prng_seed = Some(seed);
        self
    }

    fn region_params(&self) -> RegionParams {
        RegionParams {
            edge_offset: self.edge_offset,
            hole_offset: self.hole_offset,
            use_convex_hull: self.use_convex_hull,
        }
    }
}

/// Sequential per-shape placement engine.
pub struct PlacementEngine {
    board: Board,
    config: EngineConfig,
    holes: HoleSet,
    shape: Option<Shape>,
    placement: Placement,
    free_region: Vec<Polygon<f64>>,
    degraded: Vec<HoleId>,
    search: Option<LocalSearch>,
    provider: Option<Box<dyn NfpProvider>>,
}

impl PlacementEngine {
    /// Creates an engine with the built-in Minkowski NFP provider.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_provider(config, Some(Box::new(MinkowskiNfp)))
    }

    /// Creates an engine with an explicit provider, or none at all.
    /// Without a provider the circle approximation is used for the whole
    /// process lifetime.
    pub fn with_provider(
        config: EngineConfig,
        provider: Option<Box<dyn NfpProvider>>,
    ) -> Self {
        if provider.is_none() {
            log::warn!(
                target: LOG_TARGET,
                "no NFP provider configured, free regions use the circle approximation"
            );
        }
        Self {
            board: Board::default(),
            config,
            holes: HoleSet::new(),
            shape: None,
            placement: Placement::default(),
            free_region: Vec::new(),
            degraded: Vec::new(),
            search: None,
            provider,
        }
    }

    fn invalidate(&mut self) {
        self.free_region.clear();
        self.search = None;
    }

    /// Sets the shape to be placed. Resets the running search; the pose
    /// carries over to the next round.
    pub fn set_shape(&mut self, ring: &[(f64, f64)]) -> Result<()> {
        self.shape = Some(Shape::from_ring(ring)?);
        self.invalidate();
        Ok(())
    }

    /// Resizes the board.
    pub fn set_board_size(&mut self, width: f64, height: f64) {
        self.board.set_size(width, height);
        self.invalidate();
    }

    /// Returns the board dimensions.
    pub fn board_size(&self) -> (f64, f64) {
        self.board.size()
    }

    /// Board outline in counter-clockwise order, closed.
    pub fn board_shape(&self) -> Ring {
        self.board.ring()
    }

    /// Adds a hole, merging it with overlapping holes. Returns `false` on
    /// malformed input, leaving all state unchanged.
    pub fn add_hole(&mut self, ring: &[(f64, f64)]) -> bool {
        let added = self.holes.add(ring);
        if added {
            self.invalidate();
        }
        added
    }

    /// Subtracts a polygon from the hole set.
    pub fn subtract_hole(&mut self, ring: &[(f64, f64)]) {
        self.holes.subtract(ring);
        self.invalidate();
    }

    /// Removes a hole by handle.
    pub fn remove_hole(&mut self, id: HoleId) -> bool {
        let removed = self.holes.remove(id);
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Returns the hole containing the point, if any.
    pub fn query_hole(&self, point: (f64, f64)) -> Option<HoleId> {
        self.holes.query(point)
    }

    /// Hole outlines matching the filter, as closed rings.
    pub fn get_holes(&self, filter: HoleFilter) -> Vec<Ring> {
        self.holes.rings(filter)
    }

    /// Read access to the hole set.
    pub fn holes(&self) -> &HoleSet {
        &self.holes
    }

    /// The current pose.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Sets the rotation angle in degrees for the next round.
    pub fn set_angle(&mut self, angle: f64) {
        self.placement.angle = angle;
        self.invalidate();
    }

    /// Moves the reference point directly.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.placement.x = x;
        self.placement.y = y;
    }

    /// Read access to the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mutable access to the configuration; changes apply at the next
    /// [`begin`](Self::begin).
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Recomputes the free region wholesale, seeds the starting position
    /// and opens a local-search round. Returns `Ok(false)` when the shape
    /// cannot be placed anywhere; [`step`](Self::step) must not be called
    /// after that.
    pub fn begin(&mut self) -> Result<bool> {
        let outcome: FreeRegionOutcome = match self.shape.as_ref() {
            Some(shape) => {
                let provider = if self.config.use_nfp {
                    self.provider.as_deref()
                } else {
                    None
                };
                free_region::compute(
                    &self.board,
                    &mut self.holes,
                    shape,
                    self.placement.angle,
                    &self.config.region_params(),
                    provider,
                )?
            }
            // Before any shape is set the reference point alone roams the
            // board.
            None => free_region::compute_without_shape(
                &self.board,
                &self.holes,
                &self.config.region_params(),
            )?,
        };
        self.free_region = outcome.polygons;
        self.degraded = outcome.degraded;

        let Some(start) = seed::select_start(
            &self.free_region,
            self.config.small_first,
            self.config.preferred_pos,
        ) else {
            self.search = None;
            return Ok(false);
        };
        self.placement.x = start.0;
        self.placement.y = start.1;
        self.search = match self.shape.as_ref() {
            Some(shape) => Some(LocalSearch::new(
                shape,
                self.placement,
                &self.holes,
                self.config.neighbor_mode,
                self.config.prng_seed,
            )?),
            None => None,
        };
        Ok(true)
    }

    /// One local-search step. Returns `true` when the pose improved and
    /// was moved, `false` at a local optimum or outside a round.
    pub fn step(&mut self) -> bool {
        let Some(search) = self.search.as_mut() else {
            return false;
        };
        let moved = search.step();
        if moved {
            self.placement = search.placement();
        }
        moved
    }

    /// Holes that fell back to the circle approximation during the last
    /// free-region computation.
    pub fn last_degraded(&self) -> &[HoleId] {
        &self.degraded
    }

    /// Free-region rings (outer, then inner per polygon), closed; for
    /// display.
    pub fn free_region_rings(&self) -> Vec<Ring> {
        let mut rings = Vec::new();
        for polygon in &self.free_region {
            rings.push(geom::closed_ring(polygon.exterior()));
            for interior in polygon.interiors() {
                rings.push(geom::closed_ring(interior));
            }
        }
        rings
    }

    /// Outline of the shape at the current pose, closed; empty without a
    /// shape.
    pub fn get_shape_oriented(&self) -> Ring {
        self.shape
            .as_ref()
            .map(|s| s.oriented_ring(&self.placement))
            .unwrap_or_default()
    }

    /// Outline of the normalized shape in the input frame, closed.
    pub fn get_shape(&self) -> Ring {
        self.shape
            .as_ref()
            .map(|s| geom::closed_ring(s.in_input_frame().exterior()))
            .unwrap_or_default()
    }

    /// Soft-clearance outline (shape buffered by half its enclosing-circle
    /// radius) at the current pose.
    pub fn get_shape_oriented_dilated(&self) -> Result<Vec<Ring>> {
        let Some(shape) = self.shape.as_ref() else {
            return Ok(Vec::new());
        };
        let inflated = shape
            .inflated()?
            .rotate_around_point(self.placement.angle, Point::new(0.0, 0.0))
            .translate(self.placement.x, self.placement.y);
        Ok(inflated
            .0
            .iter()
            .map(|p| geom::closed_ring(p.exterior()))
            .collect())
    }

    /// Commits the current pose: the shape (or its convex hull) becomes a
    /// permanent placed-shape hole and the search round ends. Returns
    /// `false` without a shape.
    pub fn add_shape_as_hole(&mut self, name: &str) -> bool {
        let Some(shape) = self.shape.as_ref() else {
            return false;
        };
        let oriented = shape.oriented(&self.placement);
        let outline = if self.config.use_convex_hull {
            oriented.convex_hull()
        } else {
            oriented
        };
        let (cx, cy) = shape.circle_center();
        let origin = Point::new(-cx, -cy)
            .rotate_around_point(self.placement.angle, Point::new(0.0, 0.0))
            .translate(self.placement.x, self.placement.y);
        self.holes.add_placed(
            outline,
            name,
            self.placement.position(),
            self.placement.angle,
            (origin.x(), origin.y()),
        );
        self.invalidate();
        true
    }

    /// Names, positions and angles of placed shapes, sorted by x.
    pub fn placed_summaries(&self) -> Vec<(String, (f64, f64), f64)> {
        self.holes.placed_summaries()
    }

    /// Area of an arbitrary outline.
    pub fn area_of(ring: &[(f64, f64)]) -> f64 {
        geom::polygon_from_ring(ring).unsigned_area()
    }
}
