//! Stochastic hill climbing over (x, y, angle).
//!
//! The fitness landscape is discontinuous and non-convex, so refinement is
//! a plain best-of-neighborhood climb: sample a fixed number of random
//! neighbors around the current pose, move only on a strict improvement.
//! Termination is the caller's loop: repeat [`LocalSearch::step`] until it
//! reports no improvement or a step budget runs out.

use crate::error::Result;
use crate::hole::HoleSet;
use crate::shape::{Placement, Shape};
use crate::spatial_index::HoleIndex;
use geo::{BoundingRect, MultiPolygon, Point, Rotate, Translate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of random neighbors evaluated per step.
pub const NEIGHBORHOOD_SIZE: usize = 20;

/// Half-width of the uniform perturbation.
const UNIFORM_SPAN: f64 = 10.0;

/// Standard deviation of the Gaussian perturbation.
const GAUSS_SIGMA: f64 = 3.0;

/// Distribution the neighbor perturbations are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NeighborMode {
    /// Independent draws from U(−10, 10).
    #[default]
    Uniform,
    /// Independent draws from N(0, 3).
    Gauss,
}

/// One refinement round for a fixed shape and hole snapshot.
#[derive(Debug)]
pub struct LocalSearch {
    shape: MultiPolygon<f64>,
    inflated: MultiPolygon<f64>,
    placement: Placement,
    index: HoleIndex,
    mode: NeighborMode,
    rng: StdRng,
    best_fitness: f64,
}

impl LocalSearch {
    /// Builds a search round: buffers the shape for the soft-clearance
    /// term and bulk-loads the spatial index over the current holes.
    pub fn new(
        shape: &Shape,
        placement: Placement,
        holes: &HoleSet,
        mode: NeighborMode,
        seed: Option<u64>,
    ) -> Result<Self> {
        let inflated = shape.inflated()?;
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            shape: MultiPolygon::new(vec![shape.polygon().clone()]),
            inflated,
            placement,
            index: HoleIndex::build(holes),
            mode,
            rng,
            best_fitness: f64::NEG_INFINITY,
        })
    }

    /// The current pose.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Fitness of the last accepted move, `-inf` before the first one.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Total overlap area between the given geometry at a pose and every
    /// hole whose envelope intersects it.
    fn overlap_area(&self, parts: &MultiPolygon<f64>, placement: &Placement) -> f64 {
        let moved = parts
            .rotate_around_point(placement.angle, Point::new(0.0, 0.0))
            .translate(placement.x, placement.y);
        let Some(rect) = moved.bounding_rect() else {
            return 0.0;
        };
        let mut area = 0.0;
        for hole in self.index.overlapping(
            [rect.min().x, rect.min().y],
            [rect.max().x, rect.max().y],
        ) {
            area += crate::geom::overlap_area(&moved, hole);
        }
        area
    }

    /// Fitness of a pose. Colliding poses rank by decreasing collision
    /// area and are always below any collision-free pose; collision-free
    /// poses rank by the soft-clearance overlap of the inflated shape.
    pub fn fitness(&self, placement: &Placement) -> f64 {
        let exact = self.overlap_area(&self.shape, placement);
        let inflated = self.overlap_area(&self.inflated, placement);
        if exact == 0.0 {
            inflated
        } else {
            -exact
        }
    }

    fn draw(&mut self) -> f64 {
        match self.mode {
            NeighborMode::Uniform => self.rng.gen_range(-UNIFORM_SPAN..UNIFORM_SPAN),
            NeighborMode::Gauss => {
                let z: f64 = self.rng.sample(StandardNormal);
                z * GAUSS_SIGMA
            }
        }
    }

    fn neighbor(&mut self) -> Placement {
        Placement {
            x: self.placement.x + self.draw(),
            y: self.placement.y + self.draw(),
            angle: self.placement.angle + self.draw(),
        }
    }

    /// Evaluates the current pose and [`NEIGHBORHOOD_SIZE`] neighbors.
    /// Moves to the best neighbor when it strictly beats everything seen
    /// before it; returns `false` (and leaves the pose unchanged) when the
    /// incumbent wins.
    pub fn step(&mut self) -> bool {
        let mut candidates = Vec::with_capacity(NEIGHBORHOOD_SIZE + 1);
        candidates.push(self.placement);
        for _ in 0..NEIGHBORHOOD_SIZE {
            let n = self.neighbor();
            candidates.push(n);
        }
        let mut best_index = 0;
        let mut best_value = self.fitness(&candidates[0]);
        for (i, candidate) in candidates.iter().enumerate().skip(1) {
            let value = self.fitness(candidate);
            if value > best_value {
                best_index = i;
                best_value = value;
            }
        }
        if best_index == 0 {
            return false;
        }
        self.placement = candidates[best_index];
        self.best_fitness = best_value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, side: f64) -> Vec<(f64, f64)> {
        vec![(x, y), (x + side, y), (x + side, y + side), (x, y + side)]
    }

    fn shape() -> Shape {
        Shape::from_ring(&square(0.0, 0.0, 10.0)).unwrap()
    }

    fn holes_with_one_square() -> HoleSet {
        let mut holes = HoleSet::new();
        holes.add(&square(100.0, 100.0, 40.0));
        holes
    }

    #[test]
    fn colliding_pose_ranks_below_clear_pose() {
        let holes = holes_with_one_square();
        let search = LocalSearch::new(
            &shape(),
            Placement::new(0.0, 0.0, 0.0),
            &holes,
            NeighborMode::Uniform,
            Some(7),
        )
        .unwrap();
        // Dead center of the hole vs far away.
        let colliding = search.fitness(&Placement::new(120.0, 120.0, 0.0));
        let clear = search.fitness(&Placement::new(300.0, 300.0, 0.0));
        assert!(colliding < 0.0);
        assert!(clear >= 0.0);
        assert!(colliding < clear);
    }

    #[test]
    fn clear_pose_with_more_soft_overlap_ranks_higher() {
        let holes = holes_with_one_square();
        let search = LocalSearch::new(
            &shape(),
            Placement::new(0.0, 0.0, 0.0),
            &holes,
            NeighborMode::Uniform,
            Some(7),
        )
        .unwrap();
        // Just outside the hole: exact overlap 0, inflated overlap > 0.
        let hugging = search.fitness(&Placement::new(92.0, 120.0, 0.0));
        let distant = search.fitness(&Placement::new(300.0, 300.0, 0.0));
        assert!(hugging > 0.0, "hugging fitness {hugging}");
        assert_eq!(distant, 0.0);
        assert!(hugging > distant);
    }

    #[test]
    fn step_is_reproducible_with_a_seed() {
        let holes = holes_with_one_square();
        let run = |seed| {
            let mut s = LocalSearch::new(
                &shape(),
                Placement::new(120.0, 120.0, 0.0),
                &holes,
                NeighborMode::Gauss,
                Some(seed),
            )
            .unwrap();
            for _ in 0..10 {
                if !s.step() {
                    break;
                }
            }
            s.placement()
        };
        let a = run(42);
        let b = run(42);
        assert_eq!(a, b);
    }

    #[test]
    fn steps_never_increase_exact_overlap() {
        let holes = holes_with_one_square();
        let mut search = LocalSearch::new(
            &shape(),
            Placement::new(120.0, 120.0, 0.0),
            &holes,
            NeighborMode::Uniform,
            Some(99),
        )
        .unwrap();
        let exact_at = |s: &LocalSearch, p: &Placement| {
            s.overlap_area(&s.shape, p)
        };
        let mut last = exact_at(&search, &search.placement());
        for _ in 0..30 {
            let moved = search.step();
            let now = exact_at(&search, &search.placement());
            assert!(now <= last + 1e-9, "overlap grew from {last} to {now}");
            last = now;
            if !moved {
                break;
            }
        }
    }

    #[test]
    fn step_reports_no_improvement_at_a_local_optimum() {
        // No holes at all: every pose scores 0, the incumbent always wins.
        let holes = HoleSet::new();
        let mut search = LocalSearch::new(
            &shape(),
            Placement::new(50.0, 50.0, 0.0),
            &holes,
            NeighborMode::Uniform,
            Some(5),
        )
        .unwrap();
        assert!(!search.step());
        assert_eq!(search.placement(), Placement::new(50.0, 50.0, 0.0));
    }
}
