//! R*-tree index over the hole set.
//!
//! Broad-phase pruning for the local search: the tree is bulk-loaded once
//! per search round and answers "which holes' envelopes intersect this
//! envelope" so exact overlap areas are only computed for nearby holes.

use crate::hole::HoleSet;
use geo::{BoundingRect, Polygon};
use rstar::{RTree, RTreeObject, AABB};

#[derive(Debug, Clone)]
struct Entry {
    index: usize,
    aabb: [f64; 4],
}

impl RTreeObject for Entry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.aabb[0], self.aabb[1]], [self.aabb[2], self.aabb[3]])
    }
}

/// Read-only spatial index over a snapshot of the hole set.
#[derive(Debug)]
pub struct HoleIndex {
    tree: RTree<Entry>,
    polygons: Vec<Polygon<f64>>,
}

impl HoleIndex {
    /// Bulk-loads the index from the current holes.
    pub fn build(holes: &HoleSet) -> Self {
        let polygons: Vec<Polygon<f64>> =
            holes.iter().map(|h| h.polygon().clone()).collect();
        let entries: Vec<Entry> = polygons
            .iter()
            .enumerate()
            .filter_map(|(index, p)| {
                let rect = p.bounding_rect()?;
                Some(Entry {
                    index,
                    aabb: [rect.min().x, rect.min().y, rect.max().x, rect.max().y],
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            polygons,
        }
    }

    /// Number of indexed holes.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Holes whose envelope intersects the query envelope.
    pub fn overlapping(
        &self,
        min: [f64; 2],
        max: [f64; 2],
    ) -> impl Iterator<Item = &Polygon<f64>> {
        let envelope = AABB::from_corners(min, max);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(move |e| &self.polygons[e.index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, side: f64) -> Vec<(f64, f64)> {
        vec![(x, y), (x + side, y), (x + side, y + side), (x, y + side)]
    }

    #[test]
    fn query_prunes_far_holes() {
        let mut holes = HoleSet::new();
        holes.add(&square(0.0, 0.0, 10.0));
        holes.add(&square(100.0, 0.0, 10.0));
        holes.add(&square(0.0, 100.0, 10.0));
        let index = HoleIndex::build(&holes);
        assert_eq!(index.len(), 3);

        let near: Vec<_> = index.overlapping([-5.0, -5.0], [15.0, 15.0]).collect();
        assert_eq!(near.len(), 1);

        let all: Vec<_> = index.overlapping([-10.0, -10.0], [200.0, 200.0]).collect();
        assert_eq!(all.len(), 3);

        let none: Vec<_> = index.overlapping([40.0, 40.0], [60.0, 60.0]).collect();
        assert!(none.is_empty());
    }
}
