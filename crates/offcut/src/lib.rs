//! # Offcut
//!
//! Irregular 2-D placement engine for packing and cutting layouts: places a
//! target polygon onto a bounded board that already contains obstacle
//! regions ("holes"), minimizing overlap and material waste.
//!
//! ## Core Components
//!
//! - **[`HoleSet`]**: obstacle polygons with merge-on-add / split-on-
//!   subtract algebra and a per-hole NFP cache
//! - **[`free_region`]**: placeable region for the current orientation,
//!   NFP-exact with a circle-approximation fallback chain
//! - **[`PreferredPosition`]**: directional seeding of the start vertex
//! - **[`LocalSearch`]**: stochastic hill climbing over (x, y, angle)
//! - **[`PlacementEngine`]**: orchestrates set-shape → free region → seed →
//!   refine → commit-as-hole
//!
//! ## Quick Start
//!
//! ```rust
//! use offcut::{EngineConfig, HoleFilter, PlacementEngine};
//!
//! let mut engine = PlacementEngine::new(EngineConfig::new().with_prng_seed(7));
//! engine.set_board_size(600.0, 400.0);
//!
//! // A board defect placement has to avoid.
//! assert!(engine.add_hole(&[
//!     (100.0, 100.0),
//!     (200.0, 100.0),
//!     (200.0, 200.0),
//!     (100.0, 200.0),
//! ]));
//!
//! // The part to place.
//! engine.set_shape(&[(0.0, 0.0), (80.0, 0.0), (80.0, 60.0), (0.0, 60.0)])?;
//!
//! if engine.begin()? {
//!     for _ in 0..50 {
//!         if !engine.step() {
//!             break; // local optimum
//!         }
//!     }
//!     engine.add_shape_as_hole("panel-1");
//! }
//! assert_eq!(engine.get_holes(HoleFilter::Placed).len(), 1);
//! # Ok::<(), offcut::Error>(())
//! ```
//!
//! ## Strategy Selection
//!
//! With an [`NfpProvider`] (the built-in [`MinkowskiNfp`] by default) free
//! regions are exact no-fit polygons, cached per hole and per orientation.
//! Without one, or with `use_nfp` off, every hole is grown by the shape's
//! enclosing-circle radius instead: conservative, but rotation-invariant
//! and immune to NFP degeneracies. A hole whose NFP cannot be computed
//! after the built-in retry chain degrades to the circle region on its own,
//! without affecting the other holes.
//!
//! ## Feature Flags
//!
//! - `serde`: serialization for the plain configuration and pose types

pub mod board;
pub mod circle;
pub mod engine;
pub mod error;
pub mod free_region;
pub mod geom;
pub mod hole;
pub mod local_search;
pub mod nfp;
pub mod seed;
pub mod shape;
pub mod spatial_index;

// Re-exports
pub use board::Board;
pub use engine::{EngineConfig, PlacementEngine};
pub use error::{Error, Result};
pub use free_region::{FreeRegionOutcome, RegionParams};
pub use hole::{Hole, HoleFilter, HoleId, HoleKind, HoleSet, NfpSignature};
pub use local_search::{LocalSearch, NeighborMode, NEIGHBORHOOD_SIZE};
pub use nfp::{MinkowskiNfp, NfpProvider};
pub use seed::PreferredPosition;
pub use shape::{Placement, Shape};
pub use spatial_index::HoleIndex;
