//! Error types shared across the engine.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the placement engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed, degenerate or self-intersecting polygon input.
    #[error("invalid polygon: {0}")]
    InvalidPolygon(String),

    /// No NFP provider is configured; exact free regions cannot be computed.
    #[error("no NFP provider available")]
    NfpUnavailable,

    /// A single NFP computation attempt failed.
    #[error("NFP computation failed: {0}")]
    NfpFailure(String),

    /// The geometry kernel faulted on a boolean operation.
    #[error("degenerate geometry in kernel operation: {0}")]
    DegenerateGeometry(String),

    /// The free region is empty; the shape cannot be placed.
    #[error("free region is empty")]
    EmptyFreeRegion,
}
