//! Error types used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error)]
pub enum CartelaTypesError {
    /// Geometry conversion error.
    #[error("invalid input geometry: {0}")]
    Conversion(String),
    /// Projection error.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Failure to set up or apply a projection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// The SRS descriptor is not understood by any available projection implementation.
    #[error("unknown spatial reference system: {0}")]
    UnknownSrs(String),
    /// The point lies outside of the domain of the projection.
    #[error("point ({x}, {y}) is outside of the projection domain")]
    OutOfDomain {
        /// X coordinate of the failed point.
        x: f64,
        /// Y coordinate of the failed point.
        y: f64,
    },
    /// None of the sampled points of a rectangle could be projected.
    #[error("bounding box cannot be projected")]
    EmptyBox,
}
