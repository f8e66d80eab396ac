//! Error types used by the crate.

use cartela_types::ProjectionError;
use thiserror::Error;

use crate::datasource::DatasourceError;
#[cfg(feature = "image")]
use crate::encode::EncodeError;
use crate::expression::ExpressionError;
use crate::image_cache::ResourceError;
use crate::raster::RasterError;

/// Cartela error type.
#[derive(Debug, Error)]
pub enum CartelaError {
    /// Malformed expression or filter.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    /// Datasource failure.
    #[error(transparent)]
    Datasource(#[from] DatasourceError),
    /// Projection setup or transformation failure.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    /// Rasterizer failure, e.g. allocation failure while building scanlines.
    #[error(transparent)]
    Raster(#[from] RasterError),
    /// External resource (image, font) could not be loaded.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// Image encoding failure.
    #[cfg(feature = "image")]
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Invalid map or style configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Invalid arguments given to the renderer, e.g. zero-sized surface.
    #[error("invalid render arguments: {0}")]
    InvalidArguments(String),
}
