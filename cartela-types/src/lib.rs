//! Geometric primitives shared by the cartela renderer: [`Box2d`] rectangles, [`Geom`]
//! geometries, spatial reference descriptors and [`Projection`]s between them.
//!
//! Geometries are stored in whatever SRS their datasource declares. Nothing in this crate knows
//! about pixels; the view transform and everything after it live in `cartela` itself.

mod bbox;
pub mod error;
pub mod geometry;
pub mod projection;

#[cfg(feature = "geo-types")]
mod geo_types;

pub use bbox::Box2d;
pub use error::{CartelaTypesError, ProjectionError};
pub use geometry::{Geom, GeometryType, LineString, Polygon};
pub use projection::{
    BuiltinProjections, IdentityProjection, ProjTransform, Projection, ProjectionFactory, Srs,
    WebMercator,
};

/// 2d point with `f64` coordinates.
pub type Point2d = nalgebra::Point2<f64>;

/// 2d vector with `f64` coordinates.
pub type Vector2d = nalgebra::Vector2<f64>;
