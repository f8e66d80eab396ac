//! Cartela is a declarative 2D map renderer. A [`Map`] describes what to draw: layers of
//! features from datasources, styles made of rules, and symbolizers saying how matching features
//! look. A [`Renderer`] turns the map into an anti-aliased RGBA [`Surface`](raster::Surface)
//! that can then be encoded into PNG, JPEG or TIFF files.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cartela::cartela_types::Point2d;
//! use cartela::datasource::MemoryDatasource;
//! use cartela::feature::Feature;
//! use cartela::map::Layer;
//! use cartela::raster::Surface;
//! use cartela::style::{Rule, Style};
//! use cartela::symbolizer::MarkerSymbolizer;
//! use cartela::{Color, MapBuilder, Renderer};
//!
//! let cities = MemoryDatasource::new(vec![
//!     Feature::new(1).with_geometry(Point2d::new(126.98, 37.57)),
//! ]);
//! let map = MapBuilder::default()
//!     .with_size(512, 256)
//!     .with_background(Color::WHITE)
//!     .with_style(
//!         "cities",
//!         Style::new().with_rule(
//!             Rule::new().with_symbolizer(MarkerSymbolizer::ellipse(8.0, 8.0, Color::RED)),
//!         ),
//!     )
//!     .with_layer(
//!         Layer::new("cities")
//!             .with_style("cities")
//!             .with_datasource(Arc::new(cities)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut surface = Surface::new(512, 256).unwrap();
//! let report = Renderer::new().render(&map, &mut surface).unwrap();
//! assert!(report.is_complete());
//! ```
//!
//! # Main components
//!
//! * [`Map`] holds the image size, the SRS and extent, [`layers`](map::Layer) and named
//!   [`styles`](style).
//! * [`datasource`]s provide [`features`](feature) for layer queries. Datasources can be
//!   attached to layers directly or created by plugin name from a
//!   [`DatasourceRegistry`](datasource::DatasourceRegistry).
//! * [`expression`]s select features for rules and compute symbolizer parameters.
//! * [`symbolizer`]s are drawn through the [`geometry`] pipeline into the [`raster`] canvas.
//!   Point symbols and [`label`]s share a collision detector.
//! * The [`Renderer`] ties everything together and returns a [`RenderReport`] with the problems
//!   it skipped over.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

mod color;
pub mod datasource;
#[cfg(feature = "image")]
pub mod encode;
pub mod error;
pub mod expression;
pub mod feature;
pub mod geometry;
pub mod grid;
pub mod image_cache;
pub mod label;
pub mod map;
pub mod raster;
pub mod render;
pub mod style;
pub mod symbolizer;
pub mod view;

pub use color::Color;
pub use error::CartelaError;
pub use map::{Layer, Map, MapBuilder};
pub use render::{RenderOptions, RenderReport, Renderer};

// Reexport cartela_types
pub use cartela_types;
