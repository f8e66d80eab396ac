//! Datasources provide features to layers.
//!
//! The renderer talks to datasources only through the [`Datasource`] trait. Concrete
//! implementations are either attached to a layer directly or created by name through the
//! [`DatasourceRegistry`].

use std::collections::BTreeSet;

use cartela_types::Box2d;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expression::Value;
use crate::feature::Feature;

mod memory;
mod registry;

pub use memory::MemoryDatasource;
pub use registry::{DatasourceFactory, DatasourceRegistry, Parameters};

/// Error returned by datasources.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DatasourceError {
    /// No plugin with the given name is registered.
    #[error("datasource plugin '{0}' is not registered")]
    UnknownPlugin(String),
    /// Parameters given to a plugin are invalid.
    #[error("invalid datasource parameters: {0}")]
    InvalidParameters(String),
    /// Query failed.
    #[error("datasource query failed: {0}")]
    Query(String),
}

/// Lazy, forward-only sequence of features returned by a query. An error item aborts the
/// layer being rendered.
pub type FeatureSet<'a> = Box<dyn Iterator<Item = Result<Feature, DatasourceError>> + 'a>;

/// Geometry kind a datasource declares.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DatasourceGeometryType {
    /// Points only.
    Point,
    /// Lines only.
    Line,
    /// Polygons only.
    Polygon,
    /// Mixed geometry types.
    Collection,
}

/// Type of an attribute field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldType {
    /// 64-bit integer.
    Int,
    /// Floating point.
    Double,
    /// Text.
    String,
    /// Boolean.
    Bool,
}

impl FieldType {
    /// Field type that can store the value. `None` for `null`.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(FieldType::Bool),
            Value::Int(_) => Some(FieldType::Int),
            Value::Double(_) => Some(FieldType::Double),
            Value::String(_) => Some(FieldType::String),
        }
    }
}

/// Self-description of a datasource.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatasourceDescriptor {
    /// Declared geometry type, `None` if unknown or the datasource has no geometries.
    pub geometry_type: Option<DatasourceGeometryType>,
    /// Attribute schema.
    pub fields: Vec<(String, FieldType)>,
}

/// Parameters of a feature request.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Area of interest in the datasource SRS.
    pub bbox: Box2d,
    /// Attributes the renderer will read. Datasources may drop all other attributes.
    pub attributes: BTreeSet<String>,
    /// Resolution of the render, pixels per datasource unit in x and y.
    pub resolution: (f64, f64),
    /// Scale denominator of the render.
    pub scale_denominator: f64,
}

impl Query {
    /// Creates a query for the given area without attributes.
    pub fn new(bbox: Box2d) -> Self {
        Self {
            bbox,
            attributes: BTreeSet::new(),
            resolution: (1.0, 1.0),
            scale_denominator: 0.0,
        }
    }

    /// Adds an attribute to the query.
    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into());
        self
    }

    /// Sets the resolution of the query.
    pub fn with_resolution(mut self, x: f64, y: f64) -> Self {
        self.resolution = (x, y);
        self
    }
}

/// Source of features for a layer.
///
/// Implementations must be shareable between threads: independent renders of different maps
/// may run in parallel and use the same datasource.
pub trait Datasource: Send + Sync {
    /// Describes geometry type and attribute schema.
    fn describe(&self) -> DatasourceDescriptor;

    /// Extent of all features, in the datasource SRS.
    fn envelope(&self) -> Box2d;

    /// Returns features intersecting the query box.
    fn features(&self, query: &Query) -> Result<FeatureSet<'_>, DatasourceError>;

    /// Returns all features regardless of their location.
    fn all_features(&self) -> Result<FeatureSet<'_>, DatasourceError>;
}
