//! Features are the unit of data the renderer works with: an id, a set of geometries and a bag
//! of attributes.

use std::sync::Arc;

use ahash::AHashMap;
use cartela_types::{Box2d, Geom, GeometryType};

use crate::expression::Value;

/// Attribute bag of a feature.
pub type Attributes = AHashMap<String, Value>;

/// A single map feature as returned by a [`Datasource`](crate::datasource::Datasource).
///
/// Geometries are stored in the SRS of the layer the feature belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    id: i64,
    geometries: Vec<Geom>,
    attributes: Attributes,
    raster: Option<Arc<RasterData>>,
}

impl Feature {
    /// Creates a feature without geometries and attributes.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            geometries: vec![],
            attributes: Attributes::default(),
            raster: None,
        }
    }

    /// Adds a geometry to the feature.
    pub fn with_geometry(mut self, geometry: impl Into<Geom>) -> Self {
        self.geometries.push(geometry.into());
        self
    }

    /// Sets an attribute value.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attaches raster data to the feature.
    pub fn with_raster(mut self, raster: RasterData) -> Self {
        self.raster = Some(Arc::new(raster));
        self
    }

    /// Id of the feature. Unique within a feature set.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Geometries of the feature in their declared order.
    pub fn geometries(&self) -> &[Geom] {
        &self.geometries
    }

    /// Mutable access to the geometries.
    pub fn geometries_mut(&mut self) -> &mut Vec<Geom> {
        &mut self.geometries
    }

    /// All attributes of the feature.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Value of the attribute, or `None` if the feature doesn't have it.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Sets the attribute value, replacing the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Removes every attribute whose name is not accepted by `keep`.
    pub fn retain_attributes(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.attributes.retain(|name, _| keep(name));
    }

    /// Raster payload of the feature, if any.
    pub fn raster(&self) -> Option<&RasterData> {
        self.raster.as_deref()
    }

    /// Type of the first geometry of the feature.
    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.geometries.first().map(Geom::geometry_type)
    }

    /// Union of bounding boxes of all geometries and the raster extent.
    pub fn bounding_box(&self) -> Box2d {
        let mut bbox: Box2d = self.geometries.iter().filter_map(Geom::bounding_box).collect();
        if let Some(raster) = &self.raster {
            bbox.expand_to_include_box(&raster.extent);
        }

        bbox
    }
}

/// Gridded data attached to a feature, drawn by the raster symbolizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterData {
    /// Area covered by the raster, in the layer SRS.
    pub extent: Box2d,
    /// Number of columns.
    pub width: u32,
    /// Number of rows. Row `0` is the northern edge.
    pub height: u32,
    /// Cell values.
    pub bands: RasterBands,
}

/// Cell values of a [`RasterData`].
#[derive(Debug, Clone, PartialEq)]
pub enum RasterBands {
    /// Four bytes per cell, straight (not premultiplied) RGBA.
    Rgba(Vec<u8>),
    /// Single band of values, usually mapped to colors with a colorizer.
    Single {
        /// Cell values, row by row.
        values: Vec<f32>,
        /// Value marking cells without data.
        nodata: Option<f32>,
    },
}

impl RasterData {
    /// Creates an RGBA raster. Returns `None` if the buffer size doesn't match the dimensions.
    pub fn rgba(extent: Box2d, width: u32, height: u32, bytes: Vec<u8>) -> Option<Self> {
        if bytes.len() != width as usize * height as usize * 4 {
            return None;
        }

        Some(Self {
            extent,
            width,
            height,
            bands: RasterBands::Rgba(bytes),
        })
    }

    /// Creates a single band raster. Returns `None` if the buffer size doesn't match the
    /// dimensions.
    pub fn single_band(
        extent: Box2d,
        width: u32,
        height: u32,
        values: Vec<f32>,
        nodata: Option<f32>,
    ) -> Option<Self> {
        if values.len() != width as usize * height as usize {
            return None;
        }

        Some(Self {
            extent,
            width,
            height,
            bands: RasterBands::Single { values, nodata },
        })
    }
}
