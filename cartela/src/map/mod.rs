//! The map: size, SRS, layers and styles.

use ahash::AHashMap;
use cartela_types::{Box2d, ProjTransform, Srs};
use log::{debug, warn};

use crate::error::CartelaError;
use crate::expression::{Value, Variables};
use crate::style::Style;
use crate::view::ViewTransform;
use crate::Color;

mod builder;
mod layer;

pub use builder::MapBuilder;
pub use layer::{Layer, LayerSource};

/// Physical size of a pixel assumed by the OGC scale denominator.
pub const DEFAULT_PIXEL_SIZE_MM: f64 = 0.28;

/// Declarative description of a map image.
///
/// The map is not changed by rendering, so one map can be rendered by several threads at once.
#[derive(Debug, Clone)]
pub struct Map {
    width: u32,
    height: u32,
    srs: String,
    background: Option<Color>,
    layers: Vec<Layer>,
    styles: AHashMap<String, Style>,
    extent: Box2d,
    buffer_size: f64,
    variables: Variables,
}

impl Map {
    /// Creates an empty map. The initial extent is the whole world of the SRS if it is known.
    pub fn new(width: u32, height: u32, srs: impl Into<String>) -> Result<Self, CartelaError> {
        if width == 0 || height == 0 {
            return Err(CartelaError::InvalidArguments(format!(
                "map size must be positive, got {width}x{height}"
            )));
        }

        let srs = srs.into();
        let extent = Srs::parse(&srs)
            .world_extent()
            .unwrap_or(Box2d::new(-1.0, -1.0, 1.0, 1.0));

        Ok(Self {
            width,
            height,
            srs,
            background: None,
            layers: vec![],
            styles: AHashMap::new(),
            extent,
            buffer_size: 0.0,
            variables: Variables::default(),
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Changes the image size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CartelaError> {
        if width == 0 || height == 0 {
            return Err(CartelaError::InvalidArguments(format!(
                "map size must be positive, got {width}x{height}"
            )));
        }

        self.width = width;
        self.height = height;
        Ok(())
    }

    /// SRS descriptor of the map.
    pub fn srs(&self) -> &str {
        &self.srs
    }

    /// Background color.
    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// Sets the background color.
    pub fn set_background(&mut self, background: Option<Color>) {
        self.background = background;
    }

    /// Layers in drawing order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Mutable list of layers.
    pub fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }

    /// Appends a layer.
    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Adds a style, replacing any style with the same name.
    pub fn insert_style(&mut self, name: impl Into<String>, style: Style) {
        self.styles.insert(name.into(), style);
    }

    /// Removes a style.
    pub fn remove_style(&mut self, name: &str) -> Option<Style> {
        self.styles.remove(name)
    }

    /// Style with the given name.
    pub fn find_style(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }

    /// Names of all styles in alphabetical order.
    pub fn style_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.styles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Current extent in map SRS units.
    pub fn extent(&self) -> Box2d {
        self.extent
    }

    /// Sets the extent. The extent is used as is: if its aspect ratio differs from the one of
    /// the image, the map is stretched.
    pub fn zoom_to_box(&mut self, bbox: Box2d) {
        self.extent = bbox;
    }

    /// Sets the extent to cover the data of all layers.
    ///
    /// Layers without a known extent and layers whose extent can't be projected into the map
    /// SRS are ignored. If no layer has an extent, the whole world of the map SRS is used.
    pub fn zoom_all(&mut self) -> Result<(), CartelaError> {
        let mut extent = Box2d::empty();
        for layer in &self.layers {
            let Some(layer_extent) = layer.data_extent() else {
                continue;
            };

            let projected = ProjTransform::new(&layer.srs, &self.srs)
                .and_then(|transform| transform.forward_box(&layer_extent));
            match projected {
                Ok(bbox) => extent.expand_to_include_box(&bbox),
                Err(err) => warn!("Failed to project extent of layer {}: {err}", layer.name),
            }
        }

        if !extent.is_valid() {
            extent = Srs::parse(&self.srs).world_extent().ok_or_else(|| {
                CartelaError::Configuration(format!(
                    "no layer extent available and the extent of {} is unknown",
                    self.srs
                ))
            })?;
        }

        debug!("Zoomed map to {extent:?}");
        self.extent = extent;
        Ok(())
    }

    /// Buffer around the view in pixels that all layers query features in.
    pub fn buffer_size(&self) -> f64 {
        self.buffer_size
    }

    /// Sets the buffer size.
    pub fn set_buffer_size(&mut self, buffer_size: f64) {
        self.buffer_size = buffer_size;
    }

    /// Variables available to expressions as `@name`.
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Sets a variable.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Transform from map coordinates into the image pixels. `None` if the extent is empty.
    pub fn view_transform(&self) -> Option<ViewTransform> {
        ViewTransform::new(self.extent, self.width, self.height)
    }

    /// Size of a pixel in map units along x.
    pub fn resolution(&self) -> f64 {
        self.extent.width() / self.width as f64
    }

    /// OGC scale denominator, assuming 0.28 mm pixels.
    pub fn scale_denominator(&self) -> f64 {
        self.scale_denominator_with(DEFAULT_PIXEL_SIZE_MM)
    }

    /// Scale denominator for pixels of the given physical size in millimetres.
    pub fn scale_denominator_with(&self, pixel_size_mm: f64) -> f64 {
        let meters_per_pixel = self.resolution() * Srs::parse(&self.srs).meters_per_unit();
        meters_per_pixel / (pixel_size_mm / 1000.0)
    }
}
