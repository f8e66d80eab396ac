use cartela_types::Box2d;

use super::{Layer, Map};
use crate::error::CartelaError;
use crate::expression::Value;
use crate::style::Style;
use crate::Color;

/// Convenience type to assemble a [`Map`].
///
/// ```
/// use cartela::map::{Layer, MapBuilder};
/// use cartela::style::Style;
///
/// let map = MapBuilder::default()
///     .with_size(512, 256)
///     .with_style("roads", Style::new())
///     .with_layer(Layer::new("roads").with_style("roads"))
///     .build()
///     .unwrap();
/// assert_eq!(map.width(), 512);
/// ```
#[derive(Debug, Clone)]
pub struct MapBuilder {
    width: u32,
    height: u32,
    srs: String,
    background: Option<Color>,
    layers: Vec<Layer>,
    styles: Vec<(String, Style)>,
    extent: Option<Box2d>,
    buffer_size: f64,
    variables: Vec<(String, Value)>,
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            srs: "EPSG:4326".to_string(),
            background: None,
            layers: vec![],
            styles: vec![],
            extent: None,
            buffer_size: 0.0,
            variables: vec![],
        }
    }
}

impl MapBuilder {
    /// Sets the image size in pixels. Defaults to 256x256.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the map SRS. Defaults to `EPSG:4326`.
    pub fn with_srs(mut self, srs: impl Into<String>) -> Self {
        self.srs = srs.into();
        self
    }

    /// Sets the background color. Without it the image starts transparent.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = Some(background);
        self
    }

    /// Appends a layer.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Adds a named style.
    pub fn with_style(mut self, name: impl Into<String>, style: Style) -> Self {
        self.styles.push((name.into(), style));
        self
    }

    /// Sets the extent. Without it, the world extent of the SRS is used.
    pub fn with_extent(mut self, extent: Box2d) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Sets the buffer around the view in pixels.
    pub fn with_buffer_size(mut self, buffer_size: f64) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Sets a variable available to expressions as `@name`.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// Creates the map. Fails if the size is zero.
    pub fn build(self) -> Result<Map, CartelaError> {
        let mut map = Map::new(self.width, self.height, self.srs)?;
        map.set_background(self.background);
        for layer in self.layers {
            map.add_layer(layer);
        }
        for (name, style) in self.styles {
            map.insert_style(name, style);
        }
        if let Some(extent) = self.extent {
            map.zoom_to_box(extent);
        }
        map.set_buffer_size(self.buffer_size);
        for (name, value) in self.variables {
            map.set_variable(name, value);
        }

        Ok(map)
    }
}
