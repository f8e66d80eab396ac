use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use cartela_types::Box2d;

use crate::datasource::{Datasource, Parameters};

/// Where a layer gets its features from.
#[derive(Clone)]
pub enum LayerSource {
    /// Datasource instance.
    Datasource(Arc<dyn Datasource>),
    /// Datasource created at render time by a registered plugin.
    Plugin {
        /// Plugin name.
        name: String,
        /// Plugin parameters.
        parameters: Parameters,
    },
}

impl Debug for LayerSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerSource::Datasource(ds) => f
                .debug_tuple("Datasource")
                .field(&ds.describe().geometry_type)
                .finish(),
            LayerSource::Plugin { name, parameters } => f
                .debug_struct("Plugin")
                .field("name", name)
                .field("parameters", parameters)
                .finish(),
        }
    }
}

/// Layer of a map: a datasource drawn with a list of styles.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer name, used in diagnostics.
    pub name: String,
    /// SRS of the layer's features.
    pub srs: String,
    /// Smallest scale denominator at which the layer is drawn (inclusive).
    pub min_scale: f64,
    /// Scale denominator from which the layer is no longer drawn (exclusive).
    pub max_scale: f64,
    /// Whether the layer takes part in feature queries. Informational for hosts.
    pub queryable: bool,
    /// Forget all previously placed labels before drawing this layer.
    pub clear_label_cache: bool,
    /// Names of the map styles the layer is drawn with, in order.
    pub styles: Vec<String>,
    /// Feature source. Layers without one are skipped.
    pub source: Option<LayerSource>,
    /// Buffer around the view in pixels, overriding the map buffer.
    pub buffer_size: Option<f64>,
    /// Extent of the layer data in the layer SRS, overriding the datasource envelope.
    pub extent: Option<Box2d>,
}

impl Layer {
    /// Creates a layer in geographic coordinates without styles and data.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            srs: "EPSG:4326".to_string(),
            min_scale: 0.0,
            max_scale: f64::INFINITY,
            queryable: false,
            clear_label_cache: false,
            styles: vec![],
            source: None,
            buffer_size: None,
            extent: None,
        }
    }

    /// Sets the SRS.
    pub fn with_srs(mut self, srs: impl Into<String>) -> Self {
        self.srs = srs.into();
        self
    }

    /// Adds a style name.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.styles.push(style.into());
        self
    }

    /// Sets the datasource.
    pub fn with_datasource(mut self, datasource: Arc<dyn Datasource>) -> Self {
        self.source = Some(LayerSource::Datasource(datasource));
        self
    }

    /// Sets a plugin datasource.
    pub fn with_plugin(mut self, name: impl Into<String>, parameters: Parameters) -> Self {
        self.source = Some(LayerSource::Plugin {
            name: name.into(),
            parameters,
        });
        self
    }

    /// Sets the scale range `[min, max)`.
    pub fn with_scale_range(mut self, min: f64, max: f64) -> Self {
        self.min_scale = min;
        self.max_scale = max;
        self
    }

    /// Sets the label cache flag.
    pub fn with_clear_label_cache(mut self, clear: bool) -> Self {
        self.clear_label_cache = clear;
        self
    }

    /// Sets the buffer size.
    pub fn with_buffer_size(mut self, buffer_size: f64) -> Self {
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Sets the extent.
    pub fn with_extent(mut self, extent: Box2d) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Whether the layer is drawn at the scale denominator.
    pub fn is_visible_at(&self, scale_denominator: f64) -> bool {
        scale_denominator >= self.min_scale && scale_denominator < self.max_scale
    }

    /// Extent of the layer data in the layer SRS, if known without a plugin.
    pub fn data_extent(&self) -> Option<Box2d> {
        let extent = match (&self.extent, &self.source) {
            (Some(extent), _) => *extent,
            (None, Some(LayerSource::Datasource(ds))) => ds.envelope(),
            _ => return None,
        };

        extent.is_valid().then_some(extent)
    }
}
