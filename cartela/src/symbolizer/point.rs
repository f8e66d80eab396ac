#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{GeometryOptions, Prop};
use crate::geometry::TransformList;
use crate::raster::CompOp;
use crate::Color;

/// Point of a geometry where a point symbolizer image is drawn.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PointPlacement {
    /// Geometric center. May lie outside of concave polygons.
    Centroid,
    /// Point guaranteed to be inside polygons and on lines.
    #[default]
    Interior,
}

/// Draws an image at a representative point of every geometry.
///
/// Without an image, a 4x4 pixel gray square is drawn.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct PointSymbolizer {
    /// Path to the image.
    pub file: Option<String>,
    /// Opacity.
    pub opacity: Prop<f64>,
    /// Draw even if the image collides with already placed symbols or labels.
    pub allow_overlap: bool,
    /// Don't register the image with the collision detector.
    pub ignore_placement: bool,
    /// Where the image is drawn.
    pub placement: PointPlacement,
    /// Transform of the image around its center, in pixels.
    pub transform: Option<TransformList>,
    /// Compositing operator.
    pub comp_op: CompOp,
}

impl Default for PointSymbolizer {
    fn default() -> Self {
        Self {
            file: None,
            opacity: Prop::Value(1.0),
            allow_overlap: false,
            ignore_placement: false,
            placement: PointPlacement::default(),
            transform: None,
            comp_op: CompOp::default(),
        }
    }
}

/// Built-in vector marker shapes.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MarkerShape {
    /// Ellipse inscribed into the marker box.
    #[default]
    Ellipse,
    /// Arrow pointing along the x axis, or along the line for line placement.
    Arrow,
}

/// Where markers are placed on a geometry.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum MarkerPlacement {
    /// Point inside polygons, middle of lines.
    #[default]
    Point,
    /// Same as `Point`.
    Interior,
    /// Repeated along lines and polygon outlines every `spacing` pixels, rotated along the
    /// line.
    Line,
    /// First vertex of every geometry.
    VertexFirst,
    /// Last vertex of every geometry.
    VertexLast,
}

/// Draws markers: vector shapes or images.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct MarkerSymbolizer {
    /// Image drawn instead of the vector shape.
    pub file: Option<String>,
    /// Vector shape.
    pub shape: MarkerShape,
    /// Marker width in pixels. Images are scaled to it.
    pub width: Prop<f64>,
    /// Marker height in pixels. Images are scaled to it.
    pub height: Prop<f64>,
    /// Fill of the vector shape.
    pub fill: Prop<Color>,
    /// Outline color of the vector shape.
    pub stroke: Prop<Color>,
    /// Outline width of the vector shape. Zero disables the outline.
    pub stroke_width: Prop<f64>,
    /// Opacity.
    pub opacity: Prop<f64>,
    /// Draw even if the marker collides with already placed symbols or labels.
    pub allow_overlap: bool,
    /// Don't register the marker with the collision detector.
    pub ignore_placement: bool,
    /// Where markers are placed.
    pub placement: MarkerPlacement,
    /// Distance between markers with line placement.
    pub spacing: f64,
    /// Transform of the marker around its center, in pixels.
    pub transform: Option<TransformList>,
    /// Geometry processing.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub geometry: GeometryOptions,
}

impl Default for MarkerSymbolizer {
    fn default() -> Self {
        Self {
            file: None,
            shape: MarkerShape::default(),
            width: Prop::Value(10.0),
            height: Prop::Value(10.0),
            fill: Prop::Value(Color::BLUE),
            stroke: Prop::Value(Color::BLACK),
            stroke_width: Prop::Value(0.0),
            opacity: Prop::Value(1.0),
            allow_overlap: false,
            ignore_placement: false,
            placement: MarkerPlacement::default(),
            spacing: 100.0,
            transform: None,
            geometry: GeometryOptions::default(),
        }
    }
}

impl MarkerSymbolizer {
    /// Ellipse marker of the given size and color.
    pub fn ellipse(width: f64, height: f64, fill: Color) -> Self {
        Self {
            width: Prop::Value(width),
            height: Prop::Value(height),
            fill: Prop::Value(fill),
            ..Default::default()
        }
    }

    /// Sets the overlap flag.
    pub fn with_allow_overlap(mut self, allow_overlap: bool) -> Self {
        self.allow_overlap = allow_overlap;
        self
    }

    /// Sets the placement.
    pub fn with_placement(mut self, placement: MarkerPlacement) -> Self {
        self.placement = placement;
        self
    }
}
