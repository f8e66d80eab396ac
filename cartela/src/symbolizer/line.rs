#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{GeometryOptions, Prop};
use crate::geometry::{LineCap, LineJoin, StrokeStyle};
use crate::raster::Gamma;
use crate::Color;

/// Strokes lines and polygon outlines.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct LineSymbolizer {
    /// Line color.
    pub stroke: Prop<Color>,
    /// Line width in pixels.
    pub width: Prop<f64>,
    /// Opacity multiplied into the line color alpha.
    pub opacity: Prop<f64>,
    /// Corner shape.
    #[cfg_attr(feature = "serde", serde(rename = "stroke-linejoin"))]
    pub join: LineJoin,
    /// End shape.
    #[cfg_attr(feature = "serde", serde(rename = "stroke-linecap"))]
    pub cap: LineCap,
    /// Longest allowed miter relative to the line width.
    #[cfg_attr(feature = "serde", serde(rename = "stroke-miterlimit"))]
    pub miter_limit: f64,
    /// Alternating dash and gap lengths in pixels. Empty for a solid line.
    #[cfg_attr(feature = "serde", serde(rename = "stroke-dasharray"))]
    pub dasharray: Vec<f64>,
    /// Shift of the dash pattern along the line.
    #[cfg_attr(feature = "serde", serde(rename = "stroke-dashoffset"))]
    pub dashoffset: f64,
    /// Parallel offset in pixels, positive to the left.
    pub offset: Prop<f64>,
    /// Coverage-to-alpha function of the line edges.
    pub gamma: Gamma,
    /// Geometry processing.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub geometry: GeometryOptions,
}

impl Default for LineSymbolizer {
    fn default() -> Self {
        Self {
            stroke: Prop::Value(Color::BLACK),
            width: Prop::Value(1.0),
            opacity: Prop::Value(1.0),
            join: LineJoin::default(),
            cap: LineCap::default(),
            miter_limit: 4.0,
            dasharray: vec![],
            dashoffset: 0.0,
            offset: Prop::Value(0.0),
            gamma: Gamma::default(),
            geometry: GeometryOptions::default(),
        }
    }
}

impl LineSymbolizer {
    /// Solid line of the given color and width.
    pub fn new(stroke: Color, width: f64) -> Self {
        Self {
            stroke: Prop::Value(stroke),
            width: Prop::Value(width),
            ..Default::default()
        }
    }

    /// Sets the dash pattern.
    pub fn with_dashes(mut self, dasharray: Vec<f64>, dashoffset: f64) -> Self {
        self.dasharray = dasharray;
        self.dashoffset = dashoffset;
        self
    }

    /// Stroke parameters for the given resolved width.
    pub(crate) fn stroke_style(&self, width: f64) -> StrokeStyle {
        StrokeStyle::new(width)
            .with_join(self.join)
            .with_cap(self.cap)
            .with_miter_limit(self.miter_limit)
    }
}

/// Strokes lines with a repeated image. The line width equals the image height.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct LinePatternSymbolizer {
    /// Path to the pattern image.
    pub file: String,
    /// Opacity.
    pub opacity: Prop<f64>,
    /// Parallel offset in pixels, positive to the left.
    pub offset: Prop<f64>,
    /// Geometry processing.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub geometry: GeometryOptions,
}

impl Default for LinePatternSymbolizer {
    fn default() -> Self {
        Self {
            file: String::new(),
            opacity: Prop::Value(1.0),
            offset: Prop::Value(0.0),
            geometry: GeometryOptions::default(),
        }
    }
}
