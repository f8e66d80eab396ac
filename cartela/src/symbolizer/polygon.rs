#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{GeometryOptions, Prop};
use crate::raster::{FillRule, Gamma};
use crate::Color;

/// Fills polygon rings with a color.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct PolygonSymbolizer {
    /// Fill color.
    pub fill: Prop<Color>,
    /// Opacity multiplied into the fill color alpha.
    pub opacity: Prop<f64>,
    /// Coverage-to-alpha function of the polygon edges.
    pub gamma: Gamma,
    /// Fill rule. Even-odd makes holes regardless of ring orientation.
    pub fill_rule: FillRule,
    /// Geometry processing.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub geometry: GeometryOptions,
}

impl Default for PolygonSymbolizer {
    fn default() -> Self {
        Self {
            fill: Prop::Value(Color::rgb(128, 128, 128)),
            opacity: Prop::Value(1.0),
            gamma: Gamma::default(),
            fill_rule: FillRule::EvenOdd,
            geometry: GeometryOptions::default(),
        }
    }
}

impl PolygonSymbolizer {
    /// Polygon symbolizer with the given fill color.
    pub fn new(fill: Color) -> Self {
        Self {
            fill: Prop::Value(fill),
            ..Default::default()
        }
    }

    /// Sets the opacity.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Prop::Value(opacity);
        self
    }
}

/// How a polygon pattern is positioned.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PatternAlignment {
    /// Tiles start at the top-left corner of the image, so patterns of adjacent polygons join.
    #[default]
    Global,
    /// Tiles start at the top-left corner of every polygon's bounding box.
    Local,
}

/// Fills polygons with a repeated image.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct PolygonPatternSymbolizer {
    /// Path to the pattern image.
    pub file: String,
    /// Opacity.
    pub opacity: Prop<f64>,
    /// Pattern origin.
    pub alignment: PatternAlignment,
    /// Coverage-to-alpha function of the polygon edges.
    pub gamma: Gamma,
    /// Geometry processing.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub geometry: GeometryOptions,
}

impl Default for PolygonPatternSymbolizer {
    fn default() -> Self {
        Self {
            file: String::new(),
            opacity: Prop::Value(1.0),
            alignment: PatternAlignment::default(),
            gamma: Gamma::default(),
            geometry: GeometryOptions::default(),
        }
    }
}

/// Draws polygons as extruded buildings: walls in a darker shade, then the roof shifted up by
/// the building height.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct BuildingSymbolizer {
    /// Roof color. Walls use a darker shade of it.
    pub fill: Prop<Color>,
    /// Opacity.
    pub opacity: Prop<f64>,
    /// Height of the building in pixels.
    pub height: Prop<f64>,
}

impl Default for BuildingSymbolizer {
    fn default() -> Self {
        Self {
            fill: Prop::Value(Color::rgb(128, 128, 128)),
            opacity: Prop::Value(1.0),
            height: Prop::Value(0.0),
        }
    }
}
