use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Prop;
use crate::expression::Expression;
use crate::raster::CompOp;
use crate::Color;

/// Case conversion of label text.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TextTransform {
    /// Text as is.
    #[default]
    None,
    /// All letters uppercase.
    Uppercase,
    /// All letters lowercase.
    Lowercase,
    /// First letter of every word uppercase.
    Capitalize,
}

impl TextTransform {
    /// Applies the conversion.
    pub fn apply(&self, text: &str) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::Lowercase => text.to_lowercase(),
            TextTransform::Capitalize => {
                let mut result = String::with_capacity(text.len());
                let mut word_start = true;
                for c in text.chars() {
                    if word_start {
                        result.extend(c.to_uppercase());
                    } else {
                        result.push(c);
                    }
                    word_start = c.is_whitespace();
                }
                result
            }
        }
    }
}

/// How labels follow the geometry.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LabelPlacement {
    /// Horizontal label at a point inside polygons or at the middle of lines.
    #[default]
    Point,
    /// Glyphs follow lines and polygon outlines.
    Line,
    /// Same as `Point`.
    Interior,
}

/// Label parameters shared by text and shield symbolizers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct TextOptions {
    /// Label text.
    pub name: Expression,
    /// Font size in pixels.
    pub size: Prop<f64>,
    /// Glyph color.
    pub fill: Prop<Color>,
    /// Opacity.
    pub opacity: Prop<f64>,
    /// Color of the outline drawn under the glyphs.
    pub halo_fill: Color,
    /// Outline width in pixels. Zero disables the halo.
    pub halo_radius: f64,
    /// Horizontal shift of the label in pixels.
    pub dx: f64,
    /// Vertical shift of the label in pixels, positive down.
    pub dy: f64,
    /// Extra space between characters in pixels.
    pub character_spacing: f64,
    /// Case conversion.
    pub text_transform: TextTransform,
    /// How the label follows the geometry.
    pub placement: LabelPlacement,
    /// Alternative positions around a point, tried in order if the label collides:
    /// comma-separated directions (`N`, `S`, `E`, `W`, `NE`, `NW`, `SE`, `SW`) optionally
    /// followed by smaller font sizes, e.g. `"N,S,E,W,9,8"`.
    pub placements: Option<String>,
    /// Distance between repeated labels on lines. Zero places one label per line.
    pub spacing: f64,
    /// Largest allowed angle in degrees between adjacent glyphs of a line label.
    pub max_char_angle_delta: f64,
    /// Size of the area around the interior point searched for a free label position.
    pub label_position_tolerance: f64,
    /// Minimum distance to other labels.
    pub minimum_distance: f64,
    /// Draw even if the label collides with others.
    pub allow_overlap: bool,
    /// Only place labels that fit in the image.
    pub avoid_edges: bool,
    /// Compositing operator.
    pub comp_op: CompOp,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            name: Expression::literal(""),
            size: Prop::Value(10.0),
            fill: Prop::Value(Color::BLACK),
            opacity: Prop::Value(1.0),
            halo_fill: Color::WHITE,
            halo_radius: 0.0,
            dx: 0.0,
            dy: 0.0,
            character_spacing: 0.0,
            text_transform: TextTransform::default(),
            placement: LabelPlacement::default(),
            placements: None,
            spacing: 0.0,
            max_char_angle_delta: 22.5,
            label_position_tolerance: 0.0,
            minimum_distance: 0.0,
            allow_overlap: false,
            avoid_edges: false,
            comp_op: CompOp::default(),
        }
    }
}

impl TextOptions {
    /// Labels with the text computed by the expression.
    pub fn new(name: Expression) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub(super) fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        self.name.collect_attributes(out);
        self.size.collect_attributes(out);
        self.fill.collect_attributes(out);
        self.opacity.collect_attributes(out);
    }

    pub(super) fn buffer_hint(&self) -> f64 {
        self.size.literal().unwrap_or(10.0) + self.halo_radius + self.dx.abs().max(self.dy.abs())
    }
}

/// Draws labels.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextSymbolizer {
    /// Label parameters.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub text: TextOptions,
}

impl TextSymbolizer {
    /// Labels with the text computed by the expression.
    pub fn new(name: Expression) -> Self {
        Self {
            text: TextOptions::new(name),
        }
    }
}

/// Draws an image with a label on top of it. The image and the label are placed together.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct ShieldSymbolizer {
    /// Path to the shield image.
    pub file: String,
    /// Shift of the image relative to the label, in pixels.
    pub shield_dx: f64,
    /// Vertical shift of the image relative to the label, in pixels, positive down.
    pub shield_dy: f64,
    /// Label parameters.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub text: TextOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_transforms() {
        assert_eq!(TextTransform::None.apply("main St"), "main St");
        assert_eq!(TextTransform::Uppercase.apply("main St"), "MAIN ST");
        assert_eq!(TextTransform::Lowercase.apply("main St"), "main st");
        assert_eq!(
            TextTransform::Capitalize.apply("río de  la plata"),
            "Río De  La Plata"
        );
    }
}
