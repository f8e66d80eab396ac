//! Symbolizers: declarative descriptions of how the features matched by a rule are drawn.
//!
//! Symbolizer parameters are either literal values or [`Expression`]s evaluated against every
//! drawn feature, see [`Prop`].

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::expression::{EvalContext, Expression, Value};
use crate::geometry::{SimplifyAlgorithm, TransformList};
use crate::raster::CompOp;
use crate::Color;

mod debug;
mod line;
mod point;
mod polygon;
mod raster;
mod text;

pub use debug::{DebugMode, DebugSymbolizer};
pub use line::{LinePatternSymbolizer, LineSymbolizer};
pub use point::{MarkerPlacement, MarkerShape, MarkerSymbolizer, PointPlacement, PointSymbolizer};
pub use polygon::{
    BuildingSymbolizer, PatternAlignment, PolygonPatternSymbolizer, PolygonSymbolizer,
};
pub use raster::{ColorStop, Colorizer, RasterSymbolizer};
pub use text::{LabelPlacement, ShieldSymbolizer, TextOptions, TextSymbolizer, TextTransform};

/// Drawing primitive of a rule.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "kebab-case"))]
pub enum Symbolizer {
    /// Filled polygons.
    Polygon(PolygonSymbolizer),
    /// Stroked lines.
    Line(LineSymbolizer),
    /// Lines filled with a repeated image.
    LinePattern(LinePatternSymbolizer),
    /// Polygons filled with a repeated image.
    PolygonPattern(PolygonPatternSymbolizer),
    /// Image at a point of every geometry.
    Point(PointSymbolizer),
    /// Vector or image markers.
    Marker(MarkerSymbolizer),
    /// Image with a label on top of it.
    Shield(ShieldSymbolizer),
    /// Labels.
    Text(TextSymbolizer),
    /// Raster data of the feature.
    Raster(RasterSymbolizer),
    /// Extruded polygons.
    Building(BuildingSymbolizer),
    /// Debugging overlays.
    Debug(DebugSymbolizer),
}

impl Symbolizer {
    /// Short name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Symbolizer::Polygon(_) => "polygon",
            Symbolizer::Line(_) => "line",
            Symbolizer::LinePattern(_) => "line-pattern",
            Symbolizer::PolygonPattern(_) => "polygon-pattern",
            Symbolizer::Point(_) => "point",
            Symbolizer::Marker(_) => "marker",
            Symbolizer::Shield(_) => "shield",
            Symbolizer::Text(_) => "text",
            Symbolizer::Raster(_) => "raster",
            Symbolizer::Building(_) => "building",
            Symbolizer::Debug(_) => "debug",
        }
    }

    /// Adds the names of all attributes the symbolizer reads to `out`.
    pub fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        match self {
            Symbolizer::Polygon(s) => {
                s.fill.collect_attributes(out);
                s.opacity.collect_attributes(out);
                s.geometry.collect_attributes(out);
            }
            Symbolizer::Line(s) => {
                s.stroke.collect_attributes(out);
                s.width.collect_attributes(out);
                s.opacity.collect_attributes(out);
                s.offset.collect_attributes(out);
                s.geometry.collect_attributes(out);
            }
            Symbolizer::LinePattern(s) => {
                s.opacity.collect_attributes(out);
                s.offset.collect_attributes(out);
                s.geometry.collect_attributes(out);
            }
            Symbolizer::PolygonPattern(s) => {
                s.opacity.collect_attributes(out);
                s.geometry.collect_attributes(out);
            }
            Symbolizer::Point(s) => {
                s.opacity.collect_attributes(out);
                if let Some(transform) = &s.transform {
                    transform.collect_attributes(out);
                }
            }
            Symbolizer::Marker(s) => {
                s.width.collect_attributes(out);
                s.height.collect_attributes(out);
                s.fill.collect_attributes(out);
                s.stroke.collect_attributes(out);
                s.stroke_width.collect_attributes(out);
                s.opacity.collect_attributes(out);
                if let Some(transform) = &s.transform {
                    transform.collect_attributes(out);
                }
                s.geometry.collect_attributes(out);
            }
            Symbolizer::Shield(s) => s.text.collect_attributes(out),
            Symbolizer::Text(s) => s.text.collect_attributes(out),
            Symbolizer::Raster(_) | Symbolizer::Debug(_) => {}
            Symbolizer::Building(s) => {
                s.fill.collect_attributes(out);
                s.height.collect_attributes(out);
                s.opacity.collect_attributes(out);
            }
        }
    }

    /// How far outside of the view, in pixels, a feature can be and still affect the image.
    ///
    /// Only literal parameters are taken into account.
    pub fn buffer_hint(&self) -> f64 {
        match self {
            Symbolizer::Line(s) => {
                s.width.literal().unwrap_or(1.0) / 2.0 + s.offset.literal().unwrap_or(0.0).abs()
            }
            Symbolizer::LinePattern(s) => s.offset.literal().unwrap_or(0.0).abs(),
            Symbolizer::Marker(s) => {
                s.width
                    .literal()
                    .unwrap_or(0.0)
                    .max(s.height.literal().unwrap_or(0.0))
                    / 2.0
                    + s.stroke_width.literal().unwrap_or(0.0)
            }
            Symbolizer::Text(s) => s.text.buffer_hint(),
            Symbolizer::Shield(s) => s.text.buffer_hint(),
            Symbolizer::Building(s) => s.height.literal().unwrap_or(0.0),
            _ => 0.0,
        }
        .max(0.0)
    }
}

macro_rules! impl_from_symbolizer {
    ($($variant:ident($type:ident)),* $(,)?) => {
        $(
            impl From<$type> for Symbolizer {
                fn from(value: $type) -> Self {
                    Symbolizer::$variant(value)
                }
            }
        )*
    };
}

impl_from_symbolizer!(
    Polygon(PolygonSymbolizer),
    Line(LineSymbolizer),
    LinePattern(LinePatternSymbolizer),
    PolygonPattern(PolygonPatternSymbolizer),
    Point(PointSymbolizer),
    Marker(MarkerSymbolizer),
    Shield(ShieldSymbolizer),
    Text(TextSymbolizer),
    Raster(RasterSymbolizer),
    Building(BuildingSymbolizer),
    Debug(DebugSymbolizer),
);

/// Type of a symbolizer parameter that can be computed from an expression result.
pub trait PropValue: Sized {
    /// Converts an expression result. Returns `None` if the value has a wrong type.
    fn from_value(value: &Value) -> Option<Self>;
}

impl PropValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.to_f64().filter(|v| v.is_finite())
    }
}

impl PropValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        (!value.is_null()).then(|| value.to_bool())
    }
}

impl PropValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        (!value.is_null()).then(|| value.to_text())
    }
}

impl PropValue for Color {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Color::parse(s),
            _ => None,
        }
    }
}

/// Symbolizer parameter: a literal value, or an expression evaluated for every feature.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Prop<T> {
    /// Literal value.
    Value(T),
    /// Expression. Features for which the expression result can't be converted into `T`
    /// get the default value of the parameter.
    Expr(Expression),
}

impl<T: PropValue + Clone> Prop<T> {
    /// Value of the parameter for the feature in the context.
    pub fn resolve(&self, context: &EvalContext) -> Option<T> {
        match self {
            Prop::Value(v) => Some(v.clone()),
            Prop::Expr(expr) => T::from_value(&expr.evaluate(context)),
        }
    }

    /// Value of the parameter, or `default` if it can't be computed.
    pub fn resolve_or(&self, context: &EvalContext, default: T) -> T {
        self.resolve(context).unwrap_or(default)
    }
}

impl<T: Clone> Prop<T> {
    /// Literal value, if the parameter is not an expression.
    pub fn literal(&self) -> Option<T> {
        match self {
            Prop::Value(v) => Some(v.clone()),
            Prop::Expr(_) => None,
        }
    }
}

impl<T> Prop<T> {
    /// Adds attributes read by the expression to `out`.
    pub fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        if let Prop::Expr(expr) = self {
            expr.collect_attributes(out);
        }
    }
}

impl<T> From<T> for Prop<T> {
    fn from(value: T) -> Self {
        Prop::Value(value)
    }
}

/// Geometry processing common to vector symbolizers, applied in the pixel space in the order
/// transform, clip, smooth, simplify.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct GeometryOptions {
    /// Compositing operator of the symbolizer.
    pub comp_op: CompOp,
    /// Affine transform applied to the geometry after the view transform.
    pub geometry_transform: Option<TransformList>,
    /// Clip geometries to the view box expanded by the layer buffer.
    pub clip: bool,
    /// Smoothing tension in `0..=1`.
    pub smooth: f64,
    /// Simplification tolerance in pixels.
    pub simplify: f64,
    /// Simplification algorithm.
    pub simplify_algorithm: SimplifyAlgorithm,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            comp_op: CompOp::default(),
            geometry_transform: None,
            clip: true,
            smooth: 0.0,
            simplify: 0.0,
            simplify_algorithm: SimplifyAlgorithm::default(),
        }
    }
}

impl GeometryOptions {
    fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        if let Some(transform) = &self.geometry_transform {
            transform.collect_attributes(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Variables;
    use crate::feature::Feature;

    #[test]
    fn props_resolve_per_feature() {
        let width: Prop<f64> = Prop::Expr(Expression::parse("[lanes] * 2").unwrap());
        let color: Prop<Color> = Prop::Expr(Expression::parse("[color]").unwrap());
        let variables = Variables::default();

        let feature = Feature::new(1)
            .with_attribute("lanes", 3)
            .with_attribute("color", "#00ff00");
        let context = EvalContext::new(&feature, &variables);
        assert_eq!(width.resolve(&context), Some(6.0));
        assert_eq!(color.resolve(&context), Some(Color::GREEN));

        let empty = Feature::new(2);
        let context = EvalContext::new(&empty, &variables);
        assert_eq!(width.resolve_or(&context, 1.0), 1.0);
        assert_eq!(color.resolve(&context), None);
        assert_eq!(Prop::Value(4.0).resolve(&context), Some(4.0));
    }

    #[test]
    fn attributes_and_buffers() {
        let line = LineSymbolizer {
            stroke: Prop::Expr(Expression::parse("[color]").unwrap()),
            width: Prop::Value(6.0),
            offset: Prop::Value(-2.0),
            ..Default::default()
        };
        let symbolizer = Symbolizer::from(line);

        let mut attributes = BTreeSet::new();
        symbolizer.collect_attributes(&mut attributes);
        assert_eq!(attributes, BTreeSet::from(["color".to_string()]));
        assert_eq!(symbolizer.buffer_hint(), 5.0);
        assert_eq!(symbolizer.name(), "line");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_from_json() {
        let json = serde_json::json!([
            {"type": "polygon", "fill": "#ff0000", "opacity": 0.5},
            {"type": "line", "stroke": "[color]", "width": 2.5, "stroke-linejoin": "round",
             "stroke-dasharray": [4.0, 2.0], "geometry-transform": "translate(1, 2)"},
            {"type": "marker", "width": "[size] + 1", "allow-overlap": true},
        ]);
        let symbolizers: Vec<Symbolizer> = serde_json::from_value(json).unwrap();

        let Symbolizer::Polygon(polygon) = &symbolizers[0] else {
            panic!("expected polygon, got {:?}", symbolizers[0]);
        };
        assert_eq!(polygon.fill, Prop::Value(Color::RED));
        assert_eq!(polygon.opacity, Prop::Value(0.5));

        let Symbolizer::Line(line) = &symbolizers[1] else {
            panic!("expected line, got {:?}", symbolizers[1]);
        };
        assert_eq!(line.stroke, Prop::Expr(Expression::parse("[color]").unwrap()));
        assert_eq!(line.join, crate::geometry::LineJoin::Round);
        assert_eq!(line.dasharray, vec![4.0, 2.0]);
        assert!(line.geometry.geometry_transform.is_some());
        assert!(line.geometry.clip);

        let Symbolizer::Marker(marker) = &symbolizers[2] else {
            panic!("expected marker, got {:?}", symbolizers[2]);
        };
        assert!(marker.allow_overlap);
        assert_matches::assert_matches!(marker.width, Prop::Expr(_));
        assert_eq!(marker.height, Prop::Value(10.0));
    }
}
