use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use cartela_types::Point2d;
use nalgebra::Matrix3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expression::{EvalContext, Expression, ExpressionError};

/// 2d affine transformation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine {
    matrix: Matrix3<f64>,
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    /// Transform that doesn't change points.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Transform given by the coefficients as in SVG `matrix(a, b, c, d, e, f)`:
    /// `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self {
            matrix: Matrix3::new(a, c, e, b, d, f, 0.0, 0.0, 1.0),
        }
    }

    /// Translation.
    pub fn translate(dx: f64, dy: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, dx, dy)
    }

    /// Scaling around the origin.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by the angle in degrees around the origin.
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Rotation by the angle in degrees around the given center.
    pub fn rotate_around(degrees: f64, cx: f64, cy: f64) -> Self {
        Self::translate(cx, cy)
            .then_after(&Self::rotate(degrees))
            .then_after(&Self::translate(-cx, -cy))
    }

    /// Skew along the x axis by the angle in degrees.
    pub fn skew_x(degrees: f64) -> Self {
        Self::new(1.0, 0.0, degrees.to_radians().tan(), 1.0, 0.0, 0.0)
    }

    /// Skew along the y axis by the angle in degrees.
    pub fn skew_y(degrees: f64) -> Self {
        Self::new(1.0, degrees.to_radians().tan(), 0.0, 1.0, 0.0, 0.0)
    }

    /// Transform applying `inner` first and then `self`.
    pub fn then_after(&self, inner: &Affine) -> Affine {
        Affine {
            matrix: self.matrix * inner.matrix,
        }
    }

    /// Transforms the point.
    pub fn apply(&self, p: &Point2d) -> Point2d {
        let m = &self.matrix;
        Point2d::new(
            m[(0, 0)] * p.x + m[(0, 1)] * p.y + m[(0, 2)],
            m[(1, 0)] * p.x + m[(1, 1)] * p.y + m[(1, 2)],
        )
    }

    /// Inverse transform, if the matrix is not singular.
    pub fn inverse(&self) -> Option<Affine> {
        self.matrix.try_inverse().map(|matrix| Affine { matrix })
    }

    /// Returns true if the transform doesn't change points.
    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix3::identity()
    }

    /// Returns the same transform with its translation multiplied by the factor.
    pub fn with_scaled_translation(&self, factor: f64) -> Affine {
        let mut matrix = self.matrix;
        matrix[(0, 2)] *= factor;
        matrix[(1, 2)] *= factor;
        Affine { matrix }
    }

    /// Average linear scale of the transform.
    pub fn scale_factor(&self) -> f64 {
        let m = &self.matrix;
        (m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]).abs().sqrt()
    }
}

/// Error in a transform list text.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransformError {
    /// The text doesn't follow the transform list grammar.
    #[error("invalid transform at byte {offset}: {message}")]
    Syntax {
        /// Byte offset of the error.
        offset: usize,
        /// What went wrong.
        message: String,
    },
    /// An argument is not a valid expression.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

/// Kind of a transform in a list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransformKind {
    /// `matrix(a, b, c, d, e, f)`.
    Matrix,
    /// `translate(x[, y])`.
    Translate,
    /// `scale(x[, y])`.
    Scale,
    /// `rotate(angle[, cx, cy])`.
    Rotate,
    /// `skewX(angle)`.
    SkewX,
    /// `skewY(angle)`.
    SkewY,
}

impl TransformKind {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "matrix" => Self::Matrix,
            "translate" => Self::Translate,
            "scale" => Self::Scale,
            "rotate" => Self::Rotate,
            "skewX" => Self::SkewX,
            "skewY" => Self::SkewY,
            _ => return None,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Matrix => "matrix",
            Self::Translate => "translate",
            Self::Scale => "scale",
            Self::Rotate => "rotate",
            Self::SkewX => "skewX",
            Self::SkewY => "skewY",
        }
    }

    fn accepts(&self, count: usize) -> bool {
        match self {
            Self::Matrix => count == 6,
            Self::Translate | Self::Scale => count == 1 || count == 2,
            Self::Rotate => count == 1 || count == 3,
            Self::SkewX | Self::SkewY => count == 1,
        }
    }
}

/// Single transform of a list with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOp {
    /// Transform kind.
    pub kind: TransformKind,
    /// Arguments, evaluated per feature.
    pub args: Vec<Expression>,
}

impl TransformOp {
    fn evaluate(&self, context: &EvalContext) -> Affine {
        let arg = |i: usize| {
            self.args
                .get(i)
                .and_then(|e| e.evaluate(context).to_f64())
                .unwrap_or(0.0)
        };

        match self.kind {
            TransformKind::Matrix => Affine::new(arg(0), arg(1), arg(2), arg(3), arg(4), arg(5)),
            TransformKind::Translate => Affine::translate(arg(0), arg(1)),
            TransformKind::Scale => {
                let sx = arg(0);
                let sy = if self.args.len() > 1 { arg(1) } else { sx };
                Affine::scale(sx, sy)
            }
            TransformKind::Rotate => Affine::rotate_around(arg(0), arg(1), arg(2)),
            TransformKind::SkewX => Affine::skew_x(arg(0)),
            TransformKind::SkewY => Affine::skew_y(arg(0)),
        }
    }
}

/// Sequence of transforms written as in the SVG `transform` attribute, e.g.
/// `translate(10, 0) rotate([angle])`. Every argument is an expression.
///
/// Transforms are applied right to left: the last transform in the list is applied to the
/// points first.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct TransformList {
    ops: Vec<TransformOp>,
}

impl TransformList {
    /// Parses a transform list.
    pub fn parse(text: &str) -> Result<Self, TransformError> {
        let bytes = text.as_bytes();
        let mut ops = vec![];
        let mut pos = 0;

        loop {
            while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b',') {
                pos += 1;
            }
            if pos >= bytes.len() {
                break;
            }

            let name_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
                pos += 1;
            }
            let name = &text[name_start..pos];
            let kind = TransformKind::from_name(name).ok_or_else(|| TransformError::Syntax {
                offset: name_start,
                message: format!("unknown transform '{name}'"),
            })?;

            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if bytes.get(pos) != Some(&b'(') {
                return Err(TransformError::Syntax {
                    offset: pos,
                    message: "expected '('".into(),
                });
            }
            pos += 1;

            let (args, end) = split_args(text, pos)?;
            let args = args
                .into_iter()
                .map(Expression::parse)
                .collect::<Result<Vec<_>, _>>()?;
            if !kind.accepts(args.len()) {
                return Err(TransformError::Syntax {
                    offset: name_start,
                    message: format!("{} doesn't accept {} arguments", kind.name(), args.len()),
                });
            }

            ops.push(TransformOp { kind, args });
            pos = end;
        }

        Ok(Self { ops })
    }

    /// Transforms of the list.
    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    /// Returns true if the list has no transforms.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Computes the transform for the feature.
    pub fn evaluate(&self, context: &EvalContext) -> Affine {
        self.ops
            .iter()
            .fold(Affine::identity(), |acc, op| acc.then_after(&op.evaluate(context)))
    }

    /// Adds names of all attributes the arguments read.
    pub fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        for op in &self.ops {
            for arg in &op.args {
                arg.collect_attributes(out);
            }
        }
    }
}

/// Splits the arguments of a transform starting right after `(`. Returns the argument texts
/// and the position after the closing `)`.
fn split_args(text: &str, start: usize) -> Result<(Vec<&str>, usize), TransformError> {
    let bytes = text.as_bytes();
    let mut depth = 0;
    let mut quote: Option<u8> = None;
    let mut args = vec![];
    let mut arg_start = start;
    let mut pos = start;

    while pos < bytes.len() {
        let c = bytes[pos];
        if let Some(q) = quote {
            if c == b'\\' {
                pos += 1;
            } else if c == q {
                quote = None;
            }
        } else {
            match c {
                b'\'' | b'"' => quote = Some(c),
                b'(' | b'[' => depth += 1,
                b']' => depth -= 1,
                b')' if depth == 0 => {
                    let arg = text[arg_start..pos].trim();
                    if !arg.is_empty() || !args.is_empty() {
                        args.push(arg);
                    }
                    return Ok((args, pos + 1));
                }
                b')' => depth -= 1,
                b',' if depth == 0 => {
                    args.push(text[arg_start..pos].trim());
                    arg_start = pos + 1;
                }
                _ => {}
            }
        }
        pos += 1;
    }

    Err(TransformError::Syntax {
        offset: text.len(),
        message: "missing ')'".into(),
    })
}

impl Display for TransformList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}(", op.kind.name())?;
            for (j, arg) in op.args.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl FromStr for TransformList {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TransformList {
    type Error = TransformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TransformList> for String {
    fn from(value: TransformList) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Variables;
    use crate::feature::Feature;
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    fn evaluate(text: &str, feature: &Feature) -> Affine {
        let variables = Variables::default();
        TransformList::parse(text)
            .unwrap()
            .evaluate(&EvalContext::new(feature, &variables))
    }

    #[test]
    fn affine_basics() {
        let p = Point2d::new(1.0, 0.0);
        assert_eq!(Affine::translate(2.0, 3.0).apply(&p), Point2d::new(3.0, 3.0));
        assert_eq!(Affine::scale(2.0, 5.0).apply(&p), Point2d::new(2.0, 0.0));

        let rotated = Affine::rotate(90.0).apply(&p);
        assert_abs_diff_eq!(rotated.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rotated.y, 1.0, epsilon = 1e-12);

        let around = Affine::rotate_around(180.0, 1.0, 1.0).apply(&Point2d::new(0.0, 0.0));
        assert_abs_diff_eq!(around.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(around.y, 2.0, epsilon = 1e-12);

        let t = Affine::new(2.0, 0.5, 0.3, 3.0, 7.0, -1.0);
        let q = Point2d::new(4.0, -2.0);
        let back = t.inverse().unwrap().apply(&t.apply(&q));
        assert_abs_diff_eq!(back.x, q.x, epsilon = 1e-9);
        assert_abs_diff_eq!(back.y, q.y, epsilon = 1e-9);
        assert!(Affine::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn list_applies_right_to_left() {
        let feature = Feature::new(1);
        let t = evaluate("translate(10, 0) scale(2)", &feature);
        assert_eq!(t.apply(&Point2d::new(1.0, 1.0)), Point2d::new(12.0, 2.0));

        let t = evaluate("scale(2), translate(10)", &feature);
        assert_eq!(t.apply(&Point2d::new(1.0, 1.0)), Point2d::new(22.0, 2.0));
    }

    #[test]
    fn arguments_are_expressions() {
        let feature = Feature::new(1).with_attribute("dx", 4);
        let t = evaluate("translate([dx] * 2, max(1, 3))", &feature);
        assert_eq!(t.apply(&Point2d::new(0.0, 0.0)), Point2d::new(8.0, 3.0));

        let list = TransformList::parse("translate([dx] * 2, 0) skewX(45)").unwrap();
        let mut attributes = BTreeSet::new();
        list.collect_attributes(&mut attributes);
        assert_eq!(attributes.into_iter().collect::<Vec<_>>(), vec!["dx"]);
    }

    #[test]
    fn display_round_trip() {
        let list = TransformList::parse("matrix(1,0,0,1,5,6)  rotate(45, 1, 2)").unwrap();
        let text = list.to_string();
        assert_eq!(text, "matrix(1, 0, 0, 1, 5, 6) rotate(45, 1, 2)");
        assert_eq!(TransformList::parse(&text).unwrap(), list);
    }

    #[test]
    fn syntax_errors() {
        assert_matches!(
            TransformList::parse("shear(1)"),
            Err(TransformError::Syntax { offset: 0, .. })
        );
        assert_matches!(
            TransformList::parse("translate(1"),
            Err(TransformError::Syntax { .. })
        );
        assert_matches!(
            TransformList::parse("rotate(1, 2)"),
            Err(TransformError::Syntax { .. })
        );
        assert_matches!(
            TransformList::parse("scale(1 +)"),
            Err(TransformError::Expression(_))
        );
        assert!(TransformList::parse("").unwrap().is_empty());
    }
}
