use cartela_types::{Point2d, Vector2d};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{subpaths, PathCommand, Subpath};
use crate::raster::ellipse_points;

/// Shape of the outer corner where two segments of a stroked line meet.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum LineJoin {
    /// Sharp corner. Corners longer than the miter limit are cut off at the limit.
    #[default]
    Miter,
    /// Sharp corner that turns into a bevel when it's longer than the miter limit.
    MiterRevert,
    /// Rounded corner.
    Round,
    /// Corner cut straight across.
    Bevel,
}

/// Shape of the ends of a stroked line.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LineCap {
    /// Line ends exactly at the end point.
    #[default]
    Butt,
    /// Half-circle around the end point.
    Round,
    /// Line extends by half of its width beyond the end point.
    Square,
}

/// Parameters of a stroke in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StrokeStyle {
    /// Line width.
    pub width: f64,
    /// Corner shape.
    pub join: LineJoin,
    /// End shape.
    pub cap: LineCap,
    /// Longest miter relative to the line width.
    pub miter_limit: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            join: LineJoin::default(),
            cap: LineCap::default(),
            miter_limit: 4.0,
        }
    }
}

impl StrokeStyle {
    /// Stroke of the given width with default joins and caps.
    pub fn new(width: f64) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    /// Sets the join.
    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    /// Sets the cap.
    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    /// Sets the miter limit.
    pub fn with_miter_limit(mut self, miter_limit: f64) -> Self {
        self.miter_limit = miter_limit;
        self
    }
}

/// Converts the path into the outline of its stroke.
///
/// The outline is a set of overlapping closed polygons (segment bodies, joins and caps), all
/// with the same orientation, so it must be filled with the non-zero rule.
pub fn stroke_outline(
    path: impl IntoIterator<Item = PathCommand>,
    style: &StrokeStyle,
) -> Vec<Subpath> {
    let mut output = vec![];
    if !(style.width.is_finite() && style.width > 0.0) {
        return output;
    }

    for mut subpath in subpaths(path) {
        subpath.dedup();
        if subpath.points.len() < 2 {
            continue;
        }
        stroke_subpath(&subpath, style, &mut output);
    }

    output
}

fn direction(a: &Point2d, b: &Point2d) -> Vector2d {
    (b - a).normalize()
}

fn normal(d: &Vector2d) -> Vector2d {
    Vector2d::new(-d.y, d.x)
}

fn stroke_subpath(subpath: &Subpath, style: &StrokeStyle, output: &mut Vec<Subpath>) {
    let hw = style.width / 2.0;
    let points = &subpath.points;
    let closed = subpath.closed && points.len() > 2;
    let segments: Vec<(Point2d, Point2d)> = subpath.segments().filter(|(a, b)| a != b).collect();
    let last = segments.len() - 1;

    for (i, (a, b)) in segments.iter().enumerate() {
        let d = direction(a, b);
        let n = normal(&d) * hw;
        let mut start = *a;
        let mut end = *b;
        if !closed && style.cap == LineCap::Square {
            if i == 0 {
                start -= d * hw;
            }
            if i == last {
                end += d * hw;
            }
        }

        push_polygon(vec![start + n, end + n, end - n, start - n], output);
    }

    let join_count = if closed { segments.len() } else { last };
    for i in 0..join_count {
        let (a, p) = segments[i];
        let (_, b) = segments[(i + 1) % segments.len()];
        add_join(&p, &direction(&a, &p), &direction(&p, &b), hw, style, output);
    }

    if !closed && style.cap == LineCap::Round {
        for p in [points[0], points[points.len() - 1]] {
            push_polygon(ellipse_points(p.x, p.y, hw, hw), output);
        }
    }
}

fn add_join(
    p: &Point2d,
    d1: &Vector2d,
    d2: &Vector2d,
    hw: f64,
    style: &StrokeStyle,
    output: &mut Vec<Subpath>,
) {
    let cross = d1.x * d2.y - d1.y * d2.x;
    let dot = d1.dot(d2);
    if cross.abs() < 1e-12 && dot > 0.0 {
        return;
    }

    if style.join == LineJoin::Round {
        push_polygon(ellipse_points(p.x, p.y, hw, hw), output);
        return;
    }

    if cross.abs() < 1e-12 {
        return;
    }

    let side = if cross > 0.0 { -1.0 } else { 1.0 };
    let o1 = normal(d1) * (side * hw);
    let o2 = normal(d2) * (side * hw);
    let bevel = vec![*p, p + o1, p + o2];

    if style.join == LineJoin::Bevel {
        push_polygon(bevel, output);
        return;
    }

    let bisector = (o1 + o2).normalize();
    let cos_half = (o1 / hw).dot(&bisector);
    if cos_half <= 0.0 {
        push_polygon(bevel, output);
        return;
    }

    let ratio = 1.0 / cos_half;
    if ratio <= style.miter_limit {
        push_polygon(vec![*p, p + o1, p + bisector * (hw * ratio), p + o2], output);
        return;
    }

    match style.join {
        LineJoin::Miter => {
            let reach = hw * style.miter_limit.max(cos_half);
            let along = d1.dot(&bisector);
            let t = if along > 0.0 {
                (reach - hw * cos_half) / along
            } else {
                0.0
            };
            push_polygon(
                vec![*p, p + o1, p + o1 + d1 * t, p + o2 - d2 * t, p + o2],
                output,
            );
        }
        _ => push_polygon(bevel, output),
    }
}

fn signed_area(points: &[Point2d]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

fn push_polygon(mut points: Vec<Point2d>, output: &mut Vec<Subpath>) {
    let area = signed_area(&points);
    if points.len() < 3 || area == 0.0 || !area.is_finite() {
        return;
    }
    if area < 0.0 {
        points.reverse();
    }

    output.push(Subpath::closed(points));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn p(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    fn line(points: &[Point2d]) -> Vec<PathCommand> {
        Subpath::open(points.to_vec()).commands().collect()
    }

    #[test]
    fn butt_and_square_caps() {
        let path = line(&[p(0.0, 5.0), p(10.0, 5.0)]);
        let butt = stroke_outline(path.clone(), &StrokeStyle::new(2.0));
        assert_eq!(butt.len(), 1);
        assert_abs_diff_eq!(signed_area(&butt[0].points), 20.0);

        let square = stroke_outline(path, &StrokeStyle::new(2.0).with_cap(LineCap::Square));
        assert_abs_diff_eq!(signed_area(&square[0].points), 24.0);
    }

    #[test]
    fn joins() {
        let path = line(&[p(0.0, 5.0), p(10.0, 5.0), p(10.0, 15.0)]);

        let miter = stroke_outline(path.clone(), &StrokeStyle::new(2.0));
        assert_eq!(miter.len(), 3);
        assert!(miter[2]
            .points
            .iter()
            .any(|q| (q - p(11.0, 4.0)).norm() < 1e-9));

        let bevel = stroke_outline(path.clone(), &StrokeStyle::new(2.0).with_join(LineJoin::Bevel));
        assert_eq!(bevel[2].points.len(), 3);

        let round = stroke_outline(path, &StrokeStyle::new(2.0).with_join(LineJoin::Round));
        assert!(round[2].points.len() >= 8);
    }

    #[test]
    fn sharp_corner_respects_miter_limit() {
        let path = line(&[p(0.0, 0.0), p(10.0, 0.0), p(0.0, 1.0)]);
        let style = StrokeStyle::new(2.0).with_miter_limit(2.0);

        let revert = stroke_outline(path.clone(), &style.with_join(LineJoin::MiterRevert));
        assert_eq!(revert[2].points.len(), 3);

        let truncated = stroke_outline(path, &style);
        assert_eq!(truncated[2].points.len(), 5);
        let farthest = truncated[2]
            .points
            .iter()
            .map(|q| (q - p(10.0, 0.0)).norm())
            .fold(0.0, f64::max);
        assert!(farthest < 2.5);
    }

    #[test]
    fn outline_has_single_orientation() {
        let ring = Subpath::closed(vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)]);
        let outline = stroke_outline(
            ring.commands(),
            &StrokeStyle::new(3.0).with_cap(LineCap::Round),
        );
        assert_eq!(outline.len(), 8);
        assert!(outline.iter().all(|s| signed_area(&s.points) > 0.0));
    }

    #[test]
    fn degenerate_paths_are_skipped() {
        let path = line(&[p(1.0, 1.0), p(1.0, 1.0)]);
        assert!(stroke_outline(path, &StrokeStyle::new(2.0)).is_empty());
        let path = line(&[p(0.0, 0.0), p(1.0, 1.0)]);
        assert!(stroke_outline(path, &StrokeStyle::new(0.0)).is_empty());
    }
}
