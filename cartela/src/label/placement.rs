use std::f64::consts::PI;

use cartela_types::{Box2d, Point2d, Vector2d};

use super::GlyphRun;

/// Position of a point label relative to its anchor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Label centered on the anchor.
    Center,
    /// Above.
    N,
    /// Below.
    S,
    /// To the right.
    E,
    /// To the left.
    W,
    /// Above and to the right.
    NE,
    /// Above and to the left.
    NW,
    /// Below and to the right.
    SE,
    /// Below and to the left.
    SW,
}

impl Direction {
    /// Parses a direction name, case insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_uppercase().as_str() {
            "C" | "CENTER" => Direction::Center,
            "N" => Direction::N,
            "S" => Direction::S,
            "E" => Direction::E,
            "W" => Direction::W,
            "NE" => Direction::NE,
            "NW" => Direction::NW,
            "SE" => Direction::SE,
            "SW" => Direction::SW,
            _ => return None,
        })
    }

    /// Shift of the label center in label half-sizes, y pointing down.
    fn shift(&self) -> (f64, f64) {
        match self {
            Direction::Center => (0.0, 0.0),
            Direction::N => (0.0, -1.0),
            Direction::S => (0.0, 1.0),
            Direction::E => (1.0, 0.0),
            Direction::W => (-1.0, 0.0),
            Direction::NE => (1.0, -1.0),
            Direction::NW => (-1.0, -1.0),
            Direction::SE => (1.0, 1.0),
            Direction::SW => (-1.0, 1.0),
        }
    }
}

/// Alternative point label positions: every direction is tried with the main font size, then
/// with every alternative size in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementList {
    /// Directions in the order they are tried.
    pub directions: Vec<Direction>,
    /// Font sizes tried after the main one.
    pub sizes: Vec<f64>,
}

impl Default for PlacementList {
    fn default() -> Self {
        Self {
            directions: vec![Direction::Center],
            sizes: vec![],
        }
    }
}

impl PlacementList {
    /// Parses a list like `"N,S,E,W,9,8"`. Unrecognized items are skipped.
    pub fn parse(text: &str) -> Self {
        let mut list = Self {
            directions: vec![],
            sizes: vec![],
        };
        for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(direction) = Direction::from_name(item) {
                list.directions.push(direction);
            } else if let Ok(size) = item.parse::<f64>() {
                if size.is_finite() && size > 0.0 {
                    list.sizes.push(size);
                }
            }
        }

        if list.directions.is_empty() {
            list.directions.push(Direction::Center);
        }

        list
    }
}

/// Glyph of a placed label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    /// Index of the glyph in its run.
    pub glyph: usize,
    /// Position of the glyph origin in pixels.
    pub origin: Point2d,
    /// Rotation of the glyph in radians, clockwise on screen.
    pub angle: f64,
}

/// Position of a label: where every glyph goes and the boxes it occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    /// Placed glyphs.
    pub glyphs: Vec<PlacedGlyph>,
    /// Boxes to register with the collision detector.
    pub boxes: Vec<Box2d>,
}

impl LabelCandidate {
    /// Bounding box of the whole label.
    pub fn bounding_box(&self) -> Box2d {
        self.boxes
            .iter()
            .fold(Box2d::empty(), |acc, bbox| acc.merge(bbox))
    }
}

/// Horizontal label around the anchor.
pub fn horizontal_label(
    anchor: Point2d,
    run: &GlyphRun,
    direction: Direction,
    dx: f64,
    dy: f64,
) -> LabelCandidate {
    let width = run.width();
    let height = run.height();
    let (sx, sy) = direction.shift();
    let center_x = anchor.x + dx + sx * width / 2.0;
    let center_y = anchor.y + dy + sy * height / 2.0;
    let left = center_x - width / 2.0;
    let baseline = center_y - height / 2.0 + run.ascent;

    LabelCandidate {
        glyphs: run
            .glyphs
            .iter()
            .enumerate()
            .map(|(i, glyph)| PlacedGlyph {
                glyph: i,
                origin: Point2d::new(left + glyph.offset, baseline),
                angle: 0.0,
            })
            .collect(),
        boxes: vec![Box2d::new(
            left,
            baseline - run.ascent,
            left + width,
            baseline + run.descent,
        )],
    }
}

/// Offsets around an anchor to search for a free label position, nearest first.
pub fn tolerance_offsets(tolerance: f64) -> Vec<Vector2d> {
    let mut offsets = vec![Vector2d::zeros()];
    if !(tolerance > 0.0) || !tolerance.is_finite() {
        return offsets;
    }

    const STEPS: u32 = 4;
    for step in 1..=STEPS {
        let d = tolerance * step as f64 / STEPS as f64;
        offsets.extend([
            Vector2d::new(d, 0.0),
            Vector2d::new(-d, 0.0),
            Vector2d::new(0.0, d),
            Vector2d::new(0.0, -d),
        ]);
    }

    offsets
}

struct Polyline {
    points: Vec<Point2d>,
    distances: Vec<f64>,
}

impl Polyline {
    fn new(points: Vec<Point2d>) -> Self {
        let mut distances = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += (p - points[i - 1]).norm();
            }
            distances.push(total);
        }

        Self { points, distances }
    }

    fn length(&self) -> f64 {
        self.distances.last().copied().unwrap_or(0.0)
    }

    /// Point at the distance along the line and the direction of the segment it lies on.
    fn locate(&self, distance: f64) -> (Point2d, f64) {
        let n = self.points.len();
        let segment = self
            .distances
            .partition_point(|d| *d < distance)
            .clamp(1, n - 1);
        let (a, b) = (self.points[segment - 1], self.points[segment]);
        let (da, db) = (self.distances[segment - 1], self.distances[segment]);
        let t = if db > da {
            ((distance - da) / (db - da)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        (a + (b - a) * t, (b.y - a.y).atan2(b.x - a.x))
    }
}

fn angle_difference(a: f64, b: f64) -> f64 {
    let mut d = (b - a) % (2.0 * PI);
    if d > PI {
        d -= 2.0 * PI;
    } else if d < -PI {
        d += 2.0 * PI;
    }
    d.abs()
}

/// Labels following the line, vertically centered on it and shifted by `dy` pixels.
///
/// The first candidate is centered on the line; with positive `spacing` more candidates are
/// added every `spacing` pixels in both directions. Labels are flipped so they never read
/// upside down. Candidates where adjacent glyphs turn by more than `max_char_angle_delta`
/// degrees are dropped.
pub fn line_labels(
    points: &[Point2d],
    run: &GlyphRun,
    spacing: f64,
    max_char_angle_delta: f64,
    dy: f64,
) -> Vec<LabelCandidate> {
    if points.len() < 2 {
        return vec![];
    }

    let forward = Polyline::new(points.to_vec());
    let length = forward.length();
    let width = run.width();
    if !(width > 0.0) || width > length {
        return vec![];
    }

    let mut reversed_points = points.to_vec();
    reversed_points.reverse();
    let backward = Polyline::new(reversed_points);

    let mut centers = vec![length / 2.0];
    if spacing > 0.0 {
        let mut k = 1.0;
        loop {
            let mut added = false;
            for center in [length / 2.0 + k * spacing, length / 2.0 - k * spacing] {
                if center >= width / 2.0 && center <= length - width / 2.0 {
                    centers.push(center);
                    added = true;
                }
            }
            if !added {
                break;
            }
            k += 1.0;
        }
    }

    let max_delta = max_char_angle_delta.to_radians();
    centers
        .into_iter()
        .filter_map(|center| {
            let start = forward.locate(center - width / 2.0).0;
            let end = forward.locate(center + width / 2.0).0;
            if end.x < start.x {
                place_on_line(&backward, length - center, run, max_delta, dy)
            } else {
                place_on_line(&forward, center, run, max_delta, dy)
            }
        })
        .collect()
}

fn place_on_line(
    line: &Polyline,
    center: f64,
    run: &GlyphRun,
    max_delta: f64,
    dy: f64,
) -> Option<LabelCandidate> {
    let start = center - run.width() / 2.0;
    let shift = (run.ascent - run.descent) / 2.0 + dy;
    let mut glyphs = Vec::with_capacity(run.glyphs.len());
    let mut boxes = Vec::with_capacity(run.glyphs.len());
    let mut previous_angle: Option<f64> = None;

    for (i, glyph) in run.glyphs.iter().enumerate() {
        let (p0, segment_angle) = line.locate(start + glyph.offset);
        let (p1, _) = line.locate(start + glyph.offset + glyph.advance);
        let angle = if (p1 - p0).norm() > 1e-9 {
            (p1.y - p0.y).atan2(p1.x - p0.x)
        } else {
            segment_angle
        };

        if let Some(previous) = previous_angle {
            if angle_difference(previous, angle) > max_delta {
                return None;
            }
        }
        previous_angle = Some(angle);

        let (sin, cos) = angle.sin_cos();
        let normal = Vector2d::new(-sin, cos);
        let origin = p0 + normal * shift;
        let corners = [
            (0.0, -run.ascent),
            (glyph.advance, -run.ascent),
            (glyph.advance, run.descent),
            (0.0, run.descent),
        ]
        .map(|(x, y)| Point2d::new(origin.x + x * cos - y * sin, origin.y + x * sin + y * cos));
        if let Some(bbox) = Box2d::from_points(&corners) {
            boxes.push(bbox);
        }

        glyphs.push(PlacedGlyph {
            glyph: i,
            origin,
            angle,
        });
    }

    Some(LabelCandidate { glyphs, boxes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::{BlockTextEngine, TextEngine};
    use approx::assert_abs_diff_eq;

    fn p(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    fn run(text: &str) -> GlyphRun {
        BlockTextEngine.layout(text, 10.0, 0.0)
    }

    #[test]
    fn parse_placement_list() {
        let list = PlacementList::parse("N, s,E,W,9,8,bogus");
        assert_eq!(
            list.directions,
            vec![Direction::N, Direction::S, Direction::E, Direction::W]
        );
        assert_eq!(list.sizes, vec![9.0, 8.0]);
        assert_eq!(PlacementList::parse("12"), PlacementList {
            directions: vec![Direction::Center],
            sizes: vec![12.0],
        });
    }

    #[test]
    fn horizontal_labels() {
        let text = run("abcd");
        let centered = horizontal_label(p(100.0, 50.0), &text, Direction::Center, 0.0, 0.0);
        assert_eq!(centered.boxes.len(), 1);
        let bbox = centered.bounding_box();
        assert_abs_diff_eq!(bbox.minx, 88.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bbox.maxx, 112.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bbox.miny, 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bbox.maxy, 55.0, epsilon = 1e-9);
        assert_abs_diff_eq!(centered.glyphs[0].origin.y, 53.0, epsilon = 1e-9);

        let north = horizontal_label(p(100.0, 50.0), &text, Direction::NE, 2.0, 0.0);
        let bbox = north.bounding_box();
        assert_abs_diff_eq!(bbox.minx, 102.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bbox.maxy, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn straight_line_label() {
        let text = run("abc");
        let labels = line_labels(&[p(0.0, 20.0), p(100.0, 20.0)], &text, 0.0, 22.5, 0.0);
        assert_eq!(labels.len(), 1);
        let xs: Vec<f64> = labels[0].glyphs.iter().map(|g| g.origin.x).collect();
        assert_abs_diff_eq!(xs[0], 41.0, epsilon = 1e-9);
        assert_abs_diff_eq!(xs[1], 47.0, epsilon = 1e-9);
        assert_abs_diff_eq!(xs[2], 53.0, epsilon = 1e-9);
        assert_abs_diff_eq!(labels[0].glyphs[0].origin.y, 23.0, epsilon = 1e-9);
        assert_eq!(labels[0].boxes.len(), 3);
    }

    #[test]
    fn labels_are_not_upside_down() {
        let text = run("abc");
        let forward = line_labels(&[p(0.0, 20.0), p(100.0, 20.0)], &text, 0.0, 22.5, 0.0);
        let backward = line_labels(&[p(100.0, 20.0), p(0.0, 20.0)], &text, 0.0, 22.5, 0.0);
        for (a, b) in forward[0].glyphs.iter().zip(&backward[0].glyphs) {
            assert_abs_diff_eq!(a.origin.x, b.origin.x, epsilon = 1e-9);
            assert_abs_diff_eq!(a.origin.y, b.origin.y, epsilon = 1e-9);
            assert_abs_diff_eq!(a.angle, b.angle, epsilon = 1e-9);
        }
    }

    #[test]
    fn sharp_corners_are_avoided() {
        let text = run("abc");
        let line = [p(0.0, 0.0), p(50.0, 0.0), p(50.0, 50.0)];
        assert!(line_labels(&line, &text, 0.0, 22.5, 0.0).is_empty());
        assert_eq!(line_labels(&line, &text, 0.0, 100.0, 0.0).len(), 1);
    }

    #[test]
    fn repeated_labels() {
        let text = run("abc");
        let labels = line_labels(&[p(0.0, 0.0), p(300.0, 0.0)], &text, 100.0, 22.5, 0.0);
        let starts: Vec<f64> = labels.iter().map(|l| l.glyphs[0].origin.x).collect();
        assert_eq!(starts.len(), 3);
        assert_abs_diff_eq!(starts[0], 141.0, epsilon = 1e-9);
        assert_abs_diff_eq!(starts[1], 241.0, epsilon = 1e-9);
        assert_abs_diff_eq!(starts[2], 41.0, epsilon = 1e-9);

        assert!(line_labels(&[p(0.0, 0.0), p(10.0, 0.0)], &text, 0.0, 22.5, 0.0).is_empty());
    }

    #[test]
    fn offsets() {
        assert_eq!(tolerance_offsets(0.0).len(), 1);
        let offsets = tolerance_offsets(8.0);
        assert_eq!(offsets.len(), 17);
        assert_eq!(offsets[1], Vector2d::new(2.0, 0.0));
        assert_eq!(offsets[16], Vector2d::new(0.0, -8.0));
    }
}
