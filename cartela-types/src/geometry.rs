//! Geometries carried by map features.

use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Box2d, Point2d};

/// Kind of a single geometry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GeometryType {
    /// Single point.
    Point,
    /// Open polyline.
    LineString,
    /// Polygon with optional holes.
    Polygon,
}

impl GeometryType {
    /// Lowercase name of the type, as exposed to expressions.
    pub fn name(&self) -> &'static str {
        match self {
            GeometryType::Point => "point",
            GeometryType::LineString => "linestring",
            GeometryType::Polygon => "polygon",
        }
    }
}

impl Display for GeometryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sequence of vertices connected by straight segments.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineString {
    /// Vertices of the line.
    pub points: Vec<Point2d>,
}

impl LineString {
    /// Creates a new line.
    pub fn new(points: Vec<Point2d>) -> Self {
        Self { points }
    }

    /// Total length of the line.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }

    /// Point located at `distance` along the line, measured from the first vertex. The distance
    /// is clamped to the line length.
    pub fn point_at(&self, distance: f64) -> Option<Point2d> {
        let first = *self.points.first()?;
        let mut travelled = 0.0;
        for w in self.points.windows(2) {
            let segment = (w[1] - w[0]).norm();
            if segment > 0.0 && travelled + segment >= distance {
                let k = ((distance - travelled) / segment).clamp(0.0, 1.0);
                return Some(w[0] + (w[1] - w[0]) * k);
            }
            travelled += segment;
        }

        Some(*self.points.last().unwrap_or(&first))
    }

    /// Point in the middle of the line by arc length.
    pub fn midpoint(&self) -> Option<Point2d> {
        self.point_at(self.length() / 2.0)
    }
}

impl From<Vec<Point2d>> for LineString {
    fn from(points: Vec<Point2d>) -> Self {
        Self::new(points)
    }
}

/// Polygon with an exterior ring and any number of holes. Rings may be given either closed
/// (last vertex repeating the first one) or open.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polygon {
    /// Outer ring.
    pub exterior: Vec<Point2d>,
    /// Holes.
    #[cfg_attr(feature = "serde", serde(default))]
    pub interiors: Vec<Vec<Point2d>>,
}

impl Polygon {
    /// Creates a new polygon.
    pub fn new(exterior: Vec<Point2d>, interiors: Vec<Vec<Point2d>>) -> Self {
        Self {
            exterior,
            interiors,
        }
    }

    /// Iterates over all rings, exterior first.
    pub fn rings(&self) -> impl Iterator<Item = &Vec<Point2d>> + '_ {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    /// Area of the exterior minus areas of the holes.
    pub fn area(&self) -> f64 {
        let outer = signed_ring_area(&self.exterior).abs();
        let holes: f64 = self
            .interiors
            .iter()
            .map(|r| signed_ring_area(r).abs())
            .sum();
        outer - holes
    }

    /// Area-weighted centroid. Falls back to the vertex average for degenerate polygons.
    pub fn centroid(&self) -> Option<Point2d> {
        let mut area_sum = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for (index, ring) in self.rings().enumerate() {
            let (a, x, y) = ring_moments(ring);
            // Holes are subtracted regardless of their winding.
            let orientation = if a < 0.0 { -1.0 } else { 1.0 };
            let sign = if index == 0 { orientation } else { -orientation };
            area_sum += a * sign;
            cx += x * sign;
            cy += y * sign;
        }

        if area_sum.abs() < f64::EPSILON {
            let count = self.exterior.len();
            if count == 0 {
                return None;
            }
            let sum = self
                .exterior
                .iter()
                .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
            return Some(Point2d::from(sum / count as f64));
        }

        Some(Point2d::new(cx / (3.0 * area_sum), cy / (3.0 * area_sum)))
    }

    /// A point guaranteed to be inside of the polygon (when the polygon has non-zero area).
    ///
    /// A horizontal line is cast through the centroid; the midpoint of the widest interval of
    /// that line lying inside the polygon is returned.
    pub fn interior_point(&self) -> Option<Point2d> {
        let centroid = self.centroid()?;
        let bbox = Box2d::from_points(self.exterior.iter())?;
        let candidates = [centroid.y, bbox.center().y];

        for y in candidates {
            if let Some(x) = self.widest_interval_midpoint(y) {
                return Some(Point2d::new(x, y));
            }
        }

        Some(centroid)
    }

    fn widest_interval_midpoint(&self, y: f64) -> Option<f64> {
        let mut crossings = Vec::new();
        for ring in self.rings() {
            let n = ring.len();
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + 1) % n];
                if (a.y > y) != (b.y > y) {
                    crossings.push(a.x + (y - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
        }

        crossings.sort_by(f64::total_cmp);
        crossings
            .chunks_exact(2)
            .map(|pair| (pair[1] - pair[0], (pair[0] + pair[1]) / 2.0))
            .filter(|(width, _)| *width > 0.0)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, mid)| mid)
    }
}

fn signed_ring_area(ring: &[Point2d]) -> f64 {
    ring_moments(ring).0
}

/// Signed area of a ring and its first moments, halved.
fn ring_moments(ring: &[Point2d]) -> (f64, f64, f64) {
    let n = ring.len();
    let mut a = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let p = ring[i];
        let q = ring[(i + 1) % n];
        let cross = p.x * q.y - q.x * p.y;
        a += cross;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }

    (a / 2.0, cx / 2.0, cy / 2.0)
}

/// Geometry of a feature.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Geom {
    /// Single point.
    Point(Point2d),
    /// Polyline.
    LineString(LineString),
    /// Polygon.
    Polygon(Polygon),
}

impl Geom {
    /// Type of the geometry.
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geom::Point(_) => GeometryType::Point,
            Geom::LineString(_) => GeometryType::LineString,
            Geom::Polygon(_) => GeometryType::Polygon,
        }
    }

    /// Bounding rectangle of all vertices. `None` for geometries without vertices.
    pub fn bounding_box(&self) -> Option<Box2d> {
        match self {
            Geom::Point(p) => Some(Box2d::from_point(p)),
            Geom::LineString(line) => Box2d::from_points(line.points.iter()),
            Geom::Polygon(polygon) => Box2d::from_points(polygon.exterior.iter()),
        }
    }

    /// Iterates over all vertices of the geometry.
    pub fn vertices(&self) -> Box<dyn Iterator<Item = &Point2d> + '_> {
        match self {
            Geom::Point(p) => Box::new(std::iter::once(p)),
            Geom::LineString(line) => Box::new(line.points.iter()),
            Geom::Polygon(polygon) => Box::new(polygon.rings().flatten()),
        }
    }

    /// Applies a fallible point transformation to every vertex. Returns `None` if any of the
    /// vertices cannot be transformed.
    pub fn try_map_points(
        &self,
        mut f: impl FnMut(&Point2d) -> Option<Point2d>,
    ) -> Option<Geom> {
        let mut map_ring =
            |ring: &Vec<Point2d>| -> Option<Vec<Point2d>> { ring.iter().map(&mut f).collect() };

        Some(match self {
            Geom::Point(p) => Geom::Point(f(p)?),
            Geom::LineString(line) => Geom::LineString(LineString::new(map_ring(&line.points)?)),
            Geom::Polygon(polygon) => Geom::Polygon(Polygon::new(
                map_ring(&polygon.exterior)?,
                polygon
                    .interiors
                    .iter()
                    .map(&mut map_ring)
                    .collect::<Option<Vec<_>>>()?,
            )),
        })
    }

    /// Geometry moved by the given offsets.
    pub fn translate(&self, dx: f64, dy: f64) -> Geom {
        let shift = nalgebra::Vector2::new(dx, dy);
        match self.try_map_points(|p| Some(p + shift)) {
            Some(geom) => geom,
            None => self.clone(),
        }
    }

    /// Centroid: the point itself, the middle of the line, or the polygon area centroid.
    pub fn centroid(&self) -> Option<Point2d> {
        match self {
            Geom::Point(p) => Some(*p),
            Geom::LineString(line) => line.midpoint(),
            Geom::Polygon(polygon) => polygon.centroid(),
        }
    }

    /// Representative point used to place point-like symbols: interior point for polygons and
    /// the arc-length midpoint for lines.
    pub fn representative_point(&self) -> Option<Point2d> {
        match self {
            Geom::Point(p) => Some(*p),
            Geom::LineString(line) => line.midpoint(),
            Geom::Polygon(polygon) => polygon.interior_point(),
        }
    }
}

impl From<Point2d> for Geom {
    fn from(value: Point2d) -> Self {
        Self::Point(value)
    }
}

impl From<LineString> for Geom {
    fn from(value: LineString) -> Self {
        Self::LineString(value)
    }
}

impl From<Polygon> for Geom {
    fn from(value: Polygon) -> Self {
        Self::Polygon(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point2d> {
        vec![
            Point2d::new(x0, y0),
            Point2d::new(x0 + size, y0),
            Point2d::new(x0 + size, y0 + size),
            Point2d::new(x0, y0 + size),
            Point2d::new(x0, y0),
        ]
    }

    #[test]
    fn line_midpoint_by_arc_length() {
        let line = LineString::new(vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(10.0, 0.0),
            Point2d::new(10.0, 30.0),
        ]);

        assert_abs_diff_eq!(line.length(), 40.0);
        assert_abs_diff_eq!(line.midpoint().unwrap(), Point2d::new(10.0, 10.0));
    }

    #[test]
    fn polygon_centroid_with_hole() {
        let polygon = Polygon::new(square(0.0, 0.0, 10.0), vec![]);
        assert_abs_diff_eq!(polygon.centroid().unwrap(), Point2d::new(5.0, 5.0));
        assert_abs_diff_eq!(polygon.area(), 100.0);

        let with_hole = Polygon::new(square(0.0, 0.0, 10.0), vec![square(0.0, 0.0, 5.0)]);
        assert_abs_diff_eq!(with_hole.area(), 75.0);
        let centroid = with_hole.centroid().unwrap();
        assert!(centroid.x > 5.0 && centroid.y > 5.0);
    }

    #[test]
    fn interior_point_of_concave_polygon() {
        // U-shaped polygon: the centroid falls into the notch.
        let polygon = Polygon::new(
            vec![
                Point2d::new(0.0, 0.0),
                Point2d::new(10.0, 0.0),
                Point2d::new(10.0, 10.0),
                Point2d::new(8.0, 10.0),
                Point2d::new(8.0, 2.0),
                Point2d::new(2.0, 2.0),
                Point2d::new(2.0, 10.0),
                Point2d::new(0.0, 10.0),
            ],
            vec![],
        );

        let point = polygon.interior_point().unwrap();
        let inside_left = point.x > 0.0 && point.x < 2.0;
        let inside_right = point.x > 8.0 && point.x < 10.0;
        let inside_bottom = point.y < 2.0;
        assert!(inside_left || inside_right || inside_bottom, "{point:?}");
    }

    #[test]
    fn try_map_points_fails_on_any_vertex() {
        let geom = Geom::LineString(LineString::new(vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(1.0, 1.0),
        ]));

        assert!(geom.try_map_points(|p| (p.x < 0.5).then_some(*p)).is_none());
        assert_eq!(
            geom.translate(1.0, 2.0).bounding_box(),
            Some(Box2d::new(1.0, 2.0, 2.0, 3.0))
        );
    }
}
