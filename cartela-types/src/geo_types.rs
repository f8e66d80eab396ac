//! Conversions from [`geo_types`] geometries.

use geo_types::{Coord, Geometry};

use crate::{Geom, LineString, Point2d, Polygon};

fn point(coord: &Coord<f64>) -> Point2d {
    Point2d::new(coord.x, coord.y)
}

impl From<geo_types::Point<f64>> for Geom {
    fn from(value: geo_types::Point<f64>) -> Self {
        Geom::Point(point(&value.0))
    }
}

impl From<&geo_types::LineString<f64>> for LineString {
    fn from(value: &geo_types::LineString<f64>) -> Self {
        LineString::new(value.0.iter().map(point).collect())
    }
}

impl From<&geo_types::Polygon<f64>> for Polygon {
    fn from(value: &geo_types::Polygon<f64>) -> Self {
        Polygon::new(
            value.exterior().0.iter().map(point).collect(),
            value
                .interiors()
                .iter()
                .map(|ring| ring.0.iter().map(point).collect())
                .collect(),
        )
    }
}

impl Geom {
    /// Splits a `geo-types` geometry into single-part geometries. Multi-geometries and
    /// collections are flattened in order.
    pub fn from_geo_types(geometry: &Geometry<f64>) -> Vec<Geom> {
        let mut result = Vec::new();
        flatten(geometry, &mut result);
        result
    }
}

fn flatten(geometry: &Geometry<f64>, result: &mut Vec<Geom>) {
    match geometry {
        Geometry::Point(p) => result.push(Geom::Point(point(&p.0))),
        Geometry::MultiPoint(points) => {
            result.extend(points.iter().map(|p| Geom::Point(point(&p.0))))
        }
        Geometry::Line(line) => result.push(Geom::LineString(LineString::new(vec![
            point(&line.start),
            point(&line.end),
        ]))),
        Geometry::LineString(line) => result.push(Geom::LineString(line.into())),
        Geometry::MultiLineString(lines) => {
            result.extend(lines.iter().map(|l| Geom::LineString(l.into())))
        }
        Geometry::Polygon(polygon) => result.push(Geom::Polygon(polygon.into())),
        Geometry::MultiPolygon(polygons) => {
            result.extend(polygons.iter().map(|p| Geom::Polygon(p.into())))
        }
        Geometry::Rect(rect) => result.push(Geom::Polygon((&rect.to_polygon()).into())),
        Geometry::Triangle(triangle) => {
            result.push(Geom::Polygon((&triangle.to_polygon()).into()))
        }
        Geometry::GeometryCollection(collection) => {
            for geometry in collection.iter() {
                flatten(geometry, result);
            }
        }
    }
}
