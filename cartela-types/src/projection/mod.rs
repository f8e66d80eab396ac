//! Projections between spatial reference systems.
//!
//! The renderer never does coordinate math itself. It asks a [`ProjectionFactory`] for a
//! [`Projection`] from geographic coordinates into each SRS it meets, and chains two of them
//! into a [`ProjTransform`] to go from a layer SRS to the map SRS.

use std::fmt::{Debug, Formatter};

use crate::error::ProjectionError;
use crate::{Box2d, Point2d};

mod identity;
mod web_mercator;

#[cfg(feature = "geodesy")]
mod geodesy;

#[cfg(feature = "geodesy")]
pub use geodesy::GeodesyProjection;
pub use identity::IdentityProjection;
pub use web_mercator::{WebMercator, MAX_LATITUDE, WGS84_SEMIMAJOR};

/// Number of sample points taken along each side of a rectangle when projecting it.
const BOX_EDGE_SAMPLES: usize = 16;

/// Projection from geographic coordinates (longitude/latitude in degrees, `x` = longitude) into
/// a projected coordinate system.
pub trait Projection {
    /// Projects a geographic point. Returns `None` if the point is outside of the projection
    /// domain.
    fn forward(&self, input: &Point2d) -> Option<Point2d>;
    /// Converts a projected point back into geographic coordinates.
    fn inverse(&self, input: &Point2d) -> Option<Point2d>;
}

/// Well-known kinds of spatial reference systems recognized from their descriptor strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Srs {
    /// Longitude/latitude in degrees.
    Geographic,
    /// Spherical Mercator in metres (`EPSG:3857`).
    WebMercator,
    /// Anything else; the descriptor is kept as given.
    Other(String),
}

impl Srs {
    /// Recognizes the SRS from an `EPSG:NNNN` code or a PROJ-style `+proj=...` string.
    pub fn parse(descriptor: &str) -> Self {
        let normalized = descriptor.trim().to_ascii_lowercase();
        let code = normalized
            .strip_prefix("+init=")
            .unwrap_or(&normalized)
            .trim();

        match code {
            "epsg:4326" | "wgs84" | "crs:84" => return Srs::Geographic,
            "epsg:3857" | "epsg:900913" | "epsg:3785" => return Srs::WebMercator,
            _ => {}
        }

        let params: Vec<&str> = normalized.split_whitespace().collect();
        let has = |param: &str| params.iter().any(|p| *p == param);

        if has("+proj=longlat") || has("+proj=latlong") || has("+proj=lonlat") {
            return Srs::Geographic;
        }

        if has("+proj=merc") && has("+a=6378137") && has("+b=6378137") {
            return Srs::WebMercator;
        }

        Srs::Other(descriptor.to_string())
    }

    /// Returns true for longitude/latitude systems.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Srs::Geographic)
    }

    /// Length of one coordinate unit in metres at the equator.
    pub fn meters_per_unit(&self) -> f64 {
        match self {
            Srs::Geographic => 2.0 * std::f64::consts::PI * WGS84_SEMIMAJOR / 360.0,
            _ => 1.0,
        }
    }

    /// Full valid coordinate range of the system, if known.
    pub fn world_extent(&self) -> Option<Box2d> {
        match self {
            Srs::Geographic => Some(Box2d::new(-180.0, -90.0, 180.0, 90.0)),
            Srs::WebMercator => {
                let half = WebMercator::default().half_world();
                Some(Box2d::new(-half, -half, half, half))
            }
            Srs::Other(_) => None,
        }
    }
}

/// Creates projections from SRS descriptor strings. This is the seam where an external
/// projection library is plugged in.
pub trait ProjectionFactory {
    /// Returns the projection from geographic coordinates into `srs`.
    fn create(&self, srs: &str) -> Result<Box<dyn Projection>, ProjectionError>;
}

/// Factory knowing geographic and Web Mercator systems. With the `geodesy` feature, descriptors
/// of the form `geodesy:<definition>` are handed to the `geodesy` crate.
#[derive(Debug, Default, Copy, Clone)]
pub struct BuiltinProjections;

impl ProjectionFactory for BuiltinProjections {
    fn create(&self, srs: &str) -> Result<Box<dyn Projection>, ProjectionError> {
        match Srs::parse(srs) {
            Srs::Geographic => Ok(Box::new(IdentityProjection)),
            Srs::WebMercator => Ok(Box::new(WebMercator::default())),
            Srs::Other(descriptor) => create_external(&descriptor)
                .ok_or_else(|| ProjectionError::UnknownSrs(descriptor.clone())),
        }
    }
}

#[cfg(feature = "geodesy")]
fn create_external(descriptor: &str) -> Option<Box<dyn Projection>> {
    let definition = descriptor.trim().strip_prefix("geodesy:")?;
    let projection = GeodesyProjection::new(definition)?;
    Some(Box::new(projection))
}

#[cfg(not(feature = "geodesy"))]
fn create_external(_descriptor: &str) -> Option<Box<dyn Projection>> {
    None
}

/// Transformation of points from a source SRS into a destination SRS.
///
/// If the two descriptors are byte-for-byte equal the transform is the identity and no
/// projection is ever called.
pub struct ProjTransform {
    chain: Option<(Box<dyn Projection>, Box<dyn Projection>)>,
}

impl Debug for ProjTransform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjTransform")
            .field("identity", &self.is_identity())
            .finish()
    }
}

impl ProjTransform {
    /// Creates a transform using the [`BuiltinProjections`].
    pub fn new(source: &str, dest: &str) -> Result<Self, ProjectionError> {
        Self::with_factory(source, dest, &BuiltinProjections)
    }

    /// Creates a transform using projections provided by the given factory.
    pub fn with_factory(
        source: &str,
        dest: &str,
        factory: &dyn ProjectionFactory,
    ) -> Result<Self, ProjectionError> {
        if source == dest {
            return Ok(Self::identity());
        }

        let source = factory.create(source)?;
        let dest = factory.create(dest)?;
        Ok(Self {
            chain: Some((source, dest)),
        })
    }

    /// Transform that doesn't change points.
    pub fn identity() -> Self {
        Self { chain: None }
    }

    /// Returns true if the transform doesn't change points.
    pub fn is_identity(&self) -> bool {
        self.chain.is_none()
    }

    /// Converts a point from the source SRS into the destination SRS.
    pub fn forward(&self, point: &Point2d) -> Result<Point2d, ProjectionError> {
        let Some((source, dest)) = &self.chain else {
            return Ok(*point);
        };

        source
            .inverse(point)
            .and_then(|geo| dest.forward(&geo))
            .ok_or(ProjectionError::OutOfDomain {
                x: point.x,
                y: point.y,
            })
    }

    /// Converts a point from the destination SRS back into the source SRS.
    pub fn backward(&self, point: &Point2d) -> Result<Point2d, ProjectionError> {
        let Some((source, dest)) = &self.chain else {
            return Ok(*point);
        };

        dest.inverse(point)
            .and_then(|geo| source.forward(&geo))
            .ok_or(ProjectionError::OutOfDomain {
                x: point.x,
                y: point.y,
            })
    }

    /// Projects a rectangle by sampling points along its sides. Points that fail to project are
    /// ignored.
    pub fn forward_box(&self, bbox: &Box2d) -> Result<Box2d, ProjectionError> {
        self.transform_box(bbox, |p| self.forward(p))
    }

    /// Inverse of [`ProjTransform::forward_box`].
    pub fn backward_box(&self, bbox: &Box2d) -> Result<Box2d, ProjectionError> {
        self.transform_box(bbox, |p| self.backward(p))
    }

    fn transform_box(
        &self,
        bbox: &Box2d,
        transform: impl Fn(&Point2d) -> Result<Point2d, ProjectionError>,
    ) -> Result<Box2d, ProjectionError> {
        if self.is_identity() {
            return Ok(*bbox);
        }

        let mut result = Box2d::empty();
        let corners = bbox.corners();
        for i in 0..corners.len() {
            let from = corners[i];
            let to = corners[(i + 1) % corners.len()];
            for step in 0..BOX_EDGE_SAMPLES {
                let k = step as f64 / BOX_EDGE_SAMPLES as f64;
                let sample = from + (to - from) * k;
                if let Ok(projected) = transform(&sample) {
                    result.expand_to_include(&projected);
                }
            }
        }

        if result.is_valid() {
            Ok(result)
        } else {
            Err(ProjectionError::EmptyBox)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    struct CountingFactory(std::cell::Cell<usize>);

    impl ProjectionFactory for CountingFactory {
        fn create(&self, srs: &str) -> Result<Box<dyn Projection>, ProjectionError> {
            self.0.set(self.0.get() + 1);
            BuiltinProjections.create(srs)
        }
    }

    #[test]
    fn parse_descriptors() {
        assert_eq!(Srs::parse("EPSG:4326"), Srs::Geographic);
        assert_eq!(Srs::parse("+init=epsg:4326"), Srs::Geographic);
        assert_eq!(
            Srs::parse("+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs"),
            Srs::Geographic
        );
        assert_eq!(
            Srs::parse("+proj=merc +a=6378137 +b=6378137 +lat_ts=0.0 +lon_0=0.0 +x_0=0.0 +y_0=0 +k=1.0 +units=m +nadgrids=@null +wktext +no_defs"),
            Srs::WebMercator
        );
        assert_eq!(
            Srs::parse("+proj=utm +zone=33"),
            Srs::Other("+proj=utm +zone=33".into())
        );
    }

    #[test]
    fn identical_descriptors_short_circuit() {
        let factory = CountingFactory(Default::default());
        let transform = ProjTransform::with_factory("epsg:4326", "epsg:4326", &factory).unwrap();

        assert!(transform.is_identity());
        assert_eq!(factory.0.get(), 0);
        assert_eq!(
            transform.forward(&Point2d::new(1.0, 2.0)).unwrap(),
            Point2d::new(1.0, 2.0)
        );
    }

    #[test]
    fn geographic_to_mercator() {
        let transform = ProjTransform::new("epsg:4326", "epsg:3857").unwrap();
        let projected = transform.forward(&Point2d::new(180.0, 0.0)).unwrap();
        assert_abs_diff_eq!(projected.x, WebMercator::default().half_world(), epsilon = 1e-6);

        let back = transform.backward(&projected).unwrap();
        assert_abs_diff_eq!(back, Point2d::new(180.0, 0.0), epsilon = 1e-9);

        assert_matches!(
            transform.forward(&Point2d::new(0.0, 89.9)),
            Err(ProjectionError::OutOfDomain { .. })
        );
    }

    #[test]
    fn unknown_srs() {
        assert_matches!(
            ProjTransform::new("epsg:4326", "+proj=utm +zone=33"),
            Err(ProjectionError::UnknownSrs(_))
        );
    }

    #[test]
    fn project_box() {
        let transform = ProjTransform::new("epsg:3857", "epsg:4326").unwrap();
        let half = WebMercator::default().half_world();
        let bbox = transform
            .forward_box(&Box2d::new(-half, 0.0, half, 1000.0))
            .unwrap();

        assert_abs_diff_eq!(bbox.minx, -180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bbox.maxx, 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bbox.miny, 0.0, epsilon = 1e-9);
    }
}
