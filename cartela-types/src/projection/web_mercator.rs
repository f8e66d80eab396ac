use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::projection::Projection;
use crate::Point2d;

/// Semi-major axis of the WGS84 ellipsoid, used as the sphere radius by Web Mercator.
pub const WGS84_SEMIMAJOR: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator is not defined, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Spherical (Web) Mercator projection: geographic degrees to metres.
#[derive(Debug, Copy, Clone)]
pub struct WebMercator {
    semimajor: f64,
}

impl WebMercator {
    /// Creates a projection on a sphere with the given radius.
    pub fn new(semimajor: f64) -> Self {
        Self { semimajor }
    }

    /// Half of the projected world width in metres.
    pub fn half_world(&self) -> f64 {
        std::f64::consts::PI * self.semimajor
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new(WGS84_SEMIMAJOR)
    }
}

impl Projection for WebMercator {
    fn forward(&self, input: &Point2d) -> Option<Point2d> {
        if input.y.abs() > MAX_LATITUDE {
            return None;
        }

        let x = self.semimajor * input.x.to_radians();
        let y = self.semimajor * (FRAC_PI_4 + input.y.to_radians() / 2.0).tan().ln();

        if x.is_finite() && y.is_finite() {
            Some(Point2d::new(x, y))
        } else {
            None
        }
    }

    fn inverse(&self, input: &Point2d) -> Option<Point2d> {
        let lat = 2.0 * (input.y / self.semimajor).exp().atan() - FRAC_PI_2;
        let lon = input.x / self.semimajor;

        if lat.is_finite() && lon.is_finite() {
            Some(Point2d::new(lon.to_degrees(), lat.to_degrees()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn round_trip() {
        let projection = WebMercator::default();
        let point = Point2d::new(37.6, 55.75);
        let projected = projection.forward(&point).unwrap();
        assert_abs_diff_eq!(projected.x, 4_185_612.85, epsilon = 0.01);
        assert_abs_diff_eq!(
            projection.inverse(&projected).unwrap(),
            point,
            epsilon = 1e-9
        );
    }

    #[test]
    fn poles_are_out_of_domain() {
        assert!(WebMercator::default()
            .forward(&Point2d::new(0.0, 90.0))
            .is_none());
    }
}
