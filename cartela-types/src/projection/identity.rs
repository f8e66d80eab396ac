use crate::projection::Projection;
use crate::Point2d;

/// Projection that returns its input unchanged.
#[derive(Debug, Default, Copy, Clone)]
pub struct IdentityProjection;

impl Projection for IdentityProjection {
    fn forward(&self, input: &Point2d) -> Option<Point2d> {
        Some(*input)
    }

    fn inverse(&self, input: &Point2d) -> Option<Point2d> {
        Some(*input)
    }
}
