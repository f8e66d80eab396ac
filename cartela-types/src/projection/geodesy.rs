use geodesy::prelude::*;

use crate::projection::Projection;
use crate::Point2d;

/// Projection backed by the `geodesy` crate. The definition uses geodesy operator syntax, e.g.
/// `laea lon_0=10 lat_0=52 x_0=4321000 y_0=3210000`.
pub struct GeodesyProjection {
    context: Minimal,
    op: OpHandle,
}

impl GeodesyProjection {
    /// Creates a projection from the operator definition, or `None` if geodesy rejects it.
    pub fn new(definition: &str) -> Option<Self> {
        let mut context = Minimal::new();
        let op = context.op(definition).ok()?;
        Some(Self { context, op })
    }
}

impl Projection for GeodesyProjection {
    fn forward(&self, input: &Point2d) -> Option<Point2d> {
        let mut data = [Coor2D::geo(input.y, input.x)];
        self.context.apply(self.op, Fwd, &mut data).ok()?;

        if !data[0].0[0].is_finite() || !data[0].0[1].is_finite() {
            return None;
        }

        Some(Point2d::new(data[0].0[0], data[0].0[1]))
    }

    fn inverse(&self, input: &Point2d) -> Option<Point2d> {
        let mut data = [Coor2D([input.x, input.y])];
        self.context.apply(self.op, Inv, &mut data).ok()?;

        Some(Point2d::new(
            data[0].0[0].to_degrees(),
            data[0].0[1].to_degrees(),
        ))
    }
}
