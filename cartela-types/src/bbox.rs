use approx::{AbsDiffEq, RelativeEq};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Point2d;

/// Axis-aligned rectangle.
///
/// The constructor does not reorder the corners. A rectangle with `minx > maxx` or
/// `miny > maxy` is considered empty: this is what [`Box2d::intersect`] returns for disjoint
/// inputs, and all operations accept it.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Box2d {
    /// Minimum x coordinate.
    pub minx: f64,
    /// Minimum y coordinate.
    pub miny: f64,
    /// Maximum x coordinate.
    pub maxx: f64,
    /// Maximum y coordinate.
    pub maxy: f64,
}

impl Box2d {
    /// Creates a new rectangle from its bounds as is.
    pub const fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    /// Rectangle that contains nothing. Expanding it by a point gives the point's rectangle.
    pub const fn empty() -> Self {
        Self {
            minx: f64::INFINITY,
            miny: f64::INFINITY,
            maxx: f64::NEG_INFINITY,
            maxy: f64::NEG_INFINITY,
        }
    }

    /// Zero-size rectangle at the given point.
    pub fn from_point(p: &Point2d) -> Self {
        Self::new(p.x, p.y, p.x, p.y)
    }

    /// Smallest rectangle containing all points, or `None` if the iterator is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2d>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::from_point(first);
        for p in iter {
            bbox.expand_to_include(p);
        }

        Some(bbox)
    }

    /// Width of the rectangle. Negative for inverted rectangles.
    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    /// Height of the rectangle. Negative for inverted rectangles.
    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Center point.
    pub fn center(&self) -> Point2d {
        Point2d::new(
            (self.minx + self.maxx) / 2.0,
            (self.miny + self.maxy) / 2.0,
        )
    }

    /// Returns true if `minx <= maxx` and `miny <= maxy`.
    pub fn is_valid(&self) -> bool {
        self.minx <= self.maxx && self.miny <= self.maxy
    }

    /// Returns true if the rectangle is inverted along any axis.
    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    /// Returns true if the point is inside of the rectangle or on its border.
    pub fn contains(&self, point: &Point2d) -> bool {
        self.minx <= point.x && self.maxx >= point.x && self.miny <= point.y && self.maxy >= point.y
    }

    /// Returns true if `other` lies completely inside of this rectangle.
    pub fn contains_box(&self, other: &Box2d) -> bool {
        other.is_valid()
            && self.minx <= other.minx
            && self.maxx >= other.maxx
            && self.miny <= other.miny
            && self.maxy >= other.maxy
    }

    /// Returns true if the rectangles share at least one point. Empty rectangles intersect nothing.
    pub fn intersects(&self, other: &Box2d) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.minx <= other.maxx
            && self.maxx >= other.minx
            && self.miny <= other.maxy
            && self.maxy >= other.miny
    }

    /// Intersection of the two rectangles. The result is inverted (empty) if they don't overlap.
    pub fn intersect(&self, other: &Box2d) -> Box2d {
        Box2d {
            minx: self.minx.max(other.minx),
            miny: self.miny.max(other.miny),
            maxx: self.maxx.min(other.maxx),
            maxy: self.maxy.min(other.maxy),
        }
    }

    /// Grows the rectangle to include the point.
    pub fn expand_to_include(&mut self, point: &Point2d) {
        self.minx = self.minx.min(point.x);
        self.miny = self.miny.min(point.y);
        self.maxx = self.maxx.max(point.x);
        self.maxy = self.maxy.max(point.y);
    }

    /// Grows the rectangle to include another one. Empty rectangles are ignored.
    pub fn expand_to_include_box(&mut self, other: &Box2d) {
        if other.is_empty() {
            return;
        }

        self.minx = self.minx.min(other.minx);
        self.miny = self.miny.min(other.miny);
        self.maxx = self.maxx.max(other.maxx);
        self.maxy = self.maxy.max(other.maxy);
    }

    /// Union of the two rectangles.
    pub fn merge(&self, other: &Box2d) -> Box2d {
        let mut merged = *self;
        merged.expand_to_include_box(other);
        merged
    }

    /// Rectangle extended by `amount` on every side. Negative amounts shrink it.
    pub fn pad(&self, amount: f64) -> Box2d {
        Box2d {
            minx: self.minx - amount,
            miny: self.miny - amount,
            maxx: self.maxx + amount,
            maxy: self.maxy + amount,
        }
    }

    /// Rectangle moved by the given offsets.
    pub fn translate(&self, dx: f64, dy: f64) -> Box2d {
        Box2d {
            minx: self.minx + dx,
            miny: self.miny + dy,
            maxx: self.maxx + dx,
            maxy: self.maxy + dy,
        }
    }

    /// Rectangle with the same center, scaled by `factor`.
    pub fn magnify(&self, factor: f64) -> Box2d {
        let center = self.center();
        let half_width = self.width() / 2.0 * factor;
        let half_height = self.height() / 2.0 * factor;
        Box2d {
            minx: center.x - half_width,
            miny: center.y - half_height,
            maxx: center.x + half_width,
            maxy: center.y + half_height,
        }
    }

    /// Corners in counter-clockwise order starting at `(minx, miny)`.
    pub fn corners(&self) -> [Point2d; 4] {
        [
            Point2d::new(self.minx, self.miny),
            Point2d::new(self.maxx, self.miny),
            Point2d::new(self.maxx, self.maxy),
            Point2d::new(self.minx, self.maxy),
        ]
    }
}

impl FromIterator<Box2d> for Box2d {
    fn from_iter<T: IntoIterator<Item = Box2d>>(iter: T) -> Self {
        let mut curr = Box2d::empty();
        for bbox in iter {
            curr.expand_to_include_box(&bbox);
        }

        curr
    }
}

impl AbsDiffEq for Box2d {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.minx.abs_diff_eq(&other.minx, epsilon)
            && self.miny.abs_diff_eq(&other.miny, epsilon)
            && self.maxx.abs_diff_eq(&other.maxx, epsilon)
            && self.maxy.abs_diff_eq(&other.maxy, epsilon)
    }
}

impl RelativeEq for Box2d {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.minx.relative_eq(&other.minx, epsilon, max_relative)
            && self.miny.relative_eq(&other.miny, epsilon, max_relative)
            && self.maxx.relative_eq(&other.maxx, epsilon, max_relative)
            && self.maxy.relative_eq(&other.maxy, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn intersect_disjoint_is_empty() {
        let a = Box2d::new(0.0, 0.0, 10.0, 10.0);
        let b = Box2d::new(20.0, 20.0, 30.0, 30.0);

        let i = a.intersect(&b);
        assert!(i.is_empty());
        assert!(!a.intersects(&b));
        assert!(!i.intersects(&a));
    }

    #[test]
    fn intersect_overlapping() {
        let a = Box2d::new(0.0, 0.0, 10.0, 10.0);
        let b = Box2d::new(5.0, -5.0, 15.0, 5.0);

        assert_eq!(a.intersect(&b), Box2d::new(5.0, 0.0, 10.0, 5.0));
        assert!(a.intersects(&b));
    }

    #[test]
    fn expand_empty() {
        let mut bbox = Box2d::empty();
        bbox.expand_to_include(&Point2d::new(1.0, 2.0));
        assert_eq!(bbox, Box2d::new(1.0, 2.0, 1.0, 2.0));

        bbox.expand_to_include_box(&Box2d::new(5.0, 5.0, 0.0, 0.0));
        assert_eq!(bbox, Box2d::new(1.0, 2.0, 1.0, 2.0));
    }

    #[test]
    fn contains_border() {
        let bbox = Box2d::new(-180.0, -90.0, 180.0, 90.0);
        assert!(bbox.contains(&Point2d::new(180.0, 90.0)));
        assert!(!bbox.contains(&Point2d::new(180.1, 0.0)));
        assert!(bbox.contains_box(&Box2d::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn collect_union() {
        let union: Box2d = [
            Box2d::new(0.0, 0.0, 1.0, 1.0),
            Box2d::new(-1.0, 2.0, 0.5, 3.0),
        ]
        .into_iter()
        .collect();

        assert_abs_diff_eq!(union, Box2d::new(-1.0, 0.0, 1.0, 3.0));
        assert_abs_diff_eq!(union.center(), Point2d::new(0.0, 1.5));
    }

    #[test]
    fn magnify_keeps_center() {
        let bbox = Box2d::new(0.0, 0.0, 10.0, 20.0).magnify(2.0);
        assert_abs_diff_eq!(bbox, Box2d::new(-5.0, -10.0, 15.0, 30.0));
    }
}
