//! Mapping between map coordinates and surface pixels.

use cartela_types::{Box2d, Point2d};

use crate::geometry::Affine;

/// Affine mapping of a map extent onto a `width x height` pixel surface.
///
/// The x and y scales are independent, so the extent is stretched to the surface if their
/// aspect ratios differ. Pixel `y` grows downward while map `y` grows upward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    extent: Box2d,
    width: u32,
    height: u32,
    offset_x: f64,
    offset_y: f64,
    sx: f64,
    sy: f64,
}

impl ViewTransform {
    /// Creates the transform. Returns `None` if the surface size is zero or the extent has no
    /// area.
    pub fn new(extent: Box2d, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || !(extent.width() > 0.0) || !(extent.height() > 0.0) {
            return None;
        }

        Some(Self {
            extent,
            width,
            height,
            offset_x: 0.0,
            offset_y: 0.0,
            sx: width as f64 / extent.width(),
            sy: height as f64 / extent.height(),
        })
    }

    /// Shifts the whole image by the given number of pixels. Positive offsets move the map to
    /// the left and up.
    pub fn with_offset(&self, offset_x: f64, offset_y: f64) -> Self {
        Self {
            offset_x,
            offset_y,
            ..*self
        }
    }

    /// Map extent covered by the surface.
    pub fn extent(&self) -> Box2d {
        self.extent
    }

    /// Surface width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Surface height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixels per map unit along x.
    pub fn scale_x(&self) -> f64 {
        self.sx
    }

    /// Pixels per map unit along y.
    pub fn scale_y(&self) -> f64 {
        self.sy
    }

    /// Pixel rectangle `(0, 0, width, height)`.
    pub fn view_box(&self) -> Box2d {
        Box2d::new(0.0, 0.0, self.width as f64, self.height as f64)
    }

    /// Map point to pixel position.
    pub fn forward(&self, point: &Point2d) -> Point2d {
        Point2d::new(
            (point.x - self.extent.minx) * self.sx - self.offset_x,
            self.height as f64 - (point.y - self.extent.miny) * self.sy - self.offset_y,
        )
    }

    /// Pixel position to map point.
    pub fn backward(&self, point: &Point2d) -> Point2d {
        Point2d::new(
            (point.x + self.offset_x) / self.sx + self.extent.minx,
            (self.height as f64 - point.y - self.offset_y) / self.sy + self.extent.miny,
        )
    }

    /// Pixel rectangle covered by the map rectangle.
    pub fn forward_box(&self, bbox: &Box2d) -> Box2d {
        let a = self.forward(&Point2d::new(bbox.minx, bbox.miny));
        let b = self.forward(&Point2d::new(bbox.maxx, bbox.maxy));
        Box2d::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    /// Map rectangle covered by the pixel rectangle.
    pub fn backward_box(&self, bbox: &Box2d) -> Box2d {
        let a = self.backward(&Point2d::new(bbox.minx, bbox.miny));
        let b = self.backward(&Point2d::new(bbox.maxx, bbox.maxy));
        Box2d::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    /// The transform as an affine matrix.
    pub fn to_affine(&self) -> Affine {
        Affine::new(
            self.sx,
            0.0,
            0.0,
            -self.sy,
            -self.extent.minx * self.sx - self.offset_x,
            self.height as f64 + self.extent.miny * self.sy - self.offset_y,
        )
    }
}
