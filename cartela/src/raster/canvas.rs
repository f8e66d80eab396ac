use std::sync::Arc;

use cartela_types::{Box2d, Point2d};

use super::{
    sample, sample_tiled, CompOp, FillRule, Gamma, RasterError, Rasterizer,
    ScalingMethod, SpanSink, Surface,
};
use crate::geometry::{commands, stroke_outline, Affine, PathCommand, StrokeStyle};
use crate::grid::FeatureGrid;
use crate::Color;

/// Where the color of painted pixels comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintSource {
    /// Single color.
    Solid(Color),
    /// Image repeated over the whole surface, with its top-left corner at `origin`.
    Pattern {
        /// Pattern image.
        image: Arc<Surface>,
        /// Position of the top-left corner of one of the tiles, in pixels.
        origin: Point2d,
    },
}

/// How a path is painted.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    /// Color source.
    pub source: PaintSource,
    /// Opacity multiplied into the source alpha.
    pub opacity: f64,
    /// Compositing operator.
    pub comp_op: CompOp,
    /// Coverage-to-alpha function.
    pub gamma: Gamma,
    /// Fill rule for [`Canvas::fill_path`].
    pub fill_rule: FillRule,
}

impl Paint {
    /// Solid color paint.
    pub fn solid(color: Color) -> Self {
        Self {
            source: PaintSource::Solid(color),
            opacity: 1.0,
            comp_op: CompOp::default(),
            gamma: Gamma::default(),
            fill_rule: FillRule::default(),
        }
    }

    /// Repeated image paint.
    pub fn pattern(image: Arc<Surface>, origin: Point2d) -> Self {
        Self {
            source: PaintSource::Pattern { image, origin },
            ..Self::solid(Color::TRANSPARENT)
        }
    }

    /// Sets opacity.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Sets the compositing operator.
    pub fn with_comp_op(mut self, comp_op: CompOp) -> Self {
        self.comp_op = comp_op;
        self
    }

    /// Sets gamma.
    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.gamma = gamma;
        self
    }

    /// Sets the fill rule.
    pub fn with_fill_rule(mut self, fill_rule: FillRule) -> Self {
        self.fill_rule = fill_rule;
        self
    }

    fn is_invisible(&self) -> bool {
        if self.opacity <= 0.0 || self.opacity.is_nan() {
            return self.comp_op.is_src_bounded();
        }

        match &self.source {
            PaintSource::Solid(color) => color.is_transparent() && self.comp_op.is_src_bounded(),
            PaintSource::Pattern { .. } => false,
        }
    }
}

/// Drawing target: a surface, and optionally a feature grid receiving the id of the feature
/// being drawn for every pixel it covers by more than a half.
pub struct Canvas<'a> {
    surface: &'a mut Surface,
    grid: Option<&'a mut FeatureGrid>,
    rasterizer: Rasterizer,
    feature: Option<i64>,
}

impl<'a> Canvas<'a> {
    /// Creates a canvas drawing into the surface with `samples x samples` sub-pixel sampling.
    pub fn new(surface: &'a mut Surface, samples: u32) -> Self {
        Self {
            surface,
            grid: None,
            rasterizer: Rasterizer::new(samples),
            feature: None,
        }
    }

    /// Attaches a feature grid.
    pub fn with_grid(mut self, grid: &'a mut FeatureGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Sets the id written into the grid by subsequent draw calls.
    pub fn set_feature(&mut self, id: Option<i64>) {
        self.feature = id;
    }

    /// Width of the target surface.
    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    /// Height of the target surface.
    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Rectangle `(0, 0, width, height)` in pixels.
    pub fn view_box(&self) -> Box2d {
        Box2d::new(0.0, 0.0, self.width() as f64, self.height() as f64)
    }

    /// Target surface.
    pub fn surface(&self) -> &Surface {
        self.surface
    }

    /// Feature grid written together with the surface.
    pub fn grid_mut(&mut self) -> Option<&mut FeatureGrid> {
        self.grid.as_deref_mut()
    }

    /// Fills the path. Every subpath is closed implicitly.
    pub fn fill_path(
        &mut self,
        path: impl IntoIterator<Item = PathCommand>,
        paint: &Paint,
    ) -> Result<(), RasterError> {
        if paint.is_invisible() {
            return Ok(());
        }

        self.rasterizer.reset();
        self.rasterizer.add_path(path)?;
        self.sweep(paint, paint.fill_rule)
    }

    /// Strokes the path.
    pub fn stroke_path(
        &mut self,
        path: impl IntoIterator<Item = PathCommand>,
        style: &StrokeStyle,
        paint: &Paint,
    ) -> Result<(), RasterError> {
        if paint.is_invisible() {
            return Ok(());
        }

        let outline = stroke_outline(path, style);
        self.rasterizer.reset();
        self.rasterizer.add_path(commands(&outline))?;
        self.sweep(paint, FillRule::NonZero)
    }

    /// Fills an axis-aligned ellipse.
    pub fn fill_ellipse(
        &mut self,
        center: Point2d,
        rx: f64,
        ry: f64,
        paint: &Paint,
    ) -> Result<(), RasterError> {
        if paint.is_invisible() {
            return Ok(());
        }

        self.rasterizer.reset();
        self.rasterizer.add_ellipse(center.x, center.y, rx, ry)?;
        self.sweep(paint, FillRule::NonZero)
    }

    fn sweep(&mut self, paint: &Paint, fill_rule: FillRule) -> Result<(), RasterError> {
        let width = self.surface.width();
        let height = self.surface.height();
        let opacity = paint.opacity.clamp(0.0, 1.0) as f32;
        let mut sink = SpanBlender {
            surface: &mut *self.surface,
            grid: self.grid.as_deref_mut(),
            feature: self.feature,
            paint,
            color: match &paint.source {
                PaintSource::Solid(color) => color.to_premultiplied().map(|c| c * opacity),
                PaintSource::Pattern { .. } => [0.0; 4],
            },
            opacity,
        };

        self.rasterizer
            .sweep(width, height, fill_rule, &paint.gamma, &mut sink)
    }

    /// Draws an image. `transform` maps image pixel coordinates into surface pixel coordinates.
    pub fn draw_image(
        &mut self,
        image: &Surface,
        transform: &Affine,
        opacity: f64,
        comp_op: CompOp,
        scaling: ScalingMethod,
    ) -> Result<(), RasterError> {
        let Some(inverse) = transform.inverse() else {
            return Ok(());
        };
        let opacity = opacity.clamp(0.0, 1.0) as f32;
        if opacity == 0.0 && comp_op.is_src_bounded() {
            return Ok(());
        }

        let (w, h) = (image.width() as f64, image.height() as f64);
        let corners = [
            Point2d::new(0.0, 0.0),
            Point2d::new(w, 0.0),
            Point2d::new(w, h),
            Point2d::new(0.0, h),
        ]
        .map(|p| transform.apply(&p));
        let Some(bounds) = Box2d::from_points(&corners) else {
            return Ok(());
        };
        let bounds = bounds.intersect(&self.view_box());
        if !bounds.is_valid() {
            return Ok(());
        }

        let x_range = bounds.minx.floor() as u32..(bounds.maxx.ceil() as u32).min(self.width());
        let y_range = bounds.miny.floor() as u32..(bounds.maxy.ceil() as u32).min(self.height());
        for py in y_range {
            for px in x_range.clone() {
                let source = inverse.apply(&Point2d::new(px as f64 + 0.5, py as f64 + 0.5));
                if source.x < 0.0 || source.y < 0.0 || source.x >= w || source.y >= h {
                    continue;
                }

                let color = sample(image, source.x, source.y, scaling).map(|c| c * opacity);
                if color[3] <= 0.0 && comp_op.is_src_bounded() {
                    continue;
                }

                self.surface.blend_pixel(px, py, color, 1.0, comp_op);
                // Pixel centers inside the image are fully covered.
                if color[3] > 0.0 {
                    if let (Some(grid), Some(id)) = (self.grid.as_deref_mut(), self.feature) {
                        grid.set(px, py, id);
                    }
                }
            }
        }

        Ok(())
    }
}

struct SpanBlender<'s> {
    surface: &'s mut Surface,
    grid: Option<&'s mut FeatureGrid>,
    feature: Option<i64>,
    paint: &'s Paint,
    color: [f32; 4],
    opacity: f32,
}

impl SpanSink for SpanBlender<'_> {
    fn blend_span(&mut self, x: u32, y: u32, covers: &[u8], majority: &[bool]) {
        for (i, (cover, majority)) in covers.iter().zip(majority).enumerate() {
            let px = x + i as u32;
            let color = match &self.paint.source {
                PaintSource::Solid(_) => self.color,
                PaintSource::Pattern { image, origin } => sample_tiled(
                    image,
                    px as f64 + 0.5 - origin.x,
                    y as f64 + 0.5 - origin.y,
                    ScalingMethod::Near,
                )
                .map(|c| c * self.opacity),
            };

            self.surface
                .blend_pixel(px, y, color, *cover as f32 / 255.0, self.paint.comp_op);

            if *majority {
                if let (Some(grid), Some(id)) = (self.grid.as_deref_mut(), self.feature) {
                    grid.set(px, y, id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridKey;

    fn square(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Vec<PathCommand> {
        vec![
            PathCommand::MoveTo(Point2d::new(minx, miny)),
            PathCommand::LineTo(Point2d::new(maxx, miny)),
            PathCommand::LineTo(Point2d::new(maxx, maxy)),
            PathCommand::LineTo(Point2d::new(minx, maxy)),
            PathCommand::Close,
        ]
    }

    #[test]
    fn fill_with_opacity_and_comp_op() {
        let mut surface = Surface::new(4, 4).unwrap();
        surface.fill(Color::WHITE);
        let mut canvas = Canvas::new(&mut surface, 4);
        canvas
            .fill_path(
                square(0.0, 0.0, 2.0, 2.0),
                &Paint::solid(Color::BLACK).with_opacity(0.5),
            )
            .unwrap();
        canvas
            .fill_path(
                square(2.0, 2.0, 4.0, 4.0),
                &Paint::solid(Color::rgb(128, 128, 128)).with_comp_op(CompOp::Multiply),
            )
            .unwrap();

        assert_eq!(surface.pixel(0, 0), [128, 128, 128, 255]);
        assert_eq!(surface.pixel(3, 3), [128, 128, 128, 255]);
        assert_eq!(surface.pixel(3, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn stroke_covers_line() {
        let mut surface = Surface::new(10, 10).unwrap();
        let mut canvas = Canvas::new(&mut surface, 8);
        canvas
            .stroke_path(
                [
                    PathCommand::MoveTo(Point2d::new(1.0, 5.0)),
                    PathCommand::LineTo(Point2d::new(9.0, 5.0)),
                ],
                &StrokeStyle::new(2.0),
                &Paint::solid(Color::RED),
            )
            .unwrap();

        assert_eq!(surface.pixel(5, 4), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(5, 5), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(5, 2), [0, 0, 0, 0]);
        assert_eq!(surface.pixel(0, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn grid_receives_covered_pixels() {
        let mut surface = Surface::new(4, 4).unwrap();
        let mut grid = FeatureGrid::new(4, 4, GridKey::Id);
        {
            let mut canvas = Canvas::new(&mut surface, 4).with_grid(&mut grid);
            canvas.set_feature(Some(7));
            canvas
                .fill_path(square(0.0, 0.0, 1.25, 4.0), &Paint::solid(Color::BLUE))
                .unwrap();
        }

        assert_eq!(grid.get(0, 0), Some(7));
        assert_eq!(grid.get(1, 0), None);
        assert_eq!(grid.get(2, 0), None);
    }

    #[test]
    fn grid_uses_coverage_before_gamma() {
        let mut surface = Surface::new(4, 4).unwrap();
        let mut grid = FeatureGrid::new(4, 4, GridKey::Id);
        {
            let mut canvas = Canvas::new(&mut surface, 4).with_grid(&mut grid);
            canvas.set_feature(Some(1));
            canvas
                .fill_path(
                    square(0.0, 0.0, 1.75, 1.0),
                    &Paint::solid(Color::BLUE).with_gamma(Gamma::power(3.0)),
                )
                .unwrap();
            canvas.set_feature(Some(2));
            canvas
                .fill_path(
                    square(0.0, 2.0, 1.25, 3.0),
                    &Paint::solid(Color::BLUE).with_gamma(Gamma::power(0.25)),
                )
                .unwrap();
        }

        // 75% coverage is faded below half alpha but still hits the grid.
        assert!(surface.pixel(1, 0)[3] < 128);
        assert_eq!(grid.get(1, 0), Some(1));
        // 25% coverage is boosted above half alpha but doesn't.
        assert!(surface.pixel(1, 2)[3] > 128);
        assert_eq!(grid.get(1, 2), None);
        assert_eq!(grid.get(0, 2), Some(2));
    }

    #[test]
    fn draw_scaled_image() {
        let mut image = Surface::new(1, 1).unwrap();
        image.fill(Color::GREEN);
        let mut surface = Surface::new(4, 4).unwrap();
        let mut canvas = Canvas::new(&mut surface, 4);
        let transform = Affine::translate(1.0, 1.0).then_after(&Affine::scale(2.0, 2.0));
        canvas
            .draw_image(&image, &transform, 1.0, CompOp::SrcOver, ScalingMethod::Near)
            .unwrap();

        assert_eq!(surface.pixel(1, 1), [0, 255, 0, 255]);
        assert_eq!(surface.pixel(2, 2), [0, 255, 0, 255]);
        assert_eq!(surface.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(surface.pixel(3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn pattern_paint_repeats_image() {
        let mut image = Surface::new(2, 1).unwrap();
        image.set_pixel(0, 0, [255, 0, 0, 255]);
        let image = Arc::new(image);

        let mut surface = Surface::new(4, 1).unwrap();
        let mut canvas = Canvas::new(&mut surface, 4);
        canvas
            .fill_path(
                square(0.0, 0.0, 4.0, 1.0),
                &Paint::pattern(image, Point2d::new(0.0, 0.0)),
            )
            .unwrap();

        assert_eq!(surface.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(1, 0), [0, 0, 0, 0]);
        assert_eq!(surface.pixel(2, 0), [255, 0, 0, 255]);
    }
}
