use std::sync::Arc;

use cartela_types::{Box2d, Geom, Point2d};
use lazy_static::lazy_static;

use super::{ProjectedFeature, RenderPass};
use crate::expression::EvalContext;
use crate::geometry::{Affine, StrokeStyle, Subpath};
use crate::raster::{ellipse_points, Canvas, Paint, RasterError, ScalingMethod, Surface};
use crate::symbolizer::{
    MarkerPlacement, MarkerShape, MarkerSymbolizer, PointPlacement, PointSymbolizer,
};
use crate::Color;

lazy_static! {
    /// Image of point symbolizers without a file.
    static ref DEFAULT_POINT: Option<Arc<Surface>> = {
        let gray = [128u8, 128, 128, 255];
        Surface::from_straight_rgba(4, 4, &gray.repeat(16)).ok().map(Arc::new)
    };
}

/// Marker position in pixels with the rotation in degrees.
type Placement = (Point2d, f64);

/// Points every `spacing` pixels along the path, starting half a spacing from the start of
/// every subpath, with the direction of the path at that point.
fn points_along(paths: &[Subpath], spacing: f64) -> Vec<Placement> {
    let mut result = vec![];
    if !(spacing > 0.0) {
        return result;
    }

    for path in paths {
        let mut next = spacing / 2.0;
        let mut travelled = 0.0;
        for (a, b) in path.segments() {
            let length = (b - a).norm();
            if length == 0.0 {
                continue;
            }

            let angle = (b.y - a.y).atan2(b.x - a.x).to_degrees();
            while next <= travelled + length {
                let t = (next - travelled) / length;
                result.push((a + (b - a) * t, angle));
                next += spacing;
            }
            travelled += length;
        }
    }

    result
}

/// Vertex at one end of the geometry with the direction of the adjacent segment.
fn end_vertex(paths: &[Subpath], last: bool) -> Option<Placement> {
    let path = if last { paths.last()? } else { paths.first()? };
    let points = &path.points;
    let (at, from, to) = match points.len() {
        0 => return None,
        1 => return Some((points[0], 0.0)),
        n if last => (points[n - 1], points[n - 2], points[n - 1]),
        _ => (points[0], points[0], points[1]),
    };

    Some((at, (to.y - from.y).atan2(to.x - from.x).to_degrees()))
}

/// Outline of a vector marker centered at the origin.
fn marker_outline(shape: MarkerShape, width: f64, height: f64) -> Subpath {
    let (w, h) = (width / 2.0, height / 2.0);
    match shape {
        MarkerShape::Ellipse => Subpath::closed(ellipse_points(0.0, 0.0, w, h)),
        MarkerShape::Arrow => Subpath::closed(vec![
            Point2d::new(-w, -h / 3.0),
            Point2d::new(w / 3.0, -h / 3.0),
            Point2d::new(w / 3.0, -h),
            Point2d::new(w, 0.0),
            Point2d::new(w / 3.0, h),
            Point2d::new(w / 3.0, h / 3.0),
            Point2d::new(-w, h / 3.0),
        ]),
    }
}

fn transformed_box(bbox: &Box2d, transform: &Affine) -> Option<Box2d> {
    Box2d::from_points(&bbox.corners().map(|p| transform.apply(&p)))
}

impl RenderPass<'_> {
    pub(super) fn draw_point(
        &mut self,
        symbolizer: &PointSymbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let image = match &symbolizer.file {
            Some(file) => self.load_image(file),
            None => DEFAULT_POINT.clone(),
        };
        let Some(image) = image else {
            return Ok(());
        };

        let user = symbolizer
            .transform
            .as_ref()
            .map_or_else(Affine::identity, |t| t.evaluate(context));
        let opacity = symbolizer.opacity.resolve_or(context, 1.0);
        let (w, h) = (image.width() as f64, image.height() as f64);

        for geometry in &feature.geometries {
            let anchor = match symbolizer.placement {
                PointPlacement::Centroid => geometry.centroid(),
                PointPlacement::Interior => geometry.representative_point(),
            };
            let Some(anchor) = anchor.map(|p| self.to_pixels.apply(&p)) else {
                continue;
            };
            if !self.clip_box.contains(&anchor) {
                continue;
            }

            let transform = Affine::translate(anchor.x, anchor.y)
                .then_after(&Affine::scale(self.scale_factor(), self.scale_factor()))
                .then_after(&user)
                .then_after(&Affine::translate(-w / 2.0, -h / 2.0));
            let Some(bbox) = transformed_box(&Box2d::new(0.0, 0.0, w, h), &transform) else {
                continue;
            };

            if self.claim(&bbox, symbolizer.allow_overlap, symbolizer.ignore_placement) {
                canvas.draw_image(
                    &image,
                    &transform,
                    opacity,
                    symbolizer.comp_op,
                    ScalingMethod::Bilinear,
                )?;
            }
        }

        Ok(())
    }

    pub(super) fn draw_marker(
        &mut self,
        symbolizer: &MarkerSymbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let scale_factor = self.scale_factor();
        let image = match &symbolizer.file {
            Some(file) => match self.load_image(file) {
                Some(image) => Some(image),
                None => return Ok(()),
            },
            None => None,
        };

        let mut placements: Vec<Placement> = vec![];
        for geometry in &feature.geometries {
            match symbolizer.placement {
                MarkerPlacement::Point | MarkerPlacement::Interior => {
                    let anchor = geometry.representative_point();
                    if let Some(anchor) = anchor.map(|p| self.to_pixels.apply(&p)) {
                        if self.clip_box.contains(&anchor) {
                            placements.push((anchor, 0.0));
                        }
                    }
                }
                MarkerPlacement::Line => {
                    if !matches!(geometry, Geom::Point(_)) {
                        let paths = self.pixel_paths(geometry, &symbolizer.geometry, context);
                        placements.extend(points_along(&paths, symbolizer.spacing * scale_factor));
                    }
                }
                MarkerPlacement::VertexFirst | MarkerPlacement::VertexLast => {
                    let paths = self.pixel_paths(geometry, &symbolizer.geometry, context);
                    let last = symbolizer.placement == MarkerPlacement::VertexLast;
                    placements.extend(end_vertex(&paths, last));
                }
            }
        }

        if placements.is_empty() {
            return Ok(());
        }

        let user = symbolizer
            .transform
            .as_ref()
            .map_or_else(Affine::identity, |t| t.evaluate(context))
            .with_scaled_translation(scale_factor);
        let opacity = symbolizer.opacity.resolve_or(context, 1.0);

        match image {
            Some(image) => {
                let (w, h) = (image.width() as f64, image.height() as f64);
                let size = Affine::scale(scale_factor, scale_factor)
                    .then_after(&Affine::translate(-w / 2.0, -h / 2.0));
                for (position, angle) in placements {
                    let transform = Affine::translate(position.x, position.y)
                        .then_after(&Affine::rotate(angle))
                        .then_after(&user)
                        .then_after(&size);
                    let Some(bbox) = transformed_box(&Box2d::new(0.0, 0.0, w, h), &transform)
                    else {
                        continue;
                    };

                    if self.claim(&bbox, symbolizer.allow_overlap, symbolizer.ignore_placement) {
                        canvas.draw_image(
                            &image,
                            &transform,
                            opacity,
                            symbolizer.geometry.comp_op,
                            ScalingMethod::Bilinear,
                        )?;
                    }
                }
            }
            None => {
                let width = symbolizer.width.resolve_or(context, 10.0) * scale_factor;
                let height = symbolizer.height.resolve_or(context, 10.0) * scale_factor;
                let stroke_width = symbolizer.stroke_width.resolve_or(context, 0.0) * scale_factor;
                let outline = marker_outline(symbolizer.shape, width, height);
                let fill = Paint::solid(symbolizer.fill.resolve_or(context, Color::BLUE))
                    .with_opacity(opacity)
                    .with_comp_op(symbolizer.geometry.comp_op)
                    .with_gamma(self.options().gamma);
                let stroke = Paint::solid(symbolizer.stroke.resolve_or(context, Color::BLACK))
                    .with_opacity(opacity)
                    .with_comp_op(symbolizer.geometry.comp_op)
                    .with_gamma(self.options().gamma);
                let local_box =
                    Box2d::new(-width / 2.0, -height / 2.0, width / 2.0, height / 2.0)
                        .pad(stroke_width.max(0.0) / 2.0);

                for (position, angle) in placements {
                    let transform = Affine::translate(position.x, position.y)
                        .then_after(&Affine::rotate(angle))
                        .then_after(&user);
                    let Some(bbox) = transformed_box(&local_box, &transform) else {
                        continue;
                    };
                    if !self.claim(&bbox, symbolizer.allow_overlap, symbolizer.ignore_placement)
                    {
                        continue;
                    }

                    let shape = Subpath::closed(
                        outline.points.iter().map(|p| transform.apply(p)).collect(),
                    );
                    canvas.fill_path(shape.commands(), &fill)?;
                    if stroke_width > 0.0 {
                        canvas.stroke_path(
                            shape.commands(),
                            &StrokeStyle::new(stroke_width),
                            &stroke,
                        )?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Checks the box against placed symbols and registers it. Symbols allowed to overlap skip
    /// the detector. Returns false if the symbol must not be drawn.
    pub(super) fn claim(
        &mut self,
        bbox: &Box2d,
        allow_overlap: bool,
        ignore_placement: bool,
    ) -> bool {
        if allow_overlap {
            return true;
        }

        let boxes = [*bbox];
        if !self.detector.has_placement(&boxes, 0.0) {
            return false;
        }
        if !ignore_placement {
            self.detector.insert(&boxes);
        }

        true
    }
}
