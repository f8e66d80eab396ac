use std::iter;
use std::sync::Arc;

use cartela_types::{Box2d, Geom, Vector2d};

use super::{ProjectedFeature, RenderPass};
use crate::expression::EvalContext;
use crate::geometry::{commands, Affine, LineJoin, StrokeStyle, Subpath};
use crate::label::{
    horizontal_label, line_labels, tolerance_offsets, GlyphRun, LabelCandidate, PlacementList,
};
use crate::raster::{Canvas, FillRule, Paint, RasterError, ScalingMethod, Surface};
use crate::symbolizer::{
    GeometryOptions, LabelPlacement, ShieldSymbolizer, TextOptions, TextSymbolizer,
};
use crate::Color;

/// Image of a shield and its shift from the label anchor in pixels.
struct Shield {
    image: Arc<Surface>,
    dx: f64,
    dy: f64,
}

struct LabelPaint {
    fill: Paint,
    halo: Option<(StrokeStyle, Paint)>,
    opacity: f64,
}

impl RenderPass<'_> {
    pub(super) fn draw_text(
        &mut self,
        symbolizer: &TextSymbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        self.draw_label(&symbolizer.text, None, feature, context, canvas)
    }

    pub(super) fn draw_shield(
        &mut self,
        symbolizer: &ShieldSymbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let Some(image) = self.load_image(&symbolizer.file) else {
            return Ok(());
        };

        let shield = Shield {
            image,
            dx: symbolizer.shield_dx * self.scale_factor(),
            dy: symbolizer.shield_dy * self.scale_factor(),
        };
        self.draw_label(&symbolizer.text, Some(&shield), feature, context, canvas)
    }

    fn draw_label(
        &mut self,
        options: &TextOptions,
        shield: Option<&Shield>,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let text = options
            .text_transform
            .apply(&options.name.evaluate(context).to_text());
        if text.trim().is_empty() {
            return Ok(());
        }

        let scale_factor = self.scale_factor();
        let size = options.size.resolve_or(context, 10.0) * scale_factor;
        if !(size > 0.0) {
            return Ok(());
        }

        let opacity = options.opacity.resolve_or(context, 1.0);
        let fill = Paint::solid(options.fill.resolve_or(context, Color::BLACK))
            .with_opacity(opacity)
            .with_comp_op(options.comp_op)
            .with_gamma(self.options().gamma)
            .with_fill_rule(FillRule::NonZero);
        let halo_width = 2.0 * options.halo_radius * scale_factor;
        let halo = (halo_width > 0.0).then(|| {
            (
                StrokeStyle::new(halo_width).with_join(LineJoin::Round),
                Paint::solid(options.halo_fill)
                    .with_opacity(opacity)
                    .with_comp_op(options.comp_op),
            )
        });
        let paint = LabelPaint {
            fill,
            halo,
            opacity,
        };

        for geometry in &feature.geometries {
            let follows_line = options.placement == LabelPlacement::Line
                && shield.is_none()
                && !matches!(geometry, Geom::Point(_));
            if follows_line {
                self.place_line_label(options, &text, size, geometry, context, &paint, canvas)?;
            } else {
                self.place_point_label(options, &text, size, geometry, shield, &paint, canvas)?;
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn place_line_label(
        &mut self,
        options: &TextOptions,
        text: &str,
        size: f64,
        geometry: &Geom,
        context: &EvalContext,
        paint: &LabelPaint,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let scale_factor = self.scale_factor();
        let run = self.renderer.text_engine.layout(
            text,
            size,
            options.character_spacing * scale_factor,
        );
        if run.is_empty() {
            return Ok(());
        }

        for path in self.pixel_paths(geometry, &GeometryOptions::default(), context) {
            let mut points = path.points;
            if path.closed {
                if let Some(first) = points.first().copied() {
                    points.push(first);
                }
            }

            let candidates = line_labels(
                &points,
                &run,
                options.spacing * scale_factor,
                options.max_char_angle_delta,
                options.dy * scale_factor,
            );
            for candidate in candidates {
                if self.accept_label(options, &candidate.boxes) {
                    draw_glyphs(&run, &candidate, paint, canvas)?;
                }
            }
        }

        Ok(())
    }

    /// Tries every font size, direction and anchor offset in turn and draws the label at the
    /// first free position.
    #[allow(clippy::too_many_arguments)]
    fn place_point_label(
        &mut self,
        options: &TextOptions,
        text: &str,
        size: f64,
        geometry: &Geom,
        shield: Option<&Shield>,
        paint: &LabelPaint,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let Some(anchor) = geometry
            .representative_point()
            .map(|p| self.to_pixels.apply(&p))
        else {
            return Ok(());
        };
        if !self.clip_box.contains(&anchor) {
            return Ok(());
        }

        let scale_factor = self.scale_factor();
        let placements = options
            .placements
            .as_deref()
            .map(PlacementList::parse)
            .unwrap_or_default();
        let sizes = iter::once(size).chain(placements.sizes.iter().map(|s| s * scale_factor));
        let offsets = tolerance_offsets(options.label_position_tolerance * scale_factor);

        for size in sizes {
            let run = self.renderer.text_engine.layout(
                text,
                size,
                options.character_spacing * scale_factor,
            );
            if run.is_empty() {
                continue;
            }

            for direction in &placements.directions {
                for offset in &offsets {
                    let position = anchor + offset;
                    let mut candidate = horizontal_label(
                        position,
                        &run,
                        *direction,
                        options.dx * scale_factor,
                        options.dy * scale_factor,
                    );

                    let mut image_transform = None;
                    if let Some(shield) = shield {
                        let center = position + Vector2d::new(shield.dx, shield.dy);
                        let w = shield.image.width() as f64 * scale_factor;
                        let h = shield.image.height() as f64 * scale_factor;
                        let bbox = Box2d::new(
                            center.x - w / 2.0,
                            center.y - h / 2.0,
                            center.x + w / 2.0,
                            center.y + h / 2.0,
                        );
                        candidate.boxes.push(bbox);
                        image_transform = Some(
                            Affine::translate(bbox.minx, bbox.miny)
                                .then_after(&Affine::scale(scale_factor, scale_factor)),
                        );
                    }

                    if !self.accept_label(options, &candidate.boxes) {
                        continue;
                    }

                    if let (Some(shield), Some(transform)) = (shield, image_transform) {
                        canvas.draw_image(
                            &shield.image,
                            &transform,
                            paint.opacity,
                            options.comp_op,
                            ScalingMethod::Bilinear,
                        )?;
                    }
                    return draw_glyphs(&run, &candidate, paint, canvas);
                }
            }
        }

        Ok(())
    }

    fn accept_label(&mut self, options: &TextOptions, boxes: &[Box2d]) -> bool {
        if options.avoid_edges {
            let view_box = self.view.view_box();
            if !boxes.iter().all(|bbox| view_box.contains_box(bbox)) {
                return false;
            }
        }

        if options.allow_overlap {
            return true;
        }

        self.detector
            .try_place(boxes, options.minimum_distance * self.scale_factor())
    }
}

/// Draws the halo under all glyphs of the label, then the glyphs.
fn draw_glyphs(
    run: &GlyphRun,
    candidate: &LabelCandidate,
    paint: &LabelPaint,
    canvas: &mut Canvas,
) -> Result<(), RasterError> {
    let mut outlines: Vec<Subpath> = vec![];
    for placed in &candidate.glyphs {
        let Some(glyph) = run.glyphs.get(placed.glyph) else {
            continue;
        };

        let transform = Affine::translate(placed.origin.x, placed.origin.y)
            .then_after(&Affine::rotate(placed.angle.to_degrees()));
        outlines.extend(glyph.outline.iter().map(|subpath| Subpath {
            points: subpath.points.iter().map(|p| transform.apply(p)).collect(),
            closed: subpath.closed,
        }));
    }

    if let Some((style, halo)) = &paint.halo {
        canvas.stroke_path(commands(&outlines), style, halo)?;
    }
    canvas.fill_path(commands(&outlines), &paint.fill)
}
