use cartela_types::{Box2d, Geom, Point2d, Vector2d};

use super::{ProjectedFeature, RenderPass};
use crate::expression::EvalContext;
use crate::geometry::{commands, Dash, Offset, PathCommand, PathExt, StrokeStyle, Subpath};
use crate::raster::{Canvas, FillRule, Paint, RasterError};
use crate::symbolizer::{
    BuildingSymbolizer, DebugMode, DebugSymbolizer, GeometryOptions, LinePatternSymbolizer,
    LineSymbolizer, PatternAlignment, PolygonPatternSymbolizer, PolygonSymbolizer,
};
use crate::Color;

const DEFAULT_FILL: Color = Color::rgb(128, 128, 128);
const WALL_SHADE: f64 = 0.8;

/// Offsets and dashes lines.
fn line_path<'a>(
    paths: &'a [Subpath],
    offset: f64,
    dashes: &[f64],
    dash_offset: f64,
) -> Box<dyn Iterator<Item = PathCommand> + 'a> {
    let mut path: Box<dyn Iterator<Item = PathCommand> + 'a> = Box::new(commands(paths));
    if offset != 0.0 {
        path = Box::new(path.adapt(Offset::new(offset)));
    }
    if dashes.iter().any(|d| *d > 0.0) {
        path = Box::new(path.adapt(Dash::new(dashes, dash_offset)));
    }

    path
}

impl RenderPass<'_> {
    pub(super) fn draw_polygon(
        &mut self,
        symbolizer: &PolygonSymbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let paint = Paint::solid(symbolizer.fill.resolve_or(context, DEFAULT_FILL))
            .with_opacity(symbolizer.opacity.resolve_or(context, 1.0))
            .with_comp_op(symbolizer.geometry.comp_op)
            .with_gamma(self.gamma(symbolizer.gamma))
            .with_fill_rule(symbolizer.fill_rule);

        for geometry in feature.polygons() {
            let paths = self.pixel_paths(geometry, &symbolizer.geometry, context);
            canvas.fill_path(commands(&paths), &paint)?;
        }

        Ok(())
    }

    pub(super) fn draw_line(
        &mut self,
        symbolizer: &LineSymbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let scale_factor = self.scale_factor();
        let width = symbolizer.width.resolve_or(context, 1.0) * scale_factor;
        if !(width > 0.0) {
            return Ok(());
        }

        let paint = Paint::solid(symbolizer.stroke.resolve_or(context, Color::BLACK))
            .with_opacity(symbolizer.opacity.resolve_or(context, 1.0))
            .with_comp_op(symbolizer.geometry.comp_op)
            .with_gamma(self.gamma(symbolizer.gamma));
        let style = symbolizer.stroke_style(width);
        let offset = symbolizer.offset.resolve_or(context, 0.0) * scale_factor;
        let dashes: Vec<f64> = symbolizer
            .dasharray
            .iter()
            .map(|d| d * scale_factor)
            .collect();

        for geometry in feature.strokable() {
            let paths = self.pixel_paths(geometry, &symbolizer.geometry, context);
            let path = line_path(
                &paths,
                offset,
                &dashes,
                symbolizer.dashoffset * scale_factor,
            );
            canvas.stroke_path(path, &style, &paint)?;
        }

        Ok(())
    }

    pub(super) fn draw_line_pattern(
        &mut self,
        symbolizer: &LinePatternSymbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let Some(image) = self.load_image(&symbolizer.file) else {
            return Ok(());
        };

        let style = StrokeStyle::new(image.height() as f64 * self.scale_factor());
        let offset = symbolizer.offset.resolve_or(context, 0.0) * self.scale_factor();
        let paint = Paint::pattern(image, Point2d::origin())
            .with_opacity(symbolizer.opacity.resolve_or(context, 1.0))
            .with_comp_op(symbolizer.geometry.comp_op);

        for geometry in feature.strokable() {
            let paths = self.pixel_paths(geometry, &symbolizer.geometry, context);
            canvas.stroke_path(line_path(&paths, offset, &[], 0.0), &style, &paint)?;
        }

        Ok(())
    }

    pub(super) fn draw_polygon_pattern(
        &mut self,
        symbolizer: &PolygonPatternSymbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let Some(image) = self.load_image(&symbolizer.file) else {
            return Ok(());
        };

        let opacity = symbolizer.opacity.resolve_or(context, 1.0);
        for geometry in feature.polygons() {
            let paths = self.pixel_paths(geometry, &symbolizer.geometry, context);
            let origin = match symbolizer.alignment {
                // Tiles stay in place when the map is panned.
                PatternAlignment::Global => self.to_pixels.apply(&Point2d::origin()),
                PatternAlignment::Local => {
                    match Box2d::from_points(paths.iter().flat_map(|p| &p.points)) {
                        Some(bbox) => Point2d::new(bbox.minx, bbox.miny),
                        None => continue,
                    }
                }
            };

            let paint = Paint::pattern(image.clone(), origin)
                .with_opacity(opacity)
                .with_comp_op(symbolizer.geometry.comp_op)
                .with_gamma(self.gamma(symbolizer.gamma))
                .with_fill_rule(FillRule::EvenOdd);
            canvas.fill_path(commands(&paths), &paint)?;
        }

        Ok(())
    }

    /// Draws walls of every polygon edge from the back to the front, then the roof shifted up
    /// by the building height.
    pub(super) fn draw_building(
        &mut self,
        symbolizer: &BuildingSymbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let height = symbolizer.height.resolve_or(context, 0.0) * self.scale_factor();
        let fill = symbolizer.fill.resolve_or(context, DEFAULT_FILL);
        let opacity = symbolizer.opacity.resolve_or(context, 1.0);
        let wall_paint = Paint::solid(fill.darken(WALL_SHADE))
            .with_opacity(opacity)
            .with_gamma(self.options().gamma);
        let roof_paint = Paint::solid(fill)
            .with_opacity(opacity)
            .with_gamma(self.options().gamma)
            .with_fill_rule(FillRule::EvenOdd);
        let up = Vector2d::new(0.0, -height.max(0.0));

        for geometry in feature.polygons() {
            let paths = self.pixel_paths(geometry, &GeometryOptions::default(), context);
            if height > 0.0 {
                let mut walls: Vec<(Point2d, Point2d)> =
                    paths.iter().flat_map(|p| p.segments()).collect();
                walls.sort_by(|a, b| a.0.y.max(a.1.y).total_cmp(&b.0.y.max(b.1.y)));
                for (a, b) in walls {
                    let wall = Subpath::closed(vec![a, b, b + up, a + up]);
                    canvas.fill_path(wall.commands(), &wall_paint)?;
                }
            }

            let roof: Vec<Subpath> = paths
                .iter()
                .map(|p| Subpath::closed(p.points.iter().map(|v| v + up).collect()))
                .collect();
            canvas.fill_path(commands(&roof), &roof_paint)?;
        }

        Ok(())
    }

    pub(super) fn draw_debug(
        &mut self,
        symbolizer: &DebugSymbolizer,
        feature: &ProjectedFeature,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let paint = Paint::solid(Color::RED);
        match symbolizer.mode {
            DebugMode::Collision => {
                let style = StrokeStyle::new(1.0);
                let boxes: Vec<Subpath> = self
                    .detector
                    .boxes()
                    .iter()
                    .map(|bbox| Subpath::closed(bbox.corners().to_vec()))
                    .collect();
                canvas.stroke_path(commands(&boxes), &style, &paint)?;
            }
            DebugMode::Vertex => {
                let half = 1.5 * self.scale_factor();
                let marks: Vec<Subpath> = feature
                    .geometries
                    .iter()
                    .flat_map(Geom::vertices)
                    .map(|v| self.to_pixels.apply(v))
                    .filter(|p| self.clip_box.contains(p))
                    .map(|p| Subpath::closed(Box2d::from_point(&p).pad(half).corners().to_vec()))
                    .collect();
                canvas.fill_path(commands(&marks), &paint.with_fill_rule(FillRule::NonZero))?;
            }
        }

        Ok(())
    }
}
