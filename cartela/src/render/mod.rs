//! Rendering of a [`Map`] into a [`Surface`].
//!
//! A [`Renderer`] walks the layers of the map in order. For every visible layer it queries the
//! layer datasource, selects the rules of the layer styles for every feature and hands the
//! feature to the symbolizers of the matching rules. Symbolizers draw through a [`Canvas`];
//! labels and point symbols share one [`CollisionDetector`] for the whole pass.

use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use ahash::AHashSet;
use cartela_types::{Box2d, Geom, Point2d, ProjTransform, Srs};
use log::{debug, error, info, warn};

use crate::datasource::{Datasource, DatasourceError, DatasourceRegistry, Query};
use crate::error::CartelaError;
use crate::expression::EvalContext;
use crate::feature::{Feature, RasterData};
use crate::geometry::{
    geometry_path, subpaths, Affine, Clip, PathCommand, PathExt, Simplify, Smooth, Subpath,
};
use crate::grid::FeatureGrid;
use crate::image_cache::ImageCache;
use crate::label::{BlockTextEngine, CollisionDetector, TextEngine};
use crate::map::{Layer, LayerSource, Map};
use crate::raster::{Canvas, Gamma, RasterError, Surface};
use crate::style::{ScaleRules, Style};
use crate::symbolizer::{GeometryOptions, Symbolizer};
use crate::view::ViewTransform;

mod labels;
mod markers;
mod options;
mod raster_data;
mod report;
mod vector;

#[cfg(test)]
mod tests;

pub use options::{CancellationToken, RenderOptions};
pub use report::{Diagnostic, RenderReport, RenderStatus, Severity};

/// Draws maps.
///
/// The renderer itself holds only configuration, so one renderer can draw many maps, and
/// several threads can draw with the same renderer at once.
pub struct Renderer {
    options: RenderOptions,
    registry: DatasourceRegistry,
    text_engine: Arc<dyn TextEngine>,
}

impl Debug for Renderer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Creates a renderer with default options, no datasource plugins and the
    /// [`BlockTextEngine`].
    pub fn new() -> Self {
        Self {
            options: RenderOptions::default(),
            registry: DatasourceRegistry::new(),
            text_engine: Arc::new(BlockTextEngine),
        }
    }

    /// Sets render options.
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the plugins used for layers that refer to a datasource by plugin name.
    pub fn with_registry(mut self, registry: DatasourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the engine laying out label text.
    pub fn with_text_engine(mut self, text_engine: Arc<dyn TextEngine>) -> Self {
        self.text_engine = text_engine;
        self
    }

    /// Render options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Datasource plugins.
    pub fn registry_mut(&mut self) -> &mut DatasourceRegistry {
        &mut self.registry
    }

    /// Draws all layers of the map into the surface.
    ///
    /// Problems that only affect a part of the map are returned as diagnostics in the report.
    /// An error is returned only if the pass cannot continue; the surface then keeps whatever
    /// was drawn before the error.
    pub fn render(&self, map: &Map, surface: &mut Surface) -> Result<RenderReport, CartelaError> {
        if let Some(background) = map.background() {
            surface.fill(background);
        }

        let layers: Vec<&Layer> = map.layers().iter().collect();
        self.run(map, &layers, surface, None, &[])
    }

    /// Draws a single layer into the feature grid. `fields` are the attributes stored for every
    /// feature that ends up in the grid.
    pub fn render_layer(
        &self,
        map: &Map,
        layer_index: usize,
        grid: &mut FeatureGrid,
        fields: &[String],
    ) -> Result<RenderReport, CartelaError> {
        let layer = map.layers().get(layer_index).ok_or_else(|| {
            CartelaError::InvalidArguments(format!(
                "layer index {layer_index} is out of range, the map has {} layers",
                map.layers().len()
            ))
        })?;

        let mut scratch = Surface::new(grid.width(), grid.height())?;
        self.run(map, &[layer], &mut scratch, Some(grid), fields)
    }

    fn run(
        &self,
        map: &Map,
        layers: &[&Layer],
        surface: &mut Surface,
        mut grid: Option<&mut FeatureGrid>,
        fields: &[String],
    ) -> Result<RenderReport, CartelaError> {
        let view = map
            .view_transform()
            .ok_or_else(|| {
                CartelaError::InvalidArguments(format!(
                    "map extent {:?} has no area",
                    map.extent()
                ))
            })?
            .with_offset(self.options.offset_x, self.options.offset_y);
        let scale_denominator = map.scale_denominator_with(self.options.pixel_size_mm);
        info!(
            "Rendering {} layers at scale 1:{scale_denominator:.0} into {}x{} surface",
            layers.len(),
            surface.width(),
            surface.height()
        );

        let mut pass = RenderPass::new(self, map, view, scale_denominator, fields);
        for layer in layers {
            if self.options.is_cancelled() {
                pass.cancel();
            }
            if pass.cancelled {
                break;
            }

            if let Err(err) = pass.render_layer(layer, surface, grid.as_deref_mut()) {
                error!("Render pass aborted in layer {}: {err}", layer.name);
                return Err(err);
            }
        }

        let report = pass.report;
        info!(
            "Render pass finished: {:?}, {} features drawn, {} skipped, {} diagnostics",
            report.status,
            report.features_rendered,
            report.features_skipped,
            report.diagnostics.len()
        );
        Ok(report)
    }
}

/// Feature with its geometries converted into the map SRS.
pub(crate) struct ProjectedFeature<'f> {
    geometries: Vec<Geom>,
    raster: Option<(Box2d, &'f RasterData)>,
}

impl<'f> ProjectedFeature<'f> {
    fn new(feature: &'f Feature, transform: &ProjTransform, shift: f64) -> Option<Self> {
        let project = |p: &Point2d| {
            transform
                .forward(p)
                .ok()
                .map(|p| Point2d::new(p.x + shift, p.y))
        };
        let geometries = feature
            .geometries()
            .iter()
            .map(|geometry| geometry.try_map_points(project))
            .collect::<Option<Vec<_>>>()?;
        let raster = match feature.raster() {
            Some(raster) => {
                let extent = transform.forward_box(&raster.extent).ok()?;
                Some((extent.translate(shift, 0.0), raster))
            }
            None => None,
        };

        Some(Self { geometries, raster })
    }

    fn polygons(&self) -> impl Iterator<Item = &Geom> + '_ {
        self.geometries
            .iter()
            .filter(|g| matches!(g, Geom::Polygon(_)))
    }

    fn strokable(&self) -> impl Iterator<Item = &Geom> + '_ {
        self.geometries
            .iter()
            .filter(|g| !matches!(g, Geom::Point(_)))
    }
}

/// State of one render pass.
pub(crate) struct RenderPass<'r> {
    renderer: &'r Renderer,
    map: &'r Map,
    view: ViewTransform,
    to_pixels: Affine,
    scale_denominator: f64,
    fields: &'r [String],
    detector: CollisionDetector,
    report: RenderReport,
    reported_resources: AHashSet<String>,
    layer_name: String,
    clip_box: Box2d,
    features_seen: usize,
    cancelled: bool,
}

impl<'r> RenderPass<'r> {
    fn new(
        renderer: &'r Renderer,
        map: &'r Map,
        view: ViewTransform,
        scale_denominator: f64,
        fields: &'r [String],
    ) -> Self {
        Self {
            renderer,
            map,
            to_pixels: view.to_affine(),
            clip_box: view.view_box(),
            view,
            scale_denominator,
            fields,
            detector: CollisionDetector::new(),
            report: RenderReport::default(),
            reported_resources: AHashSet::new(),
            layer_name: String::new(),
            features_seen: 0,
            cancelled: false,
        }
    }

    fn options(&self) -> &RenderOptions {
        &self.renderer.options
    }

    fn scale_factor(&self) -> f64 {
        self.renderer.options.scale_factor
    }

    fn render_layer(
        &mut self,
        layer: &Layer,
        surface: &mut Surface,
        mut grid: Option<&mut FeatureGrid>,
    ) -> Result<(), CartelaError> {
        self.layer_name.clone_from(&layer.name);
        let map = self.map;
        let scale_denominator = self.scale_denominator;
        if !layer.is_visible_at(scale_denominator) {
            debug!(
                "Layer {} is not visible at scale 1:{scale_denominator:.0}",
                layer.name
            );
            return Ok(());
        }

        if layer.clear_label_cache {
            self.detector.clear();
        }

        let mut styles: Vec<(&Style, ScaleRules)> = Vec::with_capacity(layer.styles.len());
        for name in &layer.styles {
            let Some(style) = map.find_style(name) else {
                self.warn(format!("style '{name}' is not defined, layer skipped"));
                return Ok(());
            };

            let rules = style.rules_for_scale(scale_denominator);
            if !rules.is_empty() {
                styles.push((style, rules));
            }
        }

        if styles.is_empty() {
            debug!("Layer {} has no active rules", layer.name);
            return Ok(());
        }

        let Some(datasource) = self.datasource(layer)? else {
            return Ok(());
        };

        let transform = match ProjTransform::new(&layer.srs, map.srs()) {
            Ok(transform) => transform,
            Err(err) => {
                self.warn(format!(
                    "cannot project from {} to {}: {err}",
                    layer.srs,
                    map.srs()
                ));
                return Ok(());
            }
        };

        let buffer_hint = styles
            .iter()
            .map(|(_, rules)| rules.buffer_hint())
            .fold(0.0, f64::max)
            * self.scale_factor();
        let buffer = layer
            .buffer_size
            .unwrap_or(map.buffer_size())
            .max(self.options().buffer_size)
            + buffer_hint;
        self.clip_box = self.view.view_box().pad(buffer);

        let mut attributes = BTreeSet::new();
        for (_, rules) in &styles {
            rules.collect_attributes(&mut attributes);
        }

        let query_extent = self.view.backward_box(&self.clip_box);
        // Copies of the world reaching only into the buffer are not queried.
        let shifts = self.world_shifts(&self.view.backward_box(&self.view.view_box()));
        let mut projection_failures = 0;
        for (style, rules) in &styles {
            let mut target = StyleTarget {
                datasource: datasource.as_ref(),
                transform: &transform,
                query_extent,
                shifts: &shifts,
                attributes: &attributes,
                rules,
                projection_failures: 0,
            };

            if style.needs_offscreen() {
                let mut offscreen = Surface::new(surface.width(), surface.height())?;
                let result = self.render_style(&mut target, &mut offscreen, grid.as_deref_mut());
                surface.composite(&offscreen, style.comp_op.unwrap_or_default(), style.opacity);
                result?;
            } else {
                self.render_style(&mut target, surface, grid.as_deref_mut())?;
            }

            projection_failures += target.projection_failures;
            if self.cancelled {
                break;
            }
        }

        if projection_failures > 0 {
            self.warn(format!(
                "{projection_failures} features skipped: geometry could not be projected"
            ));
        }

        Ok(())
    }

    fn render_style(
        &mut self,
        target: &mut StyleTarget,
        surface: &mut Surface,
        grid: Option<&mut FeatureGrid>,
    ) -> Result<(), CartelaError> {
        let mut canvas = Canvas::new(surface, self.options().subpixel_samples);
        if let Some(grid) = grid {
            canvas = canvas.with_grid(grid);
        }

        for &shift in target.shifts {
            let map_box = target.query_extent.translate(-shift, 0.0);
            let bbox = match target.transform.backward_box(&map_box) {
                Ok(bbox) => bbox,
                Err(err) => {
                    self.warn(format!("cannot project query box {map_box:?}: {err}"));
                    continue;
                }
            };

            let query = Query {
                bbox,
                attributes: target.attributes.clone(),
                resolution: (self.view.scale_x(), self.view.scale_y()),
                scale_denominator: self.scale_denominator,
            };
            debug!("Querying layer {} with {bbox:?}", self.layer_name);

            let features = match target.datasource.features(&query) {
                Ok(features) => features,
                Err(err) => return self.datasource_error(err),
            };

            for item in features {
                if self.check_cancelled() {
                    return Ok(());
                }

                let feature = match item {
                    Ok(feature) => feature,
                    Err(err) => return self.datasource_error(err),
                };

                self.render_feature(&feature, target, shift, &mut canvas)?;
            }
        }

        Ok(())
    }

    fn render_feature(
        &mut self,
        feature: &Feature,
        target: &mut StyleTarget,
        shift: f64,
        canvas: &mut Canvas,
    ) -> Result<(), CartelaError> {
        let map = self.map;
        let context = EvalContext::new(feature, map.variables())
            .with_null_semantics(self.options().null_semantics);
        let rules = target.rules.matching(&context);
        if rules.is_empty() {
            self.report.features_skipped += 1;
            return Ok(());
        }

        let Some(projected) = ProjectedFeature::new(feature, target.transform, shift) else {
            target.projection_failures += 1;
            self.report.features_skipped += 1;
            return Ok(());
        };

        canvas.set_feature(Some(feature.id()));
        if let Some(grid) = canvas.grid_mut() {
            grid.add_feature(feature, self.fields);
        }

        for rule in rules {
            for symbolizer in &rule.symbolizers {
                self.draw(symbolizer, &projected, &context, canvas)?;
            }
        }

        canvas.set_feature(None);
        self.report.features_rendered += 1;
        Ok(())
    }

    fn draw(
        &mut self,
        symbolizer: &Symbolizer,
        feature: &ProjectedFeature,
        context: &EvalContext,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        match symbolizer {
            Symbolizer::Polygon(s) => self.draw_polygon(s, feature, context, canvas),
            Symbolizer::Line(s) => self.draw_line(s, feature, context, canvas),
            Symbolizer::LinePattern(s) => self.draw_line_pattern(s, feature, context, canvas),
            Symbolizer::PolygonPattern(s) => {
                self.draw_polygon_pattern(s, feature, context, canvas)
            }
            Symbolizer::Point(s) => self.draw_point(s, feature, context, canvas),
            Symbolizer::Marker(s) => self.draw_marker(s, feature, context, canvas),
            Symbolizer::Shield(s) => self.draw_shield(s, feature, context, canvas),
            Symbolizer::Text(s) => self.draw_text(s, feature, context, canvas),
            Symbolizer::Raster(s) => self.draw_raster(s, feature, canvas),
            Symbolizer::Building(s) => self.draw_building(s, feature, context, canvas),
            Symbolizer::Debug(s) => self.draw_debug(s, feature, canvas),
        }
    }

    fn datasource(&mut self, layer: &Layer) -> Result<Option<Arc<dyn Datasource>>, CartelaError> {
        match &layer.source {
            Some(LayerSource::Datasource(datasource)) => Ok(Some(datasource.clone())),
            Some(LayerSource::Plugin { name, parameters }) => {
                match self.renderer.registry.create(name, parameters) {
                    Ok(datasource) => Ok(Some(datasource)),
                    Err(err) => self.datasource_error(err).map(|_| None),
                }
            }
            None => {
                self.warn("layer has no datasource".to_string());
                Ok(None)
            }
        }
    }

    /// Reports a datasource failure. The layer is skipped unless the pass must stop on errors.
    fn datasource_error(&mut self, err: DatasourceError) -> Result<(), CartelaError> {
        if self.options().stop_on_error {
            self.report
                .push(&self.layer_name, err.to_string(), Severity::Error);
            return Err(err.into());
        }

        self.warn(format!("datasource error, layer skipped: {err}"));
        Ok(())
    }

    fn warn(&mut self, message: String) {
        warn!("Layer {}: {message}", self.layer_name);
        self.report
            .push(&self.layer_name, message, Severity::Warning);
    }

    fn cancel(&mut self) {
        if !self.cancelled {
            info!("Render pass cancelled in layer {}", self.layer_name);
        }
        self.cancelled = true;
        self.report.status = RenderStatus::Incomplete;
    }

    fn check_cancelled(&mut self) -> bool {
        self.features_seen += 1;
        let interval = self.options().cancel_interval.max(1);
        if self.features_seen % interval == 0 && self.options().is_cancelled() {
            self.cancel();
        }

        self.cancelled
    }

    /// Offsets by which the data must be moved to cover the visible extent. For geographic maps
    /// the extent may cross the antimeridian, and every copy of the world it overlaps is drawn.
    fn world_shifts(&self, extent: &Box2d) -> Vec<f64> {
        if !Srs::parse(self.map.srs()).is_geographic() {
            return vec![0.0];
        }

        let first = ((extent.minx - 180.0) / 360.0).floor() as i64 + 1;
        let last = ((extent.maxx + 180.0) / 360.0).ceil() as i64 - 1;
        let shifts: Vec<f64> = (first..=last).map(|k| k as f64 * 360.0).collect();
        if shifts.is_empty() {
            vec![0.0]
        } else {
            shifts
        }
    }

    /// Loads an image, reporting a failure once per path.
    fn load_image(&mut self, path: &str) -> Option<Arc<Surface>> {
        match ImageCache::global().load(path) {
            Ok(image) => Some(image),
            Err(err) => {
                if self.reported_resources.insert(path.to_string()) {
                    self.warn(err.to_string());
                }
                None
            }
        }
    }

    /// Gamma of a symbolizer, or the default one if the symbolizer doesn't set it.
    fn gamma(&self, gamma: Gamma) -> Gamma {
        if gamma == Gamma::IDENTITY {
            self.options().gamma
        } else {
            gamma
        }
    }

    /// Geometry converted into pixel paths through the geometry pipeline: view transform,
    /// geometry transform, clipping, smoothing and simplification.
    fn pixel_paths(
        &self,
        geometry: &Geom,
        options: &GeometryOptions,
        context: &EvalContext,
    ) -> Vec<Subpath> {
        let mut path: Box<dyn Iterator<Item = PathCommand>> =
            Box::new(geometry_path(geometry).into_iter().transform(self.to_pixels));
        if let Some(list) = &options.geometry_transform {
            let affine = list
                .evaluate(context)
                .with_scaled_translation(self.scale_factor());
            if !affine.is_identity() {
                path = Box::new(path.transform(affine));
            }
        }
        if options.clip {
            path = Box::new(path.adapt(Clip::new(self.clip_box)));
        }
        if options.smooth > 0.0 {
            path = Box::new(path.adapt(Smooth::new(options.smooth)));
        }
        if options.simplify > 0.0 {
            path = Box::new(path.adapt(Simplify::new(
                options.simplify_algorithm,
                options.simplify,
            )));
        }

        subpaths(path)
    }
}

/// Data source and rules of one style of a layer.
struct StyleTarget<'a> {
    datasource: &'a dyn Datasource,
    transform: &'a ProjTransform,
    query_extent: Box2d,
    shifts: &'a [f64],
    attributes: &'a BTreeSet<String>,
    rules: &'a ScaleRules<'a>,
    projection_failures: usize,
}
