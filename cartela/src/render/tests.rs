use std::sync::Arc;

use assert_matches::assert_matches;
use cartela_types::{Box2d, LineString, Point2d, Polygon};

use super::*;
use crate::datasource::{MemoryDatasource, Parameters};
use crate::expression::Expression;
use crate::grid::GridKey;
use crate::map::MapBuilder;
use crate::style::Rule;
use crate::symbolizer::{
    DebugMode, DebugSymbolizer, LinePatternSymbolizer, LineSymbolizer, MarkerSymbolizer,
    PolygonSymbolizer, TextSymbolizer,
};
use crate::Color;

fn rectangle(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Polygon {
    Polygon::new(
        vec![
            Point2d::new(minx, miny),
            Point2d::new(maxx, miny),
            Point2d::new(maxx, maxy),
            Point2d::new(minx, maxy),
        ],
        vec![],
    )
}

fn source(features: Vec<Feature>) -> Arc<dyn Datasource> {
    Arc::new(MemoryDatasource::new(features))
}

fn style_with(symbolizer: impl Into<Symbolizer>) -> Style {
    Style::new().with_rule(Rule::new().with_symbolizer(symbolizer))
}

fn render(map: &Map) -> (Surface, RenderReport) {
    render_with(&Renderer::new(), map)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn render_with(renderer: &Renderer, map: &Map) -> (Surface, RenderReport) {
    init_logger();
    let mut surface = Surface::new(map.width(), map.height()).unwrap();
    let report = renderer.render(map, &mut surface).unwrap();
    (surface, report)
}

#[test]
fn polygon_covering_the_world_fills_every_pixel() {
    let world = Feature::new(1).with_geometry(rectangle(-180.0, -90.0, 180.0, 90.0));
    let map = MapBuilder::default()
        .with_style("fill", style_with(PolygonSymbolizer::new(Color::rgb(255, 0, 0))))
        .with_layer(
            Layer::new("world")
                .with_style("fill")
                .with_datasource(source(vec![world])),
        )
        .build()
        .unwrap();

    let (surface, report) = render(&map);
    assert!(report.is_complete());
    assert_eq!(report.features_rendered, 1);
    for y in 0..surface.height() {
        for x in 0..surface.width() {
            assert_eq!(surface.pixel(x, y), [255, 0, 0, 255], "pixel {x},{y}");
        }
    }
}

#[test]
fn markers_are_centered_on_points() {
    let points = [(-90.0, 45.0), (90.0, 45.0), (-90.0, -45.0), (90.0, -45.0)];
    let features = points
        .iter()
        .enumerate()
        .map(|(i, (x, y))| Feature::new(i as i64).with_geometry(Point2d::new(*x, *y)))
        .collect();
    let marker = MarkerSymbolizer::ellipse(10.0, 10.0, Color::BLUE).with_allow_overlap(true);
    let map = MapBuilder::default()
        .with_style("markers", style_with(marker))
        .with_layer(
            Layer::new("points")
                .with_style("markers")
                .with_datasource(source(features)),
        )
        .build()
        .unwrap();

    let (surface, report) = render(&map);
    assert_eq!(report.features_rendered, 4);
    for (x, y) in [(64, 64), (192, 64), (64, 192), (192, 192)] {
        assert_eq!(surface.pixel(x, y), [0, 0, 255, 255]);
        assert_eq!(surface.pixel(x - 8, y), [0, 0, 0, 0]);
        assert_eq!(surface.pixel(x, y + 8), [0, 0, 0, 0]);
    }
    assert_eq!(surface.pixel(128, 128), [0, 0, 0, 0]);
}

#[test]
fn overlapping_markers_are_dropped() {
    let features = (0..2)
        .map(|i| Feature::new(i).with_geometry(Point2d::new(0.0, 0.0)))
        .collect();
    let map = MapBuilder::default()
        .with_style(
            "markers",
            style_with(MarkerSymbolizer::ellipse(10.0, 10.0, Color::BLUE)),
        )
        .with_style(
            "debug",
            style_with(DebugSymbolizer {
                mode: DebugMode::Collision,
            }),
        )
        .with_layer(
            Layer::new("points")
                .with_style("markers")
                .with_style("debug")
                .with_datasource(source(features)),
        )
        .build()
        .unwrap();

    let mut surface = Surface::new(256, 256).unwrap();
    let renderer = Renderer::new();
    let view = map.view_transform().unwrap();
    let mut pass = RenderPass::new(&renderer, &map, view, map.scale_denominator(), &[]);
    pass.render_layer(&map.layers()[0], &mut surface, None).unwrap();

    assert_eq!(pass.detector.len(), 1);
    assert_eq!(pass.report.features_rendered, 4);
    assert_eq!(surface.pixel(128, 128), [0, 0, 255, 255]);
}

#[test]
fn allow_overlap_markers_do_not_block_later_symbols() {
    let point = || source(vec![Feature::new(1).with_geometry(Point2d::new(0.0, 0.0))]);
    let map = MapBuilder::default()
        .with_style(
            "over",
            style_with(MarkerSymbolizer::ellipse(10.0, 10.0, Color::BLUE).with_allow_overlap(true)),
        )
        .with_style("plain", style_with(MarkerSymbolizer::ellipse(10.0, 10.0, Color::RED)))
        .with_layer(Layer::new("a").with_style("over").with_datasource(point()))
        .with_layer(Layer::new("b").with_style("plain").with_datasource(point()))
        .build()
        .unwrap();

    let (surface, report) = render(&map);
    assert_eq!(report.features_rendered, 2);
    assert_eq!(surface.pixel(128, 128), [255, 0, 0, 255]);
}

#[test]
fn default_marker_stays_inside_concave_polygon() {
    let u_shape = Polygon::new(
        vec![
            Point2d::new(-100.0, -80.0),
            Point2d::new(100.0, -80.0),
            Point2d::new(100.0, 80.0),
            Point2d::new(60.0, 80.0),
            Point2d::new(60.0, -40.0),
            Point2d::new(-60.0, -40.0),
            Point2d::new(-60.0, 80.0),
            Point2d::new(-100.0, 80.0),
        ],
        vec![],
    );
    let map = MapBuilder::default()
        .with_style(
            "markers",
            style_with(MarkerSymbolizer::ellipse(10.0, 10.0, Color::BLUE)),
        )
        .with_layer(
            Layer::new("areas")
                .with_style("markers")
                .with_datasource(source(vec![Feature::new(1).with_geometry(u_shape)])),
        )
        .build()
        .unwrap();

    let (surface, report) = render(&map);
    assert_eq!(report.features_rendered, 1);
    // The area centroid at (0, -16.4) lies in the notch.
    assert_eq!(surface.pixel(128, 151), [0, 0, 0, 0]);
    assert_eq!(surface.pixel(185, 151), [0, 0, 255, 255]);
}

#[test]
fn filter_selects_features() {
    let features = vec![
        Feature::new(1)
            .with_geometry(rectangle(-180.0, -90.0, 0.0, 90.0))
            .with_attribute("name", "land"),
        Feature::new(2)
            .with_geometry(rectangle(0.0, -90.0, 180.0, 90.0))
            .with_attribute("name", ""),
    ];
    let style = Style::new().with_rule(
        Rule::new()
            .with_filter(Expression::parse("[name] != ''").unwrap())
            .with_symbolizer(PolygonSymbolizer::new(Color::GREEN)),
    );
    let map = MapBuilder::default()
        .with_style("named", style)
        .with_layer(
            Layer::new("areas")
                .with_style("named")
                .with_datasource(source(features)),
        )
        .build()
        .unwrap();

    let (surface, report) = render(&map);
    assert_eq!(report.features_rendered, 1);
    assert_eq!(report.features_skipped, 1);
    assert_eq!(surface.pixel(64, 128), [0, 255, 0, 255]);
    assert_eq!(surface.pixel(192, 128), [0, 0, 0, 0]);
}

#[test]
fn only_rules_of_the_current_scale_are_applied() {
    let extent = Box2d::new(0.0, 0.0, 3584.0, 3584.0);
    let square = Feature::new(1).with_geometry(rectangle(0.0, 0.0, 3584.0, 3584.0));
    let style = Style::new()
        .with_rule(
            Rule::new()
                .with_scale_range(0.0, 25_000.0)
                .with_symbolizer(PolygonSymbolizer::new(Color::BLUE)),
        )
        .with_rule(
            Rule::new()
                .with_scale_range(25_000.0, 100_000.0)
                .with_symbolizer(PolygonSymbolizer::new(Color::GREEN)),
        )
        .with_rule(
            Rule::new()
                .with_scale_range(100_000.0, f64::INFINITY)
                .with_symbolizer(PolygonSymbolizer::new(Color::RED)),
        );
    let map = MapBuilder::default()
        .with_srs("EPSG:3857")
        .with_extent(extent)
        .with_style("by-scale", style)
        .with_layer(
            Layer::new("squares")
                .with_srs("EPSG:3857")
                .with_style("by-scale")
                .with_datasource(source(vec![square])),
        )
        .build()
        .unwrap();

    approx::assert_relative_eq!(map.scale_denominator(), 50_000.0, max_relative = 1e-9);
    let (surface, _) = render(&map);
    assert_eq!(surface.pixel(128, 128), [0, 255, 0, 255]);
}

#[test]
fn data_is_repeated_across_the_antimeridian() {
    let point = Feature::new(1).with_geometry(Point2d::new(-179.0, 0.0));
    let marker = MarkerSymbolizer::ellipse(6.0, 6.0, Color::RED).with_allow_overlap(true);
    let map = MapBuilder::default()
        .with_size(300, 200)
        .with_extent(Box2d::new(170.0, -10.0, 200.0, 10.0))
        .with_style("markers", style_with(marker))
        .with_layer(
            Layer::new("points")
                .with_style("markers")
                .with_datasource(source(vec![point])),
        )
        .build()
        .unwrap();

    let (surface, report) = render(&map);
    assert_eq!(report.features_rendered, 1);
    assert_eq!(surface.pixel(110, 100), [255, 0, 0, 255]);
    assert_eq!(surface.pixel(120, 100), [0, 0, 0, 0]);
}

#[test]
fn layer_is_rendered_into_a_grid() {
    let quadrants = [
        (1, rectangle(-180.0, 0.0, 0.0, 90.0)),
        (2, rectangle(0.0, 0.0, 180.0, 90.0)),
        (3, rectangle(-180.0, -90.0, 0.0, 0.0)),
        (4, rectangle(0.0, -90.0, 180.0, 0.0)),
    ];
    let features = quadrants
        .into_iter()
        .map(|(id, polygon)| Feature::new(id).with_geometry(polygon))
        .collect();
    let map = MapBuilder::default()
        .with_size(64, 64)
        .with_style("fill", style_with(PolygonSymbolizer::new(Color::WHITE)))
        .with_layer(
            Layer::new("quadrants")
                .with_style("fill")
                .with_datasource(source(features)),
        )
        .build()
        .unwrap();

    let mut grid = FeatureGrid::new(64, 64, GridKey::Id);
    let report = Renderer::new()
        .render_layer(&map, 0, &mut grid, &[])
        .unwrap();
    assert_eq!(report.features_rendered, 4);
    assert_eq!(grid.feature_count(), 4);

    let encoded = grid.encode(4, &[]);
    assert_eq!(encoded.keys, vec!["", "1", "2", "3", "4"]);
    assert_eq!(encoded.grid.len(), 16);
    assert_eq!(encoded.grid[0], "!!!!!!!!########");
    assert_eq!(encoded.grid[15], "$$$$$$$$%%%%%%%%");
}

#[test]
fn layer_index_out_of_range() {
    let map = MapBuilder::default().build().unwrap();
    let mut grid = FeatureGrid::new(4, 4, GridKey::Id);
    assert_matches!(
        Renderer::new().render_layer(&map, 3, &mut grid, &[]),
        Err(CartelaError::InvalidArguments(_))
    );
}

#[test]
fn missing_style_skips_layer() {
    let world = Feature::new(1).with_geometry(rectangle(-180.0, -90.0, 180.0, 90.0));
    let map = MapBuilder::default()
        .with_layer(
            Layer::new("world")
                .with_style("nope")
                .with_datasource(source(vec![world])),
        )
        .build()
        .unwrap();

    let (surface, report) = render(&map);
    assert!(report.is_complete());
    assert_eq!(report.features_rendered, 0);
    let warnings: Vec<_> = report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].layer, "world");
    assert!(warnings[0].message.contains("'nope'"));
    assert_eq!(surface.pixel(0, 0), [0, 0, 0, 0]);
}

#[test]
fn unknown_plugin_is_reported() {
    let map = MapBuilder::default()
        .with_style("fill", style_with(PolygonSymbolizer::new(Color::RED)))
        .with_layer(
            Layer::new("db")
                .with_style("fill")
                .with_plugin("postgis", Parameters::new()),
        )
        .build()
        .unwrap();

    let (_, report) = render(&map);
    assert!(report.is_complete());
    assert_eq!(report.warnings().count(), 1);

    let strict = Renderer::new().with_options(RenderOptions::default().with_stop_on_error(true));
    let mut surface = Surface::new(256, 256).unwrap();
    assert_matches!(
        strict.render(&map, &mut surface),
        Err(CartelaError::Datasource(DatasourceError::UnknownPlugin(name))) if name == "postgis"
    );
}

#[test]
fn registered_plugin_provides_features() {
    let mut renderer = Renderer::new();
    renderer.registry_mut().register("world", |_: &Parameters| {
        let world = Feature::new(1).with_geometry(rectangle(-180.0, -90.0, 180.0, 90.0));
        Ok(source(vec![world]))
    });
    let map = MapBuilder::default()
        .with_style("fill", style_with(PolygonSymbolizer::new(Color::BLUE)))
        .with_layer(
            Layer::new("plugin")
                .with_style("fill")
                .with_plugin("world", Parameters::new()),
        )
        .build()
        .unwrap();

    let (surface, report) = render_with(&renderer, &map);
    assert!(report.diagnostics.is_empty());
    assert_eq!(surface.pixel(10, 10), [0, 0, 255, 255]);
}

#[test]
fn cancelled_render_is_incomplete() {
    let token = CancellationToken::new();
    token.cancel();
    let world = Feature::new(1).with_geometry(rectangle(-180.0, -90.0, 180.0, 90.0));
    let map = MapBuilder::default()
        .with_style("fill", style_with(PolygonSymbolizer::new(Color::RED)))
        .with_layer(
            Layer::new("world")
                .with_style("fill")
                .with_datasource(source(vec![world])),
        )
        .build()
        .unwrap();

    let renderer = Renderer::new().with_options(RenderOptions::default().with_cancellation(token));
    let (surface, report) = render_with(&renderer, &map);
    assert_eq!(report.status, RenderStatus::Incomplete);
    assert_eq!(report.features_rendered, 0);
    assert_eq!(surface.pixel(128, 128), [0, 0, 0, 0]);
}

#[test]
fn style_opacity_is_applied_to_the_whole_style() {
    let features = vec![
        Feature::new(1).with_geometry(rectangle(-180.0, -90.0, 180.0, 90.0)),
        Feature::new(2).with_geometry(rectangle(-90.0, -45.0, 90.0, 45.0)),
    ];
    let map = MapBuilder::default()
        .with_background(Color::WHITE)
        .with_style(
            "half",
            style_with(PolygonSymbolizer::new(Color::BLACK)).with_opacity(0.5),
        )
        .with_layer(
            Layer::new("overlap")
                .with_style("half")
                .with_datasource(source(features)),
        )
        .build()
        .unwrap();

    let (surface, _) = render(&map);
    // Overlapping features are blended inside the style first.
    assert_eq!(surface.pixel(128, 128), [128, 128, 128, 255]);
    assert_eq!(surface.pixel(5, 5), [128, 128, 128, 255]);
}

#[test]
fn scale_factor_widens_lines() {
    let line = Feature::new(1).with_geometry(LineString::new(vec![
        Point2d::new(-180.0, 0.0),
        Point2d::new(180.0, 0.0),
    ]));
    let map = MapBuilder::default()
        .with_style("line", style_with(LineSymbolizer::new(Color::BLACK, 2.0)))
        .with_layer(
            Layer::new("line")
                .with_style("line")
                .with_datasource(source(vec![line])),
        )
        .build()
        .unwrap();

    let (thin, _) = render(&map);
    assert_eq!(thin.pixel(100, 127), [0, 0, 0, 255]);
    assert_eq!(thin.pixel(100, 125), [0, 0, 0, 0]);

    let renderer = Renderer::new().with_options(RenderOptions::default().with_scale_factor(4.0));
    let (thick, _) = render_with(&renderer, &map);
    assert_eq!(thick.pixel(100, 125), [0, 0, 0, 255]);
    assert_eq!(thick.pixel(100, 131), [0, 0, 0, 255]);
    assert_eq!(thick.pixel(100, 133), [0, 0, 0, 0]);
}

#[cfg(feature = "image")]
#[test]
fn scale_factor_widens_line_patterns() {
    let dir = std::env::temp_dir().join("cartela-render-tests");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("black-2px.png");
    image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]))
        .save(&path)
        .unwrap();

    let line = Feature::new(1).with_geometry(LineString::new(vec![
        Point2d::new(-180.0, 0.0),
        Point2d::new(180.0, 0.0),
    ]));
    let pattern = LinePatternSymbolizer {
        file: path.to_string_lossy().into_owned(),
        ..Default::default()
    };
    let map = MapBuilder::default()
        .with_style("pattern", style_with(pattern))
        .with_layer(
            Layer::new("line")
                .with_style("pattern")
                .with_datasource(source(vec![line])),
        )
        .build()
        .unwrap();

    let (thin, _) = render(&map);
    assert_eq!(thin.pixel(100, 127), [0, 0, 0, 255]);
    assert_eq!(thin.pixel(100, 125), [0, 0, 0, 0]);

    let renderer = Renderer::new().with_options(RenderOptions::default().with_scale_factor(4.0));
    let (thick, _) = render_with(&renderer, &map);
    assert_eq!(thick.pixel(100, 125), [0, 0, 0, 255]);
    assert_eq!(thick.pixel(100, 131), [0, 0, 0, 255]);
    assert_eq!(thick.pixel(100, 133), [0, 0, 0, 0]);
}

#[test]
fn labels_are_drawn_once_per_position() {
    let features = (0..2)
        .map(|i| {
            Feature::new(i)
                .with_geometry(Point2d::new(0.0, 0.0))
                .with_attribute("name", "H")
        })
        .collect();
    let mut text = TextSymbolizer::new(Expression::parse("[name]").unwrap());
    text.text.size = crate::symbolizer::Prop::Value(20.0);
    let map = MapBuilder::default()
        .with_style("labels", style_with(text))
        .with_layer(
            Layer::new("labels")
                .with_style("labels")
                .with_datasource(source(features)),
        )
        .build()
        .unwrap();

    let renderer = Renderer::new();
    let view = map.view_transform().unwrap();
    let mut surface = Surface::new(256, 256).unwrap();
    let mut pass = RenderPass::new(&renderer, &map, view, map.scale_denominator(), &[]);
    pass.render_layer(&map.layers()[0], &mut surface, None).unwrap();

    assert_eq!(pass.detector.len(), 1);
    assert_eq!(surface.pixel(128, 128), [0, 0, 0, 255]);
    assert_eq!(surface.pixel(128, 100), [0, 0, 0, 0]);
}

#[test]
fn allow_overlap_labels_skip_the_detector() {
    let features = (0..2)
        .map(|i| {
            Feature::new(i)
                .with_geometry(Point2d::new(0.0, 0.0))
                .with_attribute("name", "H")
        })
        .collect();
    let mut text = TextSymbolizer::new(Expression::parse("[name]").unwrap());
    text.text.size = crate::symbolizer::Prop::Value(20.0);
    text.text.allow_overlap = true;
    let map = MapBuilder::default()
        .with_style("labels", style_with(text))
        .with_layer(
            Layer::new("labels")
                .with_style("labels")
                .with_datasource(source(features)),
        )
        .build()
        .unwrap();

    let renderer = Renderer::new();
    let view = map.view_transform().unwrap();
    let mut surface = Surface::new(256, 256).unwrap();
    let mut pass = RenderPass::new(&renderer, &map, view, map.scale_denominator(), &[]);
    pass.render_layer(&map.layers()[0], &mut surface, None).unwrap();

    assert!(pass.detector.is_empty());
    assert_eq!(pass.report.features_rendered, 2);
    assert_eq!(surface.pixel(128, 128), [0, 0, 0, 255]);
}

#[test]
fn buffer_does_not_duplicate_the_world() {
    let point = Feature::new(1).with_geometry(Point2d::new(170.0, 0.0));
    let map = MapBuilder::default()
        .with_style(
            "markers",
            style_with(MarkerSymbolizer::ellipse(4.0, 4.0, Color::RED).with_allow_overlap(true)),
        )
        .with_layer(
            Layer::new("points")
                .with_style("markers")
                .with_datasource(source(vec![point])),
        )
        .build()
        .unwrap();

    let renderer = Renderer::new().with_options(RenderOptions::default().with_buffer_size(32.0));
    let (_, report) = render_with(&renderer, &map);
    assert_eq!(report.features_rendered, 1);
}

#[test]
fn world_shifts_cover_the_extent() {
    let map = MapBuilder::default().build().unwrap();
    let renderer = Renderer::new();
    let view = map.view_transform().unwrap();
    let pass = RenderPass::new(&renderer, &map, view, map.scale_denominator(), &[]);

    assert_eq!(pass.world_shifts(&Box2d::new(-180.0, -90.0, 180.0, 90.0)), vec![0.0]);
    assert_eq!(
        pass.world_shifts(&Box2d::new(170.0, -10.0, 200.0, 10.0)),
        vec![0.0, 360.0]
    );
    assert_eq!(
        pass.world_shifts(&Box2d::new(-200.0, -10.0, -170.0, 10.0)),
        vec![-360.0, 0.0]
    );

    let projected = MapBuilder::default().with_srs("EPSG:3857").build().unwrap();
    let pass = RenderPass::new(&renderer, &projected, view, 1.0, &[]);
    assert_eq!(pass.world_shifts(&Box2d::new(-1e9, -1.0, 1e9, 1.0)), vec![0.0]);
}
