//! This example renders a small world map with polygons, a line, markers and labels into an
//! image file.
//!
//! Run it with the output path and an optional format (`png`, `png8`, `jpeg80`, `tiff`...):
//!
//! ```shell
//! cargo run --example render_to_file -- world.png png8
//! ```

use std::sync::Arc;

use anyhow::{anyhow, Result};
use cartela::cartela_types::{LineString, Point2d, Polygon};
use cartela::datasource::MemoryDatasource;
use cartela::encode::{encode, ImageFormat};
use cartela::expression::Expression;
use cartela::feature::Feature;
use cartela::raster::Surface;
use cartela::style::{Rule, Style};
use cartela::symbolizer::{LineSymbolizer, MarkerSymbolizer, PolygonSymbolizer, TextSymbolizer};
use cartela::{Color, Layer, MapBuilder, RenderOptions, Renderer};
use log::info;

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

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(output) = args.next() else {
        return Err(anyhow!(
            "This example must be run with the output file path and an optional image format"
        ));
    };
    let format = ImageFormat::parse(&args.next().unwrap_or_else(|| "png".to_string()))?;

    let areas = MemoryDatasource::new(vec![
        Feature::new(1)
            .with_geometry(rectangle(-160.0, 10.0, -40.0, 70.0))
            .with_attribute("kind", "north"),
        Feature::new(2)
            .with_geometry(rectangle(-80.0, -55.0, -35.0, 10.0))
            .with_attribute("kind", "south"),
        Feature::new(3)
            .with_geometry(rectangle(-10.0, 35.0, 150.0, 75.0))
            .with_attribute("kind", "north"),
    ]);
    let route = MemoryDatasource::new(vec![Feature::new(10).with_geometry(LineString::new(
        vec![
            Point2d::new(-74.0, 40.7),
            Point2d::new(-30.0, 45.0),
            Point2d::new(2.35, 48.85),
        ],
    ))]);
    let cities = MemoryDatasource::new(vec![
        Feature::new(100)
            .with_geometry(Point2d::new(-74.0, 40.7))
            .with_attribute("name", "New York"),
        Feature::new(101)
            .with_geometry(Point2d::new(2.35, 48.85))
            .with_attribute("name", "Paris"),
        Feature::new(102)
            .with_geometry(Point2d::new(126.98, 37.57))
            .with_attribute("name", "Seoul"),
    ]);

    let land = Style::new()
        .with_rule(
            Rule::new()
                .with_filter(Expression::parse("[kind] = 'north'")?)
                .with_symbolizer(PolygonSymbolizer::new(Color::rgb(0xc8, 0xd7, 0xab))),
        )
        .with_rule(
            Rule::new()
                .as_else()
                .with_symbolizer(PolygonSymbolizer::new(Color::rgb(0xe0, 0xc9, 0x8f))),
        );
    let mut labels = TextSymbolizer::new(Expression::parse("[name]")?);
    labels.text.dy = -12.0;
    labels.text.halo_radius = 1.5;

    let map = MapBuilder::default()
        .with_size(1024, 512)
        .with_background(Color::rgb(0xaa, 0xd3, 0xdf))
        .with_style("land", land)
        .with_style(
            "route",
            Style::new().with_rule(
                Rule::new().with_symbolizer(
                    LineSymbolizer::new(Color::rgb(0xd0, 0x30, 0x30), 2.0)
                        .with_dashes(vec![8.0, 4.0], 0.0),
                ),
            ),
        )
        .with_style(
            "cities",
            Style::new().with_rule(
                Rule::new()
                    .with_symbolizer(MarkerSymbolizer::ellipse(8.0, 8.0, Color::BLACK))
                    .with_symbolizer(labels),
            ),
        )
        .with_layer(
            Layer::new("land")
                .with_style("land")
                .with_datasource(Arc::new(areas)),
        )
        .with_layer(
            Layer::new("route")
                .with_style("route")
                .with_datasource(Arc::new(route)),
        )
        .with_layer(
            Layer::new("cities")
                .with_style("cities")
                .with_datasource(Arc::new(cities)),
        )
        .build()?;

    let renderer = Renderer::new().with_options(RenderOptions::default().with_buffer_size(32.0));
    let mut surface = Surface::new(map.width(), map.height())?;
    let report = renderer.render(&map, &mut surface)?;
    for diagnostic in &report.diagnostics {
        info!("{}: {}", diagnostic.layer, diagnostic.message);
    }

    std::fs::write(&output, encode(&surface, format)?)?;
    info!("Map saved to {output} as {format}");

    Ok(())
}
