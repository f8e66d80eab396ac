use super::{ProjectedFeature, RenderPass};
use crate::feature::{RasterBands, RasterData};
use crate::geometry::Affine;
use crate::raster::{Canvas, RasterError, Surface};
use crate::symbolizer::{Colorizer, RasterSymbolizer};
use crate::Color;

/// Converts raster cells into an image. Cells without data are transparent.
fn raster_image(
    raster: &RasterData,
    colorizer: Option<&Colorizer>,
) -> Result<Surface, RasterError> {
    let values = match &raster.bands {
        RasterBands::Rgba(bytes) => {
            return Surface::from_straight_rgba(raster.width, raster.height, bytes)
        }
        RasterBands::Single { values, nodata } => values
            .iter()
            .map(|v| match nodata {
                Some(nodata) if v == nodata => f32::NAN,
                _ => *v,
            })
            .collect::<Vec<_>>(),
    };

    let colors: Vec<Color> = match colorizer {
        Some(colorizer) => values
            .iter()
            .map(|v| {
                if v.is_nan() {
                    Color::TRANSPARENT
                } else {
                    colorizer.color(*v)
                }
            })
            .collect(),
        None => {
            let (min, max) = values
                .iter()
                .filter(|v| v.is_finite())
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), v| {
                    (min.min(*v), max.max(*v))
                });
            let range = max - min;
            values
                .iter()
                .map(|v| {
                    if !v.is_finite() {
                        Color::TRANSPARENT
                    } else if range > 0.0 {
                        let level = ((v - min) / range * 255.0).round() as u8;
                        Color::rgb(level, level, level)
                    } else {
                        Color::WHITE
                    }
                })
                .collect()
        }
    };

    let bytes: Vec<u8> = colors.iter().flat_map(Color::to_u8_array).collect();
    Surface::from_straight_rgba(raster.width, raster.height, &bytes)
}

impl RenderPass<'_> {
    /// Stretches the raster of the feature over its extent in the map.
    ///
    /// Only the extent is reprojected: cells are not warped between coordinate systems.
    pub(super) fn draw_raster(
        &mut self,
        symbolizer: &RasterSymbolizer,
        feature: &ProjectedFeature,
        canvas: &mut Canvas,
    ) -> Result<(), RasterError> {
        let Some((extent, raster)) = feature.raster else {
            return Ok(());
        };
        if raster.width == 0 || raster.height == 0 || !extent.is_valid() {
            return Ok(());
        }

        let image = match raster_image(raster, symbolizer.colorizer.as_ref()) {
            Ok(image) => image,
            Err(err) => {
                self.warn(format!("raster of a feature cannot be drawn: {err}"));
                return Ok(());
            }
        };

        let transform = self
            .to_pixels
            .then_after(&Affine::translate(extent.minx, extent.maxy))
            .then_after(&Affine::scale(
                extent.width() / raster.width as f64,
                -extent.height() / raster.height as f64,
            ));
        canvas.draw_image(
            &image,
            &transform,
            symbolizer.opacity,
            symbolizer.comp_op,
            symbolizer.scaling,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolizer::ColorStop;
    use cartela_types::Box2d;

    fn extent() -> Box2d {
        Box2d::new(0.0, 0.0, 2.0, 1.0)
    }

    #[test]
    fn gray_levels_between_min_and_max() {
        let raster =
            RasterData::single_band(extent(), 2, 1, vec![10.0, 20.0], None).unwrap();
        let image = raster_image(&raster, None).unwrap();

        assert_eq!(image.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(image.pixel(1, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn nodata_is_transparent() {
        let raster =
            RasterData::single_band(extent(), 2, 1, vec![-9999.0, 5.0], Some(-9999.0)).unwrap();
        let image = raster_image(&raster, None).unwrap();

        assert_eq!(image.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(image.pixel(1, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn colorizer_is_applied() {
        let colorizer = Colorizer::new(vec![
            ColorStop {
                value: 0.0,
                color: Color::RED,
            },
            ColorStop {
                value: 1.0,
                color: Color::BLUE,
            },
        ]);
        let raster =
            RasterData::single_band(extent(), 2, 1, vec![0.0, f32::NAN], None).unwrap();
        let image = raster_image(&raster, Some(&colorizer)).unwrap();

        assert_eq!(image.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(image.pixel(1, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn rgba_size_mismatch_is_an_error() {
        let raster = RasterData {
            extent: extent(),
            width: 2,
            height: 2,
            bands: RasterBands::Rgba(vec![0; 4]),
        };
        assert!(raster_image(&raster, None).is_err());
    }
}
