#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::raster::{CompOp, ScalingMethod};
use crate::Color;

/// Value of a single-band raster with its color.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorStop {
    /// Band value.
    pub value: f32,
    /// Color of the value.
    pub color: Color,
}

/// Maps single-band raster values to colors by linear interpolation between stops.
///
/// Values below the first stop and above the last one take the color of the nearest stop.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Colorizer {
    /// Color of values that can't be mapped, e.g. NaN.
    pub default_color: Color,
    /// Stops sorted by value.
    pub stops: Vec<ColorStop>,
}

impl Default for Colorizer {
    fn default() -> Self {
        Self {
            default_color: Color::TRANSPARENT,
            stops: vec![],
        }
    }
}

impl Colorizer {
    /// Creates a colorizer. Stops are sorted by value.
    pub fn new(mut stops: Vec<ColorStop>) -> Self {
        stops.sort_by(|a, b| a.value.total_cmp(&b.value));
        Self {
            stops,
            ..Default::default()
        }
    }

    /// Color of the value.
    pub fn color(&self, value: f32) -> Color {
        if !value.is_finite() {
            return self.default_color;
        }

        let Some(first) = self.stops.first() else {
            return self.default_color;
        };
        if value <= first.value {
            return first.color;
        }

        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if value <= b.value {
                let span = b.value - a.value;
                if span <= 0.0 {
                    return b.color;
                }
                let t = (value - a.value) / span;
                let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
                return Color::rgba(
                    mix(a.color.r(), b.color.r()),
                    mix(a.color.g(), b.color.g()),
                    mix(a.color.b(), b.color.b()),
                    mix(a.color.a(), b.color.a()),
                );
            }
        }

        self.stops
            .last()
            .map_or(self.default_color, |stop| stop.color)
    }
}

/// Draws raster data attached to features.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct RasterSymbolizer {
    /// Opacity.
    pub opacity: f64,
    /// Compositing operator.
    pub comp_op: CompOp,
    /// Resampling method.
    pub scaling: ScalingMethod,
    /// Colors of single-band rasters. Without it, single-band values are drawn as gray levels
    /// in `0..=255`.
    pub colorizer: Option<Colorizer>,
}

impl Default for RasterSymbolizer {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            comp_op: CompOp::default(),
            scaling: ScalingMethod::default(),
            colorizer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorizer_interpolates() {
        let colorizer = Colorizer::new(vec![
            ColorStop {
                value: 10.0,
                color: Color::rgb(0, 0, 200),
            },
            ColorStop {
                value: 0.0,
                color: Color::rgb(0, 0, 0),
            },
        ]);

        assert_eq!(colorizer.color(-5.0), Color::rgb(0, 0, 0));
        assert_eq!(colorizer.color(5.0), Color::rgb(0, 0, 100));
        assert_eq!(colorizer.color(2.5), Color::rgb(0, 0, 50));
        assert_eq!(colorizer.color(100.0), Color::rgb(0, 0, 200));
        assert_eq!(colorizer.color(f32::NAN), Color::TRANSPARENT);
    }
}
