#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{to_float, Surface};

/// Interpolation used when an image is drawn at a different size or position.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScalingMethod {
    /// Nearest neighbour.
    #[default]
    Near,
    /// Linear interpolation between the 4 closest pixels.
    Bilinear,
    /// Catmull-Rom interpolation over the 16 closest pixels.
    Bicubic,
}

/// Samples the image at the given position in pixel coordinates of the image (pixel centers
/// are at `i + 0.5`). Positions outside of the image repeat the edge pixels.
pub fn sample(image: &Surface, x: f64, y: f64, method: ScalingMethod) -> [f32; 4] {
    let max_x = image.width() as i64 - 1;
    let max_y = image.height() as i64 - 1;
    sample_with(
        |px, py| to_float(image.pixel(px.clamp(0, max_x) as u32, py.clamp(0, max_y) as u32)),
        x,
        y,
        method,
    )
}

/// Same as [`sample`], but the image is repeated infinitely in both directions.
pub fn sample_tiled(image: &Surface, x: f64, y: f64, method: ScalingMethod) -> [f32; 4] {
    let width = image.width() as i64;
    let height = image.height() as i64;
    sample_with(
        |px, py| {
            to_float(image.pixel(
                px.rem_euclid(width) as u32,
                py.rem_euclid(height) as u32,
            ))
        },
        x,
        y,
        method,
    )
}

fn sample_with(
    fetch: impl Fn(i64, i64) -> [f32; 4],
    x: f64,
    y: f64,
    method: ScalingMethod,
) -> [f32; 4] {
    if !x.is_finite() || !y.is_finite() {
        return [0.0; 4];
    }

    match method {
        ScalingMethod::Near => fetch(x.floor() as i64, y.floor() as i64),
        ScalingMethod::Bilinear => {
            let fx = x - 0.5;
            let fy = y - 0.5;
            let x0 = fx.floor();
            let y0 = fy.floor();
            let tx = (fx - x0) as f32;
            let ty = (fy - y0) as f32;
            let (x0, y0) = (x0 as i64, y0 as i64);

            let p00 = fetch(x0, y0);
            let p10 = fetch(x0 + 1, y0);
            let p01 = fetch(x0, y0 + 1);
            let p11 = fetch(x0 + 1, y0 + 1);

            [0, 1, 2, 3].map(|i| {
                let top = p00[i] + (p10[i] - p00[i]) * tx;
                let bottom = p01[i] + (p11[i] - p01[i]) * tx;
                top + (bottom - top) * ty
            })
        }
        ScalingMethod::Bicubic => {
            let fx = x - 0.5;
            let fy = y - 0.5;
            let x0 = fx.floor();
            let y0 = fy.floor();
            let wx = catmull_rom_weights((fx - x0) as f32);
            let wy = catmull_rom_weights((fy - y0) as f32);
            let (x0, y0) = (x0 as i64, y0 as i64);

            let mut result = [0.0f32; 4];
            for (j, wy) in wy.iter().enumerate() {
                for (i, wx) in wx.iter().enumerate() {
                    let pixel = fetch(x0 + i as i64 - 1, y0 + j as i64 - 1);
                    let w = wx * wy;
                    for c in 0..4 {
                        result[c] += pixel[c] * w;
                    }
                }
            }

            let alpha = result[3].clamp(0.0, 1.0);
            [
                result[0].clamp(0.0, alpha),
                result[1].clamp(0.0, alpha),
                result[2].clamp(0.0, alpha),
                alpha,
            ]
        }
    }
}

fn catmull_rom_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use approx::assert_abs_diff_eq;

    fn two_pixels() -> Surface {
        let mut surface = Surface::new(2, 1).unwrap();
        surface.set_pixel(0, 0, [0, 0, 0, 255]);
        surface.set_pixel(1, 0, [255, 255, 255, 255]);
        surface
    }

    #[test]
    fn nearest() {
        let surface = two_pixels();
        assert_eq!(sample(&surface, 0.9, 0.5, ScalingMethod::Near)[0], 0.0);
        assert_eq!(sample(&surface, 1.1, 0.5, ScalingMethod::Near)[0], 1.0);
        assert_eq!(sample(&surface, -5.0, 0.5, ScalingMethod::Near)[0], 0.0);
        assert_eq!(sample_tiled(&surface, 2.5, 0.5, ScalingMethod::Near)[0], 0.0);
        assert_eq!(sample_tiled(&surface, -0.5, 0.5, ScalingMethod::Near)[0], 1.0);
    }

    #[test]
    fn bilinear_interpolates_between_centers() {
        let surface = two_pixels();
        assert_abs_diff_eq!(sample(&surface, 1.0, 0.5, ScalingMethod::Bilinear)[0], 0.5);
        assert_abs_diff_eq!(sample(&surface, 0.5, 0.5, ScalingMethod::Bilinear)[0], 0.0);
        assert_abs_diff_eq!(sample(&surface, 1.25, 0.5, ScalingMethod::Bilinear)[0], 0.75);
    }

    #[test]
    fn bicubic_keeps_flat_areas() {
        let mut surface = Surface::new(4, 4).unwrap();
        surface.fill(Color::rgba(255, 0, 0, 255));
        let value = sample(&surface, 1.7, 2.2, ScalingMethod::Bicubic);
        assert_abs_diff_eq!(value[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(value[3], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(value[1], 0.0, epsilon = 1e-5);
    }
}
