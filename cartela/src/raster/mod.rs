//! Software rasterizer.
//!
//! Paths are converted into anti-aliased coverage by a scanline [`Rasterizer`] that samples
//! every pixel on an `N x N` grid, and the coverage is blended into a premultiplied RGBA
//! [`Surface`] by a [`Canvas`] using one of the [`CompOp`] operators.

use thiserror::Error;

mod canvas;
mod comp_op;
mod gamma;
mod rasterizer;
mod resample;
mod surface;

pub use canvas::{Canvas, Paint, PaintSource};
pub use comp_op::CompOp;
pub use gamma::{Gamma, GammaMethod};
pub(crate) use rasterizer::ellipse_points;
pub use rasterizer::{FillRule, Rasterizer, SpanSink, DEFAULT_SAMPLES};
pub use resample::{sample, sample_tiled, ScalingMethod};
pub use surface::Surface;

/// Errors of the rasterizer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RasterError {
    /// Memory allocation failed while building scanlines or a surface.
    #[error("out of memory while rasterizing")]
    OutOfMemory,
    /// Surface dimensions are invalid.
    #[error("invalid surface size {width}x{height}")]
    InvalidSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// Pixel buffer doesn't match the declared dimensions.
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),
}

/// Converts a color channel in `0.0..=1.0` into a byte.
pub(crate) fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Converts a premultiplied pixel into `0.0..=1.0` channels.
pub(crate) fn to_float(pixel: [u8; 4]) -> [f32; 4] {
    pixel.map(|c| c as f32 / 255.0)
}
