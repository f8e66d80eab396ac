use super::{to_byte, to_float, CompOp, RasterError};
use crate::Color;

/// Pixel buffer with premultiplied RGBA pixels, 4 bytes each, in row-major order.
///
/// Rows may be padded: `stride` is the number of bytes between the starts of two
/// consecutive rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl Surface {
    /// Creates a transparent surface.
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidSize { width, height });
        }

        let stride = width as usize * 4;
        let len = stride
            .checked_mul(height as usize)
            .ok_or(RasterError::OutOfMemory)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| RasterError::OutOfMemory)?;
        data.resize(len, 0);

        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Wraps an existing premultiplied RGBA buffer.
    pub fn from_raw(
        width: u32,
        height: u32,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidSize { width, height });
        }
        if stride < width as usize * 4 {
            return Err(RasterError::InvalidBuffer(format!(
                "stride {stride} is smaller than the row size"
            )));
        }
        let required = stride * (height as usize - 1) + width as usize * 4;
        if data.len() < required {
            return Err(RasterError::InvalidBuffer(format!(
                "buffer has {} bytes, at least {required} expected",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Creates a surface from straight (not premultiplied) RGBA bytes without padding.
    pub fn from_straight_rgba(width: u32, height: u32, bytes: &[u8]) -> Result<Self, RasterError> {
        let mut surface = Self::new(width, height)?;
        if bytes.len() != width as usize * height as usize * 4 {
            return Err(RasterError::InvalidBuffer(format!(
                "buffer has {} bytes, {} expected",
                bytes.len(),
                width as usize * height as usize * 4
            )));
        }

        for (i, pixel) in bytes.chunks_exact(4).enumerate() {
            let color = Color::rgba(pixel[0], pixel[1], pixel[2], pixel[3]);
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            surface.set_pixel(x, y, color.to_premultiplied().map(to_byte));
        }

        Ok(surface)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes between starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw premultiplied pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the surface returning the raw pixel data.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride + x as usize * 4
    }

    /// Premultiplied RGBA value of the pixel. Pixels outside of the surface are transparent.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }

        let offset = self.offset(x, y);
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    /// Sets a premultiplied pixel value. Writes outside of the surface are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }

        let offset = self.offset(x, y);
        self.data[offset..offset + 4].copy_from_slice(&value);
    }

    /// Straight-alpha color of the pixel.
    pub fn color_at(&self, x: u32, y: u32) -> Color {
        let [r, g, b, a] = self.pixel(x, y);
        if a == 0 {
            return Color::TRANSPARENT;
        }

        let demultiply = |c: u8| ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
        Color::rgba(demultiply(r), demultiply(g), demultiply(b), a)
    }

    /// Sets every pixel to the color.
    pub fn fill(&mut self, color: Color) {
        let value = color.to_premultiplied().map(to_byte);
        for y in 0..self.height {
            for x in 0..self.width {
                self.set_pixel(x, y, value);
            }
        }
    }

    /// Makes every pixel transparent.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Returns straight (not premultiplied) RGBA bytes without row padding.
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                result.extend_from_slice(&self.color_at(x, y).to_u8_array());
            }
        }
        result
    }

    /// Blends a premultiplied color into the pixel with the given coverage.
    pub(crate) fn blend_pixel(&mut self, x: u32, y: u32, src: [f32; 4], cover: f32, op: CompOp) {
        if x >= self.width || y >= self.height || cover <= 0.0 {
            return;
        }

        let dst = to_float(self.pixel(x, y));
        let blended = op.blend(src, dst);
        let result = if cover >= 1.0 {
            blended
        } else {
            [0, 1, 2, 3].map(|i| dst[i] + (blended[i] - dst[i]) * cover)
        };

        self.set_pixel(x, y, result.map(to_byte));
    }

    /// Composites another surface of the same size onto this one.
    pub fn composite(&mut self, src: &Surface, op: CompOp, opacity: f64) {
        let opacity = opacity.clamp(0.0, 1.0) as f32;
        let width = self.width.min(src.width);
        let height = self.height.min(src.height);
        for y in 0..height {
            for x in 0..width {
                let pixel = src.pixel(x, y);
                if pixel[3] == 0 && op.is_src_bounded() {
                    continue;
                }
                let value = to_float(pixel).map(|c| c * opacity);
                self.blend_pixel(x, y, value, 1.0, op);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn invalid_sizes() {
        assert_matches!(
            Surface::new(0, 10),
            Err(RasterError::InvalidSize { width: 0, height: 10 })
        );
        assert_matches!(
            Surface::from_raw(2, 2, 4, vec![0; 16]),
            Err(RasterError::InvalidBuffer(_))
        );
        assert_matches!(
            Surface::from_raw(2, 2, 12, vec![0; 19]),
            Err(RasterError::InvalidBuffer(_))
        );
        assert!(Surface::from_raw(2, 2, 12, vec![0; 20]).is_ok());
    }

    #[test]
    fn straight_alpha_round_trip() {
        let surface =
            Surface::from_straight_rgba(1, 1, &[255, 0, 0, 128]).unwrap();
        assert_eq!(surface.pixel(0, 0), [128, 0, 0, 128]);
        assert_eq!(surface.color_at(0, 0), Color::rgba(255, 0, 0, 128));
        assert_eq!(surface.to_straight_rgba(), vec![255, 0, 0, 128]);
    }

    #[test]
    fn composite_with_opacity() {
        let mut target = Surface::new(1, 1).unwrap();
        target.fill(Color::WHITE);
        let mut layer = Surface::new(1, 1).unwrap();
        layer.fill(Color::BLACK);

        target.composite(&layer, CompOp::SrcOver, 0.5);
        assert_eq!(target.pixel(0, 0), [128, 128, 128, 255]);
    }
}
