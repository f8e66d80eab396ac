//! Encoding of rendered surfaces into image files.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::io::Cursor;
use std::str::FromStr;

use ahash::AHashMap;
use thiserror::Error;

use crate::raster::Surface;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Error encoding an image.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Format name is not recognized.
    #[error("unknown image format: {0}")]
    UnknownFormat(String),
    /// PNG writer failure.
    #[error("png encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    /// JPEG or TIFF encoder failure.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Output image format.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    /// 32 bit PNG with alpha channel.
    Png,
    /// 24 bit PNG, alpha is dropped.
    Png24,
    /// Indexed PNG with up to 256 colors and a transparency chunk.
    Png8,
    /// JPEG with the given quality (0-100).
    Jpeg(u8),
    /// Uncompressed RGBA TIFF.
    Tiff,
}

impl ImageFormat {
    /// Parses a format name: `png`, `png32`, `png24`, `png8`, `jpeg`, `jpegNN` or `tiff`.
    pub fn parse(name: &str) -> Result<Self, EncodeError> {
        let lower = name.trim().to_ascii_lowercase();
        let format = match lower.as_str() {
            "png" | "png32" => Self::Png,
            "png24" => Self::Png24,
            "png8" => Self::Png8,
            "tif" | "tiff" => Self::Tiff,
            "jpeg" | "jpg" => Self::Jpeg(DEFAULT_JPEG_QUALITY),
            other => {
                let quality = other
                    .strip_prefix("jpeg")
                    .or_else(|| other.strip_prefix("jpg"))
                    .and_then(|q| q.parse::<u8>().ok())
                    .filter(|q| *q <= 100)
                    .ok_or_else(|| EncodeError::UnknownFormat(name.to_string()))?;
                Self::Jpeg(quality)
            }
        };

        Ok(format)
    }

    /// Common file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png | Self::Png24 | Self::Png8 => "png",
            Self::Jpeg(_) => "jpg",
            Self::Tiff => "tiff",
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Png24 => write!(f, "png24"),
            Self::Png8 => write!(f, "png8"),
            Self::Jpeg(q) => write!(f, "jpeg{q}"),
            Self::Tiff => write!(f, "tiff"),
        }
    }
}

impl FromStr for ImageFormat {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encodes the surface. Pixels are demultiplied before encoding.
pub fn encode(surface: &Surface, format: ImageFormat) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (surface.width(), surface.height());
    let rgba = surface.to_straight_rgba();

    match format {
        ImageFormat::Png => write_png(width, height, png::ColorType::Rgba, &rgba, None),
        ImageFormat::Png24 => {
            write_png(width, height, png::ColorType::Rgb, &drop_alpha(&rgba), None)
        }
        ImageFormat::Png8 => {
            let indexed = quantize(&rgba);
            write_png(
                width,
                height,
                png::ColorType::Indexed,
                &indexed.indices,
                Some(&indexed),
            )
        }
        ImageFormat::Jpeg(quality) => {
            let mut bytes = vec![];
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality.max(1));
            encoder.encode(&drop_alpha(&rgba), width, height, image::ColorType::Rgb8)?;
            Ok(bytes)
        }
        ImageFormat::Tiff => {
            let mut cursor = Cursor::new(vec![]);
            image::codecs::tiff::TiffEncoder::new(&mut cursor).encode(
                &rgba,
                width,
                height,
                image::ColorType::Rgba8,
            )?;
            Ok(cursor.into_inner())
        }
    }
}

fn drop_alpha(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|p| [p[0], p[1], p[2]])
        .collect()
}

fn write_png(
    width: u32,
    height: u32,
    color: png::ColorType,
    data: &[u8],
    palette: Option<&IndexedImage>,
) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = vec![];
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        if let Some(indexed) = palette {
            encoder.set_palette(indexed.palette.clone());
            if indexed.alpha.iter().any(|a| *a < 255) {
                encoder.set_trns(indexed.alpha.clone());
            }
        }

        let mut writer = encoder.write_header()?;
        writer.write_image_data(data)?;
        writer.finish()?;
    }

    Ok(bytes)
}

/// Palette image produced by [`quantize`].
#[derive(Debug, Clone, PartialEq)]
struct IndexedImage {
    /// RGB triples.
    palette: Vec<u8>,
    /// Alpha of every palette entry.
    alpha: Vec<u8>,
    indices: Vec<u8>,
}

/// Reduces the image to at most 256 colors.
///
/// Channel precision is lowered step by step until the number of distinct buckets fits into
/// the palette; every palette entry is the mean of the pixels of its bucket. Buckets are
/// ordered by their key, so equal images always produce equal palettes.
fn quantize(rgba: &[u8]) -> IndexedImage {
    let mut shift = 0;
    let buckets = loop {
        let mut buckets: BTreeMap<u64, [u64; 5]> = BTreeMap::new();
        for p in rgba.chunks_exact(4) {
            let entry = buckets.entry(bucket_key(p, shift)).or_default();
            for (sum, value) in entry.iter_mut().zip(p) {
                *sum += *value as u64;
            }
            entry[4] += 1;
        }

        if buckets.len() <= 256 || shift >= 7 {
            break buckets;
        }

        shift += 1;
    };

    let mut palette = Vec::with_capacity(buckets.len() * 3);
    let mut alpha = Vec::with_capacity(buckets.len());
    let mut index_of = AHashMap::with_capacity(buckets.len());
    for (index, (key, sums)) in buckets.iter().enumerate() {
        let count = sums[4].max(1);
        let mean = |i: usize| ((sums[i] + count / 2) / count) as u8;
        palette.extend_from_slice(&[mean(0), mean(1), mean(2)]);
        alpha.push(mean(3));
        index_of.insert(*key, index as u8);
    }

    let indices = rgba
        .chunks_exact(4)
        .map(|p| index_of.get(&bucket_key(p, shift)).copied().unwrap_or(0))
        .collect();

    IndexedImage {
        palette,
        alpha,
        indices,
    }
}

fn bucket_key(p: &[u8], shift: u32) -> u64 {
    // Fully transparent pixels share one bucket regardless of color.
    if p[3] == 0 {
        return 0;
    }

    let channel = |v: u8| (v >> shift) as u64;
    (channel(p[3]) << 24 | channel(p[0]) << 16 | channel(p[1]) << 8 | channel(p[2])) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use assert_matches::assert_matches;
    use image::GenericImageView;

    fn gradient() -> Surface {
        let mut surface = Surface::new(32, 32).unwrap();
        for y in 0..32 {
            for x in 0..32 {
                surface.set_pixel(x, y, [(x * 8) as u8, (y * 8) as u8, 100, 255]);
            }
        }
        surface
    }

    #[test]
    fn parse_formats() {
        assert_eq!(ImageFormat::parse("png").unwrap(), ImageFormat::Png);
        assert_eq!(ImageFormat::parse("PNG32").unwrap(), ImageFormat::Png);
        assert_eq!(ImageFormat::parse("png8").unwrap(), ImageFormat::Png8);
        assert_eq!(ImageFormat::parse("jpeg").unwrap(), ImageFormat::Jpeg(85));
        assert_eq!(ImageFormat::parse("jpeg70").unwrap(), ImageFormat::Jpeg(70));
        assert_eq!(ImageFormat::parse("tiff").unwrap(), ImageFormat::Tiff);
        assert_matches!(
            ImageFormat::parse("jpeg101"),
            Err(EncodeError::UnknownFormat(_))
        );
        assert_matches!(ImageFormat::parse("gif"), Err(EncodeError::UnknownFormat(_)));
        assert_eq!(ImageFormat::Jpeg(70).to_string(), "jpeg70");
    }

    #[test]
    fn png_is_demultiplied() {
        let mut surface = Surface::new(2, 2).unwrap();
        surface.fill(Color::rgba(255, 0, 0, 128));

        let bytes = encode(&surface, ImageFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        let pixel = decoded.get_pixel(1, 1).0;
        assert_eq!(pixel[3], 128);
        assert!(pixel[0] >= 254);
    }

    #[test]
    fn png24_and_jpeg_have_no_alpha() {
        let surface = gradient();
        for format in [ImageFormat::Png24, ImageFormat::Jpeg(90)] {
            let bytes = encode(&surface, format).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (32, 32));
            assert!(!decoded.color().has_alpha());
        }
    }

    #[test]
    fn png8_palette() {
        let surface = gradient();
        let indexed = quantize(&surface.to_straight_rgba());
        assert!(indexed.alpha.len() <= 256);
        assert_eq!(indexed.palette.len(), indexed.alpha.len() * 3);

        let first = encode(&surface, ImageFormat::Png8).unwrap();
        let second = encode(&surface, ImageFormat::Png8).unwrap();
        assert_eq!(first, second);

        let decoded = image::load_from_memory(&first).unwrap().to_rgba8();
        let pixel = decoded.get_pixel(31, 0).0;
        assert!((pixel[0] as i32 - 248).abs() <= 8);
        assert!(pixel[1] <= 8);
    }

    #[test]
    fn png8_keeps_transparency() {
        let mut surface = Surface::new(4, 1).unwrap();
        surface.set_pixel(0, 0, [0, 0, 255, 255]);

        let indexed = quantize(&surface.to_straight_rgba());
        assert_eq!(indexed.alpha, vec![0, 255]);
        assert_eq!(indexed.indices, vec![1, 0, 0, 0]);

        let bytes = encode(&surface, ImageFormat::Png8).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(decoded.get_pixel(2, 0).0[3], 0);
    }

    #[test]
    fn tiff_round_trip() {
        let surface = gradient();
        let bytes = encode(&surface, ImageFormat::Tiff).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(3, 5).0, [24, 40, 100, 255]);
    }
}
