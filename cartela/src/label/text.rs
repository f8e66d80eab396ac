use cartela_types::Point2d;

use crate::geometry::Subpath;

/// Laid out glyph of a text run.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Character the glyph represents.
    pub character: char,
    /// Distance from the start of the run to the glyph origin along the baseline.
    pub offset: f64,
    /// Horizontal advance, including character spacing.
    pub advance: f64,
    /// Outline relative to the glyph origin on the baseline, y axis pointing down.
    pub outline: Vec<Subpath>,
}

/// Text laid out in a single line.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    /// Glyphs in reading order.
    pub glyphs: Vec<Glyph>,
    /// Height of the run above the baseline.
    pub ascent: f64,
    /// Depth of the run below the baseline.
    pub descent: f64,
}

impl GlyphRun {
    /// Length of the run along the baseline.
    pub fn width(&self) -> f64 {
        self.glyphs.iter().map(|g| g.advance).sum()
    }

    /// Height of the run.
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }

    /// Returns true if the run has nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.glyphs.iter().all(|g| g.outline.is_empty())
    }
}

/// Produces glyph runs for label text.
///
/// The renderer only needs glyph advances and outlines; fonts, shaping and glyph caching are
/// the engine's business.
pub trait TextEngine: Send + Sync {
    /// Lays out the text with the given font size and extra spacing between characters.
    fn layout(&self, text: &str, size: f64, character_spacing: f64) -> GlyphRun;
}

/// Text engine drawing every character as a box. Needs no fonts, and its layout depends only
/// on the character count, which makes it useful for tests and previews.
#[derive(Debug, Default, Copy, Clone)]
pub struct BlockTextEngine;

impl BlockTextEngine {
    const ADVANCE: f64 = 0.6;
    const ASCENT: f64 = 0.8;
    const DESCENT: f64 = 0.2;
    const CAP_HEIGHT: f64 = 0.7;
}

impl TextEngine for BlockTextEngine {
    fn layout(&self, text: &str, size: f64, character_spacing: f64) -> GlyphRun {
        let advance = (size * Self::ADVANCE + character_spacing).max(0.0);
        let glyph_width = size * (Self::ADVANCE - 0.1);
        let glyphs = text
            .chars()
            .enumerate()
            .map(|(i, character)| {
                let outline = if character.is_whitespace() {
                    vec![]
                } else {
                    let (x0, x1) = (size * 0.05, size * 0.05 + glyph_width);
                    let top = -size * Self::CAP_HEIGHT;
                    vec![Subpath::closed(vec![
                        Point2d::new(x0, top),
                        Point2d::new(x1, top),
                        Point2d::new(x1, 0.0),
                        Point2d::new(x0, 0.0),
                    ])]
                };

                Glyph {
                    character,
                    offset: i as f64 * advance,
                    advance,
                    outline,
                }
            })
            .collect();

        GlyphRun {
            glyphs,
            ascent: size * Self::ASCENT,
            descent: size * Self::DESCENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn block_layout() {
        let run = BlockTextEngine.layout("ab c", 10.0, 1.0);
        assert_eq!(run.glyphs.len(), 4);
        assert_abs_diff_eq!(run.width(), 28.0, epsilon = 1e-9);
        assert_abs_diff_eq!(run.glyphs[3].offset, 21.0, epsilon = 1e-9);
        assert!(run.glyphs[2].outline.is_empty());
        assert_abs_diff_eq!(run.height(), 10.0, epsilon = 1e-9);
        assert!(!run.is_empty());
        assert!(BlockTextEngine.layout(" ", 10.0, 0.0).is_empty());
    }
}
