//! Label layout and placement.
//!
//! Text is laid out into [`GlyphRun`]s by a [`TextEngine`], candidate positions are computed by
//! the functions of this module, and a [`CollisionDetector`] shared by the whole render pass
//! decides which candidates are free.

mod collision;
mod placement;
mod text;

pub use collision::CollisionDetector;
pub use placement::{
    horizontal_label, line_labels, tolerance_offsets, Direction, LabelCandidate, PlacedGlyph,
    PlacementList,
};
pub use text::{BlockTextEngine, Glyph, GlyphRun, TextEngine};
