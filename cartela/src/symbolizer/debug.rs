#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a debug symbolizer shows.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DebugMode {
    /// Outlines of every box registered with the collision detector so far.
    #[default]
    Collision,
    /// A small cross at every vertex of the feature geometries.
    Vertex,
}

/// Draws debugging overlays.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DebugSymbolizer {
    /// Overlay kind.
    pub mode: DebugMode,
}
