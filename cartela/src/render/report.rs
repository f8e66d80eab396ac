#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a render pass drew everything it was asked to.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RenderStatus {
    /// All layers were processed.
    #[default]
    Complete,
    /// The pass was cancelled before all layers were drawn.
    Incomplete,
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    /// Something was skipped, the rest of the map is fine.
    Warning,
    /// The pass could not complete.
    Error,
}

/// Problem encountered during a render pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    /// Layer being rendered.
    pub layer: String,
    /// Description of the problem.
    pub message: String,
    /// Severity.
    pub severity: Severity,
}

/// Outcome of a render pass.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderReport {
    /// Completion status.
    pub status: RenderStatus,
    /// Problems in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of features at least one rule applied to.
    pub features_rendered: usize,
    /// Number of features that were skipped: no rule matched or their geometry could not be
    /// projected.
    pub features_skipped: usize,
}

impl RenderReport {
    /// Returns true if the pass completed.
    pub fn is_complete(&self) -> bool {
        self.status == RenderStatus::Complete
    }

    /// Diagnostics with warning severity.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub(super) fn push(&mut self, layer: &str, message: String, severity: Severity) {
        self.diagnostics.push(Diagnostic {
            layer: layer.to_string(),
            message,
            severity,
        });
    }
}
