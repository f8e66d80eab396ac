use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::expression::NullSemantics;
use crate::map::DEFAULT_PIXEL_SIZE_MM;
use crate::raster::{Gamma, DEFAULT_SAMPLES};

/// Flag that stops a running render pass.
///
/// Clones share the flag, so a token can be handed to the renderer and cancelled from another
/// thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Parameters of a render pass.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderOptions {
    /// Multiplier of all metric sizes: line widths, marker and text sizes, dash lengths.
    pub scale_factor: f64,
    /// Shift of the map image to the left, in pixels.
    pub offset_x: f64,
    /// Shift of the map image up, in pixels.
    pub offset_y: f64,
    /// Number of sub-pixel samples along each axis of a pixel.
    pub subpixel_samples: u32,
    /// Gamma of symbolizers that don't set their own.
    pub gamma: Gamma,
    /// Minimum buffer around the view for all layers, in pixels.
    pub buffer_size: f64,
    /// Abort the pass on the first datasource error instead of skipping the layer.
    pub stop_on_error: bool,
    /// Null handling of filters.
    pub null_semantics: NullSemantics,
    /// Physical pixel size used for the scale denominator.
    pub pixel_size_mm: f64,
    /// Number of features between cancellation checks.
    pub cancel_interval: usize,
    /// Token to cancel the pass.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancellation: Option<CancellationToken>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            subpixel_samples: DEFAULT_SAMPLES,
            gamma: Gamma::default(),
            buffer_size: 0.0,
            stop_on_error: false,
            null_semantics: NullSemantics::default(),
            pixel_size_mm: DEFAULT_PIXEL_SIZE_MM,
            cancel_interval: 1024,
            cancellation: None,
        }
    }
}

impl RenderOptions {
    /// Sets the scale factor.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Sets the image offset.
    pub fn with_offset(mut self, offset_x: f64, offset_y: f64) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    /// Sets the number of sub-pixel samples.
    pub fn with_subpixel_samples(mut self, samples: u32) -> Self {
        self.subpixel_samples = samples;
        self
    }

    /// Sets the default gamma.
    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.gamma = gamma;
        self
    }

    /// Sets the minimum buffer size.
    pub fn with_buffer_size(mut self, buffer_size: f64) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Sets whether datasource errors abort the pass.
    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Sets null semantics of filters.
    pub fn with_null_semantics(mut self, null_semantics: NullSemantics) -> Self {
        self.null_semantics = null_semantics;
        self
    }

    /// Sets the physical pixel size.
    pub fn with_pixel_size_mm(mut self, pixel_size_mm: f64) -> Self {
        self.pixel_size_mm = pixel_size_mm;
        self
    }

    /// Sets how often cancellation is checked.
    pub fn with_cancel_interval(mut self, cancel_interval: usize) -> Self {
        self.cancel_interval = cancel_interval;
        self
    }

    /// Sets the cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub(super) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
