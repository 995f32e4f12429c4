//! Resampling-only engine for accelerator-free environments.

use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbImage;
use tracing::debug;

use crate::engine::{resample_to_scale, InferenceEngine};
use crate::error::EngineError;

/// Engine that resamples instead of running a network.
///
/// Selected explicitly at configuration time; the server never falls back
/// to it silently. Exercises the full request path (validation, caching,
/// dispatch) with deterministic output, which makes it the engine of choice
/// for tests. An invocation counter exposes how many times `enhance`
/// actually ran, so tests can assert that a cache hit skipped the engine.
pub struct NullEngine {
    model_id: String,
    native_scale: u32,
    invocations: AtomicU64,
}

impl NullEngine {
    pub fn new(model_id: impl Into<String>, native_scale: u32) -> Self {
        Self {
            model_id: model_id.into(),
            native_scale,
            invocations: AtomicU64::new(0),
        }
    }

    /// Number of completed `enhance` calls.
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }
}

impl InferenceEngine for NullEngine {
    fn enhance(&self, image: &RgbImage, outscale: f32) -> Result<RgbImage, EngineError> {
        let (w, h) = image.dimensions();
        debug!(model = %self.model_id, width = w, height = h, outscale, "Resampling (null engine)");

        let result = resample_to_scale(image, w, h, outscale);
        self.invocations.fetch_add(1, Ordering::Relaxed);
        Ok(result)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn native_scale(&self) -> u32 {
        self.native_scale
    }
}

// =============================================================================
// Tests
// =============================================================================
