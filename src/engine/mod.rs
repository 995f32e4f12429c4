//! Tiled super-resolution inference engines.
//!
//! An engine wraps one loaded network and turns an RGB image into its
//! upscaled counterpart. Two implementations exist:
//!
//! - [`OrtEngine`]: runs a pretrained ONNX graph through ONNX Runtime with
//!   the CUDA execution provider, tiling large inputs to bound device
//!   memory.
//! - [`NullEngine`]: plain resampling with no network, for development and
//!   tests on machines without an accelerator.
//!
//! Engines are synchronous; callers dispatch them to a blocking thread.

pub mod device;
mod null;
mod onnx;
mod tiling;

pub use device::DeviceInfo;
pub use null::NullEngine;
pub use onnx::OrtEngine;

use image::RgbImage;

use crate::error::EngineError;

/// Default edge length of one inference tile, in pixels.
pub const DEFAULT_TILE_SIZE: usize = 512;

/// Default halo of extra context pixels around each tile.
pub const DEFAULT_TILE_OVERLAP: usize = 10;

// =============================================================================
// Engine Trait
// =============================================================================

/// A loaded super-resolution network.
///
/// Implementations are internally synchronized: `enhance` may be called
/// from multiple threads, and forward passes on the underlying device are
/// serialized by the engine itself.
pub trait InferenceEngine: Send + Sync {
    /// Upscale `image` to `outscale` times its input dimensions.
    ///
    /// The network always runs at its native scale; when `outscale`
    /// differs, the result is resampled to the requested size afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Inference`] if the forward pass fails, or
    /// [`EngineError::OutputShape`] if the network produces a tensor whose
    /// dimensions do not match `input * native_scale`. Failed passes are
    /// never retried.
    fn enhance(&self, image: &RgbImage, outscale: f32) -> Result<RgbImage, EngineError>;

    /// Identifier of the model this engine runs.
    fn model_id(&self) -> &str;

    /// Upscale factor the network was trained for.
    fn native_scale(&self) -> u32;
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Tuning knobs shared by engine constructors.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Edge length of one tile; inputs with `h * w <= tile_size²` run in a
    /// single pass
    pub tile_size: usize,

    /// Context pixels around each tile, blended away when stitching
    pub tile_overlap: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            tile_overlap: DEFAULT_TILE_OVERLAP,
        }
    }
}

// =============================================================================
// Engine Kind
// =============================================================================

/// Which engine implementation the server constructs on model load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// ONNX Runtime with the CUDA execution provider
    Onnx,

    /// Resampling-only [`NullEngine`]
    Null,
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "real" => Ok(EngineKind::Onnx),
            "null" => Ok(EngineKind::Null),
            other => Err(format!(
                "invalid engine '{}', expected 'real' or 'null'",
                other
            )),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Onnx => f.write_str("real"),
            EngineKind::Null => f.write_str("null"),
        }
    }
}

/// Resample an image to `outscale` times the given base dimensions.
///
/// Used by both engines for the final output-scale adjustment; Lanczos3
/// keeps edges crisp on downscale from the network's native factor.
pub(crate) fn resample_to_scale(
    image: &RgbImage,
    base_w: u32,
    base_h: u32,
    outscale: f32,
) -> RgbImage {
    let target_w = ((base_w as f32 * outscale).round() as u32).max(1);
    let target_h = ((base_h as f32 * outscale).round() as u32).max(1);
    if (target_w, target_h) == image.dimensions() {
        return image.clone();
    }
    image::imageops::resize(
        image,
        target_w,
        target_h,
        image::imageops::FilterType::Lanczos3,
    )
}
