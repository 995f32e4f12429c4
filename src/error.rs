use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the inference engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No compute accelerator is present. Checked once at load time,
    /// never per inference call.
    #[error("No compute accelerator available: {reason}")]
    DeviceUnavailable { reason: String },

    /// The ONNX session could not be constructed from the weight file.
    #[error("Failed to build model session: {0}")]
    SessionBuild(String),

    /// A forward pass failed. Wraps any lower-level numeric or device
    /// failure; never retried.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The network produced an output whose shape does not match
    /// `input * native_scale`.
    #[error("Unexpected output shape: expected {expected_h}x{expected_w}, got {got_h}x{got_w}")]
    OutputShape {
        expected_h: usize,
        expected_w: usize,
        got_h: usize,
        got_w: usize,
    },
}

/// Errors related to the model registry and lifecycle manager.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The requested model id is not in the static catalog.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The model is registered but its weight file is absent on disk.
    #[error("Model weights not found for '{id}': {path}")]
    WeightsMissing { id: String, path: PathBuf },

    /// A load is already in progress; the caller should retry later.
    #[error("A model load is already in progress")]
    Busy,

    /// The engine failed to load or run.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors from the durable result cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying filesystem failure (read, write, rename or delete).
    #[error("Cache storage error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by the upscale service for a single request.
#[derive(Debug, Error)]
pub enum UpscaleError {
    /// Bad upload: wrong extension, empty body or oversized file.
    /// Rejected before any side effect.
    #[error("Invalid upload: {reason}")]
    Validation { reason: String },

    /// No model is currently resident.
    #[error("No model loaded")]
    NoModelLoaded,

    /// The upload could not be decoded as an image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The result could not be encoded as PNG.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
