//! Static catalog of super-resolution model configurations.
//!
//! The registry is built once at process start from a fixed catalog plus a
//! weights directory, and is never mutated afterwards. Weight files are
//! read-only external artifacts; the registry only checks their presence,
//! it never loads them.

use std::path::{Path, PathBuf};

use crate::error::ModelError;

// =============================================================================
// Architecture Kinds
// =============================================================================

/// Closed set of network architecture families the server knows how to run.
///
/// The architectures themselves are opaque ONNX graphs; the kind only
/// affects catalog metadata and construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchKind {
    /// RRDBNet-style network (Real-ESRGAN). `num_blocks` applies.
    RrdbNet,

    /// Compact convolutional network (SRVGG-style), optimized for speed.
    CompactConv,

    /// Any other pretrained graph loaded as-is.
    GenericGraph,
}

impl ArchKind {
    /// Short identifier used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ArchKind::RrdbNet => "rrdbnet",
            ArchKind::CompactConv => "compact",
            ArchKind::GenericGraph => "generic",
        }
    }
}

// =============================================================================
// Model Configuration
// =============================================================================

/// Immutable descriptor of one registered model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Unique catalog key (e.g. "fast")
    pub id: String,

    /// Human-readable display name
    pub name: String,

    /// Short description for the model list endpoint
    pub description: String,

    /// Weight file name, resolved against the registry's weights directory
    pub weight_file: String,

    /// Architecture family
    pub arch: ArchKind,

    /// Upscale factor the network was trained for
    pub native_scale: u32,

    /// Block count hyperparameter; only meaningful for [`ArchKind::RrdbNet`]
    pub num_blocks: Option<u32>,
}

// =============================================================================
// Model Registry
// =============================================================================

/// Catalog of known models with availability checks.
///
/// Lookup order is stable insertion order, used by the `/models` endpoint.
pub struct ModelRegistry {
    models: Vec<ModelConfig>,
    weights_dir: PathBuf,
}

impl ModelRegistry {
    /// Create a registry over a custom catalog.
    pub fn new(models: Vec<ModelConfig>, weights_dir: impl Into<PathBuf>) -> Self {
        Self {
            models,
            weights_dir: weights_dir.into(),
        }
    }

    /// Create a registry with the default catalog.
    ///
    /// Two entries, matching the shipped weight files: a high-quality
    /// RRDBNet and a fast compact network, both trained at x4.
    pub fn with_default_catalog(weights_dir: impl Into<PathBuf>) -> Self {
        let models = vec![
            ModelConfig {
                id: "slow".to_string(),
                name: "High Quality (Slow)".to_string(),
                description: "Higher quality, slower processing".to_string(),
                weight_file: "RealESRGAN_x4plus_anime_6B.onnx".to_string(),
                arch: ArchKind::RrdbNet,
                native_scale: 4,
                num_blocks: Some(6),
            },
            ModelConfig {
                id: "fast".to_string(),
                name: "Fast (Compact)".to_string(),
                description: "Faster processing, optimized for video/animation".to_string(),
                weight_file: "realesr-animevideov3.onnx".to_string(),
                arch: ArchKind::CompactConv,
                native_scale: 4,
                num_blocks: None,
            },
        ];
        Self::new(models, weights_dir)
    }

    /// Look up a model by id.
    pub fn describe(&self, id: &str) -> Result<&ModelConfig, ModelError> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ModelError::UnknownModel(id.to_string()))
    }

    /// Check whether the weight file for `id` is present on disk.
    ///
    /// Returns `false` for unknown ids as well; use [`Self::describe`] to
    /// distinguish.
    pub fn is_available(&self, id: &str) -> bool {
        self.describe(id)
            .map(|m| self.weight_path(m).is_file())
            .unwrap_or(false)
    }

    /// All registered models, in insertion order.
    pub fn list(&self) -> &[ModelConfig] {
        &self.models
    }

    /// Absolute path of a model's weight file.
    pub fn weight_path(&self, config: &ModelConfig) -> PathBuf {
        self.weights_dir.join(&config.weight_file)
    }

    /// The configured weights directory.
    pub fn weights_dir(&self) -> &Path {
        &self.weights_dir
    }

    /// Resolve a model id to its config and weight path, failing with
    /// `UnknownModel` or `WeightsMissing`.
    pub fn resolve(&self, id: &str) -> Result<(&ModelConfig, PathBuf), ModelError> {
        let config = self.describe(id)?;
        let path = self.weight_path(config);
        if !path.is_file() {
            return Err(ModelError::WeightsMissing {
                id: id.to_string(),
                path,
            });
        }
        Ok((config, path))
    }
}

// =============================================================================
// Tests
// =============================================================================
