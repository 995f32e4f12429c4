//! Upscale orchestration: validation, cache dispatch, inference, encoding.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use image::RgbImage;
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheStats, ResultCache};
use crate::error::{CacheError, UpscaleError};
use crate::hash::fingerprint;
use crate::model::ModelManager;

/// Maximum accepted upload size.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Accepted upload file extensions (case-insensitive).
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Result of one upscale request.
#[derive(Debug)]
pub struct UpscaleOutcome {
    /// Encoded PNG bytes
    pub data: Bytes,

    /// Whether the result came from the cache
    pub cache_hit: bool,
}

/// Validate an upload before any side effect.
///
/// Rejects empty bodies, oversized files and disallowed extensions.
pub fn validate_upload(filename: &str, size: usize) -> Result<(), UpscaleError> {
    if size == 0 {
        return Err(UpscaleError::Validation {
            reason: "empty file".to_string(),
        });
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UpscaleError::Validation {
            reason: format!(
                "file too large: {} bytes (max {})",
                size, MAX_UPLOAD_BYTES
            ),
        });
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(UpscaleError::Validation {
            reason: format!(
                "unsupported file type '{}', expected one of: {}",
                filename,
                ALLOWED_EXTENSIONS.join(", ")
            ),
        }),
    }
}

// =============================================================================
// Upscale Service
// =============================================================================

/// Orchestrates the upscale path: fingerprint, cache probe, inference,
/// PNG encoding, cache store.
///
/// # Example
///
/// ```ignore
/// use sr_server::service::UpscaleService;
///
/// let service = UpscaleService::new(cache, manager, 2.0);
/// let outcome = service.upscale("photo.png", upload_bytes).await?;
/// assert!(!outcome.cache_hit);
/// ```
pub struct UpscaleService {
    cache: ResultCache,
    manager: Arc<ModelManager>,
    outscale: f32,
}

impl UpscaleService {
    pub fn new(cache: ResultCache, manager: Arc<ModelManager>, outscale: f32) -> Self {
        Self {
            cache,
            manager,
            outscale,
        }
    }

    /// The model lifecycle manager.
    pub fn manager(&self) -> &Arc<ModelManager> {
        &self.manager
    }

    /// The configured output scale.
    pub fn outscale(&self) -> f32 {
        self.outscale
    }

    /// Upscale an uploaded image, serving from the cache when possible.
    ///
    /// The cache key combines the content fingerprint of the raw bytes with
    /// the active model id and the output scale. On a miss, the image is
    /// decoded and enhanced on blocking threads, encoded as PNG and stored
    /// before returning.
    ///
    /// # Errors
    ///
    /// - [`UpscaleError::Validation`] for a bad upload (no side effects)
    /// - [`UpscaleError::NoModelLoaded`] when no engine is resident
    /// - [`UpscaleError::Decode`] / [`UpscaleError::Encode`] for codec
    ///   failures
    /// - [`UpscaleError::Engine`] / [`UpscaleError::Cache`] passed through
    pub async fn upscale(&self, filename: &str, data: Bytes) -> Result<UpscaleOutcome, UpscaleError> {
        validate_upload(filename, data.len())?;

        let model_id = self
            .manager
            .current()
            .await
            .ok_or(UpscaleError::NoModelLoaded)?;
        let key = CacheKey::new(fingerprint(&data), model_id, self.outscale);

        if let Some(cached) = self.cache.load(&key)? {
            debug!(key = %key, "Cache hit");
            return Ok(UpscaleOutcome {
                data: cached,
                cache_hit: true,
            });
        }
        debug!(key = %key, "Cache miss");

        let image = decode_rgb(data.clone()).await?;
        let (result, used_model) = self.manager.enhance(image, self.outscale).await?;

        // A model switch may have landed between the cache probe and the
        // forward pass; key the entry by the model that actually ran.
        let key = if used_model == key.model_id {
            key
        } else {
            CacheKey::new(key.fingerprint, used_model, self.outscale)
        };

        let encoded = encode_png(result).await?;
        self.cache.store(&key, &encoded)?;

        Ok(UpscaleOutcome {
            data: Bytes::from(encoded),
            cache_hit: false,
        })
    }

    /// Delete every cached result, returning the number removed.
    pub fn clear_cache(&self) -> Result<usize, CacheError> {
        let removed = self.cache.clear()?;
        info!(removed, "Cache cleared");
        Ok(removed)
    }

    /// Cache entry count and total size.
    pub fn cache_stats(&self) -> Result<CacheStats, CacheError> {
        self.cache.stats()
    }
}

async fn decode_rgb(data: Bytes) -> Result<RgbImage, UpscaleError> {
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&data)
            .map(|img| img.to_rgb8())
            .map_err(|e| UpscaleError::Decode(e.to_string()))
    })
    .await
    .map_err(|e| UpscaleError::Decode(e.to_string()))?
}

async fn encode_png(image: RgbImage) -> Result<Vec<u8>, UpscaleError> {
    tokio::task::spawn_blocking(move || {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, image::ImageFormat::Png)
            .map_err(|e| UpscaleError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    })
    .await
    .map_err(|e| UpscaleError::Encode(e.to_string()))?
}

// =============================================================================
// Tests
// =============================================================================
