//! Disk-backed store for encoded upscale results.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::error::CacheError;
use crate::hash::Fingerprint;

// =============================================================================
// Cache Key
// =============================================================================

/// Composite key identifying one cached result.
///
/// A cached image is only valid for the exact `(fingerprint, model, scale)`
/// triple that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    /// Fingerprint of the raw upload bytes
    pub fingerprint: Fingerprint,

    /// Identifier of the model that produced (or will produce) the result
    pub model_id: String,

    /// Output scale the result was rendered at
    pub outscale: f32,
}

impl CacheKey {
    /// Create a new cache key.
    pub fn new(fingerprint: Fingerprint, model_id: impl Into<String>, outscale: f32) -> Self {
        Self {
            fingerprint,
            model_id: model_id.into(),
            outscale,
        }
    }

    /// File name (without directory) this key maps to.
    pub fn file_name(&self) -> String {
        format!("{}.png", self)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Trim a trailing ".0" so integer scales render as "x2" not "x2.0".
        let scale = if self.outscale.fract() == 0.0 {
            format!("{}", self.outscale as u32)
        } else {
            format!("{}", self.outscale)
        };
        write!(f, "{}-{}-x{}", self.fingerprint, self.model_id, scale)
    }
}

// =============================================================================
// Cache Stats
// =============================================================================

/// Aggregate statistics over the cache directory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Number of cached artifacts
    pub count: usize,

    /// Total size of cached artifacts in bytes
    pub total_bytes: u64,
}

impl CacheStats {
    /// Total size in MiB, rounded to two decimals.
    pub fn size_mb(&self) -> f64 {
        let mb = self.total_bytes as f64 / (1024.0 * 1024.0);
        (mb * 100.0).round() / 100.0
    }
}

// =============================================================================
// Result Cache
// =============================================================================

/// Durable, content-addressed cache of encoded PNG results.
///
/// Each entry is a single file named deterministically from its [`CacheKey`].
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so a concurrent reader never observes a partially written entry.
///
/// # Example
///
/// ```ignore
/// use sr_server::cache::{CacheKey, ResultCache};
/// use sr_server::hash::fingerprint;
///
/// let cache = ResultCache::new("./cache")?;
/// let key = CacheKey::new(fingerprint(b"raw upload"), "fast", 2.0);
///
/// if cache.lookup(&key)?.is_none() {
///     cache.store(&key, &png_bytes)?;
/// }
/// ```
pub struct ResultCache {
    /// Root directory holding one file per entry
    root: PathBuf,
}

impl ResultCache {
    /// Open (and create if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| CacheError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an entry for `key` would be stored at.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Check whether an entry exists, returning its path if so.
    ///
    /// O(1) existence check; no side effects.
    pub fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.entry_path(key);
        path.is_file().then_some(path)
    }

    /// Read a cached entry, returning `None` on a miss.
    pub fn load(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let Some(path) = self.lookup(key) else {
            return Ok(None);
        };
        let data = fs::read(&path).map_err(|source| CacheError::Io { path, source })?;
        Ok(Some(Bytes::from(data)))
    }

    /// Store an encoded result under `key`.
    ///
    /// Idempotent: re-storing the same key leaves exactly one artifact. The
    /// write is atomic with respect to readers (temp file + rename).
    pub fn store(&self, key: &CacheKey, data: &[u8]) -> Result<PathBuf, CacheError> {
        let path = self.entry_path(key);
        let tmp = self.root.join(format!("{}.tmp", key));

        fs::write(&tmp, data).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(key = %key, bytes = data.len(), "Stored cache entry");
        Ok(path)
    }

    /// Delete all cached artifacts, returning the number removed.
    ///
    /// Destructive and irreversible. The first deletion failure aborts the
    /// call; artifacts already removed stay removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let entries = fs::read_dir(&self.root).map_err(|source| CacheError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|source| CacheError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|source| CacheError::Io { path, source })?;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Count entries and total bytes on disk.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = fs::read_dir(&self.root).map_err(|source| CacheError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut count = 0;
        let mut total_bytes = 0;
        for entry in entries {
            let entry = entry.map_err(|source| CacheError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                let meta = fs::metadata(&path).map_err(|source| CacheError::Io { path, source })?;
                count += 1;
                total_bytes += meta.len();
            }
        }

        Ok(CacheStats { count, total_bytes })
    }
}

// =============================================================================
// Tests
// =============================================================================
