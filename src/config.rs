//! Configuration management for the upscale server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `UPSCALE_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use sr_server::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//!
//! println!("Listening on {}", config.bind_address());
//! println!("Models dir: {}", config.models_dir.display());
//! ```
//!
//! # Environment Variables
//!
//! All configuration options can be set via environment variables with the `UPSCALE_` prefix:
//!
//! - `UPSCALE_HOST` - Server bind address (default: 0.0.0.0)
//! - `UPSCALE_PORT` - Server port (default: 8000)
//! - `UPSCALE_MODELS_DIR` - Directory containing ONNX weight files (default: ./models)
//! - `UPSCALE_CACHE_DIR` - Directory for cached results (default: ./cache)
//! - `UPSCALE_DEFAULT_MODEL` - Model loaded at startup (default: fast)
//! - `UPSCALE_OUTSCALE` - Output scale factor (default: 2.0)
//! - `UPSCALE_TILE_SIZE` - Inference tile edge length (default: 512)
//! - `UPSCALE_TILE_OVERLAP` - Tile context overlap in pixels (default: 10)
//! - `UPSCALE_ENGINE` - Engine implementation, "real" or "null" (default: real)
//! - `UPSCALE_CORS_ORIGINS` - Allowed CORS origins (comma-separated)

use std::path::PathBuf;

use clap::Parser;

use crate::engine::{EngineKind, EngineSettings, DEFAULT_TILE_OVERLAP, DEFAULT_TILE_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default weights directory.
pub const DEFAULT_MODELS_DIR: &str = "./models";

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// Default model loaded at startup.
pub const DEFAULT_MODEL: &str = "fast";

/// Default output scale factor.
pub const DEFAULT_OUTSCALE: f32 = 2.0;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Super-resolution upscale server.
///
/// Accepts uploaded raster images over HTTP, runs them through a pretrained
/// super-resolution network and returns the upscaled PNG. Results are
/// memoized on disk by content hash.
#[derive(Parser, Debug, Clone)]
#[command(name = "sr-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "UPSCALE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "UPSCALE_PORT")]
    pub port: u16,

    // =========================================================================
    // Model Configuration
    // =========================================================================
    /// Directory containing the ONNX weight files.
    #[arg(long, default_value = DEFAULT_MODELS_DIR, env = "UPSCALE_MODELS_DIR")]
    pub models_dir: PathBuf,

    /// Model to load at startup.
    #[arg(long, default_value = DEFAULT_MODEL, env = "UPSCALE_DEFAULT_MODEL")]
    pub default_model: String,

    /// Engine implementation: "real" (ONNX Runtime + CUDA) or "null"
    /// (resampling only, no accelerator required).
    ///
    /// WARNING: the null engine is a development aid; it produces plain
    /// resampled output, not super-resolution.
    #[arg(long, default_value_t = EngineKind::Onnx, env = "UPSCALE_ENGINE")]
    pub engine: EngineKind,

    // =========================================================================
    // Inference Configuration
    // =========================================================================
    /// Output scale factor applied to every upload.
    #[arg(long, default_value_t = DEFAULT_OUTSCALE, env = "UPSCALE_OUTSCALE")]
    pub outscale: f32,

    /// Inference tile edge length in pixels; larger inputs are tiled.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "UPSCALE_TILE_SIZE")]
    pub tile_size: usize,

    /// Context overlap around each tile in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_OVERLAP, env = "UPSCALE_TILE_OVERLAP")]
    pub tile_overlap: usize,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Directory for cached upscale results.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "UPSCALE_CACHE_DIR")]
    pub cache_dir: PathBuf,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "UPSCALE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.outscale <= 0.0 || !self.outscale.is_finite() {
            return Err(format!(
                "outscale must be a positive number, got {}",
                self.outscale
            ));
        }
        if self.outscale > 8.0 {
            return Err(format!("outscale must be at most 8, got {}", self.outscale));
        }

        // The tile walk needs forward progress after subtracting the halo.
        if self.tile_size < 64 || self.tile_size > 4096 {
            return Err("tile_size must be between 64 and 4096".to_string());
        }
        if self.tile_overlap * 2 >= self.tile_size {
            return Err(format!(
                "tile_overlap ({}) must be less than half the tile_size ({})",
                self.tile_overlap, self.tile_size
            ));
        }

        if self.default_model.is_empty() {
            return Err("default_model must not be empty".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Engine tuning knobs derived from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            tile_size: self.tile_size,
            tile_overlap: self.tile_overlap,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
