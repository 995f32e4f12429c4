//! # SR Server
//!
//! An HTTP super-resolution service: uploads go through a pretrained ONNX
//! network on a GPU and come back as upscaled PNGs. Results are memoized on
//! disk by content hash, so re-uploading the same bytes under the same model
//! never re-invokes the network.
//!
//! ## Features
//!
//! - **Tiled inference**: Large inputs are processed as an overlapping tile
//!   grid to bound device memory
//! - **Hot model swap**: The active network can be replaced at runtime
//!   without a restart or a device-memory leak
//! - **Content-addressed cache**: Results keyed by upload fingerprint,
//!   model and output scale
//! - **Null engine**: A resampling-only engine for accelerator-free
//!   development and testing
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`hash`] - Content fingerprinting for cache keys
//! - [`cache`] - Disk-backed result cache
//! - [`model`] - Model catalog and lifecycle manager
//! - [`engine`] - Tiled inference engines (ONNX Runtime and null)
//! - [`service`] - Upscale orchestration
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sr_server::{
//!     create_router, DeviceInfo, EngineKind, EngineSettings, ModelManager, ModelRegistry,
//!     ResultCache, RouterConfig, UpscaleService,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ModelRegistry::with_default_catalog("./models");
//!     let manager = Arc::new(ModelManager::new(
//!         registry,
//!         DeviceInfo::probe(),
//!         EngineSettings::default(),
//!         EngineKind::Onnx,
//!     ));
//!     let cache = ResultCache::new("./cache").expect("cache dir");
//!     let service = UpscaleService::new(cache, manager, 2.0);
//!     let router = create_router(service, RouterConfig::default());
//!
//!     // Start the server...
//!     let _ = router;
//! }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod model;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use cache::{CacheKey, CacheStats, ResultCache};
pub use config::Config;
pub use engine::{
    DeviceInfo, EngineKind, EngineSettings, InferenceEngine, NullEngine, OrtEngine,
    DEFAULT_TILE_OVERLAP, DEFAULT_TILE_SIZE,
};
pub use error::{CacheError, EngineError, ModelError, UpscaleError};
pub use hash::{fingerprint, Fingerprint};
pub use model::{ArchKind, ModelConfig, ModelManager, ModelRegistry, ModelState, SwitchOutcome};
pub use server::{
    create_router, AppState, ErrorResponse, HealthResponse, ModelsResponse, RouterConfig,
    StatsResponse, SwitchModelRequest, SwitchModelResponse,
};
pub use service::{UpscaleOutcome, UpscaleService, ALLOWED_EXTENSIONS, MAX_UPLOAD_BYTES};
