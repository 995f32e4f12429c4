//! HTTP server layer for the upscale service.
//!
//! This module provides the HTTP API over the upscale service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       HTTP Layer                        │
//! │    POST /upscale   POST /switch-model   GET /health     │
//! │                                                         │
//! │  ┌───────────────────────┐  ┌─────────────────────────┐ │
//! │  │       handlers        │  │         routes          │ │
//! │  │ (requests, responses) │  │    (router config)      │ │
//! │  └───────────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    clear_cache_handler, health_handler, models_handler, stats_handler, switch_model_handler,
    upscale_handler, AppState, ClearCacheResponse, ErrorResponse, HealthResponse, ModelEntry,
    ModelsResponse, StatsResponse, SwitchModelRequest, SwitchModelResponse,
};
pub use routes::{create_router, RouterConfig};
