//! HTTP request handlers for the upscale API.
//!
//! # Endpoints
//!
//! - `POST /upscale` - Upscale an uploaded image
//! - `POST /switch-model` - Swap the active model
//! - `GET /models` - List the model catalog
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache and device statistics
//! - `POST /clear-cache` - Drop all cached results

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{CacheError, ModelError, UpscaleError};
use crate::model::SwitchOutcome;
use crate::service::UpscaleService;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the upscale service.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// The service orchestrating validation, caching and inference
    pub service: Arc<UpscaleService>,
}

impl AppState {
    /// Create a new application state with the given service.
    pub fn new(service: UpscaleService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Body of a model switch request.
#[derive(Debug, Deserialize)]
pub struct SwitchModelRequest {
    /// Catalog id of the model to activate
    pub model: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "unknown_model", "invalid_upload")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" when a model is resident, "unhealthy" otherwise
    pub status: String,

    /// Whether an accelerator was found at startup
    pub gpu_available: bool,

    /// Accelerator name, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_name: Option<String>,

    /// Whether a model is resident
    pub model_loaded: bool,

    /// Catalog id of the resident model
    pub current_model: Option<String>,

    /// Display name of the resident model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Whether a model load is in flight
    pub model_loading: bool,
}

/// One entry in the model list response.
#[derive(Debug, Serialize)]
pub struct ModelEntry {
    /// Catalog id
    pub id: String,

    /// Display name
    pub name: String,

    /// Short description
    pub description: String,

    /// Whether the weight file is present on disk
    pub available: bool,

    /// Whether this model is currently resident
    pub active: bool,
}

/// Response from the model list endpoint.
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// All registered models in catalog order
    pub models: Vec<ModelEntry>,

    /// Id of the resident model
    pub current: Option<String>,

    /// Whether a load is in flight
    pub loading: bool,
}

/// Response from the model switch endpoint.
#[derive(Debug, Serialize)]
pub struct SwitchModelResponse {
    pub success: bool,
    pub message: String,
    pub model: String,
}

/// Response from the cache clear endpoint.
#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub message: String,
}

/// Response from the stats endpoint.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Number of cached results
    pub cache_count: usize,

    /// Total cache size in MiB, rounded to two decimals
    pub cache_size_mb: f64,

    /// Whether an accelerator was found at startup
    pub gpu_available: bool,

    /// Catalog id of the resident model
    pub current_model: Option<String>,

    /// Display name of the resident model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

// =============================================================================
// Error Mapping
// =============================================================================

fn log_and_respond(status: StatusCode, error_type: &str, message: String) -> Response {
    // Log errors based on severity
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::CONFLICT {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Rejected: {}",
            message
        );
    } else if status.is_client_error() {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let error_response = ErrorResponse::with_status(error_type, message, status);
    (status, Json(error_response)).into_response()
}

/// Convert ModelError to HTTP response.
///
/// - 4xx errors are logged at WARN level (client errors)
/// - 5xx errors are logged at ERROR level (server errors)
/// - 409 Busy is logged at DEBUG level (expected during switches)
impl IntoResponse for ModelError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            // 400 Bad Request - the id or the deployment is wrong
            ModelError::UnknownModel(id) => (
                StatusCode::BAD_REQUEST,
                "unknown_model",
                format!("Unknown model: {}", id),
            ),

            ModelError::WeightsMissing { id, path } => (
                StatusCode::BAD_REQUEST,
                "weights_missing",
                format!("Weights for model '{}' not found at {}", id, path.display()),
            ),

            // 409 Conflict - a load is in flight, retry later
            ModelError::Busy => (
                StatusCode::CONFLICT,
                "model_loading",
                "A model load is already in progress".to_string(),
            ),

            // 500 Internal Server Error - load or device failure
            ModelError::Engine(engine_err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "engine_error",
                engine_err.to_string(),
            ),
        };

        log_and_respond(status, error_type, message)
    }
}

/// Convert UpscaleError to HTTP response.
impl IntoResponse for UpscaleError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            // 400 Bad Request - bad upload, rejected before any side effect
            UpscaleError::Validation { reason } => (
                StatusCode::BAD_REQUEST,
                "invalid_upload",
                format!("Invalid upload: {}", reason),
            ),

            UpscaleError::Decode(msg) => (
                StatusCode::BAD_REQUEST,
                "decode_error",
                format!("Failed to decode image: {}", msg),
            ),

            // 500 Internal Server Error - service not ready or processing failed
            UpscaleError::NoModelLoaded => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "no_model",
                "No model loaded".to_string(),
            ),

            UpscaleError::Encode(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "encode_error",
                format!("Failed to encode image: {}", msg),
            ),

            UpscaleError::Engine(engine_err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "inference_error",
                engine_err.to_string(),
            ),

            UpscaleError::Cache(cache_err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                cache_err.to_string(),
            ),
        };

        log_and_respond(status, error_type, message)
    }
}

/// Convert CacheError to HTTP response (stats and clear endpoints).
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        log_and_respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            self.to_string(),
        )
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle upscale requests.
///
/// # Endpoint
///
/// `POST /upscale` with a multipart body containing an `image` field.
///
/// # Response
///
/// - `200 OK`: PNG image with `Content-Type: image/png`
/// - `400 Bad Request`: Missing/empty/oversized upload, bad extension, or
///   undecodable image
/// - `500 Internal Server Error`: No model loaded, inference or storage
///   failure
///
/// # Headers
///
/// - `X-Upscale-Cache-Hit: true|false`
pub async fn upscale_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, UpscaleError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UpscaleError::Validation {
            reason: format!("malformed multipart body: {}", e),
        })?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field.bytes().await.map_err(|e| UpscaleError::Validation {
                reason: format!("failed to read upload: {}", e),
            })?;
            upload = Some((filename, data));
            break;
        }
    }

    let (filename, data) = upload.ok_or_else(|| UpscaleError::Validation {
        reason: "missing 'image' field".to_string(),
    })?;

    let outcome = state.service.upscale(&filename, data).await?;

    let http_response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header("X-Upscale-Cache-Hit", outcome.cache_hit.to_string())
        .body(axum::body::Body::from(outcome.data))
        .unwrap();

    Ok(http_response)
}

/// Handle model switch requests.
///
/// # Endpoint
///
/// `POST /switch-model` with JSON body `{"model": "<id>"}`.
///
/// # Response
///
/// - `200 OK`: `{"success": true, "message": ..., "model": ...}`
/// - `400 Bad Request`: Unknown model or missing weights
/// - `409 Conflict`: Another load is in flight
/// - `500 Internal Server Error`: The load itself failed
pub async fn switch_model_handler(
    State(state): State<AppState>,
    Json(request): Json<SwitchModelRequest>,
) -> Result<Json<SwitchModelResponse>, ModelError> {
    let outcome = state.service.manager().switch_to(&request.model).await?;

    let message = match outcome {
        SwitchOutcome::AlreadyActive => format!("Model '{}' already active", request.model),
        SwitchOutcome::Switched => format!("Switched to model '{}'", request.model),
    };

    Ok(Json(SwitchModelResponse {
        success: true,
        message,
        model: request.model,
    }))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "gpu_available": true,
///   "gpu_name": "CUDA",
///   "model_loaded": true,
///   "current_model": "fast",
///   "model_name": "Fast (Compact)",
///   "model_loading": false
/// }
/// ```
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let manager = state.service.manager();
    let current = manager.current().await;
    let model_loaded = current.is_some();
    let model_name = current
        .as_deref()
        .and_then(|id| manager.registry().describe(id).ok())
        .map(|c| c.name.clone());
    let device = manager.device();

    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "unhealthy" }.to_string(),
        gpu_available: device.available,
        gpu_name: device.name.clone(),
        model_loaded,
        current_model: current,
        model_name,
        model_loading: manager.is_loading(),
    })
}

/// Handle model list requests.
///
/// # Endpoint
///
/// `GET /models`
///
/// # Response
///
/// `200 OK` with the full catalog, each entry flagged with weight-file
/// availability and whether it is the active model.
pub async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    let manager = state.service.manager();
    let current = manager.current().await;

    let models = manager
        .registry()
        .list()
        .iter()
        .map(|config| ModelEntry {
            id: config.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            available: manager.registry().is_available(&config.id),
            active: current.as_deref() == Some(config.id.as_str()),
        })
        .collect();

    Json(ModelsResponse {
        models,
        current,
        loading: manager.is_loading(),
    })
}

/// Handle cache clear requests.
///
/// # Endpoint
///
/// `POST /clear-cache`
///
/// # Response
///
/// - `200 OK`: `{"message": "Cache cleared, N files deleted"}`
/// - `500 Internal Server Error`: A deletion failed; artifacts already
///   removed stay removed
pub async fn clear_cache_handler(
    State(state): State<AppState>,
) -> Result<Json<ClearCacheResponse>, CacheError> {
    let removed = state.service.clear_cache()?;
    Ok(Json(ClearCacheResponse {
        message: format!("Cache cleared, {} files deleted", removed),
    }))
}

/// Handle stats requests.
///
/// # Endpoint
///
/// `GET /stats`
///
/// # Response
///
/// `200 OK` with cache entry count, total size in MiB and device/model
/// status.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, CacheError> {
    let manager = state.service.manager();
    let stats = state.service.cache_stats()?;
    let current = manager.current().await;
    let model_name = current
        .as_deref()
        .and_then(|id| manager.registry().describe(id).ok())
        .map(|c| c.name.clone());

    Ok(Json(StatsResponse {
        cache_count: stats.count,
        cache_size_mb: stats.size_mb(),
        gpu_available: manager.device().available,
        current_model: current,
        model_name,
    }))
}

// =============================================================================
// Tests
// =============================================================================
