//! API integration tests for the upscale endpoints and error handling.
//!
//! Tests verify:
//! - Upload, upscaling and PNG responses with cache-hit headers
//! - Health, model catalog and stats responses
//! - Error cases (bad uploads, unknown models, no model loaded)

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{
    is_valid_png, png_upload, spawn_app, spawn_unloaded_app, switch_model_request, upscale_request,
};

// =============================================================================
// Upscale Endpoint
// =============================================================================

#[tokio::test]
async fn test_upscale_success() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(upscale_request("image", "photo.png", &png_upload(100, 100)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );
    assert_eq!(
        response.headers().get("x-upscale-cache-hit").unwrap(),
        "false"
    );

    // Outscale 2 turns 100x100 into 200x200.
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_png(&body), "Response should be a valid PNG");
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(decoded.width(), 200);
    assert_eq!(decoded.height(), 200);
}

#[tokio::test]
async fn test_upscale_repeat_sets_cache_hit_header() {
    let app = spawn_app().await;
    let upload = png_upload(32, 32);

    let first = app
        .router
        .clone()
        .oneshot(upscale_request("image", "a.png", &upload))
        .await
        .unwrap();
    assert_eq!(
        first.headers().get("x-upscale-cache-hit").unwrap(),
        "false"
    );

    let second = app
        .router
        .clone()
        .oneshot(upscale_request("image", "a.png", &upload))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        second.headers().get("x-upscale-cache-hit").unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_upscale_missing_field() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(upscale_request("wrong_field", "a.png", &png_upload(8, 8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "invalid_upload");
}

#[tokio::test]
async fn test_upscale_rejects_unsupported_extension() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(upscale_request("image", "anim.gif", &png_upload(8, 8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "invalid_upload");
}

#[tokio::test]
async fn test_upscale_rejects_undecodable_image() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(upscale_request("image", "broken.png", b"definitely not a png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "decode_error");
}

#[tokio::test]
async fn test_upscale_without_model() {
    let app = spawn_unloaded_app().await;

    let response = app
        .router
        .clone()
        .oneshot(upscale_request("image", "a.png", &png_upload(8, 8)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "no_model");
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_with_model() {
    let app = spawn_app().await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model_loaded"], true);
    assert_eq!(health["current_model"], "fast");
    assert_eq!(health["model_loading"], false);
    assert_eq!(health["gpu_available"], false);
}

#[tokio::test]
async fn test_health_without_model() {
    let app = spawn_unloaded_app().await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["model_loaded"], false);
    assert!(health["current_model"].is_null());
}

// =============================================================================
// Models Endpoint
// =============================================================================

#[tokio::test]
async fn test_models_catalog() {
    let app = spawn_app().await;

    let request = Request::builder()
        .uri("/models")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let models: serde_json::Value = serde_json::from_slice(&body).unwrap();

    let entries = models["models"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], "slow");
    assert_eq!(entries[1]["id"], "fast");
    assert_eq!(entries[1]["active"], true);
    assert_eq!(entries[0]["active"], false);
    // No weight files in the temp models dir.
    assert_eq!(entries[0]["available"], false);

    assert_eq!(models["current"], "fast");
    assert_eq!(models["loading"], false);
}

// =============================================================================
// Switch Model Endpoint
// =============================================================================

#[tokio::test]
async fn test_switch_model_success() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(switch_model_request("slow"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["model"], "slow");

    assert_eq!(app.manager.current().await.as_deref(), Some("slow"));
}

#[tokio::test]
async fn test_switch_model_already_active() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(switch_model_request("fast"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["success"], true);
    assert!(result["message"]
        .as_str()
        .unwrap()
        .contains("already active"));
}

#[tokio::test]
async fn test_switch_model_unknown() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(switch_model_request("nonexistent"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "unknown_model");

    // The resident model is untouched.
    assert_eq!(app.manager.current().await.as_deref(), Some("fast"));
}

// =============================================================================
// Stats and Clear Cache Endpoints
// =============================================================================

#[tokio::test]
async fn test_stats_and_clear_cache() {
    let app = spawn_app().await;

    // Populate the cache with one result.
    app.router
        .clone()
        .oneshot(upscale_request("image", "a.png", &png_upload(16, 16)))
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/stats")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats["cache_count"], 1);
    assert_eq!(stats["current_model"], "fast");
    assert_eq!(stats["gpu_available"], false);

    // Clear it.
    let request = Request::builder()
        .method("POST")
        .uri("/clear-cache")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["message"], "Cache cleared, 1 files deleted");

    // Stats reflect the empty cache.
    let request = Request::builder()
        .uri("/stats")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats["cache_count"], 0);
    assert_eq!(stats["cache_size_mb"], 0.0);
}
