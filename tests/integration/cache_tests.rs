//! Cache behavior tests across the full request path.
//!
//! Tests verify:
//! - A repeated upload never re-invokes the engine (invocation counter)
//! - Switching models isolates cache entries
//! - Clearing the cache forces recomputation

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{png_upload, spawn_app, switch_model_request, upscale_request};

#[tokio::test]
async fn test_cache_hit_skips_engine() {
    let app = spawn_app().await;
    let upload = png_upload(100, 100);

    // First upload runs the engine once.
    let first = app
        .router
        .clone()
        .oneshot(upscale_request("image", "photo.png", &upload))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(app.engine.invocation_count(), 1);

    let first_body = first.into_body().collect().await.unwrap().to_bytes();

    // Second upload of the same bytes is served from the cache without a
    // second forward pass.
    let second = app
        .router
        .clone()
        .oneshot(upscale_request("image", "photo.png", &upload))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        second.headers().get("x-upscale-cache-hit").unwrap(),
        "true"
    );
    assert_eq!(app.engine.invocation_count(), 1);

    // Byte-identical result.
    let second_body = second.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(first_body, second_body);
}

#[tokio::test]
async fn test_filename_does_not_affect_cache_key() {
    let app = spawn_app().await;
    let upload = png_upload(24, 24);

    app.router
        .clone()
        .oneshot(upscale_request("image", "first.png", &upload))
        .await
        .unwrap();

    // Same bytes under a different filename still hit.
    let response = app
        .router
        .clone()
        .oneshot(upscale_request("image", "renamed.jpg", &upload))
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-upscale-cache-hit").unwrap(),
        "true"
    );
    assert_eq!(app.engine.invocation_count(), 1);
}

#[tokio::test]
async fn test_distinct_uploads_miss() {
    let app = spawn_app().await;

    app.router
        .clone()
        .oneshot(upscale_request("image", "a.png", &png_upload(10, 10)))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(upscale_request("image", "b.png", &png_upload(11, 11)))
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-upscale-cache-hit").unwrap(),
        "false"
    );
    assert_eq!(app.engine.invocation_count(), 2);
}

#[tokio::test]
async fn test_model_switch_isolates_cache() {
    let app = spawn_app().await;
    let upload = png_upload(20, 20);

    app.router
        .clone()
        .oneshot(upscale_request("image", "a.png", &upload))
        .await
        .unwrap();
    assert_eq!(app.engine.invocation_count(), 1);

    // Switch to the other model. The entry produced by "fast" must not
    // satisfy requests served by "slow".
    let response = app
        .router
        .clone()
        .oneshot(switch_model_request("slow"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(upscale_request("image", "a.png", &upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-upscale-cache-hit").unwrap(),
        "false"
    );
}

#[tokio::test]
async fn test_clear_cache_forces_recompute() {
    let app = spawn_app().await;
    let upload = png_upload(12, 12);

    app.router
        .clone()
        .oneshot(upscale_request("image", "a.png", &upload))
        .await
        .unwrap();
    assert_eq!(app.engine.invocation_count(), 1);

    let request = Request::builder()
        .method("POST")
        .uri("/clear-cache")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(upscale_request("image", "a.png", &upload))
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-upscale-cache-hit").unwrap(),
        "false"
    );
    assert_eq!(app.engine.invocation_count(), 2);
}
