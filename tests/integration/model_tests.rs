//! Model lifecycle tests over the HTTP surface.
//!
//! Tests verify:
//! - Switching models updates the health and catalog views
//! - A switch back restores the original model
//! - Upscaling keeps working across switches

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{png_upload, spawn_app, switch_model_request, upscale_request};

async fn get_json(app: &super::test_utils::TestApp, uri: &str) -> serde_json::Value {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_switch_updates_health_and_catalog() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(switch_model_request("slow"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health = get_json(&app, "/health").await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["current_model"], "slow");
    assert_eq!(health["model_name"], "High Quality (Slow)");
    assert_eq!(health["model_loading"], false);

    let models = get_json(&app, "/models").await;
    assert_eq!(models["current"], "slow");
    let entries = models["models"].as_array().unwrap();
    assert_eq!(entries[0]["id"], "slow");
    assert_eq!(entries[0]["active"], true);
    assert_eq!(entries[1]["active"], false);
}

#[tokio::test]
async fn test_switch_back_restores_model() {
    let app = spawn_app().await;

    for target in ["slow", "fast"] {
        let response = app
            .router
            .clone()
            .oneshot(switch_model_request(target))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.manager.current().await.as_deref(), Some(target));
    }

    let models = get_json(&app, "/models").await;
    assert_eq!(models["current"], "fast");
}

#[tokio::test]
async fn test_upscale_works_after_switch() {
    let app = spawn_app().await;

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
        .oneshot(upscale_request("image", "a.png", &png_upload(40, 40)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Still produces the configured x2 output.
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(decoded.width(), 80);
    assert_eq!(decoded.height(), 80);
}

#[tokio::test]
async fn test_repeated_switch_to_same_model_is_stable() {
    let app = spawn_app().await;

    for _ in 0..3 {
        let response = app
            .router
            .clone()
            .oneshot(switch_model_request("slow"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(app.manager.current().await.as_deref(), Some("slow"));
    assert!(!app.manager.is_loading());
}

#[tokio::test]
async fn test_stats_reflect_switched_model() {
    let app = spawn_app().await;

    app.router
        .clone()
        .oneshot(switch_model_request("slow"))
        .await
        .unwrap();

    let stats = get_json(&app, "/stats").await;
    assert_eq!(stats["current_model"], "slow");
    assert_eq!(stats["model_name"], "High Quality (Slow)");
}
