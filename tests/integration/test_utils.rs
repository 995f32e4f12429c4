//! Test utilities for integration tests.
//!
//! Provides a fully wired test application (null engine, temp cache) and
//! helpers for building multipart uploads.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use image::{Rgb, RgbImage};

use sr_server::engine::{DeviceInfo, EngineKind, EngineSettings, NullEngine};
use sr_server::model::{ModelManager, ModelRegistry};
use sr_server::service::UpscaleService;
use sr_server::{create_router, ResultCache, RouterConfig};

pub const MULTIPART_BOUNDARY: &str = "sr-server-test-boundary";

// =============================================================================
// Test Application
// =============================================================================

/// A fully wired application with a counting null engine installed.
pub struct TestApp {
    pub router: Router,
    pub manager: Arc<ModelManager>,
    pub engine: Arc<NullEngine>,
    _dir: tempfile::TempDir,
}

/// Build an app with the `fast` model resident (native x4, outscale 2).
pub async fn spawn_app() -> TestApp {
    let app = spawn_unloaded_app().await;
    app.manager.install(app.engine.clone()).await;
    app
}

/// Build an app with no model resident.
pub async fn spawn_unloaded_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let manager = Arc::new(ModelManager::new(
        ModelRegistry::with_default_catalog(dir.path().join("models")),
        DeviceInfo::unavailable(),
        EngineSettings::default(),
        EngineKind::Null,
    ));
    let engine = Arc::new(NullEngine::new("fast", 4));

    let cache = ResultCache::new(dir.path().join("cache")).unwrap();
    let service = UpscaleService::new(cache, Arc::clone(&manager), 2.0);
    let router = create_router(service, RouterConfig::default().with_tracing(false));

    TestApp {
        router,
        manager,
        engine,
        _dir: dir,
    }
}

// =============================================================================
// Upload Helpers
// =============================================================================

/// Encode a gradient test image as PNG bytes.
pub fn png_upload(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Build a multipart request for the upscale endpoint.
pub fn upscale_request(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upscale")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Build a JSON request for the switch-model endpoint.
pub fn switch_model_request(model: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/switch-model")
        .header("content-type", "application/json")
        .body(Body::from(format!(r#"{{"model": "{}"}}"#, model)))
        .unwrap()
}

/// Check the PNG magic bytes.
pub fn is_valid_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
}
