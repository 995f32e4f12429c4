//! SR Server - an HTTP super-resolution upscale service.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sr_server::{
    config::Config,
    engine::{DeviceInfo, EngineKind},
    model::{ModelManager, ModelRegistry},
    server::{create_router, RouterConfig},
    service::UpscaleService,
    ResultCache,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    info!("Configuration:");
    info!("  Models dir: {}", config.models_dir.display());
    info!("  Cache dir: {}", config.cache_dir.display());
    info!("  Default model: {}", config.default_model);
    info!("  Output scale: x{}", config.outscale);
    info!(
        "  Tiles: {}px, {}px overlap",
        config.tile_size, config.tile_overlap
    );

    // Engine status with warning for the degraded mode
    match config.engine {
        EngineKind::Onnx => info!("  Engine: real (ONNX Runtime)"),
        EngineKind::Null => {
            warn!("  Engine: NULL - output is plain resampling, not super-resolution");
            warn!("          Remove --engine=null to use the real engine");
        }
    }

    // Probe the accelerator once; the result is held for the process
    // lifetime.
    let device = DeviceInfo::probe();
    if device.available {
        info!(
            "  GPU: {} available",
            device.name.as_deref().unwrap_or("accelerator")
        );
    } else if config.engine == EngineKind::Onnx {
        error!("  GPU: no CUDA device available");
        error!("");
        error!("  The real engine requires an accelerator. Please check:");
        error!("    - An NVIDIA GPU is present and the driver is installed");
        error!("    - The CUDA runtime libraries are on the library path");
        error!("    - Or start in degraded mode with --engine=null");
        return ExitCode::FAILURE;
    } else {
        info!("  GPU: none (null engine does not need one)");
    }

    // Build the result cache, creating the directory if needed
    let cache = match ResultCache::new(&config.cache_dir) {
        Ok(cache) => cache,
        Err(e) => {
            error!("Failed to initialize cache: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Create registry and lifecycle manager
    let registry = ModelRegistry::with_default_catalog(&config.models_dir);
    let manager = Arc::new(ModelManager::new(
        registry,
        device,
        config.engine_settings(),
        config.engine,
    ));

    // Load the startup model
    info!("");
    info!("Loading model '{}'...", config.default_model);
    if let Err(e) = manager.load(&config.default_model).await {
        error!("  Failed to load model: {}", e);
        error!("");
        error!("  Please check:");
        error!(
            "    - The weight file exists under {}",
            config.models_dir.display()
        );
        error!("    - The model id is one of the registered models");
        return ExitCode::FAILURE;
    }
    info!("  Model loaded");

    // Create the service and router
    let service = UpscaleService::new(cache, manager, config.outscale);
    let router = create_router(service, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/models", addr);
    info!(
        "    curl -F image=@photo.png http://{}/upscale -o upscaled.png",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("███████╗██████╗       ███████╗███████╗██████╗ ██╗   ██╗███████╗██████╗ ");
    info!("██╔════╝██╔══██╗      ██╔════╝██╔════╝██╔══██╗██║   ██║██╔════╝██╔══██╗");
    info!("███████╗██████╔╝█████╗███████╗█████╗  ██████╔╝██║   ██║█████╗  ██████╔╝");
    info!("╚════██║██╔══██╗╚════╝╚════██║██╔══╝  ██╔══██╗╚██╗ ██╔╝██╔══╝  ██╔══██╗");
    info!("███████║██║  ██║      ███████║███████╗██║  ██║ ╚████╔╝ ███████╗██║  ██║");
    info!("╚══════╝╚═╝  ╚═╝      ╚══════╝╚══════╝╚═╝  ╚═╝  ╚═══╝  ╚══════╝╚═╝  ╚═╝");
    info!("");
    info!("                        v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "sr_server=debug,tower_http=debug"
    } else {
        "sr_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::default();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}
