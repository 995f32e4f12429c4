//! Model lifecycle management: load, hot-swap, and shared inference access.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbImage;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::engine::{DeviceInfo, EngineKind, EngineSettings, InferenceEngine, NullEngine, OrtEngine};
use crate::error::{EngineError, ModelError, UpscaleError};
use crate::model::registry::ModelRegistry;

// =============================================================================
// Model State
// =============================================================================

/// Observable lifecycle state, reported by the health endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    /// No engine resident (startup, or after a failed load)
    Unloaded,

    /// A load is in flight
    Loading,

    /// An engine is resident and serving
    Ready { model_id: String },
}

/// Result of a [`ModelManager::switch_to`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The requested model was already active; nothing happened
    AlreadyActive,

    /// The model was loaded and is now active
    Switched,
}

// =============================================================================
// Model Manager
// =============================================================================

/// Owner of the single resident inference engine.
///
/// At most one engine is loaded at a time. The engine slot is a
/// reader-writer lock: inference takes shared read access, load and unload
/// take exclusive write access, so a swap can never pull the session out
/// from under an in-flight forward pass. A separate atomic flag rejects
/// concurrent load attempts with [`ModelError::Busy`] instead of queueing
/// them.
pub struct ModelManager {
    registry: ModelRegistry,
    device: DeviceInfo,
    settings: EngineSettings,
    kind: EngineKind,
    slot: Arc<RwLock<Option<Arc<dyn InferenceEngine>>>>,
    loading: AtomicBool,
}

impl ModelManager {
    pub fn new(
        registry: ModelRegistry,
        device: DeviceInfo,
        settings: EngineSettings,
        kind: EngineKind,
    ) -> Self {
        Self {
            registry,
            device,
            settings,
            kind,
            slot: Arc::new(RwLock::new(None)),
            loading: AtomicBool::new(false),
        }
    }

    /// The model catalog.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Accelerator availability, probed at startup.
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Load `id`, replacing any resident engine.
    ///
    /// Catalog, weight-file and device checks fail fast before anything is
    /// unloaded. The previous engine is released before the new session is
    /// built, so two networks never occupy device memory at once; the cost
    /// is that a failed load leaves the manager [`ModelState::Unloaded`]
    /// rather than rolled back.
    ///
    /// # Errors
    ///
    /// [`ModelError::Busy`] if another load is in flight.
    pub async fn load(&self, id: &str) -> Result<(), ModelError> {
        self.registry.describe(id)?;
        if self.kind == EngineKind::Onnx {
            self.registry.resolve(id)?;
            self.device.ensure_available()?;
        }

        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ModelError::Busy);
        }

        let result = self.load_locked(id).await;
        self.loading.store(false, Ordering::Release);

        if let Err(ref e) = result {
            warn!(model = id, error = %e, "Model load failed, no model resident");
        }
        result
    }

    async fn load_locked(&self, id: &str) -> Result<(), ModelError> {
        let mut slot = self.slot.write().await;

        if let Some(old) = slot.take() {
            info!(model = old.model_id(), "Releasing previous model");
            drop(old);
        }

        let engine = self.build_engine(id).await?;
        info!(model = id, "Model ready");
        *slot = Some(engine);
        Ok(())
    }

    async fn build_engine(&self, id: &str) -> Result<Arc<dyn InferenceEngine>, ModelError> {
        match self.kind {
            EngineKind::Null => {
                let config = self.registry.describe(id)?;
                Ok(Arc::new(NullEngine::new(
                    config.id.clone(),
                    config.native_scale,
                )))
            }
            EngineKind::Onnx => {
                let (config, path) = self.registry.resolve(id)?;
                let config = config.clone();
                let settings = self.settings;
                // Session construction reads and uploads weights; keep it
                // off the async workers.
                let engine = tokio::task::spawn_blocking(move || {
                    OrtEngine::load(&config, &path, settings)
                })
                .await
                .map_err(|e| EngineError::SessionBuild(e.to_string()))??;
                Ok(Arc::new(engine))
            }
        }
    }

    /// Switch the active model, a no-op when `id` is already resident.
    ///
    /// # Errors
    ///
    /// [`ModelError::Busy`] if a load is already in flight.
    pub async fn switch_to(&self, id: &str) -> Result<SwitchOutcome, ModelError> {
        if self.current().await.as_deref() == Some(id) {
            return Ok(SwitchOutcome::AlreadyActive);
        }
        self.load(id).await.map(|()| SwitchOutcome::Switched)
    }

    /// Install an engine directly, bypassing the catalog. Used by tests to
    /// inject instrumented engines.
    pub async fn install(&self, engine: Arc<dyn InferenceEngine>) {
        let mut slot = self.slot.write().await;
        *slot = Some(engine);
    }

    /// Id of the resident model, if any.
    pub async fn current(&self) -> Option<String> {
        let slot = self.slot.read().await;
        slot.as_ref().map(|e| e.model_id().to_string())
    }

    /// Whether a load is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ModelState {
        if self.is_loading() {
            return ModelState::Loading;
        }
        match self.current().await {
            Some(model_id) => ModelState::Ready { model_id },
            None => ModelState::Unloaded,
        }
    }

    /// Run the resident engine over `image` on a blocking thread.
    ///
    /// Holds shared read access to the engine slot for the duration of the
    /// pass, so a concurrent model switch waits for completion instead of
    /// unloading mid-inference. Returns the result together with the id of
    /// the model that actually produced it.
    pub async fn enhance(
        &self,
        image: RgbImage,
        outscale: f32,
    ) -> Result<(RgbImage, String), UpscaleError> {
        let guard = Arc::clone(&self.slot).read_owned().await;
        if guard.is_none() {
            return Err(UpscaleError::NoModelLoaded);
        }

        let result = tokio::task::spawn_blocking(move || {
            let Some(engine) = guard.as_ref() else {
                return Err(UpscaleError::NoModelLoaded);
            };
            let model_id = engine.model_id().to_string();
            let out = engine.enhance(&image, outscale)?;
            Ok((out, model_id))
        })
        .await
        .map_err(|e| UpscaleError::Engine(EngineError::Inference(e.to_string())))?;

        result
    }
}

// =============================================================================
// Tests
// =============================================================================
