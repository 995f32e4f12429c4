//! Compute accelerator probing.
//!
//! The CUDA execution provider is probed exactly once at startup; the
//! result is held for the lifetime of the process and reported through the
//! health and stats endpoints. Inference never re-checks the device.

use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

use crate::error::EngineError;

/// Snapshot of accelerator availability taken at startup.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Whether the CUDA execution provider can be registered
    pub available: bool,

    /// Provider name, present when available
    pub name: Option<String>,
}

impl DeviceInfo {
    /// Probe for a usable CUDA device.
    pub fn probe() -> Self {
        let provider = CUDAExecutionProvider::default();
        let available = provider.is_available().unwrap_or(false);
        Self {
            available,
            name: available.then(|| "CUDA".to_string()),
        }
    }

    /// A device that reports as absent, for tests and the null engine path.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            name: None,
        }
    }

    /// Fail with [`EngineError::DeviceUnavailable`] when no accelerator is
    /// present.
    pub fn ensure_available(&self) -> Result<(), EngineError> {
        if self.available {
            Ok(())
        } else {
            Err(EngineError::DeviceUnavailable {
                reason: "CUDA execution provider is not available".to_string(),
            })
        }
    }
}
