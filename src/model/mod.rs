//! Model catalog and lifecycle management.
//!
//! This module owns everything about which networks exist and which one is
//! resident:
//!
//! - [`ModelRegistry`]: static catalog of known model configurations,
//!   built at process start and never mutated.
//! - [`ModelManager`]: owner of the single loaded engine, responsible for
//!   safe load/unload transitions and for handing shared access to
//!   inference callers.

pub mod manager;
pub mod registry;

pub use manager::{ModelManager, ModelState, SwitchOutcome};
pub use registry::{ArchKind, ModelConfig, ModelRegistry};
