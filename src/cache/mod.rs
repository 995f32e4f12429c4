//! Durable result cache for upscaled images.
//!
//! Expensive inference results are memoized on disk, keyed by the content
//! fingerprint of the upload together with the model that produced the
//! result and the requested output scale. A repeated upload of the same
//! bytes under the same model never re-invokes the network.
//!
//! # Cache Key
//!
//! Entries are keyed by a composite of:
//! - Content fingerprint (128-bit hash of raw upload bytes)
//! - Model identifier
//! - Output scale
//!
//! The model id and scale are part of the key so that switching the active
//! model can never serve a stale entry produced by a different network.
//!
//! Entries are never evicted automatically; the cache is cleared only by an
//! explicit administrative call.

mod store;

pub use store::{CacheKey, CacheStats, ResultCache};
