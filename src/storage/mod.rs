//! Key/value persistence used by the rating cache.
//!
//! The store is shared with unrelated components, so callers namespace
//! their keys. There are no transactions: each `set` or `remove` applies
//! on its own.
//!
//! ```text
//! rating_codeforces_tourist -> { "record": {...}, "storedAt": "2026-..." }
//! rating_atcoder_chokudai   -> { ... }
//! contests_cache            -> (owned by someone else)
//! ```

pub mod local;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Asynchronous key/value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys. Missing keys are absent from the map.
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>>;

    /// Insert or overwrite every entry of `items`.
    async fn set(&self, items: HashMap<String, Value>) -> Result<()>;

    /// Delete the given keys; unknown keys are ignored.
    async fn remove(&self, keys: &[String]) -> Result<()>;

    /// Every key currently stored.
    async fn keys(&self) -> Result<Vec<String>>;
}
