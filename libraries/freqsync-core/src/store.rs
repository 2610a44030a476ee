/// Remote store trait for freqsync
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Hierarchical key-value store holding the mirrored records.
///
/// Paths are `/`-separated and relative to the store root. Each call is
/// atomic on its own; no ordering or transactional behavior is assumed
/// across calls, and callers must tolerate any single call failing
/// independently of its neighbors.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a child of `parent` under a server-generated unique key.
    ///
    /// Returns the generated key (not the full path).
    async fn push(&self, parent: &str, value: &Value) -> Result<String>;

    /// Write `value` at `path`, replacing whatever was there.
    async fn set(&self, path: &str, value: &Value) -> Result<()>;

    /// Merge `fields` into the value at `path`, leaving other fields alone.
    async fn update(&self, path: &str, fields: &Value) -> Result<()>;

    /// Remove the node at `path`, including any children under it.
    ///
    /// Deleting a path that does not exist is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Read the value at `path`, or `None` if nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>>;
}
