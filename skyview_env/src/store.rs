//! Blob and metadata store abstractions for the submission catalog.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{ListPage, StoredObject};

/// Abstraction for blob storage (uploaded simulation logs).
///
/// # Implementations
///
/// - **Production**: `SledStore` - embedded database tree
/// - **Simulation**: `InMemoryFileStore` - map behind a lock
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    /// Stores `body` under `key`, replacing any previous object.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), EnvError>;

    /// Fetches the object under `key`.
    ///
    /// # Returns
    /// * `Ok(Some(obj))` - The object exists
    /// * `Ok(None)` - No object under this key
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, EnvError>;

    /// Returns true if an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, EnvError>;

    /// Removes the object under `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), EnvError>;
}

/// Abstraction for the key-value metadata store.
///
/// Values are opaque strings (the catalog stores pretty-printed JSON).
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    /// Stores `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: String) -> Result<(), EnvError>;

    /// Fetches the value under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, EnvError>;

    /// Lists keys starting with `prefix`, in lexicographic order.
    ///
    /// # Arguments
    /// * `prefix` - Key prefix filter
    /// * `cursor` - Cursor returned by the previous page, `None` for the first
    async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, EnvError>;

    /// Removes the value under `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), EnvError>;
}
