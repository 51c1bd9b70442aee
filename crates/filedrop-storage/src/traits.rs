use async_trait::async_trait;
use bytes::Bytes;
use filedrop_core::models::PresignedUpload;
use filedrop_core::StorageBackend;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store-side failure that may clear on its own (throttling, internal
    /// error, temporary unavailability). Eligible for bounded retry.
    #[error("transient store error ({code}): {message}")]
    Transient { code: String, message: String },

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("credential resolution failed: {0}")]
    Credentials(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("storage configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient { .. })
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Object-store abstraction used as `Arc<dyn ObjectStore>` across the
/// service, one instance per process.
///
/// Absent keys are data, not errors: `get` yields `Ok(None)` and `exists`
/// yields `Ok(false)`. Errors mean the store could not answer.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object. Overwrites silently; callers own write-once rules.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<()>;

    /// Read an object, `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Cheap existence check (HEAD, no body transfer).
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// All top-level identifier prefixes, without the trailing delimiter.
    async fn list_prefixes(&self) -> StoreResult<Vec<String>>;

    /// Every key under `{prefix}/`.
    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Batch delete. Deleting absent keys succeeds.
    async fn delete_many(&self, keys: &[String]) -> StoreResult<()>;

    /// Presigned upload credential scoped to the exact key, a content-type
    /// condition, and the size range `[0, max_bytes]`.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        max_bytes: u64,
        ttl: Duration,
    ) -> StoreResult<PresignedUpload>;

    /// Presigned download URL forcing a "save as" response disposition with
    /// the given filename.
    async fn presign_download(
        &self,
        key: &str,
        filename: &str,
        ttl: Duration,
    ) -> StoreResult<String>;

    /// Get the backend type of this storage implementation
    fn backend_type(&self) -> StorageBackend;
}
