//! Storage gateway abstraction
//!
//! This module defines the gateway trait that all bucket backends must
//! implement, plus the error and batch-outcome types shared by them.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Per-key result of one batched delete request.
///
/// A batch can partially succeed; the caller inspects `failed` rather than
/// receiving a blanket error, so it can report exactly which objects are
/// still in the bucket. A key that was already absent counts as deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Keys confirmed removed (or already absent).
    pub deleted: Vec<String>,
    /// Keys the backend failed to remove, with the backend's error message.
    pub failed: Vec<(String, String)>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Gateway to the object-storage bucket.
///
/// Implementations must be safe for concurrent use: the upload coordinator
/// fans out one `put` per file in an attachment's upload set. `delete_many`
/// must issue a single batched request per call so that network round-trips
/// stay O(1) per attachment and partial success is visible in one response.
#[async_trait]
pub trait ObjectStoreGateway: Send + Sync {
    /// Upload one object. Overwrites any existing object under the same key.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete a set of objects in one batched request.
    ///
    /// Callers must not pass an empty key set; short-circuit before reaching
    /// the gateway instead of issuing an empty batch.
    async fn delete_many(&self, keys: &[String]) -> StorageResult<BatchOutcome>;

    /// The bucket this gateway writes to.
    fn bucket(&self) -> &str;

    /// Public URL for an object key (used to rewrite the host's upload URLs).
    fn public_url(&self, key: &str) -> String;
}
