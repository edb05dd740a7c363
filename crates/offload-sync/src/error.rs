//! Error types for the synchronization core.
//!
//! Resolution and derivation failures abort the single attachment's operation
//! and never affect other attachments. A wrong key is worse than a failed
//! operation (it orphans or collides objects), so derivation errors surface
//! instead of being defaulted.

use std::path::PathBuf;

use offload_core::AttachmentId;
use offload_storage::StorageError;

use crate::keys::KeyError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(AttachmentId),

    #[error("Metadata read failed for attachment {id}: {message}")]
    Metadata { id: AttachmentId, message: String },

    #[error("Key derivation failed: {0}")]
    KeyDerivation(#[from] KeyError),

    #[error("Failed to read local file {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload failed for key {key}: {source}")]
    Upload {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Batch delete incomplete: {} of {} keys failed", failed.len(), failed.len() + deleted.len())]
    BatchDelete {
        /// Keys the storage confirmed removed before the batch went bad.
        deleted: Vec<String>,
        /// Keys still in the bucket, with the backend's error message.
        failed: Vec<(String, String)>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
