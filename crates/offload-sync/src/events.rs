//! Lifecycle event wiring.
//!
//! The host drives the core through three hooks: attachment updated (upload
//! the set), attachment about to be deleted (batch-delete the set), and the
//! upload-directory URL rewrite that points the library's public URLs at the
//! bucket. Handlers are plain objects registered on an explicit dispatcher;
//! there is no hidden global instance.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use offload_core::{AttachmentId, AttachmentMetadata, UploadDirs};

use crate::delete::DeletionCoordinator;
use crate::error::{SyncError, SyncResult};
use crate::upload::UploadCoordinator;

/// Handler for the host's attachment lifecycle events.
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    /// Fired after the host (re)generates an attachment's metadata. The
    /// payload is the fresh metadata, which may not be persisted yet.
    async fn on_attachment_updated(
        &self,
        id: AttachmentId,
        metadata: &AttachmentMetadata,
    ) -> SyncResult<()>;

    /// Fired before the host destroys an attachment and its metadata.
    async fn on_before_attachment_deleted(&self, id: AttachmentId) -> SyncResult<()>;

    /// Rewrite the externally visible upload URLs to point at the bucket.
    /// Pure string substitution; the subdir stays untouched.
    fn rewrite_upload_dirs(&self, dirs: &UploadDirs) -> UploadDirs;
}

/// The offload component's lifecycle handler.
///
/// Constructed once at host startup and registered on the dispatcher; both
/// coordinators share the same resolver and naming scheme so upload-time and
/// delete-time keys cannot diverge.
pub struct OffloadHandler {
    upload: UploadCoordinator,
    deletion: DeletionCoordinator,
    bucket_url: String,
}

impl OffloadHandler {
    pub fn new(
        upload: UploadCoordinator,
        deletion: DeletionCoordinator,
        bucket_url: impl Into<String>,
    ) -> Self {
        OffloadHandler {
            upload,
            deletion,
            bucket_url: bucket_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LifecycleHandler for OffloadHandler {
    async fn on_attachment_updated(
        &self,
        id: AttachmentId,
        metadata: &AttachmentMetadata,
    ) -> SyncResult<()> {
        self.upload
            .sync_attachment_with_metadata(id, metadata)
            .await?;
        Ok(())
    }

    async fn on_before_attachment_deleted(&self, id: AttachmentId) -> SyncResult<()> {
        self.deletion.delete_attachment(id).await?;
        Ok(())
    }

    fn rewrite_upload_dirs(&self, dirs: &UploadDirs) -> UploadDirs {
        let subdir = dirs.subdir.trim_matches('/');
        let url = if subdir.is_empty() {
            self.bucket_url.clone()
        } else {
            format!("{}/{}", self.bucket_url, subdir)
        };
        UploadDirs {
            url,
            base_url: self.bucket_url.clone(),
            subdir: dirs.subdir.clone(),
        }
    }
}

/// Registry of lifecycle handlers.
///
/// Thread-safe and async-compatible using tokio's RwLock. Registration
/// happens at startup; dispatch reads the handler list concurrently. Events
/// for one attachment arrive serially from the host, so handlers run in
/// registration order per event.
#[derive(Clone)]
pub struct LifecycleDispatcher {
    handlers: Arc<RwLock<Vec<Arc<dyn LifecycleHandler>>>>,
}

impl LifecycleDispatcher {
    pub fn new() -> Self {
        LifecycleDispatcher {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn register(&self, handler: Arc<dyn LifecycleHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Fire the update event on every handler.
    ///
    /// Every handler runs even when an earlier one fails; the first error is
    /// re-raised afterwards so the host can decide whether to abort the
    /// triggering action.
    pub async fn dispatch_attachment_updated(
        &self,
        id: AttachmentId,
        metadata: &AttachmentMetadata,
    ) -> SyncResult<()> {
        let handlers = self.handlers.read().await.clone();
        let mut first_error: Option<SyncError> = None;
        for handler in handlers {
            if let Err(e) = handler.on_attachment_updated(id, metadata).await {
                tracing::error!(error = %e, attachment_id = %id, "attachment update handler failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Fire the before-delete event on every handler.
    pub async fn dispatch_before_attachment_deleted(&self, id: AttachmentId) -> SyncResult<()> {
        let handlers = self.handlers.read().await.clone();
        let mut first_error: Option<SyncError> = None;
        for handler in handlers {
            if let Err(e) = handler.on_before_attachment_deleted(id).await {
                tracing::error!(error = %e, attachment_id = %id, "attachment delete handler failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Thread the upload-dirs value through every handler's rewrite.
    pub async fn rewrite_upload_dirs(&self, dirs: UploadDirs) -> UploadDirs {
        let handlers = self.handlers.read().await.clone();
        handlers
            .iter()
            .fold(dirs, |dirs, handler| handler.rewrite_upload_dirs(&dirs))
    }
}

impl Default for LifecycleDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
