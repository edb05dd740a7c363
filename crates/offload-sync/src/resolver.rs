//! Attachment resolution.
//!
//! Builds the complete local file set for one attachment from the host's
//! media-metadata collaborator: the main file plus every generated size
//! variant that actually has a file. Read-only; the host owns the metadata.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use offload_core::{AttachmentId, AttachmentMetadata, Config, SizeDescriptor, UploadSet};

use crate::error::{SyncError, SyncResult};

/// The host's media-metadata store.
///
/// Queried, never mutated. `main_path` returning `None` means the host has no
/// record of the attachment; `registered_sizes` descriptors carry a filename
/// only, with no directory component.
#[async_trait]
pub trait MediaMetadataStore: Send + Sync {
    async fn main_path(&self, id: AttachmentId) -> Result<Option<PathBuf>>;

    async fn registered_sizes(&self, id: AttachmentId) -> Result<Vec<(String, SizeDescriptor)>>;
}

/// Where an attachment's derivative files live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivativeLayout {
    /// Derivatives sit next to the main file, in its time-partitioned
    /// directory. The common layout.
    AlongsideMain,
    /// Derivatives sit in a shared current-upload directory regardless of the
    /// main file's location.
    UploadDir(PathBuf),
}

/// Resolves an attachment ID to its local file set.
#[derive(Clone)]
pub struct AttachmentResolver {
    metadata: Arc<dyn MediaMetadataStore>,
    layout: DerivativeLayout,
}

impl AttachmentResolver {
    pub fn new(metadata: Arc<dyn MediaMetadataStore>, layout: DerivativeLayout) -> Self {
        AttachmentResolver { metadata, layout }
    }

    pub fn from_config(metadata: Arc<dyn MediaMetadataStore>, config: &Config) -> Self {
        let layout = match &config.current_upload_dir {
            Some(dir) => DerivativeLayout::UploadDir(dir.clone()),
            None => DerivativeLayout::AlongsideMain,
        };
        AttachmentResolver::new(metadata, layout)
    }

    /// Resolve the attachment's main file path.
    pub async fn resolve_main(&self, id: AttachmentId) -> SyncResult<PathBuf> {
        self.metadata
            .main_path(id)
            .await
            .map_err(|e| SyncError::Metadata {
                id,
                message: e.to_string(),
            })?
            .ok_or(SyncError::AttachmentNotFound(id))
    }

    /// Resolve the complete upload set, enumerating sizes from the store.
    ///
    /// Used by the delete path, where the store is still authoritative at the
    /// time the lifecycle event fires.
    pub async fn upload_set(&self, id: AttachmentId) -> SyncResult<UploadSet> {
        let sizes = self
            .metadata
            .registered_sizes(id)
            .await
            .map_err(|e| SyncError::Metadata {
                id,
                message: e.to_string(),
            })?;
        self.build_set(id, &sizes).await
    }

    /// Resolve the complete upload set from event-supplied metadata.
    ///
    /// The update event hands over metadata that may not be persisted yet, so
    /// the upload path enumerates sizes from the event payload instead of
    /// re-querying the store.
    pub async fn upload_set_from_metadata(
        &self,
        id: AttachmentId,
        metadata: &AttachmentMetadata,
    ) -> SyncResult<UploadSet> {
        self.build_set(id, &metadata.sizes).await
    }

    async fn build_set(
        &self,
        id: AttachmentId,
        sizes: &[(String, SizeDescriptor)],
    ) -> SyncResult<UploadSet> {
        let main = self.resolve_main(id).await?;
        let derivative_dir = match &self.layout {
            DerivativeLayout::AlongsideMain => {
                main.parent().map(PathBuf::from).unwrap_or_default()
            }
            DerivativeLayout::UploadDir(dir) => dir.clone(),
        };

        let mut set = UploadSet::new();
        set.push(main);
        for (label, descriptor) in sizes {
            match &descriptor.file {
                Some(file) => set.push(derivative_dir.join(file)),
                // A size with no generated file is normal, not an error.
                None => {
                    tracing::debug!(attachment_id = %id, size = %label, "size has no file entry, skipping")
                }
            }
        }
        Ok(set)
    }
}
