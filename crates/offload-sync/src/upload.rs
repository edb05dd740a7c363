//! Upload coordination.
//!
//! Pushes one attachment's entire upload set to storage. Keys for the whole
//! set are derived before any network traffic so a derivation failure never
//! leaves a half-uploaded attachment behind; the puts themselves fan out
//! concurrently and the coordinator waits for all of them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use offload_core::{AttachmentId, AttachmentMetadata, UploadSet};
use offload_storage::ObjectStoreGateway;

use crate::error::{SyncError, SyncResult};
use crate::keys::NamingScheme;
use crate::resolver::AttachmentResolver;

#[derive(Clone)]
pub struct UploadCoordinator {
    resolver: AttachmentResolver,
    scheme: NamingScheme,
    gateway: Arc<dyn ObjectStoreGateway>,
    delete_local_after_upload: bool,
}

impl UploadCoordinator {
    pub fn new(
        resolver: AttachmentResolver,
        scheme: NamingScheme,
        gateway: Arc<dyn ObjectStoreGateway>,
        delete_local_after_upload: bool,
    ) -> Self {
        UploadCoordinator {
            resolver,
            scheme,
            gateway,
            delete_local_after_upload,
        }
    }

    /// Upload the attachment's complete file set, enumerating sizes from the
    /// metadata store.
    pub async fn sync_attachment(&self, id: AttachmentId) -> SyncResult<Vec<String>> {
        let set = self.resolver.upload_set(id).await?;
        self.sync_set(id, set).await
    }

    /// Upload the attachment's complete file set as described by an update
    /// event's metadata payload.
    pub async fn sync_attachment_with_metadata(
        &self,
        id: AttachmentId,
        metadata: &AttachmentMetadata,
    ) -> SyncResult<Vec<String>> {
        let set = self.resolver.upload_set_from_metadata(id, metadata).await?;
        self.sync_set(id, set).await
    }

    async fn sync_set(&self, id: AttachmentId, set: UploadSet) -> SyncResult<Vec<String>> {
        let start = std::time::Instant::now();

        // Derive every key up front: a wrong or underivable key must abort
        // the whole operation before anything reaches the bucket.
        let keyed: Vec<(PathBuf, String)> = set
            .into_paths()
            .into_iter()
            .map(|path| {
                let key = self.scheme.derive(&path)?;
                Ok((path, key))
            })
            .collect::<Result<_, SyncError>>()?;

        // Uploads of distinct files are independent: fan out, then wait for
        // the whole set. A partially uploaded set is not success.
        futures::future::try_join_all(
            keyed
                .iter()
                .map(|(path, key)| self.upload_one(path, key)),
        )
        .await?;

        let keys: Vec<String> = keyed.into_iter().map(|(_, key)| key).collect();

        tracing::info!(
            attachment_id = %id,
            bucket = %self.gateway.bucket(),
            file_count = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "attachment sync successful"
        );

        Ok(keys)
    }

    async fn upload_one(&self, path: &Path, key: &str) -> SyncResult<()> {
        // A missing derivative *file* (unlike a missing descriptor entry) is
        // a real inconsistency and propagates.
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| SyncError::LocalRead {
                path: path.to_path_buf(),
                source,
            })?;

        self.gateway
            .put(key, Bytes::from(data))
            .await
            .map_err(|source| SyncError::Upload {
                key: key.to_string(),
                source,
            })?;

        // Spooling: the local copy goes away only after the put succeeded.
        if self.delete_local_after_upload {
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    key = %key,
                    "uploaded but failed to remove local file"
                );
            }
        }

        Ok(())
    }
}
