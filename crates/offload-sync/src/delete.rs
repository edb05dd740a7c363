//! Deletion coordination.
//!
//! Removes an attachment's entire upload set from storage with exactly one
//! batched delete per attachment. The file set is resolved while the host's
//! metadata is still intact (the lifecycle event fires before teardown), and
//! keys come from the same deriver the upload path used, so the delete
//! request covers exactly the objects the uploads created.

use std::sync::Arc;

use offload_core::AttachmentId;
use offload_storage::{BatchOutcome, ObjectStoreGateway};

use crate::error::{SyncError, SyncResult};
use crate::keys::NamingScheme;
use crate::resolver::AttachmentResolver;

#[derive(Clone)]
pub struct DeletionCoordinator {
    resolver: AttachmentResolver,
    scheme: NamingScheme,
    gateway: Arc<dyn ObjectStoreGateway>,
}

impl DeletionCoordinator {
    pub fn new(
        resolver: AttachmentResolver,
        scheme: NamingScheme,
        gateway: Arc<dyn ObjectStoreGateway>,
    ) -> Self {
        DeletionCoordinator {
            resolver,
            scheme,
            gateway,
        }
    }

    /// Delete every remote object belonging to the attachment.
    ///
    /// Must be called while the host still has the attachment's metadata;
    /// resolution happens first for exactly that reason.
    pub async fn delete_attachment(&self, id: AttachmentId) -> SyncResult<BatchOutcome> {
        let start = std::time::Instant::now();

        let set = self.resolver.upload_set(id).await?;
        let keys = set
            .iter()
            .map(|path| self.scheme.derive(path))
            .collect::<Result<Vec<String>, _>>()?;

        if keys.is_empty() {
            tracing::debug!(attachment_id = %id, "no resolvable files, skipping delete request");
            return Ok(BatchOutcome::default());
        }

        let outcome = self.gateway.delete_many(&keys).await?;

        if !outcome.is_complete() {
            return Err(SyncError::BatchDelete {
                deleted: outcome.deleted,
                failed: outcome.failed,
            });
        }

        tracing::info!(
            attachment_id = %id,
            bucket = %self.gateway.bucket(),
            key_count = outcome.deleted.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "attachment delete successful"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DerivativeLayout;
    use crate::test_helpers::{MockMetadataStore, RecordingGateway};
    use offload_core::SizeDescriptor;

    fn scheme() -> NamingScheme {
        NamingScheme::TimePartitioned {
            prefix: "media".into(),
        }
    }

    fn coordinator(
        store: Arc<MockMetadataStore>,
        gateway: Arc<RecordingGateway>,
    ) -> DeletionCoordinator {
        DeletionCoordinator::new(
            AttachmentResolver::new(store, DerivativeLayout::AlongsideMain),
            scheme(),
            gateway,
        )
    }

    #[tokio::test]
    async fn issues_exactly_one_batch_for_the_whole_set() {
        let store = Arc::new(MockMetadataStore::new());
        store.insert(
            AttachmentId(1),
            "/uploads/2024/03/photo.jpg",
            vec![
                ("thumbnail".into(), SizeDescriptor::with_file("photo-150x150.jpg")),
                ("medium".into(), SizeDescriptor::with_file("photo-300x300.jpg")),
            ],
        );
        let gateway = Arc::new(RecordingGateway::new("media-bucket"));

        let outcome = coordinator(store, gateway.clone())
            .delete_attachment(AttachmentId(1))
            .await
            .unwrap();

        let batches = gateway.delete_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            [
                "media/2024/03/photo.jpg",
                "media/2024/03/photo-150x150.jpg",
                "media/2024/03/photo-300x300.jpg",
            ]
        );
        assert_eq!(outcome.deleted.len(), 3);
    }

    #[tokio::test]
    async fn zero_derivatives_still_one_batch_with_one_key() {
        let store = Arc::new(MockMetadataStore::new());
        store.insert(AttachmentId(2), "/uploads/2024/03/solo.jpg", vec![]);
        let gateway = Arc::new(RecordingGateway::new("media-bucket"));

        coordinator(store, gateway.clone())
            .delete_attachment(AttachmentId(2))
            .await
            .unwrap();

        let batches = gateway.delete_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], ["media/2024/03/solo.jpg"]);
    }

    #[tokio::test]
    async fn partial_batch_failure_surfaces_failed_keys() {
        let store = Arc::new(MockMetadataStore::new());
        store.insert(
            AttachmentId(3),
            "/uploads/2024/03/photo.jpg",
            vec![(
                "thumbnail".into(),
                SizeDescriptor::with_file("photo-150x150.jpg"),
            )],
        );
        let gateway = Arc::new(RecordingGateway::new("media-bucket"));
        gateway.fail_delete("media/2024/03/photo-150x150.jpg");

        let err = coordinator(store, gateway)
            .delete_attachment(AttachmentId(3))
            .await
            .unwrap_err();

        match err {
            SyncError::BatchDelete { deleted, failed } => {
                assert_eq!(deleted, ["media/2024/03/photo.jpg"]);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].0, "media/2024/03/photo-150x150.jpg");
            }
            other => panic!("expected BatchDelete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_attachment_aborts_without_network_call() {
        let gateway = Arc::new(RecordingGateway::new("media-bucket"));
        let err = coordinator(Arc::new(MockMetadataStore::new()), gateway.clone())
            .delete_attachment(AttachmentId(404))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::AttachmentNotFound(_)));
        assert!(gateway.delete_batches().is_empty());
    }

    #[tokio::test]
    async fn delete_keys_match_upload_keys() {
        use crate::upload::UploadCoordinator;
        use std::fs;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let month_dir = dir.path().join("uploads/2024/03");
        fs::create_dir_all(&month_dir).unwrap();
        let main = month_dir.join("photo.jpg");
        let thumb = month_dir.join("photo-150x150.jpg");
        fs::write(&main, b"m").unwrap();
        fs::write(&thumb, b"t").unwrap();

        let store = Arc::new(MockMetadataStore::new());
        store.insert(
            AttachmentId(5),
            &main,
            vec![(
                "thumbnail".into(),
                SizeDescriptor::with_file("photo-150x150.jpg"),
            )],
        );
        let gateway = Arc::new(RecordingGateway::new("media-bucket"));
        let resolver =
            AttachmentResolver::new(store.clone(), DerivativeLayout::AlongsideMain);

        let uploaded = UploadCoordinator::new(
            resolver.clone(),
            scheme(),
            gateway.clone(),
            false,
        )
        .sync_attachment(AttachmentId(5))
        .await
        .unwrap();

        let outcome = DeletionCoordinator::new(resolver, scheme(), gateway.clone())
            .delete_attachment(AttachmentId(5))
            .await
            .unwrap();

        assert_eq!(uploaded, outcome.deleted);
        assert_eq!(gateway.inner().object_count().await, 0);
    }
}
