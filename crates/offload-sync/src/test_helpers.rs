//! Test helpers for synchronization tests
//!
//! This module provides mock implementations of the metadata collaborator and
//! an instrumented gateway wrapper so coordinators can be tested without a
//! host or a real bucket.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use offload_core::{AttachmentId, SizeDescriptor};
use offload_storage::{BatchOutcome, MemoryGateway, ObjectStoreGateway, StorageError, StorageResult};

use crate::resolver::MediaMetadataStore;

/// Mock media-metadata store backed by a map.
#[derive(Clone, Default)]
pub struct MockMetadataStore {
    #[allow(clippy::type_complexity)]
    attachments: Arc<Mutex<HashMap<AttachmentId, (PathBuf, Vec<(String, SizeDescriptor)>)>>>,
}

impl MockMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        id: AttachmentId,
        main_path: impl Into<PathBuf>,
        sizes: Vec<(String, SizeDescriptor)>,
    ) {
        self.attachments
            .lock()
            .unwrap()
            .insert(id, (main_path.into(), sizes));
    }

    pub fn remove(&self, id: AttachmentId) {
        self.attachments.lock().unwrap().remove(&id);
    }
}

#[async_trait]
impl MediaMetadataStore for MockMetadataStore {
    async fn main_path(&self, id: AttachmentId) -> Result<Option<PathBuf>> {
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .get(&id)
            .map(|(path, _)| path.clone()))
    }

    async fn registered_sizes(&self, id: AttachmentId) -> Result<Vec<(String, SizeDescriptor)>> {
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .get(&id)
            .map(|(_, sizes)| sizes.clone())
            .unwrap_or_default())
    }
}

/// Gateway wrapper that records every call and can inject failures per key.
///
/// Wraps a [`MemoryGateway`] so successful operations still land somewhere
/// inspectable.
#[derive(Clone)]
pub struct RecordingGateway {
    inner: MemoryGateway,
    puts: Arc<Mutex<Vec<String>>>,
    delete_batches: Arc<Mutex<Vec<Vec<String>>>>,
    failing_puts: Arc<Mutex<HashSet<String>>>,
    failing_deletes: Arc<Mutex<HashSet<String>>>,
}

impl RecordingGateway {
    pub fn new(bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let public_base_url = format!("https://{}.s3.us-east-1.amazonaws.com", bucket);
        RecordingGateway {
            inner: MemoryGateway::new(bucket, public_base_url),
            puts: Arc::new(Mutex::new(Vec::new())),
            delete_batches: Arc::new(Mutex::new(Vec::new())),
            failing_puts: Arc::new(Mutex::new(HashSet::new())),
            failing_deletes: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn inner(&self) -> &MemoryGateway {
        &self.inner
    }

    /// Make every future `put` of this key fail.
    pub fn fail_put(&self, key: impl Into<String>) {
        self.failing_puts.lock().unwrap().insert(key.into());
    }

    /// Make every future batched delete report this key as failed.
    pub fn fail_delete(&self, key: impl Into<String>) {
        self.failing_deletes.lock().unwrap().insert(key.into());
    }

    /// Keys uploaded so far, in completion order.
    pub fn put_keys(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    /// Every `delete_many` invocation with its full key set.
    pub fn delete_batches(&self) -> Vec<Vec<String>> {
        self.delete_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStoreGateway for RecordingGateway {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if self.failing_puts.lock().unwrap().contains(key) {
            return Err(StorageError::UploadFailed(format!(
                "injected failure for {}",
                key
            )));
        }
        self.inner.put(key, data).await?;
        self.puts.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> StorageResult<BatchOutcome> {
        self.delete_batches.lock().unwrap().push(keys.to_vec());

        let failing = self.failing_deletes.lock().unwrap().clone();
        let (bad, good): (Vec<String>, Vec<String>) =
            keys.iter().cloned().partition(|k| failing.contains(k));

        let mut outcome = self.inner.delete_many(&good).await?;
        outcome
            .failed
            .extend(bad.into_iter().map(|k| (k, "injected failure".to_string())));
        Ok(outcome)
    }

    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }
}
