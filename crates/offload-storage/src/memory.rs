use crate::traits::{BatchOutcome, ObjectStoreGateway, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory gateway implementation.
///
/// Backs the `memory` storage backend for local development and tests. The
/// whole bucket lives in a map behind an async RwLock, so it is safe for the
/// coordinator's concurrent puts.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    bucket: String,
    public_base_url: String,
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryGateway {
    pub fn new(bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        MemoryGateway {
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch an object's contents, if present.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }

    /// Number of objects currently stored.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// All stored keys, sorted for stable assertions.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStoreGateway for MemoryGateway {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let size = data.len();
        self.objects.write().await.insert(key.to_string(), data);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            "Memory upload successful"
        );

        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> StorageResult<BatchOutcome> {
        let mut objects = self.objects.write().await;
        // Absent keys count as deleted: the bucket ends up in the requested
        // state either way, matching S3 DeleteObjects semantics.
        let deleted: Vec<String> = keys
            .iter()
            .inspect(|key| {
                objects.remove(key.as_str());
            })
            .cloned()
            .collect();

        tracing::info!(
            bucket = %self.bucket,
            key_count = deleted.len(),
            "Memory batch delete successful"
        );

        Ok(BatchOutcome {
            deleted,
            failed: Vec::new(),
        })
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
