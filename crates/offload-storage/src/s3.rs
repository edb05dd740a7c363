use crate::traits::{BatchOutcome, ObjectStoreGateway, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};

/// S3 gateway implementation
#[derive(Clone)]
pub struct S3Gateway {
    store: AmazonS3,
    bucket: String,
    public_base_url: String,
}

impl S3Gateway {
    /// Create a new S3Gateway instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `public_base_url` - Public URL of the bucket, used for URL rewriting
    /// * `credentials` - Optional static (access key id, secret access key) pair;
    ///   when absent, the SDK's ambient credential resolution applies
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_base_url: String,
        credentials: Option<(String, String)>,
    ) -> StorageResult<Self> {
        // Build AmazonS3 object store from environment and explicit settings.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        if let Some((access_key_id, secret_access_key)) = credentials {
            builder = builder
                .with_access_key_id(access_key_id)
                .with_secret_access_key(secret_access_key);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Gateway {
            store,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ObjectStoreGateway for S3Gateway {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let size = data.len() as u64;
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> StorageResult<BatchOutcome> {
        let start = std::time::Instant::now();

        // delete_stream batches into DeleteObjects requests under the hood,
        // so an attachment's whole key set goes out as one request.
        let locations = stream::iter(
            keys.iter()
                .map(|k| Ok(Path::from(k.clone())))
                .collect::<Vec<ObjectResult<Path>>>(),
        )
        .boxed();

        let mut deleted: Vec<String> = Vec::with_capacity(keys.len());
        let mut errors: Vec<String> = Vec::new();

        let mut results = self.store.delete_stream(locations);
        while let Some(result) = results.next().await {
            match result {
                Ok(path) => deleted.push(path.to_string()),
                // Deleting an already-absent object is success: the bucket is
                // in the requested state.
                Err(ObjectStoreError::NotFound { path, .. }) => deleted.push(path),
                Err(e) => errors.push(e.to_string()),
            }
        }

        // The bulk-delete response does not always attribute an error to its
        // key, so failures are matched up by elimination against the request.
        let failed: Vec<(String, String)> = keys
            .iter()
            .filter(|key| !deleted.iter().any(|d| d == *key))
            .cloned()
            .zip(errors.iter().cloned().chain(std::iter::repeat(
                "not confirmed deleted by storage".to_string(),
            )))
            .collect();

        if failed.is_empty() {
            tracing::info!(
                bucket = %self.bucket,
                key_count = keys.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 batch delete successful"
            );
        } else {
            tracing::error!(
                bucket = %self.bucket,
                key_count = keys.len(),
                failed_count = failed.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 batch delete partially failed"
            );
        }

        Ok(BatchOutcome { deleted, failed })
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
