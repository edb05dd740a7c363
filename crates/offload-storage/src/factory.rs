#[cfg(feature = "storage-memory")]
use crate::MemoryGateway;
#[cfg(feature = "storage-s3")]
use crate::S3Gateway;
use crate::{ObjectStoreGateway, StorageBackend, StorageError, StorageResult};
use offload_core::Config;
use std::sync::Arc;

/// Create a storage gateway based on configuration
pub async fn create_gateway(config: &Config) -> StorageResult<Arc<dyn ObjectStoreGateway>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let region = config.region.clone().ok_or_else(|| {
                StorageError::ConfigError(
                    "AWS_DEFAULT_REGION or AWS_REGION not configured".to_string(),
                )
            })?;

            let credentials = match (&config.access_key_id, &config.secret_access_key) {
                (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
                _ => None,
            };

            let gateway = S3Gateway::new(
                config.bucket.clone(),
                region,
                config.endpoint.clone(),
                config.bucket_url.clone(),
                credentials,
            )
            .await?;
            Ok(Arc::new(gateway))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => Ok(Arc::new(MemoryGateway::new(
            config.bucket.clone(),
            config.bucket_url.clone(),
        ))),

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)".to_string(),
        )),
    }
}
