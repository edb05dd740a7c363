//! Configuration module
//!
//! Environment-driven configuration for the offload component. The component
//! runs in-process inside the host, so there is no CLI or config-file surface;
//! everything is read once at startup from the environment (with `.env`
//! support for development).

use std::env;
use std::path::PathBuf;

use crate::storage_types::{KeyScheme, StorageBackend};

const DEFAULT_KEY_PREFIX: &str = "uploads";
const DEFAULT_REBASE_ANCHOR: &str = "uploads";

/// Application configuration.
///
/// Built once via [`Config::from_env`] and shared read-only for the lifetime
/// of the process. The naming scheme in particular must never change during a
/// run: upload-time and delete-time key derivation have to agree.
#[derive(Clone, Debug)]
pub struct Config {
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub region: Option<String>,
    pub bucket: String,
    pub bucket_url: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    // Key derivation configuration
    pub key_scheme: KeyScheme,
    pub key_prefix: String,
    pub upload_subdir: Option<String>,
    pub rebase_anchor: String,
    // Resolution configuration
    pub current_upload_dir: Option<PathBuf>,
    // Spooling behavior
    pub delete_local_after_upload: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(StorageBackend::S3);

        let region = env::var("AWS_DEFAULT_REGION")
            .or_else(|_| env::var("AWS_REGION"))
            .ok()
            .filter(|s| !s.is_empty());

        let bucket = env::var("S3_BUCKET").unwrap_or_default();

        let bucket_url = env::var("S3_BUCKET_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| match &region {
                Some(region) => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
                None => format!("https://{}.s3.amazonaws.com", bucket),
            });

        let key_scheme = env::var("KEY_NAMING_SCHEME")
            .ok()
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(KeyScheme::TimePartitioned);

        let config = Config {
            storage_backend,
            region,
            bucket,
            bucket_url,
            endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok().filter(|s| !s.is_empty()),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            key_scheme,
            key_prefix: env::var("S3_KEY_PREFIX")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            upload_subdir: env::var("UPLOAD_SUBDIR").ok().filter(|s| !s.is_empty()),
            rebase_anchor: env::var("REBASE_ANCHOR")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_REBASE_ANCHOR.to_string()),
            current_upload_dir: env::var("CURRENT_UPLOAD_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            delete_local_after_upload: env::var("DELETE_LOCAL_AFTER_UPLOAD")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_backend == StorageBackend::S3 {
            if self.bucket.is_empty() {
                return Err(anyhow::anyhow!(
                    "S3_BUCKET must be set when using the S3 storage backend"
                ));
            }
            if self.region.is_none() {
                return Err(anyhow::anyhow!(
                    "AWS_DEFAULT_REGION or AWS_REGION must be set when using the S3 storage backend"
                ));
            }
        }

        // A static credential pair must be complete; a lone half is a
        // misconfiguration rather than a fallback to ambient credentials.
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(anyhow::anyhow!(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together"
            ));
        }

        if self.key_scheme == KeyScheme::SubdirMirrored && self.upload_subdir.is_none() {
            return Err(anyhow::anyhow!(
                "UPLOAD_SUBDIR must be set when KEY_NAMING_SCHEME is subdir-mirrored"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            storage_backend: StorageBackend::S3,
            region: Some("us-east-1".to_string()),
            bucket: "media-bucket".to_string(),
            bucket_url: "https://media-bucket.s3.us-east-1.amazonaws.com".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            key_scheme: KeyScheme::TimePartitioned,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            upload_subdir: None,
            rebase_anchor: DEFAULT_REBASE_ANCHOR.to_string(),
            current_upload_dir: None,
            delete_local_after_upload: false,
        }
    }

    #[test]
    fn valid_s3_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut config = base_config();
        config.bucket = String::new();
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.region = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn memory_backend_needs_no_bucket() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::Memory;
        config.bucket = String::new();
        config.region = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn half_a_credential_pair_is_rejected() {
        let mut config = base_config();
        config.access_key_id = Some("AKIA...".to_string());
        assert!(config.validate().is_err());

        config.secret_access_key = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn subdir_scheme_requires_subdir() {
        let mut config = base_config();
        config.key_scheme = KeyScheme::SubdirMirrored;
        assert!(config.validate().is_err());

        config.upload_subdir = Some("2024/03".to_string());
        assert!(config.validate().is_ok());
    }
}
