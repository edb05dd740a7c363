use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Defined in core because both configuration and the gateway factory need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Key naming schemes observed across deployments.
///
/// Selects how a local attachment path maps to a remote object key. Chosen
/// once at startup and immutable for the lifetime of the process so that
/// upload-time and delete-time derivation can never diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyScheme {
    /// `prefix/year/month/filename`, year/month taken from the two trailing
    /// directory segments of the local path.
    TimePartitioned,
    /// `prefix/subdir/filename`, subdir taken from the storage-location
    /// configuration.
    SubdirMirrored,
    /// `prefix/<everything after the anchor segment>`, anchor located by
    /// path-component search.
    AnchorRebase,
}

impl FromStr for KeyScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "time-partitioned" => Ok(KeyScheme::TimePartitioned),
            "subdir-mirrored" => Ok(KeyScheme::SubdirMirrored),
            "anchor-rebase" => Ok(KeyScheme::AnchorRebase),
            _ => Err(anyhow::anyhow!("Invalid key naming scheme: {}", s)),
        }
    }
}

impl Display for KeyScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            KeyScheme::TimePartitioned => write!(f, "time-partitioned"),
            KeyScheme::SubdirMirrored => write!(f, "subdir-mirrored"),
            KeyScheme::AnchorRebase => write!(f, "anchor-rebase"),
        }
    }
}
