//! Offload Core Library
//!
//! This crate provides the domain models, configuration, and shared types used
//! by the offload storage and synchronization crates.

pub mod config;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use models::{AttachmentId, AttachmentMetadata, SizeDescriptor, UploadDirs, UploadSet};
pub use storage_types::{KeyScheme, StorageBackend};
