//! Offload Storage Library
//!
//! This crate provides the gateway abstraction over the object-storage bucket
//! and its implementations. The gateway surface is deliberately thin: one
//! `put` per file and one batched `delete_many` per attachment. Everything
//! below it (authentication, retries, transport) belongs to the storage SDK.

pub mod factory;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_gateway;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryGateway;
pub use offload_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Gateway;
pub use traits::{BatchOutcome, ObjectStoreGateway, StorageError, StorageResult};
