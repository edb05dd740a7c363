//! Offload Sync Library
//!
//! This crate is the synchronization core: it derives remote object keys from
//! local attachment paths, resolves an attachment's complete file set from the
//! host's media metadata, and coordinates uploads and batched deletes against
//! the storage gateway.
//!
//! # Key stability
//!
//! The one invariant everything here leans on: for a fixed naming scheme, the
//! same local path always derives the same remote key, whether derived at
//! upload time or at delete time. Both coordinators therefore share one
//! [`NamingScheme`] value and one [`AttachmentResolver`], and deletion
//! resolves its file set before the host tears down attachment metadata.

pub mod delete;
pub mod error;
pub mod events;
pub mod keys;
pub mod resolver;
pub mod upload;

pub mod test_helpers;

// Re-export commonly used types
pub use delete::DeletionCoordinator;
pub use error::{SyncError, SyncResult};
pub use events::{LifecycleDispatcher, LifecycleHandler, OffloadHandler};
pub use keys::{KeyError, NamingScheme};
pub use resolver::{AttachmentResolver, DerivativeLayout, MediaMetadataStore};
pub use upload::UploadCoordinator;
