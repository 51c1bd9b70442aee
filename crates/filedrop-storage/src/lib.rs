//! Filedrop Storage Library
//!
//! This crate provides the object-store abstraction and backends for
//! filedrop. The [`ObjectStore`](traits::ObjectStore) trait covers the
//! put/get/list/delete/presign surface the service needs; implementations
//! exist for S3 (and S3-compatible providers) and the local filesystem.
//!
//! # Storage key format
//!
//! Every shared item occupies the key prefix `{file_id}/`:
//!
//! - `{file_id}/metadata.json` - the write-once metadata record
//! - `{file_id}/{original_filename}` - the content bytes
//!
//! Keys must not contain `..` segments or a leading `/`. Key derivation is
//! centralized in the [`keys`] module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod post_policy;
pub mod retry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_object_store;
pub use filedrop_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalObjectStore;
pub use retry::RetryPolicy;
#[cfg(feature = "storage-s3")]
pub use s3::S3ObjectStore;
pub use traits::{ObjectStore, StoreError, StoreResult};
