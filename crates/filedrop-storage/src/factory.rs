#[cfg(feature = "storage-local")]
use crate::LocalObjectStore;
#[cfg(feature = "storage-s3")]
use crate::{RetryPolicy, S3ObjectStore};
use crate::{ObjectStore, StorageBackend, StoreError, StoreResult};
use filedrop_core::Config;
use std::sync::Arc;

/// Create the object store selected by configuration.
///
/// Called once at startup; the returned store is shared across the process
/// behind `Arc<dyn ObjectStore>`.
pub async fn create_object_store(config: &Config) -> StoreResult<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let retry = RetryPolicy::new(config.store_max_retries);
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StoreError::Config("S3_BUCKET not configured".to_string()))?;
            let region = config
                .s3_region
                .clone()
                .or_else(|| config.aws_region.clone())
                .unwrap_or_else(|| "us-east-1".to_string());
            let endpoint = config.s3_endpoint.clone();

            let store = S3ObjectStore::new(bucket, region, endpoint, retry).await?;

            // Best-effort; failure is logged, not fatal.
            if config.lifecycle_guard_days > 0 {
                if let Err(err) = store
                    .ensure_lifecycle_rule(config.lifecycle_guard_days)
                    .await
                {
                    tracing::warn!(
                        error = %err,
                        days = config.lifecycle_guard_days,
                        "Could not install lifecycle expiration rule"
                    );
                }
            }

            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StoreError::Config(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let store = LocalObjectStore::new(
                config.local_storage_path.clone(),
                config.local_storage_base_url.clone(),
            )
            .await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StoreError::Config(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
