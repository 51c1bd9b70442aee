use chrono::Utc;
use filedrop_core::models::{CleanupSummary, ShareRecord};
use filedrop_storage::keys;
use filedrop_storage::{ObjectStore, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Removes expired shares from the object store.
///
/// The sweeper only ever deletes a share it could fully evaluate: a prefix
/// whose metadata record is missing, unreadable, or carries an unparseable
/// expiration time is counted and skipped, never deleted. The download path
/// makes the opposite call and treats those records as expired.
#[derive(Clone)]
pub struct CleanupSweeper {
    store: Arc<dyn ObjectStore>,
}

impl CleanupSweeper {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Start the background cleanup task that runs every `interval_secs`
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut cleanup_interval = interval(Duration::from_secs(interval_secs));

            loop {
                cleanup_interval.tick().await;

                tracing::info!("Starting scheduled cleanup of expired shares");

                match self.sweep().await {
                    Ok(summary) => {
                        tracing::info!(
                            checked = summary.checked,
                            deleted = summary.deleted,
                            "Cleanup task completed successfully"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Cleanup task failed");
                    }
                }
            }
        })
    }

    /// Sweep the whole store once and delete every expired share
    #[tracing::instrument(skip(self), fields(cleanup.operation = "expire_all"))]
    pub async fn sweep(&self) -> StoreResult<CleanupSummary> {
        let start = std::time::Instant::now();
        let prefixes = self.store.list_prefixes().await?;

        let mut summary = CleanupSummary {
            checked: 0,
            deleted: 0,
        };

        for file_id in prefixes {
            summary.checked += 1;

            let metadata_key = keys::metadata_key(&file_id);
            let bytes = match self.store.get(&metadata_key).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    tracing::warn!(file_id = %file_id, "Metadata record missing, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        file_id = %file_id,
                        "Failed to read metadata record, skipping"
                    );
                    continue;
                }
            };

            let record: ShareRecord = match serde_json::from_slice(&bytes) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        file_id = %file_id,
                        "Malformed metadata record, skipping"
                    );
                    continue;
                }
            };

            let expires = match record.expires_at() {
                Some(expires) => expires,
                None => {
                    tracing::warn!(
                        file_id = %file_id,
                        expiration_time = %record.expiration_time,
                        "Unreadable expiration time, skipping"
                    );
                    continue;
                }
            };

            if Utc::now() <= expires {
                continue;
            }

            tracing::info!(
                file_id = %file_id,
                filename = %record.original_filename,
                expiration_time = %record.expiration_time,
                "Deleting expired share"
            );

            let keys = match self.store.list_keys(&file_id).await {
                Ok(keys) => keys,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        file_id = %file_id,
                        "Failed to list share objects, continuing with next share"
                    );
                    continue;
                }
            };

            match self.store.delete_many(&keys).await {
                Ok(()) => {
                    summary.deleted += 1;
                    tracing::debug!(
                        file_id = %file_id,
                        objects = keys.len(),
                        "Successfully deleted from storage"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        file_id = %file_id,
                        "Failed to delete share from storage, continuing with next share"
                    );
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            deleted = summary.deleted,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cleanup completed"
        );

        Ok(summary)
    }
}
