//! Storage setup and initialization

use anyhow::Result;
use filedrop_core::Config;
use filedrop_storage::{create_object_store, ObjectStore};
use std::sync::Arc;

/// Setup the object store selected by configuration
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    tracing::info!("Initializing storage abstraction...");
    let store = create_object_store(config).await?;
    tracing::info!(
        backend = ?store.backend_type(),
        "Storage abstraction initialized successfully"
    );
    Ok(store)
}
