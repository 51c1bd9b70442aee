//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p filedrop-api --test uploads_test` or
//! `cargo test -p filedrop-api`. Shares are stored in a per-test temp directory.

use axum_test::TestServer;
use bytes::Bytes;
use chrono::{Duration, Utc};
use filedrop_api::services::CleanupSweeper;
use filedrop_api::setup::routes::setup_routes;
use filedrop_api::state::AppState;
use filedrop_core::models::ShareRecord;
use filedrop_core::{Config, StorageBackend};
use filedrop_storage::keys;
use filedrop_storage::{LocalObjectStore, ObjectStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        storage_backend: StorageBackend::Local,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: "unused-in-tests".to_string(),
        local_storage_base_url: "http://localhost:4000/files".to_string(),
        max_file_size_mb: 10,
        allowed_content_types: vec![
            "text/plain".to_string(),
            "application/pdf".to_string(),
            "image/png".to_string(),
        ],
        upload_url_expiry_secs: 300,
        download_url_expiry_secs: 900,
        retention_hours: 24,
        store_max_retries: 3,
        cleanup_interval_secs: 0,
        lifecycle_guard_days: 0,
    }
}

/// Setup test app with isolated local storage.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let config = test_config();
    let store: Arc<dyn ObjectStore> = Arc::new(
        LocalObjectStore::new(
            temp_dir.path().to_path_buf(),
            config.local_storage_base_url.clone(),
        )
        .await
        .expect("Failed to create local storage"),
    );

    let sweeper = Arc::new(CleanupSweeper::new(store.clone()));
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        sweeper,
    });

    let router = setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

/// Write a metadata record (and optionally content bytes) straight into the
/// store, as if a caller had completed the out-of-band upload.
#[allow(dead_code)]
pub async fn seed_share(app: &TestApp, file_id: &str, record: &ShareRecord, with_content: bool) {
    app.state
        .store
        .put(
            &keys::metadata_key(file_id),
            Bytes::from(serde_json::to_vec(record).expect("serializable record")),
            "application/json",
        )
        .await
        .expect("Failed to write metadata");

    if with_content {
        app.state
            .store
            .put(
                &keys::content_key(file_id, &record.original_filename),
                Bytes::from_static(b"payload-bytes"),
                &record.content_type,
            )
            .await
            .expect("Failed to write content");
    }
}

#[allow(dead_code)]
pub fn live_record(filename: &str) -> ShareRecord {
    ShareRecord::new(filename, "text/plain", 13, Utc::now(), Duration::hours(24))
}

#[allow(dead_code)]
pub fn expired_record(filename: &str) -> ShareRecord {
    ShareRecord::new(
        filename,
        "text/plain",
        13,
        Utc::now() - Duration::hours(48),
        Duration::hours(24),
    )
}
