//! Download API integration tests.
//!
//! Run with: `cargo test -p filedrop-api --test downloads_test`

mod helpers;

use bytes::Bytes;
use filedrop_storage::keys;
use helpers::{expired_record, live_record, seed_share, setup_test_app};
use serde_json::json;

#[tokio::test]
async fn test_download_unknown_id_is_not_found() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client.get("/download/nonexistent-id").await;

    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"].as_str().unwrap(), "File not found");
}

#[tokio::test]
async fn test_upload_then_download_round_trip() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post("/upload")
        .json(&json!({
            "filename": "a.txt",
            "content_type": "text/plain",
            "file_size": 100
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let upload: serde_json::Value = response.json();
    let file_id = upload["file_id"].as_str().unwrap();

    // Complete the out-of-band upload by writing the content bytes
    app.state
        .store
        .put(
            &keys::content_key(file_id, "a.txt"),
            Bytes::from_static(b"hello"),
            "text/plain",
        )
        .await
        .unwrap();

    let response = client.get(upload["download_path"].as_str().unwrap()).await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert!(body["download_url"].as_str().unwrap().contains("a.txt"));
    assert_eq!(body["filename"].as_str().unwrap(), "a.txt");
    assert_eq!(body["content_type"].as_str().unwrap(), "text/plain");
    assert_eq!(body["expiration_time"], upload["expiration_time"]);
}

#[tokio::test]
async fn test_download_without_content_is_content_not_found() {
    let app = setup_test_app().await;
    let client = app.client();

    let record = live_record("pending.txt");
    seed_share(&app, "half-done", &record, false).await;

    let response = client.get("/download/half-done").await;

    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"].as_str().unwrap(), "File content not found");
}

#[tokio::test]
async fn test_download_expired_share_is_not_found() {
    let app = setup_test_app().await;
    let client = app.client();

    let record = expired_record("old.txt");
    seed_share(&app, "stale", &record, true).await;

    let response = client.get("/download/stale").await;

    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"].as_str().unwrap(), "File not found");
}

#[tokio::test]
async fn test_download_unparseable_expiration_is_treated_as_expired() {
    let app = setup_test_app().await;
    let client = app.client();

    let mut record = live_record("weird.txt");
    record.expiration_time = "sometime next year".to_string();
    seed_share(&app, "weird", &record, true).await;

    let response = client.get("/download/weird").await;

    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"].as_str().unwrap(), "File not found");
}

#[tokio::test]
async fn test_download_malformed_metadata_is_internal_error() {
    let app = setup_test_app().await;
    let client = app.client();

    app.state
        .store
        .put(
            &keys::metadata_key("mangled"),
            Bytes::from_static(b"{\"original_filename\": 42"),
            "application/json",
        )
        .await
        .unwrap();

    let response = client.get("/download/mangled").await;

    assert_eq!(response.status_code(), 500);
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["error"].as_str().unwrap(),
        "An internal server error occurred"
    );
}

#[tokio::test]
async fn test_download_rejects_separator_in_id() {
    let app = setup_test_app().await;
    let client = app.client();

    // Percent-encoded slash decodes into the path parameter
    let response = client.get("/download/..%2Fescape").await;

    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"].as_str().unwrap(), "File not found");
}
