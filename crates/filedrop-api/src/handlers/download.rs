use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use filedrop_core::models::{DownloadResponse, ShareRecord};
use filedrop_core::AppError;
use filedrop_storage::keys;
use std::sync::Arc;

fn file_not_found() -> HttpAppError {
    HttpAppError(AppError::NotFound("File not found".to_string()))
}

/// Resolve a share to a presigned download URL
///
/// Expired shares answer exactly like missing ones. A share whose metadata
/// exists but whose content was never uploaded gets the distinct
/// "File content not found" response.
#[utoipa::path(
    get,
    path = "/download/{file_id}",
    tag = "shares",
    params(
        ("file_id" = String, Path, description = "Share identifier returned by the upload endpoint")
    ),
    responses(
        (status = 200, description = "Presigned download URL", body = DownloadResponse),
        (status = 404, description = "Share missing, expired, or content not uploaded", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(file_id = %file_id, operation = "resolve_download"))]
pub async fn resolve_download(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    // Path parameters are percent-decoded, so a crafted request can still
    // smuggle separators into the identifier. Such ids never exist.
    if file_id.is_empty() || file_id.contains(['/', '\\']) || file_id == "." || file_id == ".." {
        return Err(file_not_found());
    }

    let bytes = state
        .store
        .get(&keys::metadata_key(&file_id))
        .await?
        .ok_or_else(file_not_found)?;

    let record: ShareRecord = serde_json::from_slice(&bytes).map_err(|e| {
        AppError::InternalWithSource {
            message: "Malformed metadata record".to_string(),
            source: e.into(),
        }
    })?;

    if record.expires_at().is_none() {
        tracing::warn!(
            expiration_time = %record.expiration_time,
            "Unreadable expiration time, treating share as expired"
        );
    }
    if record.is_expired(Utc::now()) {
        return Err(file_not_found());
    }

    let content_key = keys::content_key(&file_id, &record.original_filename);
    if !state.store.exists(&content_key).await? {
        return Err(HttpAppError(AppError::NotFound(
            "File content not found".to_string(),
        )));
    }

    let download_url = state
        .store
        .presign_download(
            &content_key,
            &record.original_filename,
            state.config.download_url_expiry(),
        )
        .await?;

    tracing::debug!(filename = %record.original_filename, "Resolved share to download URL");

    Ok(Json(DownloadResponse {
        download_url,
        filename: record.original_filename,
        content_type: record.content_type,
        expiration_time: record.expiration_time,
    }))
}
