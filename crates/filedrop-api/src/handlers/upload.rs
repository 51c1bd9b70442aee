use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use bytes::Bytes;
use chrono::Utc;
use filedrop_core::models::{ShareRecord, UploadRequest, UploadResponse};
use filedrop_core::AppError;
use filedrop_storage::keys;
use std::sync::Arc;
use uuid::Uuid;

/// Longest filename accepted; also bounds the derived storage keys.
const MAX_FILENAME_LEN: usize = 255;

/// Check that a filename is usable as the final segment of a storage key on
/// every backend: bounded length, no path separators, no NUL, not a dot
/// directory reference.
fn filename_is_well_formed(filename: &str) -> bool {
    filename.len() <= MAX_FILENAME_LEN
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\', '\0'])
}

/// Create a presigned upload for a new share
///
/// Writes the metadata record first, then issues the upload credential. The
/// caller uploads the bytes directly to the object store; a record without
/// content is expected until that upload completes.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "shares",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Presigned upload created", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        filename = ?request.filename,
        file_size = ?request.file_size,
        operation = "create_upload"
    )
)]
pub async fn create_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let config = &state.config;

    // Validation order is part of the API contract: the first failing check
    // answers, and nothing is written before all checks pass.
    let filename = match request.filename.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(HttpAppError::from(AppError::InvalidInput(
                "Filename is required".to_string(),
            )))
        }
    };

    if !filename_is_well_formed(filename) {
        return Err(HttpAppError::from(AppError::InvalidInput(
            "Invalid filename".to_string(),
        )));
    }

    let content_type = match request.content_type.as_deref() {
        Some(ct) if !ct.is_empty() => ct,
        _ => {
            return Err(HttpAppError::from(AppError::InvalidInput(
                "Content type is required".to_string(),
            )))
        }
    };

    let file_size = match request.file_size {
        Some(size) if size > 0 => size as u64,
        _ => {
            return Err(HttpAppError::from(AppError::InvalidInput(
                "Valid file size is required".to_string(),
            )))
        }
    };

    if file_size > config.max_file_size_bytes() {
        return Err(HttpAppError::from(AppError::InvalidInput(format!(
            "File size exceeds the maximum limit of {}MB",
            config.max_file_size_mb
        ))));
    }

    if !config.content_type_allowed(content_type) {
        return Err(HttpAppError::from(AppError::InvalidInput(format!(
            "Content type {} is not allowed",
            content_type
        ))));
    }

    let file_id = Uuid::new_v4();
    let record = ShareRecord::new(
        filename,
        content_type,
        file_size,
        Utc::now(),
        config.retention(),
    );

    let metadata = serde_json::to_vec(&record).map_err(AppError::from)?;
    state
        .store
        .put(
            &keys::metadata_key(&file_id.to_string()),
            Bytes::from(metadata),
            "application/json",
        )
        .await?;

    let upload_data = state
        .store
        .presign_upload(
            &keys::content_key(&file_id.to_string(), filename),
            content_type,
            config.max_file_size_bytes(),
            config.upload_url_expiry(),
        )
        .await?;

    tracing::info!(
        file_id = %file_id,
        filename = %filename,
        content_type = %content_type,
        size_bytes = file_size,
        "Created presigned upload"
    );

    Ok(Json(UploadResponse {
        file_id,
        upload_data,
        download_path: format!("/download/{}", file_id),
        expiration_time: record.expiration_time,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_filenames_are_well_formed() {
        assert!(filename_is_well_formed("report.pdf"));
        assert!(filename_is_well_formed("photo (1).jpg"));
        assert!(filename_is_well_formed("café.txt"));
    }

    #[test]
    fn path_separators_are_rejected() {
        assert!(!filename_is_well_formed("a/b.txt"));
        assert!(!filename_is_well_formed("a\\b.txt"));
        assert!(!filename_is_well_formed("nul\0.txt"));
    }

    #[test]
    fn dot_references_are_rejected() {
        assert!(!filename_is_well_formed("."));
        assert!(!filename_is_well_formed(".."));
        assert!(filename_is_well_formed("..config"));
    }

    #[test]
    fn overlong_filenames_are_rejected() {
        let name = "a".repeat(MAX_FILENAME_LEN + 1);
        assert!(!filename_is_well_formed(&name));
        let name = "a".repeat(MAX_FILENAME_LEN);
        assert!(filename_is_well_formed(&name));
    }
}
