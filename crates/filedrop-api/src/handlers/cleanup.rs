use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use filedrop_core::models::CleanupSummary;
use std::sync::Arc;

/// Sweep the store once and delete expired shares
///
/// The same sweep the scheduled background task runs, exposed so an external
/// scheduler (cron, Cloud Scheduler) can drive cleanup instead.
#[utoipa::path(
    post,
    path = "/internal/cleanup",
    tag = "internal",
    responses(
        (status = 200, description = "Sweep finished", body = CleanupSummary),
        (status = 500, description = "Sweep could not enumerate the store", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "run_cleanup"))]
pub async fn run_cleanup(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let summary = state.sweeper.sweep().await?;
    Ok(Json(summary))
}
