//! Sync trigger API handler

use axum::{extract::State, routing::post, Json, Router};
use sadhana_common::records::SyncMode;
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    sync, AppState,
};

/// POST /sync request
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub mode: String,
}

/// POST /sync
///
/// Fetches the four spreadsheet exports and reconciles them against
/// the store under the requested mode. An unknown mode is rejected
/// before any I/O occurs.
pub async fn trigger_sync(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> ApiResult<Json<sync::SyncSummary>> {
    let mode = match request.mode.as_str() {
        "merge" => SyncMode::Merge,
        "overwrite" => SyncMode::Overwrite,
        other => {
            return Err(ApiError::BadRequest(format!(
                "Invalid sync mode: '{}' (expected 'merge' or 'overwrite')",
                other
            )))
        }
    };

    let sources = state.sheets.fetch_all().await;

    match sync::run_sync(&state.store, mode, sources).await {
        Ok(summary) => {
            tracing::info!(
                mode = mode.as_str(),
                meditation = summary.meditation_members,
                practice = summary.practice_members,
                class = summary.class_members,
                submissions = summary.submission_count,
                "Sync completed"
            );
            Ok(Json(summary))
        }
        Err(e) => {
            tracing::error!(mode = mode.as_str(), error = %e, "Sync failed");
            state.record_error(e.to_string()).await;
            Err(ApiError::Internal(format!("Sync failed: {}", e)))
        }
    }
}

/// Build sync routes
pub fn sync_routes() -> Router<AppState> {
    Router::new().route("/sync", post(trigger_sync))
}
