//! Read path for the per-type tables

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use sadhana_common::records::{ParsedTable, RecentEntry, SyncMeta, SyncMode};
use serde::Serialize;

use crate::db::kv::keys;
use crate::{error::ApiResult, sync, AppState};

/// GET /data response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub meditation: ParsedTable,
    pub practice: ParsedTable,
    pub class: ParsedTable,
    pub recent_activity: Vec<RecentEntry>,
    /// Whether this response was served from cache or freshly synced
    pub cached: bool,
    /// Cache age at serve time, None when nothing has ever synced
    pub cache_age_seconds: Option<i64>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// GET /data
///
/// Serves the best-known per-type tables. A missing or stale cache
/// triggers a fresh merge-mode sync; if that refresh fails the cached
/// state is served anyway rather than failing the read.
pub async fn get_data(State(state): State<AppState>) -> ApiResult<Json<DataResponse>> {
    let max_age = state.settings.cache_max_age_seconds;

    let meta: Option<SyncMeta> = match state.store.get(keys::META).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!(error = %e, "Sync metadata read failed, treating as uncached");
            None
        }
    };
    let age = meta
        .as_ref()
        .map(|m| (Utc::now() - m.synced_at).num_seconds());

    let mut cached = true;
    if age.map_or(true, |a| a > max_age) {
        let sources = state.sheets.fetch_all().await;
        match sync::run_sync(&state.store, SyncMode::Merge, sources).await {
            Ok(_) => cached = false,
            Err(e) => {
                tracing::warn!(error = %e, "Refresh failed, serving cached data");
                state.record_error(e.to_string()).await;
            }
        }
    }

    let (meditation, practice, class) = tokio::join!(
        state.store.get_or_default::<ParsedTable>(keys::MEDITATION),
        state.store.get_or_default::<ParsedTable>(keys::PRACTICE),
        state.store.get_or_default::<ParsedTable>(keys::CLASS),
    );

    let meta: Option<SyncMeta> = if cached {
        meta
    } else {
        state.store.get(keys::META).await.unwrap_or(None)
    };
    let (recent_activity, synced_at) = match meta {
        Some(m) => (m.recent_activity, Some(m.synced_at)),
        None => (Vec::new(), None),
    };

    Ok(Json(DataResponse {
        meditation,
        practice,
        class,
        recent_activity,
        cached,
        cache_age_seconds: if cached { age } else { Some(0) },
        synced_at,
    }))
}

/// Build data routes
pub fn data_routes() -> Router<AppState> {
    Router::new().route("/data", get(get_data))
}
