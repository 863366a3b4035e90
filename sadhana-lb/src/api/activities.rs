//! Unified activity log handlers

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use sadhana_common::records::{ActivityEvent, ActivityType, EventSource, ParsedTable};
use serde::Deserialize;
use serde_json::json;

use crate::aggregate::UNKNOWN_TEAM;
use crate::db::kv::{keys, table_key};
use crate::{
    error::{ApiError, ApiResult},
    sync, AppState,
};

const DEFAULT_LIST_LIMIT: usize = 50;

/// POST /activities request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    #[serde(rename = "type")]
    pub activity: ActivityType,
    #[serde(default)]
    pub team: Option<String>,
    pub member: String,
    pub date: String,
    pub value: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub thoughts: Option<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
}

/// POST /activities
///
/// Direct admin write: appends to the unified log and accumulates into
/// the matching per-type table. Validation happens before any I/O.
pub async fn create_activity(
    State(state): State<AppState>,
    Json(request): Json<CreateActivityRequest>,
) -> ApiResult<Json<ActivityEvent>> {
    let member = request.member.trim().to_string();
    let date = request.date.trim().to_string();
    if member.is_empty() {
        return Err(ApiError::BadRequest("Activity member is required".to_string()));
    }
    if date.is_empty() {
        return Err(ApiError::BadRequest("Activity date is required".to_string()));
    }
    if !request.value.is_finite() || request.value < 0.0 {
        return Err(ApiError::BadRequest(
            "Activity value must be a non-negative number".to_string(),
        ));
    }

    let team = request
        .team
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_default();

    let mut event = ActivityEvent::new(
        request.activity,
        team.clone(),
        member.clone(),
        date.clone(),
        request.value,
        EventSource::Admin,
    );
    event.notes = request.notes.filter(|n| !n.trim().is_empty());
    event.thoughts = request.thoughts.filter(|t| !t.trim().is_empty());
    event.time_of_day = request.time_of_day.filter(|t| !t.trim().is_empty());

    let mut activities: Vec<ActivityEvent> = state.store.get_or_default(keys::ACTIVITIES_ALL).await;
    activities.push(event.clone());

    let key = table_key(request.activity);
    let mut table: ParsedTable = state.store.get_or_default(key).await;
    let table_team = if team.is_empty() { UNKNOWN_TEAM } else { team.as_str() };
    sync::apply_direct_entry(
        &mut table,
        request.activity,
        table_team,
        &member,
        &date,
        request.value,
    );

    let (log_write, table_write) = tokio::join!(
        state.store.set_permanent(keys::ACTIVITIES_ALL, &activities),
        state.store.set(key, &table, None),
    );
    log_write?;
    table_write?;

    tracing::info!(
        activity = request.activity.as_str(),
        member = %member,
        value = request.value,
        "Direct activity recorded"
    );

    Ok(Json(event))
}

/// GET /activities query parameters
#[derive(Debug, Deserialize)]
pub struct ListActivitiesParams {
    pub limit: Option<usize>,
}

/// GET /activities
///
/// Most recent events first.
pub async fn list_activities(
    State(state): State<AppState>,
    Query(params): Query<ListActivitiesParams>,
) -> ApiResult<Json<Vec<ActivityEvent>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let activities: Vec<ActivityEvent> = state.store.get_or_default(keys::ACTIVITIES_ALL).await;

    Ok(Json(activities.into_iter().rev().take(limit).collect()))
}

/// DELETE /activities/{id}
pub async fn delete_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut activities: Vec<ActivityEvent> = state.store.get_or_default(keys::ACTIVITIES_ALL).await;
    let before = activities.len();
    activities.retain(|e| e.id != id);
    if activities.len() == before {
        return Err(ApiError::NotFound(format!("Activity not found: {}", id)));
    }

    state
        .store
        .set_permanent(keys::ACTIVITIES_ALL, &activities)
        .await?;

    tracing::info!(activity_id = %id, "Activity deleted");

    Ok(Json(json!({ "deleted": id })))
}

/// Build activity routes
pub fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/activities", get(list_activities).post(create_activity))
        .route("/activities/:id", delete(delete_activity))
}
