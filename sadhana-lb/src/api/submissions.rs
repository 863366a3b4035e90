//! Form submission intake

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use sadhana_common::records::{
    ActivityEvent, ActivityType, EventSource, ParsedTable, Submission,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::aggregate::UNKNOWN_TEAM;
use crate::db::kv::keys;
use crate::sync::{apply_direct_entry, merge_submissions};
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// POST /submissions request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmissionRequest {
    pub name: String,
    pub date: String,
    pub minutes: f64,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub thoughts: Option<String>,
    #[serde(default)]
    pub share_consent: bool,
}

/// POST /submissions
///
/// User-facing intake: dedups into the submission log and mirrors a
/// meditation event into the unified log and the meditation table.
pub async fn create_submission(
    State(state): State<AppState>,
    Json(request): Json<CreateSubmissionRequest>,
) -> ApiResult<Json<Submission>> {
    let name = request.name.trim().to_string();
    let date = request.date.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Submission name is required".to_string()));
    }
    if date.is_empty() {
        return Err(ApiError::BadRequest("Submission date is required".to_string()));
    }
    if !(request.minutes > 0.0) || !request.minutes.is_finite() {
        return Err(ApiError::BadRequest(
            "Submission minutes must be a positive number".to_string(),
        ));
    }

    let now = Utc::now();
    let submission = Submission {
        id: Uuid::new_v4().to_string(),
        name: name.clone(),
        date: date.clone(),
        minutes: request.minutes,
        time_of_day: request.time_of_day.filter(|t| !t.trim().is_empty()),
        thoughts: request.thoughts.filter(|t| !t.trim().is_empty()),
        share_consent: request.share_consent,
        timestamp: now.format("%-m/%-d/%Y %-I:%M:%S %p").to_string(),
        submitted_at: now.timestamp_millis(),
        source: EventSource::Form,
    };

    let existing: Vec<Submission> = state.store.get_or_default(keys::SUBMISSIONS_ALL).await;
    let submissions = merge_submissions(existing, vec![submission.clone()]);

    // Mirror as a meditation event; the member's sheet team is reused
    // when one is known
    let mut table: ParsedTable = state.store.get_or_default(keys::MEDITATION).await;
    let team = table
        .members
        .iter()
        .find(|m| m.name == name)
        .map(|m| m.team.clone())
        .unwrap_or_default();
    let table_team = if team.is_empty() { UNKNOWN_TEAM } else { team.as_str() };

    let mut event = ActivityEvent::new(
        ActivityType::Meditation,
        team.clone(),
        name.clone(),
        date.clone(),
        request.minutes,
        EventSource::Form,
    );
    event.thoughts = submission.thoughts.clone();
    event.time_of_day = submission.time_of_day.clone();

    let mut activities: Vec<ActivityEvent> = state.store.get_or_default(keys::ACTIVITIES_ALL).await;
    activities.push(event);

    apply_direct_entry(
        &mut table,
        ActivityType::Meditation,
        table_team,
        &name,
        &date,
        request.minutes,
    );

    let (submissions_write, activities_write, table_write) = tokio::join!(
        state.store.set_permanent(keys::SUBMISSIONS_ALL, &submissions),
        state.store.set_permanent(keys::ACTIVITIES_ALL, &activities),
        state.store.set(keys::MEDITATION, &table, None),
    );
    submissions_write?;
    activities_write?;
    table_write?;

    tracing::info!(member = %name, minutes = request.minutes, "Submission recorded");

    Ok(Json(submission))
}

/// GET /submissions
pub async fn list_submissions(State(state): State<AppState>) -> ApiResult<Json<Vec<Submission>>> {
    let submissions: Vec<Submission> = state.store.get_or_default(keys::SUBMISSIONS_ALL).await;
    Ok(Json(submissions))
}

/// Build submission routes
pub fn submission_routes() -> Router<AppState> {
    Router::new().route("/submissions", get(list_submissions).post(create_submission))
}
