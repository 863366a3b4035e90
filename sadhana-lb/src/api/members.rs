//! Member listing and manual member metadata

use axum::{extract::State, routing::get, Json, Router};
use sadhana_common::records::{ActivityEvent, ManualMember, SyncedMember};
use serde::Serialize;

use crate::aggregate::{self, MemberTotals};
use crate::db::kv::keys;
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// One row of the layered member listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberListing {
    pub team: String,
    pub name: String,
    pub meditation_points: f64,
    pub practice_points: f64,
    pub class_points: f64,
    pub total: f64,
}

impl From<MemberTotals> for MemberListing {
    fn from(totals: MemberTotals) -> Self {
        let total = totals.total();
        Self {
            team: totals.team,
            name: totals.name,
            meditation_points: totals.meditation_points,
            practice_points: totals.practice_points,
            class_points: totals.class_points,
            total,
        }
    }
}

/// GET /members response
#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<MemberListing>,
}

/// GET /members
///
/// Layered composition, in precedence order: synced baseline, then
/// totals computed from the unified log, then manual overrides.
pub async fn list_members(State(state): State<AppState>) -> ApiResult<Json<MembersResponse>> {
    let (synced, activities, manual) = tokio::join!(
        state.store.get_or_default::<Vec<SyncedMember>>(keys::MEMBERS_SYNCED),
        state.store.get_or_default::<Vec<ActivityEvent>>(keys::ACTIVITIES_ALL),
        state.store.get_or_default::<Vec<ManualMember>>(keys::MEMBERS_ALL),
    );

    let listing = aggregate::apply_overrides(
        aggregate::apply_computed(
            aggregate::apply_baseline(&synced),
            aggregate::aggregate_events(&activities),
        ),
        &manual,
    );

    Ok(Json(MembersResponse {
        members: listing.into_iter().map(Into::into).collect(),
    }))
}

/// POST /members
///
/// Upsert admin-entered member metadata, matched by name.
pub async fn upsert_member(
    State(state): State<AppState>,
    Json(record): Json<ManualMember>,
) -> ApiResult<Json<ManualMember>> {
    if record.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Member name is required".to_string()));
    }

    let mut manual: Vec<ManualMember> = state.store.get_or_default(keys::MEMBERS_ALL).await;
    match manual.iter().position(|m| m.name == record.name) {
        Some(i) => manual[i] = record.clone(),
        None => manual.push(record.clone()),
    }
    state.store.set_permanent(keys::MEMBERS_ALL, &manual).await?;

    tracing::info!(member = %record.name, "Manual member record saved");

    Ok(Json(record))
}

/// Build member routes
pub fn member_routes() -> Router<AppState> {
    Router::new().route("/members", get(list_members).post(upsert_member))
}
