//! Team CRUD handlers

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use sadhana_common::records::{ParsedTable, Team};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db::kv::keys;
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

const DEFAULT_TEAM_COLOR: &str = "#64748b";

/// Team set seeded on first read
fn default_teams() -> Vec<Team> {
    vec![
        Team {
            id: "lotus".to_string(),
            name: "Lotus".to_string(),
            short_name: "LTS".to_string(),
            color: "#7c3aed".to_string(),
        },
        Team {
            id: "cedar".to_string(),
            name: "Cedar".to_string(),
            short_name: "CDR".to_string(),
            color: "#16a34a".to_string(),
        },
        Team {
            id: "juniper".to_string(),
            name: "Juniper".to_string(),
            short_name: "JNP".to_string(),
            color: "#0ea5e9".to_string(),
        },
    ]
}

/// GET /teams
///
/// Lazily seeds the default team set on first read.
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Json<Vec<Team>>> {
    match state.store.get::<Vec<Team>>(keys::TEAMS).await {
        Ok(Some(teams)) => Ok(Json(teams)),
        Ok(None) => {
            let teams = default_teams();
            state.store.set_permanent(keys::TEAMS, &teams).await?;
            tracing::info!(count = teams.len(), "Seeded default teams");
            Ok(Json(teams))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Team read failed, serving defaults");
            Ok(Json(default_teams()))
        }
    }
}

/// POST /teams request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// POST /teams
pub async fn create_team(
    State(state): State<AppState>,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<Json<Team>> {
    let name = request.name.trim().to_string();
    let short_name = request.short_name.trim().to_string();
    if name.is_empty() || short_name.is_empty() {
        return Err(ApiError::BadRequest(
            "Team name and shortName are required".to_string(),
        ));
    }

    let id = request
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut teams: Vec<Team> = state.store.get_or_default(keys::TEAMS).await;
    let collision = teams.iter().any(|t| {
        t.id == id
            || t.name.eq_ignore_ascii_case(&name)
            || t.short_name.eq_ignore_ascii_case(&short_name)
    });
    if collision {
        return Err(ApiError::Conflict(format!(
            "Team with the same id, name, or shortName already exists: {}",
            name
        )));
    }

    let team = Team {
        id,
        name,
        short_name,
        color: request
            .color
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_TEAM_COLOR.to_string()),
    };
    teams.push(team.clone());
    state.store.set_permanent(keys::TEAMS, &teams).await?;

    tracing::info!(team = %team.name, id = %team.id, "Team created");

    Ok(Json(team))
}

/// DELETE /teams/{id}
///
/// Refused while any per-type table member still references the team.
pub async fn delete_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut teams: Vec<Team> = state.store.get_or_default(keys::TEAMS).await;
    let Some(position) = teams.iter().position(|t| t.id == id) else {
        return Err(ApiError::NotFound(format!("Team not found: {}", id)));
    };
    let team = teams[position].clone();

    let (meditation, practice, class) = tokio::join!(
        state.store.get_or_default::<ParsedTable>(keys::MEDITATION),
        state.store.get_or_default::<ParsedTable>(keys::PRACTICE),
        state.store.get_or_default::<ParsedTable>(keys::CLASS),
    );
    let references: usize = [&meditation, &practice, &class]
        .iter()
        .map(|table| {
            table
                .members
                .iter()
                .filter(|m| m.team == team.name)
                .count()
        })
        .sum();
    if references > 0 {
        return Err(ApiError::Conflict(format!(
            "Team '{}' still has {} member record(s)",
            team.name, references
        )));
    }

    teams.remove(position);
    state.store.set_permanent(keys::TEAMS, &teams).await?;

    tracing::info!(team = %team.name, id = %team.id, "Team deleted");

    Ok(Json(json!({ "deleted": team.id })))
}

/// Build team routes
pub fn team_routes() -> Router<AppState> {
    Router::new()
        .route("/teams", get(list_teams).post(create_team))
        .route("/teams/:id", delete(delete_team))
}
