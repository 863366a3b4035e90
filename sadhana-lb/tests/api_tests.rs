//! HTTP API integration tests
//!
//! Drive the router with oneshot requests against an in-memory store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sadhana_common::config::Settings;
use sadhana_lb::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Create test app state with in-memory database
async fn test_app_state() -> AppState {
    let pool = sqlx::SqlitePool::connect(":memory:").await.unwrap();
    sadhana_lb::db::init_tables(&pool).await.unwrap();
    AppState::new(pool, Settings::default())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = build_router(test_app_state().await);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "sadhana-lb");
}

#[tokio::test]
async fn sync_rejects_unknown_mode() {
    let app = build_router(test_app_state().await);

    let response = app
        .oneshot(post_json("/sync", json!({ "mode": "replace" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn sync_with_no_configured_sources_succeeds() {
    let app = build_router(test_app_state().await);

    let response = app
        .oneshot(post_json("/sync", json!({ "mode": "merge" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["mode"], "merge");
    assert_eq!(body["meditationMembers"], 0);
    assert_eq!(body["verifiedMemberCount"], 0);
}

#[tokio::test]
async fn direct_writes_accumulate_minutes() {
    let state = test_app_state().await;

    for value in [20.0, 15.0] {
        let app = build_router(state.clone());
        let response = app
            .oneshot(post_json(
                "/activities",
                json!({
                    "type": "meditation",
                    "team": "Lotus",
                    "member": "Asha",
                    "date": "1/5",
                    "value": value,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let app = build_router(state);
    let response = app.oneshot(get("/data")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let members = body["meditation"]["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["total"], 35.0);
    assert_eq!(members[0]["daily"]["1/5"], 35.0);
}

#[tokio::test]
async fn direct_write_requires_member_and_nonnegative_value() {
    let state = test_app_state().await;

    let app = build_router(state.clone());
    let response = app
        .oneshot(post_json(
            "/activities",
            json!({ "type": "meditation", "member": "", "date": "1/5", "value": 20.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let app = build_router(state);
    let response = app
        .oneshot(post_json(
            "/activities",
            json!({ "type": "meditation", "member": "Asha", "date": "1/5", "value": -5.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn activity_delete_removes_event_once() {
    let state = test_app_state().await;

    let app = build_router(state.clone());
    let response = app
        .oneshot(post_json(
            "/activities",
            json!({ "type": "practice", "member": "Asha", "date": "1/5", "value": 10.0 }),
        ))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let app = build_router(state.clone());
    let response = app.oneshot(delete(&format!("/activities/{}", id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let app = build_router(state);
    let response = app.oneshot(delete(&format!("/activities/{}", id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn team_deletion_guard_blocks_referenced_teams() {
    let state = test_app_state().await;

    // Put a member on team Lotus in the meditation table
    let app = build_router(state.clone());
    app.oneshot(post_json(
        "/activities",
        json!({ "type": "meditation", "team": "Lotus", "member": "Asha", "date": "1/5", "value": 20.0 }),
    ))
    .await
    .unwrap();

    // First read seeds the default team set
    let app = build_router(state.clone());
    let response = app.oneshot(get("/teams")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await.as_array().unwrap().len() >= 2);

    let app = build_router(state.clone());
    let response = app.oneshot(delete("/teams/lotus")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");

    // A team with no member records deletes cleanly
    let app = build_router(state.clone());
    let response = app.oneshot(delete("/teams/cedar")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let app = build_router(state);
    let response = app.oneshot(delete("/teams/absent")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn team_uniqueness_is_enforced() {
    let state = test_app_state().await;

    let app = build_router(state.clone());
    let response = app
        .oneshot(post_json(
            "/teams",
            json!({ "name": "Willow", "shortName": "WLW" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let app = build_router(state);
    let response = app
        .oneshot(post_json(
            "/teams",
            json!({ "name": "willow", "shortName": "XYZ" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn submission_flow_feeds_members_listing() {
    let state = test_app_state().await;

    let app = build_router(state.clone());
    let response = app
        .oneshot(post_json(
            "/submissions",
            json!({ "name": "Asha", "date": "1/5", "minutes": 30.0, "shareConsent": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let app = build_router(state.clone());
    let response = app.oneshot(get("/submissions")).await.unwrap();
    let submissions = body_json(response).await;
    assert_eq!(submissions.as_array().unwrap().len(), 1);

    let app = build_router(state);
    let response = app.oneshot(get("/members")).await.unwrap();
    let body = body_json(response).await;
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["name"], "Asha");
    assert_eq!(members[0]["meditationPoints"], 30.0);
    assert_eq!(members[0]["team"], "unknown");
}

#[tokio::test]
async fn submission_requires_positive_minutes() {
    let app = build_router(test_app_state().await);

    let response = app
        .oneshot(post_json(
            "/submissions",
            json!({ "name": "Asha", "date": "1/5", "minutes": 0.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn manual_override_moves_team_without_touching_scores() {
    let state = test_app_state().await;

    let app = build_router(state.clone());
    app.oneshot(post_json(
        "/submissions",
        json!({ "name": "Asha", "date": "1/5", "minutes": 30.0 }),
    ))
    .await
    .unwrap();

    let app = build_router(state.clone());
    let response = app
        .oneshot(post_json("/members", json!({ "name": "Asha", "team": "Juniper" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let app = build_router(state);
    let response = app.oneshot(get("/members")).await.unwrap();
    let body = body_json(response).await;
    let members = body["members"].as_array().unwrap();
    assert_eq!(members[0]["team"], "Juniper");
    assert_eq!(members[0]["meditationPoints"], 30.0);
}

#[tokio::test]
async fn data_read_reports_cache_state() {
    let state = test_app_state().await;

    // Nothing cached yet: the read performs a fresh (empty) sync
    let app = build_router(state.clone());
    let response = app.oneshot(get("/data")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["cached"], false);
    assert_eq!(body["cacheAgeSeconds"], 0);

    // Second read is served from the metadata-stamped cache
    let app = build_router(state);
    let response = app.oneshot(get("/data")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["cached"], true);
    assert!(body["syncedAt"].is_string());
}
