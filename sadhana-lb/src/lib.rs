//! sadhana-lb library interface for testing
//!
//! Exposes public APIs for integration testing

pub mod aggregate;
pub mod api;
pub mod db;
pub mod error;
pub mod scoring;
pub mod services;
pub mod sync;
pub mod tabular;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sadhana_common::config::Settings;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::kv::Store;
use crate::services::sheets_client::SheetsClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway over the shared SQLite pool
    pub store: Store,
    /// Spreadsheet export fetcher
    pub sheets: SheetsClient,
    /// Resolved runtime settings
    pub settings: Settings,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, settings: Settings) -> Self {
        Self {
            store: Store::new(db),
            sheets: SheetsClient::new(settings.sheets.clone()),
            settings,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record an error for the health endpoint diagnostics
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::sync_routes())
        .merge(api::data_routes())
        .merge(api::member_routes())
        .merge(api::team_routes())
        .merge(api::activity_routes())
        .merge(api::submission_routes())
        .merge(api::health_routes())
        .with_state(state)
}
