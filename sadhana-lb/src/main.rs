//! sadhana-lb - Leaderboard Sync Service
//!
//! Reconciles spreadsheet attendance exports with the persisted
//! key-value store and serves per-member scores derived from the
//! unified activity log.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sadhana_lb::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting sadhana-lb (Leaderboard Sync) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve settings: env > TOML > defaults
    let settings = sadhana_common::config::load_settings()
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
    info!("Database: {}", settings.database_path.display());

    // Initialize database connection pool
    let db_pool = sadhana_lb::db::init_database_pool(&settings.database_path).await?;
    info!("Database connection established");

    // Create application state
    let bind_address = settings.bind_address.clone();
    let state = AppState::new(db_pool, settings);

    // Build router
    let app = sadhana_lb::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
