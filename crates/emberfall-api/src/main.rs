//! Emberfall API server entry point.

use std::sync::{Arc, Mutex};

use emberfall_content::application::loader::load_campaign;
use emberfall_core::clock::SystemClock;
use emberfall_core::rng::StdRngSource;
use emberfall_save_store::pg_save_store::PgSaveStore;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use emberfall_api::config::AppConfig;
use emberfall_api::error::AppError;
use emberfall_api::routes;
use emberfall_api::state::{AppState, SharedRng};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Emberfall API server");

    let config = AppConfig::from_env()?;

    let campaign = load_campaign(&config.campaign_path).await?;
    tracing::info!(
        campaign = %campaign.id,
        version = %campaign.version_hash,
        "campaign loaded"
    );

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let store = PgSaveStore::new(pool);
    store.ensure_schema().await?;

    let rng: SharedRng = match config.rng_seed {
        Some(seed) => {
            tracing::info!(seed, "using seeded dice");
            Arc::new(Mutex::new(StdRngSource::from_seed(seed)))
        }
        None => Arc::new(Mutex::new(StdRngSource::from_entropy())),
    };

    let app_state = AppState::new(
        Arc::new(campaign),
        config.engine_config(),
        Arc::new(SystemClock),
        rng,
        Arc::new(store),
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
