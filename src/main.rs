//! CarbonTrack - carbon-credit accounting backend for biochar sites.

use anyhow::{Context, Result};
use carbontrack_backend::accounting::engine::EngineConfig;
use carbontrack_backend::accounting::time::reporting_offset;
use carbontrack_backend::api::{router, AppState};
use carbontrack_backend::models::Config;
use carbontrack_backend::store::{seed, SqliteStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carbontrack_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!("Starting CarbonTrack backend on port {}", config.port);

    let store = Arc::new(SqliteStore::new(&config.database_path)?);

    if let Some(seed_path) = &config.seed_file {
        let parsed = seed::load(Path::new(seed_path))?;
        seed::apply(&store, &parsed)?;
    }

    let state = AppState {
        store,
        engine_config: EngineConfig {
            reporting_offset: reporting_offset(config.reporting_offset_hours),
            self_customer_id: config.self_customer_id.clone(),
            missing_quantity: config.missing_quantity,
        },
        accounting_deadline: Duration::from_secs(config.accounting_deadline_secs),
    };

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {addr}");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
