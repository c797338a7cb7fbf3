//! Custodian API server entry point.

use std::sync::Arc;

use custodian_api::config::Config;
use custodian_api::error::AppError;
use custodian_api::state::AppState;
use custodian_api::{build_router, telemetry};
use custodian_core::clock::SystemClock;
use custodian_initiative::application::command_handlers::InitiativeService;
use custodian_store::pg_tracker_repository::PgTrackerRepository;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;
    let telemetry = telemetry::init(&config)?;

    tracing::info!("Starting Custodian API server");

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    tracing::info!(max_connections = config.max_connections, "Connected to database");

    custodian_store::MIGRATOR.run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Build application state.
    let service = InitiativeService::new(
        Arc::new(PgTrackerRepository::new(pool.clone())),
        Arc::new(SystemClock),
    );
    let app_state = AppState::new(Arc::new(service));

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    pool.close().await;
    tracing::info!("Disconnected from database");
    telemetry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
