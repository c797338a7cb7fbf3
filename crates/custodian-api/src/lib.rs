//! Custodian API: HTTP transport and chat command surface.

pub mod chat;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the application router with every route mounted.
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/initiatives", routes::initiative::router())
        .nest("/api/v1/channels", routes::commands::router())
        .with_state(app_state)
}
