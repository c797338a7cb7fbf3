//! Chat command endpoint: accepts a raw `/init ...` line and returns the
//! text reply a chat bot would post back to the channel.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::chat;
use crate::state::AppState;

/// Request body for POST /{channel_id}/commands.
#[derive(Debug, Deserialize)]
pub struct ChatCommandRequest {
    /// The raw command line, e.g. `/init add Bob 12`.
    pub command: String,
}

/// Reply text for a chat command.
#[derive(Debug, Serialize)]
pub struct ChatCommandResponse {
    /// Message to post back to the channel.
    pub reply: String,
}

/// POST /{channel_id}/commands
#[instrument(skip(state, request))]
async fn handle_command(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(request): Json<ChatCommandRequest>,
) -> Json<ChatCommandResponse> {
    let correlation_id = Uuid::new_v4();
    info!(%correlation_id, command = %request.command, "handling chat command");

    let reply = chat::respond(
        &state.initiative,
        correlation_id,
        &channel_id,
        &request.command,
    )
    .await;
    Json(ChatCommandResponse { reply })
}

/// Returns the router for chat commands.
pub fn router() -> Router<AppState> {
    Router::new().route("/{channel_id}/commands", post(handle_command))
}
