//! JSON routes for initiative trackers, keyed by channel.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use custodian_initiative::application::query_handlers::InitiativeView;
use custodian_initiative::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{channel_id}.
#[derive(Debug, Default, Deserialize)]
pub struct CreateInitiativeRequest {
    /// Round to start at; defaults to 1.
    #[serde(default)]
    pub starting_round: Option<i32>,
}

/// Request body for POST /{channel_id}/participants.
#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    /// Participant name.
    pub name: String,
    /// Initiative value.
    pub initiative_value: i32,
    /// Secondary sort key; defaults to 0.
    #[serde(default)]
    pub tiebreaker: i32,
}

/// Request body for PUT /{channel_id}/participants/{name}.
#[derive(Debug, Deserialize)]
pub struct UpdateParticipantRequest {
    /// New initiative value.
    pub initiative_value: i32,
    /// New secondary sort key; defaults to 0.
    #[serde(default)]
    pub tiebreaker: i32,
}

/// Request body for POST /{channel_id}/goto.
#[derive(Debug, Deserialize)]
pub struct GotoRequest {
    /// Participant who takes the turn.
    pub name: String,
}

/// POST /{channel_id}
#[instrument(skip(state, request))]
async fn create_initiative(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(request): Json<CreateInitiativeRequest>,
) -> Result<(StatusCode, Json<InitiativeView>), ApiError> {
    let command = commands::CreateInitiative {
        correlation_id: Uuid::new_v4(),
        channel_id,
        starting_round: request.starting_round.unwrap_or(1),
    };

    info!(correlation_id = %command.correlation_id, "handling create_initiative command");

    let tracker = state.initiative.create_initiative(&command).await?;
    Ok((StatusCode::CREATED, Json(InitiativeView::from(&tracker))))
}

/// GET /{channel_id}
#[instrument(skip(state))]
async fn get_initiative(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<InitiativeView>, ApiError> {
    let tracker = state.initiative.get_initiative(&channel_id).await?;
    Ok(Json(InitiativeView::from(&tracker)))
}

/// DELETE /{channel_id}
#[instrument(skip(state))]
async fn delete_initiative(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteInitiative {
        correlation_id: Uuid::new_v4(),
        channel_id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_initiative command");

    state.initiative.delete_initiative(&command).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /{channel_id}/participants
#[instrument(skip(state, request), fields(name = %request.name))]
async fn add_participant(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(request): Json<AddParticipantRequest>,
) -> Result<Json<InitiativeView>, ApiError> {
    let command = commands::AddParticipant {
        correlation_id: Uuid::new_v4(),
        channel_id,
        name: request.name,
        initiative_value: request.initiative_value,
        tiebreaker: request.tiebreaker,
    };

    info!(correlation_id = %command.correlation_id, "handling add_participant command");

    let tracker = state.initiative.add_participant(&command).await?;
    Ok(Json(InitiativeView::from(&tracker)))
}

/// PUT /{channel_id}/participants/{name}
#[instrument(skip(state, request))]
async fn update_participant(
    State(state): State<AppState>,
    Path((channel_id, name)): Path<(String, String)>,
    Json(request): Json<UpdateParticipantRequest>,
) -> Result<Json<InitiativeView>, ApiError> {
    let command = commands::UpdateParticipant {
        correlation_id: Uuid::new_v4(),
        channel_id,
        name,
        initiative_value: request.initiative_value,
        tiebreaker: request.tiebreaker,
    };

    info!(correlation_id = %command.correlation_id, "handling update_participant command");

    let tracker = state.initiative.update_participant(&command).await?;
    Ok(Json(InitiativeView::from(&tracker)))
}

/// DELETE /{channel_id}/participants/{name}
#[instrument(skip(state))]
async fn remove_participant(
    State(state): State<AppState>,
    Path((channel_id, name)): Path<(String, String)>,
) -> Result<Json<InitiativeView>, ApiError> {
    let command = commands::RemoveParticipant {
        correlation_id: Uuid::new_v4(),
        channel_id,
        name,
    };

    info!(correlation_id = %command.correlation_id, "handling remove_participant command");

    let tracker = state.initiative.remove_participant(&command).await?;
    Ok(Json(InitiativeView::from(&tracker)))
}

/// POST /{channel_id}/next
#[instrument(skip(state))]
async fn next_participant(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<InitiativeView>, ApiError> {
    let command = commands::NextParticipant {
        correlation_id: Uuid::new_v4(),
        channel_id,
    };

    info!(correlation_id = %command.correlation_id, "handling next_participant command");

    let tracker = state.initiative.next_participant(&command).await?;
    Ok(Json(InitiativeView::from(&tracker)))
}

/// POST /{channel_id}/back
#[instrument(skip(state))]
async fn previous_participant(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<InitiativeView>, ApiError> {
    let command = commands::PreviousParticipant {
        correlation_id: Uuid::new_v4(),
        channel_id,
    };

    info!(correlation_id = %command.correlation_id, "handling previous_participant command");

    let tracker = state.initiative.previous_participant(&command).await?;
    Ok(Json(InitiativeView::from(&tracker)))
}

/// POST /{channel_id}/goto
#[instrument(skip(state, request), fields(name = %request.name))]
async fn goto_participant(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(request): Json<GotoRequest>,
) -> Result<Json<InitiativeView>, ApiError> {
    let command = commands::GotoParticipant {
        correlation_id: Uuid::new_v4(),
        channel_id,
        name: request.name,
    };

    info!(correlation_id = %command.correlation_id, "handling goto_participant command");

    let tracker = state.initiative.goto_participant(&command).await?;
    Ok(Json(InitiativeView::from(&tracker)))
}

/// Returns the router for initiative trackers.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{channel_id}",
            post(create_initiative)
                .get(get_initiative)
                .delete(delete_initiative),
        )
        .route("/{channel_id}/participants", post(add_participant))
        .route(
            "/{channel_id}/participants/{name}",
            put(update_participant).delete(remove_participant),
        )
        .route("/{channel_id}/next", post(next_participant))
        .route("/{channel_id}/back", post(previous_participant))
        .route("/{channel_id}/goto", post(goto_participant))
}
