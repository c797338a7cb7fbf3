//! Query handlers for the initiative context.
//!
//! This module contains read-only lookups and the view DTO returned to
//! callers outside the crate.

use custodian_core::error::DomainError;
use custodian_core::repository::TrackerRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::InitiativeTracker;
use crate::domain::participant::Participant;

/// Read-only view of a tracker.
#[derive(Debug, Serialize)]
pub struct InitiativeView {
    /// The tracker identifier.
    pub tracker_id: Uuid,
    /// The owning channel.
    pub channel_id: String,
    /// Current round.
    pub current_round: i32,
    /// Cursor into `participants`.
    pub current_index: usize,
    /// Name of the participant whose turn it is.
    pub current_participant: Option<String>,
    /// Participants in initiative order.
    pub participants: Vec<Participant>,
    /// Plain-text rendering of the tracker.
    pub text: String,
}

impl From<&InitiativeTracker> for InitiativeView {
    fn from(tracker: &InitiativeTracker) -> Self {
        Self {
            tracker_id: tracker.id(),
            channel_id: tracker.channel_id().to_owned(),
            current_round: tracker.current_round(),
            current_index: tracker.current_index(),
            current_participant: tracker.current_participant().map(|p| p.name.clone()),
            participants: tracker.participants().to_vec(),
            text: tracker.to_string(),
        }
    }
}

/// A tracker as loaded from storage, with its roster still in join order.
pub(crate) struct LoadedTracker {
    pub tracker: InitiativeTracker,
    pub roster: Vec<Participant>,
}

pub(crate) fn tracker_not_found(channel_id: &str) -> DomainError {
    DomainError::NotFound(format!("no initiative in channel {channel_id}"))
}

/// Loads the tracker for a channel.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the channel has no tracker, or any
/// error from the repository.
pub(crate) async fn load_tracker(
    channel_id: &str,
    repo: &dyn TrackerRepository,
) -> Result<LoadedTracker, DomainError> {
    let record = repo
        .fetch_tracker(channel_id)
        .await?
        .ok_or_else(|| tracker_not_found(channel_id))?;
    let roster: Vec<Participant> = repo
        .fetch_participants(record.id)
        .await?
        .into_iter()
        .map(Participant::from)
        .collect();
    let tracker = InitiativeTracker::new(
        record.id,
        record.channel_id,
        record.current_round,
        usize::try_from(record.current_index).unwrap_or(0),
        roster.clone(),
    );
    Ok(LoadedTracker { tracker, roster })
}

/// Retrieves the tracker for a channel.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the channel has no tracker.
/// Returns `DomainError::Infrastructure` if storage fails.
pub async fn get_initiative(
    channel_id: &str,
    repo: &dyn TrackerRepository,
) -> Result<InitiativeTracker, DomainError> {
    let loaded = load_tracker(channel_id, repo).await?;
    Ok(loaded.tracker)
}
