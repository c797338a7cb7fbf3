//! Tracker repository abstraction.
//!
//! This is the persistence contract consumed by the initiative service. One
//! tracker record exists per channel; its participants are stored separately
//! and returned in insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of an initiative tracker (without participants).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerRecord {
    /// Tracker identifier.
    pub id: Uuid,
    /// Channel that owns the tracker. Unique across trackers.
    pub channel_id: String,
    /// Current round, starting at 1.
    pub current_round: i32,
    /// Cursor into the sorted participant order.
    pub current_index: i32,
    /// When the tracker was created.
    pub created_at: DateTime<Utc>,
    /// When the cursor was last moved.
    pub updated_at: DateTime<Utc>,
}

/// Stored representation of one participant in a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    /// Participant name. Unique within a tracker.
    pub name: String,
    /// Initiative value.
    pub initiative_value: i32,
    /// Secondary sort key; 0 when not given.
    pub tiebreaker: i32,
}

/// New cursor position for a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorRecord {
    /// Cursor into the sorted participant order.
    pub current_index: i32,
    /// Current round, at least 1.
    pub current_round: i32,
    /// When the cursor moved.
    pub updated_at: DateTime<Utc>,
}

/// One change to a tracker's participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    /// Append a participant.
    Insert(ParticipantRecord),
    /// Change a participant's initiative, keeping its insertion position.
    Update(ParticipantRecord),
    /// Remove a participant by name.
    Delete(String),
}

/// Repository trait for storing trackers and their participants.
#[async_trait]
pub trait TrackerRepository: Send + Sync {
    /// Insert a new tracker and return its identifier.
    ///
    /// Returns `DomainError::AlreadyExists` if the channel already has one.
    async fn insert_tracker(&self, tracker: &TrackerRecord) -> Result<Uuid, DomainError>;

    /// Fetch the tracker for a channel, if any.
    async fn fetch_tracker(&self, channel_id: &str) -> Result<Option<TrackerRecord>, DomainError>;

    /// Fetch a tracker's participants in insertion order.
    async fn fetch_participants(
        &self,
        tracker_id: Uuid,
    ) -> Result<Vec<ParticipantRecord>, DomainError>;

    /// Append a participant to a tracker.
    ///
    /// Returns `DomainError::AlreadyExists` if the name is already taken in
    /// this tracker.
    async fn insert_participant(
        &self,
        tracker_id: Uuid,
        participant: &ParticipantRecord,
    ) -> Result<(), DomainError>;

    /// Delete a participant by name. Returns whether a row was removed.
    async fn delete_participant(&self, tracker_id: Uuid, name: &str) -> Result<bool, DomainError>;

    /// Update a participant's initiative in place, keeping its insertion
    /// position. Returns whether a row was updated.
    async fn update_participant(
        &self,
        tracker_id: Uuid,
        participant: &ParticipantRecord,
    ) -> Result<bool, DomainError>;

    /// Apply a roster change and, if given, move the cursor, as one atomic
    /// step: either both are stored or neither is.
    ///
    /// Returns `Ok(false)` without writing anything when an update or delete
    /// names a participant that is not in the tracker, and
    /// `DomainError::AlreadyExists` when an insert reuses a name.
    async fn apply_roster_change(
        &self,
        tracker_id: Uuid,
        change: &RosterChange,
        cursor: Option<&CursorRecord>,
    ) -> Result<bool, DomainError>;

    /// Move a tracker's cursor.
    async fn update_tracker_cursor(
        &self,
        tracker_id: Uuid,
        current_index: i32,
        current_round: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Delete the tracker for a channel together with its participants.
    /// Returns whether a tracker was removed.
    async fn delete_tracker(&self, channel_id: &str) -> Result<bool, DomainError>;
}
