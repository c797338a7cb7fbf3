//! In-memory and failing `TrackerRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use custodian_core::error::DomainError;
use custodian_core::repository::{
    CursorRecord, ParticipantRecord, RosterChange, TrackerRecord, TrackerRepository,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredTracker {
    record: TrackerRecord,
    participants: Vec<ParticipantRecord>,
}

impl StoredTracker {
    /// Applies `change` to the participant list. Returns `Ok(false)` when an
    /// update or delete names nobody.
    fn apply(&mut self, change: &RosterChange) -> Result<bool, DomainError> {
        match change {
            RosterChange::Insert(participant) => {
                if self.participants.iter().any(|p| p.name == participant.name) {
                    return Err(DomainError::AlreadyExists(format!(
                        "participant {}",
                        participant.name
                    )));
                }
                self.participants.push(participant.clone());
                Ok(true)
            }
            RosterChange::Update(participant) => {
                match self
                    .participants
                    .iter_mut()
                    .find(|p| p.name == participant.name)
                {
                    Some(existing) => {
                        existing.initiative_value = participant.initiative_value;
                        existing.tiebreaker = participant.tiebreaker;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            RosterChange::Delete(name) => {
                let before = self.participants.len();
                self.participants.retain(|p| &p.name != name);
                Ok(self.participants.len() != before)
            }
        }
    }

    fn move_cursor(&mut self, cursor: &CursorRecord) {
        self.record.current_index = cursor.current_index;
        self.record.current_round = cursor.current_round;
        self.record.updated_at = cursor.updated_at;
    }
}

/// A tracker repository held entirely in memory. Enforces the same uniqueness
/// rules as the database schema (one tracker per channel, one participant per
/// name within a tracker) and keeps participants in insertion order.
///
/// [`InMemoryTrackerRepository::fail_cursor_writes`] makes every cursor write
/// fail, so callers can check that a failed step leaves nothing behind.
#[derive(Debug, Default)]
pub struct InMemoryTrackerRepository {
    trackers: Mutex<HashMap<String, StoredTracker>>,
    cursor_writes_fail: AtomicBool,
}

impl InMemoryTrackerRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later cursor write fail with an infrastructure error,
    /// including the cursor half of `apply_roster_change`.
    pub fn fail_cursor_writes(&self) {
        self.cursor_writes_fail.store(true, Ordering::SeqCst);
    }

    /// Returns the stored record for a channel, bypassing the trait.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn tracker(&self, channel_id: &str) -> Option<TrackerRecord> {
        self.trackers
            .lock()
            .unwrap()
            .get(channel_id)
            .map(|stored| stored.record.clone())
    }

    /// Returns the stored participant names for a channel in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn participant_names(&self, channel_id: &str) -> Vec<String> {
        self.trackers
            .lock()
            .unwrap()
            .get(channel_id)
            .map(|stored| stored.participants.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default()
    }

    fn check_cursor_write(&self) -> Result<(), DomainError> {
        if self.cursor_writes_fail.load(Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("cursor write failed".into()));
        }
        Ok(())
    }
}

fn missing_tracker(tracker_id: Uuid) -> DomainError {
    DomainError::NotFound(format!("tracker {tracker_id}"))
}

fn find_stored(
    trackers: &mut HashMap<String, StoredTracker>,
    tracker_id: Uuid,
) -> Option<&mut StoredTracker> {
    trackers
        .values_mut()
        .find(|stored| stored.record.id == tracker_id)
}

#[async_trait]
impl TrackerRepository for InMemoryTrackerRepository {
    async fn insert_tracker(&self, tracker: &TrackerRecord) -> Result<Uuid, DomainError> {
        let mut trackers = self.trackers.lock().unwrap();
        if trackers.contains_key(&tracker.channel_id) {
            return Err(DomainError::AlreadyExists(format!(
                "initiative for channel {}",
                tracker.channel_id
            )));
        }
        trackers.insert(
            tracker.channel_id.clone(),
            StoredTracker {
                record: tracker.clone(),
                participants: Vec::new(),
            },
        );
        Ok(tracker.id)
    }

    async fn fetch_tracker(&self, channel_id: &str) -> Result<Option<TrackerRecord>, DomainError> {
        Ok(self.tracker(channel_id))
    }

    async fn fetch_participants(
        &self,
        tracker_id: Uuid,
    ) -> Result<Vec<ParticipantRecord>, DomainError> {
        let mut trackers = self.trackers.lock().unwrap();
        Ok(find_stored(&mut trackers, tracker_id)
            .map(|stored| stored.participants.clone())
            .unwrap_or_default())
    }

    async fn insert_participant(
        &self,
        tracker_id: Uuid,
        participant: &ParticipantRecord,
    ) -> Result<(), DomainError> {
        let mut trackers = self.trackers.lock().unwrap();
        let stored =
            find_stored(&mut trackers, tracker_id).ok_or_else(|| missing_tracker(tracker_id))?;
        stored.apply(&RosterChange::Insert(participant.clone()))?;
        Ok(())
    }

    async fn delete_participant(&self, tracker_id: Uuid, name: &str) -> Result<bool, DomainError> {
        let mut trackers = self.trackers.lock().unwrap();
        match find_stored(&mut trackers, tracker_id) {
            Some(stored) => stored.apply(&RosterChange::Delete(name.to_owned())),
            None => Ok(false),
        }
    }

    async fn update_participant(
        &self,
        tracker_id: Uuid,
        participant: &ParticipantRecord,
    ) -> Result<bool, DomainError> {
        let mut trackers = self.trackers.lock().unwrap();
        match find_stored(&mut trackers, tracker_id) {
            Some(stored) => stored.apply(&RosterChange::Update(participant.clone())),
            None => Ok(false),
        }
    }

    async fn apply_roster_change(
        &self,
        tracker_id: Uuid,
        change: &RosterChange,
        cursor: Option<&CursorRecord>,
    ) -> Result<bool, DomainError> {
        let mut trackers = self.trackers.lock().unwrap();
        let stored =
            find_stored(&mut trackers, tracker_id).ok_or_else(|| missing_tracker(tracker_id))?;

        // Stage both writes on a copy; the stored tracker only changes if
        // every step succeeds.
        let mut staged = stored.clone();
        if !staged.apply(change)? {
            return Ok(false);
        }
        if let Some(cursor) = cursor {
            self.check_cursor_write()?;
            staged.move_cursor(cursor);
        }
        *stored = staged;
        Ok(true)
    }

    async fn update_tracker_cursor(
        &self,
        tracker_id: Uuid,
        current_index: i32,
        current_round: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.check_cursor_write()?;
        let mut trackers = self.trackers.lock().unwrap();
        let stored =
            find_stored(&mut trackers, tracker_id).ok_or_else(|| missing_tracker(tracker_id))?;
        stored.move_cursor(&CursorRecord {
            current_index,
            current_round,
            updated_at,
        });
        Ok(())
    }

    async fn delete_tracker(&self, channel_id: &str) -> Result<bool, DomainError> {
        Ok(self.trackers.lock().unwrap().remove(channel_id).is_some())
    }
}

/// A tracker repository that always returns an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingTrackerRepository;

fn connection_refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

#[async_trait]
impl TrackerRepository for FailingTrackerRepository {
    async fn insert_tracker(&self, _tracker: &TrackerRecord) -> Result<Uuid, DomainError> {
        Err(connection_refused())
    }

    async fn fetch_tracker(
        &self,
        _channel_id: &str,
    ) -> Result<Option<TrackerRecord>, DomainError> {
        Err(connection_refused())
    }

    async fn fetch_participants(
        &self,
        _tracker_id: Uuid,
    ) -> Result<Vec<ParticipantRecord>, DomainError> {
        Err(connection_refused())
    }

    async fn insert_participant(
        &self,
        _tracker_id: Uuid,
        _participant: &ParticipantRecord,
    ) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn delete_participant(
        &self,
        _tracker_id: Uuid,
        _name: &str,
    ) -> Result<bool, DomainError> {
        Err(connection_refused())
    }

    async fn update_participant(
        &self,
        _tracker_id: Uuid,
        _participant: &ParticipantRecord,
    ) -> Result<bool, DomainError> {
        Err(connection_refused())
    }

    async fn apply_roster_change(
        &self,
        _tracker_id: Uuid,
        _change: &RosterChange,
        _cursor: Option<&CursorRecord>,
    ) -> Result<bool, DomainError> {
        Err(connection_refused())
    }

    async fn update_tracker_cursor(
        &self,
        _tracker_id: Uuid,
        _current_index: i32,
        _current_round: i32,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn delete_tracker(&self, _channel_id: &str) -> Result<bool, DomainError> {
        Err(connection_refused())
    }
}
