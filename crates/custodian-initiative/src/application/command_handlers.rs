//! Command handlers for the initiative context.
//!
//! `InitiativeService` orchestrates every tracker change: lock the channel,
//! load the tracker, compute the new value with the pure domain model, and
//! persist the difference. Storage and time are injected at construction.

use std::fmt;
use std::sync::Arc;

use custodian_core::clock::Clock;
use custodian_core::command::Command;
use custodian_core::error::DomainError;
use custodian_core::repository::{
    CursorRecord, ParticipantRecord, RosterChange, TrackerRecord, TrackerRepository,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::locks::ChannelLocks;
use super::query_handlers::{self, LoadedTracker, load_tracker, tracker_not_found};
use crate::domain::aggregates::InitiativeTracker;
use crate::domain::commands::{
    AddParticipant, CreateInitiative, DeleteInitiative, GotoParticipant, NextParticipant,
    PreviousParticipant, RemoveParticipant, UpdateParticipant,
};
use crate::domain::participant::Participant;

fn participant_not_found(name: &str) -> DomainError {
    DomainError::NotFound(format!("{name} is not in initiative"))
}

fn nobody_in_initiative() -> DomainError {
    DomainError::NotFound("nobody is in initiative".to_owned())
}

fn require_channel(channel_id: &str) -> Result<(), DomainError> {
    if channel_id.trim().is_empty() {
        return Err(DomainError::Validation(
            "channel id must not be empty".to_owned(),
        ));
    }
    Ok(())
}

fn require_name(name: &str) -> Result<&str, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation(
            "participant name must not be empty".to_owned(),
        ));
    }
    Ok(name)
}

fn log_command(command: &dyn Command) {
    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        channel_id = command.channel_id(),
        "handling initiative command"
    );
}

/// Tracker service. Operations on the same channel run one at a time.
pub struct InitiativeService {
    repo: Arc<dyn TrackerRepository>,
    clock: Arc<dyn Clock>,
    locks: ChannelLocks,
}

impl fmt::Debug for InitiativeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitiativeService")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl InitiativeService {
    /// Creates a service over the given repository and clock.
    #[must_use]
    pub fn new(repo: Arc<dyn TrackerRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            locks: ChannelLocks::default(),
        }
    }

    /// Returns the tracker for a channel.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the channel has no tracker.
    pub async fn get_initiative(&self, channel_id: &str) -> Result<InitiativeTracker, DomainError> {
        query_handlers::get_initiative(channel_id, self.repo.as_ref()).await
    }

    /// Starts a tracker for a channel with no participants.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank channel or a starting
    /// round below 1, and `DomainError::AlreadyExists` if the channel already
    /// has a tracker.
    #[instrument(skip_all, fields(channel_id = %command.channel_id))]
    pub async fn create_initiative(
        &self,
        command: &CreateInitiative,
    ) -> Result<InitiativeTracker, DomainError> {
        log_command(command);
        require_channel(&command.channel_id)?;
        if command.starting_round < 1 {
            return Err(DomainError::Validation(
                "starting round must be at least 1".to_owned(),
            ));
        }

        let _guard = self.locks.acquire(&command.channel_id).await;
        if self.repo.fetch_tracker(&command.channel_id).await?.is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "initiative for channel {}",
                command.channel_id
            )));
        }

        let now = self.clock.now();
        let record = TrackerRecord {
            id: Uuid::now_v7(),
            channel_id: command.channel_id.clone(),
            current_round: command.starting_round,
            current_index: 0,
            created_at: now,
            updated_at: now,
        };
        let id = self.repo.insert_tracker(&record).await?;

        info!(tracker_id = %id, "initiative created");
        Ok(InitiativeTracker::new(
            id,
            record.channel_id,
            record.current_round,
            0,
            Vec::new(),
        ))
    }

    /// Ends the tracker for a channel.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the channel has no tracker.
    #[instrument(skip_all, fields(channel_id = %command.channel_id))]
    pub async fn delete_initiative(&self, command: &DeleteInitiative) -> Result<(), DomainError> {
        log_command(command);
        require_channel(&command.channel_id)?;

        let _guard = self.locks.acquire(&command.channel_id).await;
        if !self.repo.delete_tracker(&command.channel_id).await? {
            return Err(tracker_not_found(&command.channel_id));
        }
        info!("initiative deleted");
        Ok(())
    }

    /// Adds a participant. The current participant keeps the turn even when
    /// the newcomer sorts ahead of them.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the channel has no tracker and
    /// `DomainError::AlreadyExists` if the name is taken.
    #[instrument(skip_all, fields(channel_id = %command.channel_id, name = %command.name))]
    pub async fn add_participant(
        &self,
        command: &AddParticipant,
    ) -> Result<InitiativeTracker, DomainError> {
        log_command(command);
        let name = require_name(&command.name)?;

        let _guard = self.locks.acquire(&command.channel_id).await;
        let LoadedTracker {
            tracker,
            mut roster,
        } = load_tracker(&command.channel_id, self.repo.as_ref()).await?;
        if tracker.find_by_name(name).is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "{name} is already in initiative"
            )));
        }

        let participant = Participant::new(name, command.initiative_value, command.tiebreaker);
        let change = RosterChange::Insert(ParticipantRecord::from(&participant));
        roster.push(participant);
        let after = tracker.with_roster(roster)?;

        self.commit_roster(&tracker, after, &change, name).await
    }

    /// Removes a participant. If it was their turn, the next participant in
    /// order takes it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the tracker or participant is absent.
    #[instrument(skip_all, fields(channel_id = %command.channel_id, name = %command.name))]
    pub async fn remove_participant(
        &self,
        command: &RemoveParticipant,
    ) -> Result<InitiativeTracker, DomainError> {
        log_command(command);
        let name = require_name(&command.name)?;

        let _guard = self.locks.acquire(&command.channel_id).await;
        let LoadedTracker {
            tracker,
            mut roster,
        } = load_tracker(&command.channel_id, self.repo.as_ref()).await?;
        if tracker.find_by_name(name).is_none() {
            return Err(participant_not_found(name));
        }

        roster.retain(|p| p.name != name);
        let after = tracker.with_roster(roster)?;

        self.commit_roster(&tracker, after, &RosterChange::Delete(name.to_owned()), name)
            .await
    }

    /// Changes a participant's initiative, keeping the current participant.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the tracker or participant is absent.
    #[instrument(skip_all, fields(channel_id = %command.channel_id, name = %command.name))]
    pub async fn update_participant(
        &self,
        command: &UpdateParticipant,
    ) -> Result<InitiativeTracker, DomainError> {
        log_command(command);
        let name = require_name(&command.name)?;

        let _guard = self.locks.acquire(&command.channel_id).await;
        let LoadedTracker {
            tracker,
            mut roster,
        } = load_tracker(&command.channel_id, self.repo.as_ref()).await?;
        let Some(slot) = roster.iter_mut().find(|p| p.name == name) else {
            return Err(participant_not_found(name));
        };
        slot.initiative_value = command.initiative_value;
        slot.tiebreaker = command.tiebreaker;
        let change = RosterChange::Update(ParticipantRecord::from(&*slot));
        let after = tracker.with_roster(roster)?;

        self.commit_roster(&tracker, after, &change, name).await
    }

    /// Passes the turn to the next participant, starting a new round after
    /// the last one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the channel has no tracker or
    /// nobody is in it.
    #[instrument(skip_all, fields(channel_id = %command.channel_id))]
    pub async fn next_participant(
        &self,
        command: &NextParticipant,
    ) -> Result<InitiativeTracker, DomainError> {
        log_command(command);

        let _guard = self.locks.acquire(&command.channel_id).await;
        let LoadedTracker { tracker, .. } =
            load_tracker(&command.channel_id, self.repo.as_ref()).await?;
        if tracker.is_empty() {
            return Err(nobody_in_initiative());
        }

        let next = tracker.advanced()?;

        self.commit(&tracker, next).await
    }

    /// Hands the turn back to the previous participant.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the channel has no tracker or
    /// nobody is in it, and `DomainError::Backtrack` at the top of round 1.
    #[instrument(skip_all, fields(channel_id = %command.channel_id))]
    pub async fn previous_participant(
        &self,
        command: &PreviousParticipant,
    ) -> Result<InitiativeTracker, DomainError> {
        log_command(command);

        let _guard = self.locks.acquire(&command.channel_id).await;
        let LoadedTracker { tracker, .. } =
            load_tracker(&command.channel_id, self.repo.as_ref()).await?;
        if tracker.is_empty() {
            return Err(nobody_in_initiative());
        }
        let previous = tracker.retreated()?;

        self.commit(&tracker, previous).await
    }

    /// Gives the turn to a named participant without changing the round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the tracker or participant is absent.
    #[instrument(skip_all, fields(channel_id = %command.channel_id, name = %command.name))]
    pub async fn goto_participant(
        &self,
        command: &GotoParticipant,
    ) -> Result<InitiativeTracker, DomainError> {
        log_command(command);
        let name = require_name(&command.name)?;

        let _guard = self.locks.acquire(&command.channel_id).await;
        let LoadedTracker { tracker, .. } =
            load_tracker(&command.channel_id, self.repo.as_ref()).await?;
        let target = tracker
            .with_current(name)
            .ok_or_else(|| participant_not_found(name))?;

        self.commit(&tracker, target).await
    }

    /// Persists the cursor of `after` if it moved away from `before`.
    async fn commit(
        &self,
        before: &InitiativeTracker,
        after: InitiativeTracker,
    ) -> Result<InitiativeTracker, DomainError> {
        if let Some(cursor) = self.moved_cursor(before, &after)? {
            self.repo
                .update_tracker_cursor(
                    after.id(),
                    cursor.current_index,
                    cursor.current_round,
                    cursor.updated_at,
                )
                .await?;
        }
        log_outcome(&after);
        Ok(after)
    }

    /// Persists a roster change together with any cursor movement it caused,
    /// in one repository call.
    async fn commit_roster(
        &self,
        before: &InitiativeTracker,
        after: InitiativeTracker,
        change: &RosterChange,
        name: &str,
    ) -> Result<InitiativeTracker, DomainError> {
        let cursor = self.moved_cursor(before, &after)?;
        if !self
            .repo
            .apply_roster_change(after.id(), change, cursor.as_ref())
            .await?
        {
            return Err(participant_not_found(name));
        }
        log_outcome(&after);
        Ok(after)
    }

    fn moved_cursor(
        &self,
        before: &InitiativeTracker,
        after: &InitiativeTracker,
    ) -> Result<Option<CursorRecord>, DomainError> {
        if before.current_index() == after.current_index()
            && before.current_round() == after.current_round()
        {
            return Ok(None);
        }
        let current_index = i32::try_from(after.current_index()).map_err(|_| {
            DomainError::Validation("too many participants in initiative".to_owned())
        })?;
        Ok(Some(CursorRecord {
            current_index,
            current_round: after.current_round(),
            updated_at: self.clock.now(),
        }))
    }
}

fn log_outcome(tracker: &InitiativeTracker) {
    info!(
        round = tracker.current_round(),
        index = tracker.current_index(),
        participants = tracker.participants().len(),
        "initiative updated"
    );
}
