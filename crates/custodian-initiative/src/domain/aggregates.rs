//! The initiative tracker value and its cursor transitions.

use std::fmt;

use custodian_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use super::participant::{self, Participant};

/// Turn-order state for one channel.
///
/// Participants are held in initiative order. The value is never mutated in
/// place; every transition returns a new tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiativeTracker {
    id: Uuid,
    channel_id: String,
    current_round: i32,
    current_index: usize,
    participants: Vec<Participant>,
}

impl InitiativeTracker {
    /// Builds a tracker from a roster given in join order.
    ///
    /// The roster is sorted once here. The round is raised to at least 1 and
    /// the cursor is clamped to the last participant (0 when empty).
    #[must_use]
    pub fn new(
        id: Uuid,
        channel_id: impl Into<String>,
        current_round: i32,
        current_index: usize,
        mut roster: Vec<Participant>,
    ) -> Self {
        participant::sort_by_initiative(&mut roster);
        let current_index = current_index.min(roster.len().saturating_sub(1));
        Self {
            id,
            channel_id: channel_id.into(),
            current_round: current_round.max(1),
            current_index,
            participants: roster,
        }
    }

    /// Tracker identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Channel that owns this tracker.
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Current round, at least 1.
    #[must_use]
    pub fn current_round(&self) -> i32 {
        self.current_round
    }

    /// Index of the participant whose turn it is.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Participants in initiative order.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// The participant whose turn it is, if anyone is in initiative.
    #[must_use]
    pub fn current_participant(&self) -> Option<&Participant> {
        self.participants.get(self.current_index)
    }

    /// Looks a participant up by name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Participant> {
        participant::find_by_name(&self.participants, name)
    }

    /// Whether nobody is in initiative.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Rebuilds the tracker with a new roster (in join order), keeping the
    /// same participant current.
    ///
    /// If the current participant is no longer in the roster, the cursor stays
    /// at the same position so the next participant in order takes the turn.
    /// When that falls off the end the cursor wraps to the top and a new round
    /// starts, as with [`InitiativeTracker::advanced`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the wrap would pass the last
    /// representable round.
    pub fn with_roster(&self, roster: Vec<Participant>) -> Result<Self, DomainError> {
        let next = Self::new(
            self.id,
            self.channel_id.clone(),
            self.current_round,
            0,
            roster,
        );
        let followed = self
            .current_participant()
            .and_then(|current| next.position_of(&current.name));
        let (index, round) = match followed {
            Some(index) => (index, self.current_round),
            None if self.current_index < next.participants.len() => {
                (self.current_index, self.current_round)
            }
            None if next.is_empty() => (0, self.current_round),
            None => (0, self.next_round()?),
        };
        Ok(next.with_cursor(index, round))
    }

    /// Moves the cursor to the next participant.
    ///
    /// The round increments when the cursor wraps from the last participant
    /// back to the top. An empty tracker is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the wrap would pass the last
    /// representable round.
    pub fn advanced(&self) -> Result<Self, DomainError> {
        let count = self.participants.len();
        if count == 0 {
            return Ok(self.clone());
        }
        let next_index = (self.current_index + 1) % count;
        let next_round = if next_index == 0 {
            self.next_round()?
        } else {
            self.current_round
        };
        Ok(self.with_cursor(next_index, next_round))
    }

    /// Moves the cursor to the previous participant.
    ///
    /// The round decrements when the cursor wraps from the top back to the
    /// last participant. An empty tracker is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Backtrack` at the top of round 1.
    pub fn retreated(&self) -> Result<Self, DomainError> {
        let count = self.participants.len();
        if count == 0 {
            return Ok(self.clone());
        }
        if self.current_index > 0 {
            return Ok(self.with_cursor(self.current_index - 1, self.current_round));
        }
        if self.current_round <= 1 {
            return Err(DomainError::Backtrack);
        }
        Ok(self.with_cursor(count - 1, self.current_round - 1))
    }

    /// Moves the cursor to the named participant without touching the round.
    /// Returns `None` if nobody has that name.
    #[must_use]
    pub fn with_current(&self, name: &str) -> Option<Self> {
        self.position_of(name)
            .map(|index| self.with_cursor(index, self.current_round))
    }

    fn next_round(&self) -> Result<i32, DomainError> {
        self.current_round
            .checked_add(1)
            .ok_or_else(|| DomainError::Validation("round limit reached".to_owned()))
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.participants.iter().position(|p| p.name == name)
    }

    fn with_cursor(&self, current_index: usize, current_round: i32) -> Self {
        Self {
            current_index,
            current_round,
            ..self.clone()
        }
    }
}

impl fmt::Display for InitiativeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round {}", self.current_round)?;
        if self.participants.is_empty() {
            return write!(f, "\nNobody!");
        }
        for participant in &self.participants {
            write!(f, "\n{participant}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(roster: Vec<Participant>) -> InitiativeTracker {
        InitiativeTracker::new(Uuid::new_v4(), "123", 1, 0, roster)
    }

    fn three() -> InitiativeTracker {
        tracker_with(vec![
            Participant::new("Alice", 15, 0),
            Participant::new("Bob", 10, 0),
            Participant::new("Charlie", 5, 0),
        ])
    }

    fn advance(mut tracker: InitiativeTracker, steps: usize) -> InitiativeTracker {
        for _ in 0..steps {
            tracker = tracker.advanced().unwrap();
        }
        tracker
    }

    fn current_name(tracker: &InitiativeTracker) -> &str {
        tracker.current_participant().map_or("", |p| p.name.as_str())
    }

    #[test]
    fn test_new_sorts_roster_and_clamps_cursor() {
        let tracker = InitiativeTracker::new(
            Uuid::new_v4(),
            "123",
            0,
            7,
            vec![Participant::new("Bob", 10, 0), Participant::new("Alice", 15, 0)],
        );

        assert_eq!(tracker.participants()[0].name, "Alice");
        assert_eq!(tracker.current_index(), 1);
        assert_eq!(tracker.current_round(), 1);
    }

    #[test]
    fn test_empty_tracker_has_no_current_participant() {
        let tracker = tracker_with(Vec::new());

        assert!(tracker.is_empty());
        assert_eq!(tracker.current_index(), 0);
        assert!(tracker.current_participant().is_none());
    }

    #[test]
    fn test_advance_walks_order_and_increments_round_on_wrap() {
        let mut tracker = three();
        let mut seen = Vec::new();

        for _ in 0..6 {
            tracker = tracker.advanced().unwrap();
            seen.push((tracker.current_index(), tracker.current_round()));
        }

        assert_eq!(
            seen,
            vec![(1, 1), (2, 1), (0, 2), (1, 2), (2, 2), (0, 3)]
        );
    }

    #[test]
    fn test_single_participant_advances_a_round_every_step() {
        let tracker = tracker_with(vec![Participant::new("Solo", 3, 0)]);

        let next = tracker.advanced().unwrap();

        assert_eq!(next.current_index(), 0);
        assert_eq!(next.current_round(), 2);
    }

    #[test]
    fn test_advance_past_last_round_is_rejected() {
        let tracker = InitiativeTracker::new(
            Uuid::new_v4(),
            "123",
            i32::MAX,
            0,
            vec![Participant::new("Solo", 3, 0)],
        );

        match tracker.advanced().unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "round limit reached"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_advance_within_last_round_still_moves() {
        let tracker = InitiativeTracker::new(
            Uuid::new_v4(),
            "123",
            i32::MAX,
            0,
            vec![Participant::new("Alice", 15, 0), Participant::new("Bob", 10, 0)],
        );

        let next = tracker.advanced().unwrap();

        assert_eq!((next.current_index(), next.current_round()), (1, i32::MAX));
    }

    #[test]
    fn test_retreat_at_round_one_top_is_refused() {
        match three().retreated().unwrap_err() {
            DomainError::Backtrack => {}
            other => panic!("expected Backtrack, got {other:?}"),
        }
    }

    #[test]
    fn test_retreat_undoes_advance() {
        let start = three();
        let mut tracker = start.clone();
        for _ in 0..4 {
            tracker = tracker.advanced().unwrap();
        }

        for _ in 0..4 {
            tracker = tracker.retreated().unwrap();
        }

        assert_eq!(tracker, start);
    }

    #[test]
    fn test_retreat_from_top_of_later_round_wraps_to_bottom() {
        let tracker = advance(three(), 3);
        assert_eq!((tracker.current_index(), tracker.current_round()), (0, 2));

        let back = tracker.retreated().unwrap();

        assert_eq!((back.current_index(), back.current_round()), (2, 1));
        assert_eq!(current_name(&back), "Charlie");
    }

    #[test]
    fn test_empty_tracker_cursor_moves_are_no_ops() {
        let tracker = tracker_with(Vec::new());

        assert_eq!(tracker.advanced().unwrap(), tracker);
        assert_eq!(tracker.retreated().unwrap(), tracker);
    }

    #[test]
    fn test_with_current_sets_cursor_and_keeps_round() {
        let tracker = advance(three(), 3);

        let jumped = tracker.with_current("Charlie").unwrap();

        assert_eq!(jumped.current_index(), 2);
        assert_eq!(jumped.current_round(), 2);
        assert!(tracker.with_current("Zed").is_none());
    }

    #[test]
    fn test_with_roster_keeps_current_when_newcomer_sorts_first() {
        let tracker = tracker_with(vec![Participant::new("Bob", 10, 0)]);

        let next = tracker.with_roster(vec![
            Participant::new("Bob", 10, 0),
            Participant::new("Alice", 15, 0),
        ])
        .unwrap();

        assert_eq!(next.current_index(), 1);
        assert_eq!(current_name(&next), "Bob");
    }

    #[test]
    fn test_with_roster_follows_updated_current_participant() {
        let tracker = three().with_current("Charlie").unwrap();

        let next = tracker.with_roster(vec![
            Participant::new("Alice", 15, 0),
            Participant::new("Bob", 10, 0),
            Participant::new("Charlie", 20, 0),
        ])
        .unwrap();

        assert_eq!(next.current_index(), 0);
        assert_eq!(current_name(&next), "Charlie");
    }

    #[test]
    fn test_with_roster_passes_turn_on_when_current_is_removed() {
        let tracker = three().with_current("Bob").unwrap();

        let next = tracker.with_roster(vec![
            Participant::new("Alice", 15, 0),
            Participant::new("Charlie", 5, 0),
        ])
        .unwrap();

        assert_eq!(current_name(&next), "Charlie");
        assert_eq!(next.current_round(), 1);
    }

    #[test]
    fn test_with_roster_starts_next_round_when_last_current_is_removed() {
        let tracker = three().with_current("Charlie").unwrap();

        let next = tracker
            .with_roster(vec![
                Participant::new("Alice", 15, 0),
                Participant::new("Bob", 10, 0),
            ])
            .unwrap();

        assert_eq!(next.current_index(), 0);
        assert_eq!(next.current_round(), 2);
        assert_eq!(current_name(&next), "Alice");
    }

    #[test]
    fn test_removing_last_current_matches_advancing_past_them() {
        let tracker = three().with_current("Charlie").unwrap();

        let removed = tracker
            .with_roster(vec![
                Participant::new("Alice", 15, 0),
                Participant::new("Bob", 10, 0),
            ])
            .unwrap();
        let advanced = tracker.advanced().unwrap();

        assert_eq!(removed.current_round(), advanced.current_round());
        assert_eq!(current_name(&removed), current_name(&advanced));
    }

    #[test]
    fn test_removing_only_participant_keeps_round() {
        let tracker = tracker_with(vec![Participant::new("Solo", 3, 0)]);

        let next = tracker.with_roster(Vec::new()).unwrap();

        assert!(next.is_empty());
        assert_eq!((next.current_index(), next.current_round()), (0, 1));
    }

    #[test]
    fn test_display_lists_participants_under_round_header() {
        let tracker = tracker_with(vec![
            Participant::new("Bob", 10, 0),
            Participant::new("Deborah", 15, 99),
        ]);

        assert_eq!(tracker.to_string(), "Round 1\n15 (99): Deborah\n10: Bob");
    }

    #[test]
    fn test_display_empty_tracker() {
        assert_eq!(tracker_with(Vec::new()).to_string(), "Round 1\nNobody!");
    }
}
