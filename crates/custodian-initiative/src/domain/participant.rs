//! Participants and the initiative ordering rule.

use std::fmt;

use custodian_core::repository::ParticipantRecord;
use serde::Serialize;

/// One combatant in a tracker.
///
/// Ordering uses `(initiative_value, tiebreaker)` descending. Participants with
/// equal keys keep the order in which they joined; the name never takes part
/// in the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Display name, unique within a tracker.
    pub name: String,
    /// Initiative value.
    pub initiative_value: i32,
    /// Secondary sort key; 0 when not given.
    pub tiebreaker: i32,
}

impl Participant {
    /// Creates a participant.
    #[must_use]
    pub fn new(name: impl Into<String>, initiative_value: i32, tiebreaker: i32) -> Self {
        Self {
            name: name.into(),
            initiative_value,
            tiebreaker,
        }
    }

    /// The key participants are ordered by, highest first.
    #[must_use]
    pub fn sort_key(&self) -> (i32, i32) {
        (self.initiative_value, self.tiebreaker)
    }

    /// Whether `self` goes strictly before `other` regardless of when either
    /// joined. Returns `false` for equal keys: those are decided by position.
    #[must_use]
    pub fn sorts_before(&self, other: &Self) -> bool {
        self.sort_key() > other.sort_key()
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tiebreaker == 0 {
            write!(f, "{}: {}", self.initiative_value, self.name)
        } else {
            write!(
                f,
                "{} ({}): {}",
                self.initiative_value, self.tiebreaker, self.name
            )
        }
    }
}

impl From<ParticipantRecord> for Participant {
    fn from(record: ParticipantRecord) -> Self {
        Self {
            name: record.name,
            initiative_value: record.initiative_value,
            tiebreaker: record.tiebreaker,
        }
    }
}

impl From<&Participant> for ParticipantRecord {
    fn from(participant: &Participant) -> Self {
        Self {
            name: participant.name.clone(),
            initiative_value: participant.initiative_value,
            tiebreaker: participant.tiebreaker,
        }
    }
}

/// Sorts a roster given in join order into initiative order.
///
/// `sort_by` is stable, so equal keys stay in join order.
pub fn sort_by_initiative(roster: &mut [Participant]) {
    roster.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}

/// Linear search by name.
#[must_use]
pub fn find_by_name<'a>(participants: &'a [Participant], name: &str) -> Option<&'a Participant> {
    participants.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(participants: &[Participant]) -> Vec<&str> {
        participants.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_equal_keys_keep_join_order() {
        let mut roster = vec![
            Participant::new("Alice", 15, 0),
            Participant::new("Frank", 15, 0),
            Participant::new("Aabria", 15, 0),
        ];

        sort_by_initiative(&mut roster);

        assert_eq!(names(&roster), vec!["Alice", "Frank", "Aabria"]);
    }

    #[test]
    fn test_full_ordering_uses_value_then_tiebreaker_then_join_order() {
        let mut roster = vec![
            Participant::new("Alice", 15, 0),
            Participant::new("Bob", 10, 0),
            Participant::new("Charlie", 5, 0),
            Participant::new("Deborah", 15, 99),
            Participant::new("Eve", 15, -10),
            Participant::new("Frank", 15, 0),
            Participant::new("Aabria", 15, 0),
        ];

        sort_by_initiative(&mut roster);

        assert_eq!(
            names(&roster),
            vec![
                "Deborah", "Alice", "Frank", "Aabria", "Eve", "Bob", "Charlie"
            ]
        );
    }

    #[test]
    fn test_sorts_before_ignores_name() {
        let zed = Participant::new("Zed", 12, 0);
        let abe = Participant::new("Abe", 12, 0);

        assert!(!zed.sorts_before(&abe));
        assert!(!abe.sorts_before(&zed));
        assert!(Participant::new("Abe", 12, 1).sorts_before(&zed));
    }

    #[test]
    fn test_display_omits_zero_tiebreaker() {
        assert_eq!(Participant::new("Bob", 10, 0).to_string(), "10: Bob");
        assert_eq!(Participant::new("Eve", 15, -10).to_string(), "15 (-10): Eve");
    }

    #[test]
    fn test_find_by_name_is_exact() {
        let roster = vec![Participant::new("Bob", 10, 0)];

        assert_eq!(find_by_name(&roster, "Bob"), Some(&roster[0]));
        assert!(find_by_name(&roster, "bob").is_none());
    }
}
