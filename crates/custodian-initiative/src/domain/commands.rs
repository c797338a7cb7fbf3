//! Commands for the initiative context.

use custodian_core::command::Command;
use uuid::Uuid;

/// Implements `Command` for a struct with `correlation_id` and `channel_id`
/// fields.
macro_rules! impl_command {
    ($command:ty, $name:literal) => {
        impl Command for $command {
            fn command_type(&self) -> &'static str {
                $name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }

            fn channel_id(&self) -> &str {
                &self.channel_id
            }
        }
    };
}

/// Command to start tracking initiative in a channel.
#[derive(Debug, Clone)]
pub struct CreateInitiative {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel to track.
    pub channel_id: String,
    /// Round to start counting from; 1 unless resuming a fight.
    pub starting_round: i32,
}

impl_command!(CreateInitiative, "initiative.create");

/// Command to stop tracking initiative in a channel.
#[derive(Debug, Clone)]
pub struct DeleteInitiative {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel whose tracker is removed.
    pub channel_id: String,
}

impl_command!(DeleteInitiative, "initiative.delete");

/// Command to add a participant.
#[derive(Debug, Clone)]
pub struct AddParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel whose tracker is changed.
    pub channel_id: String,
    /// Name of the new participant.
    pub name: String,
    /// Initiative value.
    pub initiative_value: i32,
    /// Secondary sort key.
    pub tiebreaker: i32,
}

impl_command!(AddParticipant, "initiative.add_participant");

/// Command to remove a participant.
#[derive(Debug, Clone)]
pub struct RemoveParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel whose tracker is changed.
    pub channel_id: String,
    /// Name of the participant to remove.
    pub name: String,
}

impl_command!(RemoveParticipant, "initiative.remove_participant");

/// Command to change a participant's initiative.
#[derive(Debug, Clone)]
pub struct UpdateParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel whose tracker is changed.
    pub channel_id: String,
    /// Name of the participant to update.
    pub name: String,
    /// New initiative value.
    pub initiative_value: i32,
    /// New secondary sort key.
    pub tiebreaker: i32,
}

impl_command!(UpdateParticipant, "initiative.update_participant");

/// Command to pass the turn to the next participant.
#[derive(Debug, Clone)]
pub struct NextParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel whose tracker is advanced.
    pub channel_id: String,
}

impl_command!(NextParticipant, "initiative.next_participant");

/// Command to hand the turn back to the previous participant.
#[derive(Debug, Clone)]
pub struct PreviousParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel whose tracker is rewound.
    pub channel_id: String,
}

impl_command!(PreviousParticipant, "initiative.previous_participant");

/// Command to jump the turn to a named participant.
#[derive(Debug, Clone)]
pub struct GotoParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel whose tracker is changed.
    pub channel_id: String,
    /// Name of the participant who takes the turn.
    pub name: String,
}

impl_command!(GotoParticipant, "initiative.goto_participant");
