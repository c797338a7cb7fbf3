//! Chat command surface.
//!
//! Parses the text of an `init` chat command, runs exactly one service
//! operation for the channel it came from, and renders the outcome as plain
//! text. Every failure, including parse errors, becomes a reply; nothing is
//! propagated to the transport.

use std::str::FromStr;

use custodian_core::error::DomainError;
use custodian_initiative::application::command_handlers::InitiativeService;
use custodian_initiative::domain::aggregates::InitiativeTracker;
use custodian_initiative::domain::commands::{
    AddParticipant, CreateInitiative, DeleteInitiative, GotoParticipant, NextParticipant,
    PreviousParticipant, RemoveParticipant, UpdateParticipant,
};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Overview of every command, sent for empty or unknown input.
pub const HELP: &str = "\
Initiative commands:
  start [round]
  end
  show
  add <name> <initiative> [tiebreaker]
  remove <name>
  update <name> <initiative> [tiebreaker]
  next
  back
  goto <name>
Quote names that contain spaces, e.g. add \"Goblin Boss\" 14";

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Liveness check.
    Ping,
    /// Start tracking initiative.
    Start {
        /// Round to start at.
        starting_round: i32,
    },
    /// Stop tracking initiative.
    End,
    /// Show the tracker.
    Show,
    /// Add a participant.
    Add {
        /// Participant name.
        name: String,
        /// Initiative value.
        initiative_value: i32,
        /// Secondary sort key.
        tiebreaker: i32,
    },
    /// Remove a participant.
    Remove {
        /// Participant name.
        name: String,
    },
    /// Change a participant's initiative.
    Update {
        /// Participant name.
        name: String,
        /// New initiative value.
        initiative_value: i32,
        /// New secondary sort key.
        tiebreaker: i32,
    },
    /// Next turn.
    Next,
    /// Previous turn.
    Back,
    /// Jump to a participant's turn.
    Goto {
        /// Participant name.
        name: String,
    },
}

/// Why a chat message could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing but whitespace (or the bare group prefix) was sent.
    #[error("no command given")]
    Empty,

    /// The first word is not a known command.
    #[error("unknown command: {0}")]
    Unknown(String),

    /// A known command with missing, extra, or malformed arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// A double quote was opened but never closed.
    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// Splits on whitespace, keeping double-quoted runs together.
fn tokenize(input: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if quoted || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(ParseError::UnterminatedQuote);
    }
    if quoted || !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_int(token: &str, usage: &'static str) -> Result<i32, ParseError> {
    token.parse().map_err(|_| ParseError::Usage(usage))
}

/// Parses `<name> <initiative> [tiebreaker]`.
fn parse_roll(args: &[String], usage: &'static str) -> Result<(String, i32, i32), ParseError> {
    match args {
        [name, value] => Ok((name.clone(), parse_int(value, usage)?, 0)),
        [name, value, tiebreaker] => Ok((
            name.clone(),
            parse_int(value, usage)?,
            parse_int(tiebreaker, usage)?,
        )),
        _ => Err(ParseError::Usage(usage)),
    }
}

impl FromStr for ChatCommand {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(input)?;
        let tokens = match tokens.first().map(String::as_str) {
            Some("/init" | "init") => &tokens[1..],
            _ => &tokens[..],
        };
        let Some((name, args)) = tokens.split_first() else {
            return Err(ParseError::Empty);
        };

        match (name.to_lowercase().as_str(), args) {
            ("ping", []) => Ok(Self::Ping),
            ("start", []) => Ok(Self::Start { starting_round: 1 }),
            ("start", [round]) => Ok(Self::Start {
                starting_round: parse_int(round, "start [round]")?,
            }),
            ("end", []) => Ok(Self::End),
            ("show", []) => Ok(Self::Show),
            ("add", args) => {
                let usage = "add <name> <initiative> [tiebreaker]";
                let (name, initiative_value, tiebreaker) = parse_roll(args, usage)?;
                Ok(Self::Add {
                    name,
                    initiative_value,
                    tiebreaker,
                })
            }
            ("remove", [name]) => Ok(Self::Remove { name: name.clone() }),
            ("update", args) => {
                let usage = "update <name> <initiative> [tiebreaker]";
                let (name, initiative_value, tiebreaker) = parse_roll(args, usage)?;
                Ok(Self::Update {
                    name,
                    initiative_value,
                    tiebreaker,
                })
            }
            ("next", []) => Ok(Self::Next),
            ("back", []) => Ok(Self::Back),
            ("goto", [name]) => Ok(Self::Goto { name: name.clone() }),
            ("ping", _) => Err(ParseError::Usage("ping")),
            ("end", _) => Err(ParseError::Usage("end")),
            ("show", _) => Err(ParseError::Usage("show")),
            ("next", _) => Err(ParseError::Usage("next")),
            ("back", _) => Err(ParseError::Usage("back")),
            ("start", _) => Err(ParseError::Usage("start [round]")),
            ("remove", _) => Err(ParseError::Usage("remove <name>")),
            ("goto", _) => Err(ParseError::Usage("goto <name>")),
            (other, _) => Err(ParseError::Unknown(other.to_owned())),
        }
    }
}

/// Renders a tracker together with whose turn it is.
fn render_turn(tracker: &InitiativeTracker) -> String {
    match tracker.current_participant() {
        Some(current) => format!("{tracker}\n\nUp now: {}", current.name),
        None => tracker.to_string(),
    }
}

/// Turns a domain error into the reply shown to the channel.
#[must_use]
pub fn describe_error(err: &DomainError) -> String {
    match err {
        DomainError::NotFound(message) => format!("Not found: {message}"),
        DomainError::AlreadyExists(message) => format!("Already exists: {message}"),
        DomainError::Backtrack => {
            "Can't go back any further: it's the first turn of round 1.".to_owned()
        }
        DomainError::Validation(message) => format!("Invalid input: {message}"),
        DomainError::Infrastructure(message) => {
            error!(%message, "infrastructure failure while handling chat command");
            "Something went wrong, please try again.".to_owned()
        }
    }
}

/// Runs one parsed command against the channel's tracker, stamping every
/// service command with `correlation_id`.
///
/// # Errors
///
/// Returns whatever `DomainError` the service operation produced.
pub async fn execute(
    service: &InitiativeService,
    correlation_id: Uuid,
    channel_id: &str,
    command: ChatCommand,
) -> Result<String, DomainError> {
    let channel_id = channel_id.to_owned();

    let reply = match command {
        ChatCommand::Ping => "Pong!".to_owned(),
        ChatCommand::Start { starting_round } => {
            let tracker = service
                .create_initiative(&CreateInitiative {
                    correlation_id,
                    channel_id,
                    starting_round,
                })
                .await?;
            format!("Initiative started!\n{tracker}")
        }
        ChatCommand::End => {
            service
                .delete_initiative(&DeleteInitiative {
                    correlation_id,
                    channel_id,
                })
                .await?;
            "Initiative ended.".to_owned()
        }
        ChatCommand::Show => render_turn(&service.get_initiative(&channel_id).await?),
        ChatCommand::Add {
            name,
            initiative_value,
            tiebreaker,
        } => render_turn(
            &service
                .add_participant(&AddParticipant {
                    correlation_id,
                    channel_id,
                    name,
                    initiative_value,
                    tiebreaker,
                })
                .await?,
        ),
        ChatCommand::Remove { name } => render_turn(
            &service
                .remove_participant(&RemoveParticipant {
                    correlation_id,
                    channel_id,
                    name,
                })
                .await?,
        ),
        ChatCommand::Update {
            name,
            initiative_value,
            tiebreaker,
        } => render_turn(
            &service
                .update_participant(&UpdateParticipant {
                    correlation_id,
                    channel_id,
                    name,
                    initiative_value,
                    tiebreaker,
                })
                .await?,
        ),
        ChatCommand::Next => render_turn(
            &service
                .next_participant(&NextParticipant {
                    correlation_id,
                    channel_id,
                })
                .await?,
        ),
        ChatCommand::Back => render_turn(
            &service
                .previous_participant(&PreviousParticipant {
                    correlation_id,
                    channel_id,
                })
                .await?,
        ),
        ChatCommand::Goto { name } => render_turn(
            &service
                .goto_participant(&GotoParticipant {
                    correlation_id,
                    channel_id,
                    name,
                })
                .await?,
        ),
    };
    Ok(reply)
}

/// Parses and runs a chat message, always producing a reply.
pub async fn respond(
    service: &InitiativeService,
    correlation_id: Uuid,
    channel_id: &str,
    input: &str,
) -> String {
    let command = match input.parse::<ChatCommand>() {
        Ok(command) => command,
        Err(ParseError::Empty | ParseError::Unknown(_)) => return HELP.to_owned(),
        Err(err) => return format!("Sorry, I couldn't read that ({err})."),
    };
    info!(%correlation_id, channel_id, ?command, "chat command received");

    match execute(service, correlation_id, channel_id, command).await {
        Ok(reply) => reply,
        Err(err) => describe_error(&err),
    }
}
