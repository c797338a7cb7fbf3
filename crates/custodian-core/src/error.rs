//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// `NotFound`, `AlreadyExists` and `Backtrack` are the expected, user-facing
/// failures of tracker operations. `Validation` rejects malformed input before
/// any storage access, and `Infrastructure` wraps persistence failures.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A tracker or participant does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A tracker or participant with the same key already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Retreating would move the tracker before its first round.
    #[error("cannot go back before round 1")]
    Backtrack,

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
