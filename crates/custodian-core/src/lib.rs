//! Custodian Core: shared domain abstractions.
//!
//! This crate defines the traits and types that the initiative context,
//! the persistence layer, and the API all depend on. It contains no
//! infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod repository;
