//! Custodian Store: PostgreSQL persistence for initiative trackers.

pub mod pg_tracker_repository;

use sqlx::migrate::Migrator;

/// Embedded schema migrations shared with the integration tests.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
