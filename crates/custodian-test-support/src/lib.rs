//! Shared test mocks and utilities for the Custodian initiative tracker.

mod clock;
mod repository;

pub use clock::FixedClock;
pub use repository::{FailingTrackerRepository, InMemoryTrackerRepository};
