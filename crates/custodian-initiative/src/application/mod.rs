//! Application layer: load, mutate and persist trackers.

pub mod command_handlers;
mod locks;
pub mod query_handlers;
