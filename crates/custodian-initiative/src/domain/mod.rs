//! Pure initiative model: value types and ordering. No I/O.

pub mod aggregates;
pub mod commands;
pub mod participant;
