//! Initiative tracking bounded context.
//!
//! Responsible for the turn order of a tabletop session: which participants
//! are in the fight, how they are ordered, whose turn it is, and which round
//! the table is in. One tracker exists per chat channel.

pub mod application;
pub mod domain;
