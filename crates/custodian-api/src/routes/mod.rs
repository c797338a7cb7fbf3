//! Route modules.

pub mod commands;
pub mod health;
pub mod initiative;
