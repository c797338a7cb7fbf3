//! Shared application state.

use std::sync::Arc;

use custodian_initiative::application::command_handlers::InitiativeService;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The initiative service, shared by every channel.
    pub initiative: Arc<InitiativeService>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(initiative: Arc<InitiativeService>) -> Self {
        Self { initiative }
    }
}
