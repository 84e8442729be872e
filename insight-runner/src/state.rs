//! Shared application state.

use crate::orchestrator::Orchestrator;
use crate::session::SessionManager;

/// Shared application state passed to all handlers.
pub struct AppState {
    pub sessions: SessionManager,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            sessions: SessionManager::new(),
            orchestrator,
        }
    }
}
