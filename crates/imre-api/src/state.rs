//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use imre_chat::ConversationOrchestrator;
use imre_core::ImreConfig;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub config: Arc<ImreConfig>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ImreConfig, orchestrator: Arc<ConversationOrchestrator>) -> Self {
        Self {
            orchestrator,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
