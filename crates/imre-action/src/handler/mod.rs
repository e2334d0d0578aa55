//! Action handler registry and trait definition.
//!
//! Defines the `ActionHandler` async trait and the registry the dispatcher
//! uses to route a platform intent to its implementation.

pub mod assessment_complete;
pub mod assessment_start;
pub mod dashboard_query;
pub mod report_generate;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ActionError;
use crate::types::{ActionContext, ActionResult, PlatformIntentKind};

pub use assessment_complete::AssessmentCompleteHandler;
pub use assessment_start::AssessmentStartHandler;
pub use dashboard_query::DashboardQueryHandler;
pub use report_generate::ReportGenerateHandler;

/// Executes one kind of platform action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn kind(&self) -> PlatformIntentKind;

    async fn execute(
        &self,
        user_id: &str,
        context: &ActionContext,
    ) -> Result<ActionResult, ActionError>;

    /// Short human-readable description, used in logs.
    fn describe(&self, user_id: &str) -> String;
}

/// Handlers keyed by the platform intent they serve.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<PlatformIntentKind, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same kind.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn get(&self, kind: PlatformIntentKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Reject an empty or whitespace-only user id.
pub(crate) fn require_user(user_id: &str) -> Result<(), ActionError> {
    if user_id.trim().is_empty() {
        Err(ActionError::InvalidInput(
            "user id must not be empty".to_string(),
        ))
    } else {
        Ok(())
    }
}
