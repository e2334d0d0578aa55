//! Error types for platform actions.

use imre_assessment::AssessmentError;

use crate::types::PlatformIntentKind;

/// Errors from action handler execution.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Invalid action input: {0}")]
    InvalidInput(String),
    #[error("No active assessment session for user: {0}")]
    SessionAbsent(String),
    #[error("Action type not registered: {0}")]
    UnregisteredHandler(PlatformIntentKind),
    #[error("Action not supported: {0}")]
    Unsupported(PlatformIntentKind),
    #[error("Collaborator failed: {0}")]
    Collaborator(String),
    #[error("Assessment error: {0}")]
    Assessment(#[from] AssessmentError),
}
