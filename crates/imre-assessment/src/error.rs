//! Error types for the interview engine.

use imre_core::ImreError;

use crate::session::Step;

/// Errors from session storage and step transitions.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("No active assessment session for user: {0}")]
    SessionAbsent(String),
    #[error("Invalid step transition: {0} -> {1}")]
    InvalidTransition(Step, Step),
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] ImreError),
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl AssessmentError {
    /// True when the same call may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            AssessmentError::Collaborator(e) => e.is_retryable(),
            _ => false,
        }
    }
}
