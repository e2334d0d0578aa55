use imre_assessment::AssessmentError;
use thiserror::Error;

/// Errors returned by [`crate::ConversationOrchestrator::handle`].
///
/// Only envelope validation and poisoned shared state surface here;
/// collaborator failures become degraded replies instead.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("user id must not be empty")]
    EmptyUserId,

    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<AssessmentError> for ChatError {
    fn from(err: AssessmentError) -> Self {
        ChatError::Storage(err.to_string())
    }
}
