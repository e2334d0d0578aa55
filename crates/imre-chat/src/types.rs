//! Reply envelope returned by the orchestrator.

use std::fmt;

use imre_intent::IntentType;
use serde::{Deserialize, Serialize};

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Assistant,
    Action,
    Assessment,
    Synthesizer,
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplySource::Assistant => write!(f, "assistant"),
            ReplySource::Action => write!(f, "action"),
            ReplySource::Assessment => write!(f, "assessment"),
            ReplySource::Synthesizer => write!(f, "synthesizer"),
        }
    }
}

/// Result of one `handle` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    /// Confidence in [0, 1], penalized on degraded turns.
    pub confidence: f32,
    /// Clinical intent of the user message.
    #[serde(rename = "type")]
    pub reply_type: IntentType,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Reply {
    pub fn source(&self) -> Option<ReplySource> {
        self.metadata
            .get("source")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata
            .get("degraded")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}
