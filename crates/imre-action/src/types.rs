//! Platform intents and action results.

use std::fmt;

use imre_assessment::{InterviewSession, Step, StepOutcome};
use imre_core::ReportSections;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Platform intent
// =============================================================================

/// System action a message asks for. Orthogonal to the clinical intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformIntentKind {
    AssessmentStart,
    AssessmentComplete,
    ReportGenerate,
    DashboardQuery,
    NotifyProfessional,
    None,
}

impl fmt::Display for PlatformIntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformIntentKind::AssessmentStart => write!(f, "assessment_start"),
            PlatformIntentKind::AssessmentComplete => write!(f, "assessment_complete"),
            PlatformIntentKind::ReportGenerate => write!(f, "report_generate"),
            PlatformIntentKind::DashboardQuery => write!(f, "dashboard_query"),
            PlatformIntentKind::NotifyProfessional => write!(f, "notify_professional"),
            PlatformIntentKind::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for PlatformIntentKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assessment_start" => Ok(PlatformIntentKind::AssessmentStart),
            "assessment_complete" => Ok(PlatformIntentKind::AssessmentComplete),
            "report_generate" => Ok(PlatformIntentKind::ReportGenerate),
            "dashboard_query" => Ok(PlatformIntentKind::DashboardQuery),
            "notify_professional" => Ok(PlatformIntentKind::NotifyProfessional),
            "none" => Ok(PlatformIntentKind::None),
            _ => Err(format!("Unknown platform intent: {}", s)),
        }
    }
}

/// A detected platform intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformIntent {
    pub kind: PlatformIntentKind,
    pub confidence: f32,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl PlatformIntent {
    pub fn new(kind: PlatformIntentKind, confidence: f32) -> Self {
        Self {
            kind,
            confidence,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn none() -> Self {
        Self::new(PlatformIntentKind::None, 0.0)
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn is_none(&self) -> bool {
        self.kind == PlatformIntentKind::None
    }
}

// =============================================================================
// Execution
// =============================================================================

/// Inputs an action may need beyond the user id.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// The message that triggered the action.
    pub text: String,
    /// The user's live interview, if any.
    pub session: Option<InterviewSession>,
    /// Report sections prepared by the caller for report generation.
    pub sections: Option<ReportSections>,
}

/// Dashboard figures for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub report_count: usize,
    pub latest_report_id: Option<Uuid>,
    pub active_step: Option<Step>,
}

/// Typed payload of a successful action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionData {
    Assessment(StepOutcome),
    Report { report_id: Uuid, patient_name: String },
    Dashboard(DashboardSummary),
}

/// Outcome of executing a platform action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    /// User-facing summary of the outcome.
    pub message: String,
    pub data: Option<ActionData>,
    pub error: Option<String>,
    /// The reply for this turn must mention this outcome.
    pub requires_response: bool,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>, data: ActionData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
            requires_response: true,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl ToString) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error.to_string()),
            requires_response: true,
        }
    }

    /// Nothing to do; the reply is built elsewhere.
    pub fn noop() -> Self {
        Self {
            success: true,
            message: String::new(),
            data: None,
            error: None,
            requires_response: false,
        }
    }
}
