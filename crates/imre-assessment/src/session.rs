//! Interview session state.

use std::collections::BTreeMap;
use std::fmt;

use imre_core::Timestamp;
use serde::{Deserialize, Serialize};

// =============================================================================
// Step
// =============================================================================

/// IMRE protocol step. `Investigation` is initial, `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Investigation,
    Methodology,
    Result,
    Evolution,
    Completed,
}

impl Step {
    /// The step that follows this one, `None` for `Completed`.
    pub fn next(self) -> Option<Step> {
        match self {
            Step::Investigation => Some(Step::Methodology),
            Step::Methodology => Some(Step::Result),
            Step::Result => Some(Step::Evolution),
            Step::Evolution => Some(Step::Completed),
            Step::Completed => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Investigation => write!(f, "investigation"),
            Step::Methodology => write!(f, "methodology"),
            Step::Result => write!(f, "result"),
            Step::Evolution => write!(f, "evolution"),
            Step::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for Step {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "investigation" => Ok(Step::Investigation),
            "methodology" => Ok(Step::Methodology),
            "result" => Ok(Step::Result),
            "evolution" => Ok(Step::Evolution),
            "completed" => Ok(Step::Completed),
            _ => Err(format!("Unknown step: {}", s)),
        }
    }
}

// =============================================================================
// Complaint drill-down
// =============================================================================

/// The next question to ask about one complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailQuestion {
    Location,
    Onset,
    Character,
    Associated,
    /// Combined "what improves / what worsens" question, asked once.
    Factors,
}

/// Answers collected for one complaint, filled in fixed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintDetail {
    pub location: Option<String>,
    pub when: Option<String>,
    pub how: Option<String>,
    pub associated: Option<String>,
    pub improves: Option<String>,
    pub worsens: Option<String>,
}

impl ComplaintDetail {
    /// First unanswered question, `None` once every field is filled.
    pub fn next_question(&self) -> Option<DetailQuestion> {
        if self.location.is_none() {
            Some(DetailQuestion::Location)
        } else if self.when.is_none() {
            Some(DetailQuestion::Onset)
        } else if self.how.is_none() {
            Some(DetailQuestion::Character)
        } else if self.associated.is_none() {
            Some(DetailQuestion::Associated)
        } else if self.improves.is_none() && self.worsens.is_none() {
            Some(DetailQuestion::Factors)
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.next_question().is_none()
    }

    /// Number of filled fields (0..=6).
    pub fn filled(&self) -> usize {
        [
            &self.location,
            &self.when,
            &self.how,
            &self.associated,
            &self.improves,
            &self.worsens,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }
}

// =============================================================================
// Investigation
// =============================================================================

/// Progress through the four Investigation phases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestigationState {
    pub presenting_self: Option<String>,
    /// Insertion order is question order.
    pub complaints_list: Vec<String>,
    pub collecting_complaints: bool,
    pub selecting_main_complaint: bool,
    pub main_complaint: Option<String>,
    /// Index into [`InvestigationState::drill_order`].
    pub current_complaint_index: usize,
    pub complaint_details: BTreeMap<String, ComplaintDetail>,
}

impl InvestigationState {
    /// Complaints to drill down, main complaint first. Without `drill_all`
    /// only the main complaint is drilled.
    pub fn drill_order(&self, drill_all: bool) -> Vec<String> {
        let Some(main) = &self.main_complaint else {
            return Vec::new();
        };
        let mut order = vec![main.clone()];
        if drill_all {
            order.extend(
                self.complaints_list
                    .iter()
                    .filter(|c| *c != main)
                    .cloned(),
            );
        }
        order
    }

    /// The complaint currently being drilled, if any.
    pub fn current_complaint(&self, drill_all: bool) -> Option<String> {
        self.drill_order(drill_all)
            .into_iter()
            .nth(self.current_complaint_index)
    }
}

// =============================================================================
// Session
// =============================================================================

/// One user's live interview. Owned by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub user_id: String,
    pub step: Step,
    pub investigation: InvestigationState,
    pub methodology: String,
    pub result: String,
    pub evolution: String,
    pub started_at: Timestamp,
    pub last_update: Timestamp,
}

impl InterviewSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            user_id: user_id.into(),
            step: Step::Investigation,
            investigation: InvestigationState::default(),
            methodology: String::new(),
            result: String::new(),
            evolution: String::new(),
            started_at: now,
            last_update: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_update = Timestamp::now();
    }
}
