//! IMRE clinical interview.
//!
//! Owns the per-user interview sessions and the state machine that walks
//! each one through Investigation, Methodology, Result and Evolution, ending
//! in a generated clinical report.

pub mod error;
pub mod heuristics;
pub mod investigation;
pub mod prompts;
pub mod report;
pub mod session;
pub mod state_machine;
pub mod store;

pub use error::AssessmentError;
pub use session::{ComplaintDetail, DetailQuestion, InterviewSession, InvestigationState, Step};
pub use state_machine::{validate_transition, AssessmentMachine, StepOutcome, StepStatus};
pub use store::SessionStore;
