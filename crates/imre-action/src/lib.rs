//! Platform actions.
//!
//! Detects platform-level intents (start or complete an assessment, generate
//! a report, query the dashboard) and executes them through pluggable
//! handlers, independently of the reply text.

pub mod detector;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod types;

pub use detector::PlatformIntentDetector;
pub use dispatcher::ActionDispatcher;
pub use error::ActionError;
pub use handler::{ActionHandler, ActionRegistry};
pub use types::{
    ActionContext, ActionData, ActionResult, DashboardSummary, PlatformIntent, PlatformIntentKind,
};
