//! Assessment start action handler.
//!
//! Opens an IMRE interview for the user, or resumes the live one.

use std::sync::Arc;

use async_trait::async_trait;
use imre_assessment::AssessmentMachine;

use crate::error::ActionError;
use crate::handler::{require_user, ActionHandler};
use crate::types::{ActionContext, ActionData, ActionResult, PlatformIntentKind};

pub struct AssessmentStartHandler {
    machine: Arc<AssessmentMachine>,
}

impl AssessmentStartHandler {
    pub fn new(machine: Arc<AssessmentMachine>) -> Self {
        Self { machine }
    }
}

#[async_trait]
impl ActionHandler for AssessmentStartHandler {
    fn kind(&self) -> PlatformIntentKind {
        PlatformIntentKind::AssessmentStart
    }

    async fn execute(
        &self,
        user_id: &str,
        _context: &ActionContext,
    ) -> Result<ActionResult, ActionError> {
        require_user(user_id)?;
        let outcome = self.machine.start(user_id)?;
        Ok(ActionResult::ok(
            outcome.reply.clone(),
            ActionData::Assessment(outcome),
        ))
    }

    fn describe(&self, user_id: &str) -> String {
        format!("Start IMRE assessment for {}", user_id)
    }
}
