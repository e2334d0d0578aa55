//! Assessment completion action handler.
//!
//! Closes the user's interview: records the message as the evolution answer
//! when the interview is at that step, generates the report and removes the
//! session. A failed report call leaves the session in place.

use std::sync::Arc;

use async_trait::async_trait;
use imre_assessment::prompts::completion_message;
use imre_assessment::{AssessmentMachine, Step};

use crate::error::ActionError;
use crate::handler::{require_user, ActionHandler};
use crate::types::{ActionContext, ActionData, ActionResult, PlatformIntentKind};

pub struct AssessmentCompleteHandler {
    machine: Arc<AssessmentMachine>,
}

impl AssessmentCompleteHandler {
    pub fn new(machine: Arc<AssessmentMachine>) -> Self {
        Self { machine }
    }
}

#[async_trait]
impl ActionHandler for AssessmentCompleteHandler {
    fn kind(&self) -> PlatformIntentKind {
        PlatformIntentKind::AssessmentComplete
    }

    async fn execute(
        &self,
        user_id: &str,
        context: &ActionContext,
    ) -> Result<ActionResult, ActionError> {
        require_user(user_id)?;
        let session = context
            .session
            .as_ref()
            .ok_or_else(|| ActionError::SessionAbsent(user_id.to_string()))?;

        let evolution = (session.step == Step::Evolution).then_some(context.text.as_str());
        let report = self.machine.finalize(user_id, evolution).await?;

        Ok(ActionResult::ok(
            completion_message(report.id),
            ActionData::Report {
                report_id: report.id,
                patient_name: report.patient_name,
            },
        ))
    }

    fn describe(&self, user_id: &str) -> String {
        format!("Complete IMRE assessment for {}", user_id)
    }
}
