//! IMRE step machine.
//!
//! Enforces the step sequence
//! Investigation -> Methodology -> Result -> Evolution -> Completed
//! and advances one session by one answer per call. Sessions are read from
//! the store as snapshots, mutated locally and written back only when the
//! turn succeeds, so a failed collaborator call never loses state.

use std::sync::Arc;
use std::time::Duration;

use imre_core::config::AssessmentConfig;
use imre_core::{with_timeout, PatientRecordStore, Report, ReportService};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AssessmentError;
use crate::investigation::{InvestigationOptions, InvestigationTurn};
use crate::prompts;
use crate::report::{build_sections, patient_name};
use crate::session::{InterviewSession, Step};
use crate::store::SessionStore;

/// Validate that a step transition is allowed.
///
/// Valid transitions:
/// - Investigation -> Methodology
/// - Methodology -> Result
/// - Result -> Evolution
/// - Evolution -> Completed
pub fn validate_transition(from: Step, to: Step) -> Result<(), AssessmentError> {
    let valid = matches!(
        (from, to),
        (Step::Investigation, Step::Methodology)
            | (Step::Methodology, Step::Result)
            | (Step::Result, Step::Evolution)
            | (Step::Evolution, Step::Completed)
    );

    if valid {
        Ok(())
    } else {
        Err(AssessmentError::InvalidTransition(from, to))
    }
}

/// How a call left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// A new session was created.
    Started,
    /// `start` found a live session and reused it.
    Resumed,
    /// The answer was recorded.
    Advanced,
    /// Empty input; the pending prompt is repeated.
    Repeated,
    /// Report generated and session removed.
    Completed,
    /// A collaborator failed; the session is unchanged.
    Degraded,
    /// The user has no live session.
    NoSession,
}

/// Reply and resulting state for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub reply: String,
    /// Step the session is at after this call.
    pub step: Option<Step>,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    fn new(reply: impl Into<String>, step: Step, status: StepStatus) -> Self {
        Self {
            reply: reply.into(),
            step: Some(step),
            status,
            report_id: None,
            error: None,
        }
    }

    fn no_session() -> Self {
        Self {
            reply: prompts::NO_SESSION_PROMPT.to_string(),
            step: None,
            status: StepStatus::NoSession,
            report_id: None,
            error: None,
        }
    }

    fn degraded(reply: &str, step: Step, error: impl ToString) -> Self {
        Self {
            reply: reply.to_string(),
            step: Some(step),
            status: StepStatus::Degraded,
            report_id: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == StepStatus::Degraded
    }
}

/// Drives interview sessions through the IMRE steps.
pub struct AssessmentMachine {
    store: Arc<SessionStore>,
    reports: Arc<dyn ReportService>,
    records: Option<Arc<dyn PatientRecordStore>>,
    config: AssessmentConfig,
    timeout_ms: u64,
}

impl AssessmentMachine {
    pub fn new(
        store: Arc<SessionStore>,
        reports: Arc<dyn ReportService>,
        config: AssessmentConfig,
        timeout_ms: u64,
    ) -> Self {
        Self {
            store,
            reports,
            records: None,
            config,
            timeout_ms,
        }
    }

    /// Also upsert the patient's assessment record on completion.
    pub fn with_records(mut self, records: Arc<dyn PatientRecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn reports(&self) -> &Arc<dyn ReportService> {
        &self.reports
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    fn options(&self) -> InvestigationOptions {
        InvestigationOptions {
            closing_max_len: self.config.closing_max_len,
            drill_all_complaints: self.config.drill_all_complaints,
        }
    }

    /// Purge sessions idle past the configured TTL.
    pub fn expire_idle(&self) -> Vec<String> {
        let ttl = Duration::from_secs(u64::from(self.config.session_ttl_minutes) * 60);
        self.store.expire_idle(ttl)
    }

    /// Snapshot of the user's live session.
    pub fn session_state(&self, user_id: &str) -> Result<Option<InterviewSession>, AssessmentError> {
        self.store.get(user_id)
    }

    /// The pending prompt for a session.
    pub fn current_prompt(&self, session: &InterviewSession) -> String {
        match session.step {
            Step::Investigation => session.investigation.current_prompt(self.options()),
            Step::Methodology => prompts::METHODOLOGY_PROMPT.to_string(),
            Step::Result => prompts::RESULT_PROMPT.to_string(),
            Step::Evolution => prompts::EVOLUTION_PROMPT.to_string(),
            Step::Completed => prompts::NO_SESSION_PROMPT.to_string(),
        }
    }

    /// Start an interview. Idempotent: a live session is reused and its
    /// pending prompt returned.
    pub fn start(&self, user_id: &str) -> Result<StepOutcome, AssessmentError> {
        let (session, created) = self.store.get_or_insert(InterviewSession::new(user_id))?;
        if created {
            info!(user_id = %user_id, "Assessment session started");
            Ok(StepOutcome::new(
                prompts::PRESENTATION_PROMPT,
                session.step,
                StepStatus::Started,
            ))
        } else {
            debug!(user_id = %user_id, step = %session.step, "Assessment already in progress");
            Ok(StepOutcome::new(
                prompts::resume_message(&self.current_prompt(&session)),
                session.step,
                StepStatus::Resumed,
            ))
        }
    }

    /// Feed one user message into the user's session.
    ///
    /// Never fails for a missing session or a collaborator failure: the
    /// first offers to start an interview, the second returns a degraded
    /// outcome and leaves the session as it was.
    pub async fn advance(&self, user_id: &str, text: &str) -> Result<StepOutcome, AssessmentError> {
        let Some(mut session) = self.store.get(user_id)? else {
            return Ok(StepOutcome::no_session());
        };

        let answer = text.trim();
        if answer.is_empty() {
            return Ok(StepOutcome::new(
                self.current_prompt(&session),
                session.step,
                StepStatus::Repeated,
            ));
        }

        let reply = match session.step {
            Step::Investigation => match session.investigation.answer(answer, self.options()) {
                InvestigationTurn::Prompt(prompt) => prompt,
                InvestigationTurn::Finished => {
                    self.transition(&mut session, Step::Methodology)?;
                    prompts::METHODOLOGY_PROMPT.to_string()
                }
            },
            Step::Methodology => {
                session.methodology = answer.to_string();
                self.transition(&mut session, Step::Result)?;
                prompts::RESULT_PROMPT.to_string()
            }
            Step::Result => {
                session.result = answer.to_string();
                self.transition(&mut session, Step::Evolution)?;
                prompts::EVOLUTION_PROMPT.to_string()
            }
            Step::Evolution => {
                session.evolution = answer.to_string();
                return match self.complete(session).await {
                    Ok(report) => Ok(completed(report.id)),
                    Err(e) if e.is_retryable() => {
                        warn!(user_id = %user_id, error = %e, "Report generation failed");
                        Ok(StepOutcome::degraded(
                            prompts::REPORT_FAILURE_APOLOGY,
                            Step::Evolution,
                            e,
                        ))
                    }
                    Err(e) => Err(e),
                };
            }
            Step::Completed => {
                self.store.delete(user_id)?;
                return Ok(StepOutcome::no_session());
            }
        };

        let step = session.step;
        session.touch();
        self.store.set(session)?;
        Ok(StepOutcome::new(reply, step, StepStatus::Advanced))
    }

    /// Close the user's interview now and generate its report.
    ///
    /// Unanswered steps are filled with configured defaults while walking the
    /// remaining transitions. `evolution` is recorded when the session is
    /// already at Evolution. On collaborator failure the stored session is
    /// left untouched and the error returned.
    pub async fn finalize(
        &self,
        user_id: &str,
        evolution: Option<&str>,
    ) -> Result<Report, AssessmentError> {
        let mut session = self
            .store
            .get(user_id)?
            .ok_or_else(|| AssessmentError::SessionAbsent(user_id.to_string()))?;

        if session.step == Step::Evolution {
            if let Some(text) = evolution.map(str::trim).filter(|t| !t.is_empty()) {
                session.evolution = text.to_string();
            }
        }

        while session.step != Step::Evolution {
            let next = session
                .step
                .next()
                .ok_or(AssessmentError::InvalidTransition(session.step, Step::Evolution))?;
            match next {
                Step::Result if session.methodology.is_empty() => {
                    session.methodology = self.config.default_methodology.clone();
                }
                Step::Evolution if session.result.is_empty() => {
                    session.result = self.config.default_result.clone();
                }
                _ => {}
            }
            self.transition(&mut session, next)?;
        }

        self.complete(session).await
    }

    /// Generate the report for a session at Evolution and remove it from the
    /// store. The store is only touched on success.
    async fn complete(&self, mut session: InterviewSession) -> Result<Report, AssessmentError> {
        validate_transition(session.step, Step::Completed)?;

        let sections = build_sections(&session, &self.config);
        let name = patient_name(&session);
        let report = with_timeout(
            "report service",
            self.timeout_ms,
            self.reports
                .generate_report(&session.user_id, &name, sections),
        )
        .await?;

        self.store.delete(&session.user_id)?;
        session.step = Step::Completed;
        info!(
            user_id = %session.user_id,
            report_id = %report.id,
            "Assessment completed"
        );

        self.record_completion(&session.user_id, &report).await;
        Ok(report)
    }

    /// Best-effort upsert of the patient's assessment record.
    async fn record_completion(&self, user_id: &str, report: &Report) {
        let Some(records) = &self.records else {
            return;
        };
        let data = serde_json::json!({
            "report_id": report.id,
            "sections": report.sections,
        });
        if let Err(e) = with_timeout(
            "patient records",
            self.timeout_ms,
            records.upsert_assessment_record(user_id, "completed", data),
        )
        .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to upsert assessment record");
        }
    }

    fn transition(&self, session: &mut InterviewSession, to: Step) -> Result<(), AssessmentError> {
        validate_transition(session.step, to)?;
        debug!(user_id = %session.user_id, from = %session.step, to = %to, "Step transition");
        session.step = to;
        Ok(())
    }
}

fn completed(report_id: Uuid) -> StepOutcome {
    StepOutcome {
        reply: prompts::completion_message(report_id),
        step: Some(Step::Completed),
        status: StepStatus::Completed,
        report_id: Some(report_id),
        error: None,
    }
}
