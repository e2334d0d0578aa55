//! Platform action dispatcher.
//!
//! Pairs detection with execution. Handler errors never escape: every
//! failure becomes an `ActionResult` with `success = false` and a
//! user-facing message.

use std::sync::Arc;

use imre_assessment::prompts::{NO_SESSION_PROMPT, REPORT_FAILURE_APOLOGY, STORAGE_FAILURE_APOLOGY};
use imre_assessment::{AssessmentError, AssessmentMachine};
use tracing::{info, warn};

use crate::detector::PlatformIntentDetector;
use crate::error::ActionError;
use crate::handler::{
    ActionRegistry, AssessmentCompleteHandler, AssessmentStartHandler, DashboardQueryHandler,
    ReportGenerateHandler,
};
use crate::types::{ActionContext, ActionResult, PlatformIntent, PlatformIntentKind};

const INVALID_INPUT_MESSAGE: &str =
    "Não consegui identificar seu usuário. Faça login novamente para continuar.";
const REPORT_UNAVAILABLE_MESSAGE: &str =
    "Desculpe, não consegui gerar o relatório agora. Tente novamente em instantes.";
const DASHBOARD_UNAVAILABLE_MESSAGE: &str =
    "Desculpe, não consegui carregar seu painel agora. Tente novamente em instantes.";
const UNSUPPORTED_MESSAGE: &str = "Essa ação ainda não está disponível na plataforma.";

pub struct ActionDispatcher {
    detector: PlatformIntentDetector,
    registry: ActionRegistry,
}

impl ActionDispatcher {
    pub fn new(detector: PlatformIntentDetector, registry: ActionRegistry) -> Self {
        Self { detector, registry }
    }

    /// Dispatcher with the four built-in handlers, sharing the machine's
    /// session store and report service.
    pub fn with_defaults(machine: Arc<AssessmentMachine>, timeout_ms: u64) -> Self {
        let detector = PlatformIntentDetector::new(machine.store().clone());
        let reports = machine.reports().clone();
        let config = machine.config().clone();

        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(AssessmentStartHandler::new(machine.clone())));
        registry.register(Arc::new(AssessmentCompleteHandler::new(machine)));
        registry.register(Arc::new(ReportGenerateHandler::new(
            reports.clone(),
            config,
            timeout_ms,
        )));
        registry.register(Arc::new(DashboardQueryHandler::new(reports, timeout_ms)));

        Self::new(detector, registry)
    }

    pub fn detect(&self, text: &str, user_id: &str) -> PlatformIntent {
        self.detector.detect(text, user_id)
    }

    /// Execute a detected intent. `None` is a no-op.
    pub async fn execute(
        &self,
        intent: &PlatformIntent,
        user_id: &str,
        context: &ActionContext,
    ) -> ActionResult {
        if intent.is_none() {
            return ActionResult::noop();
        }

        let Some(handler) = self.registry.get(intent.kind) else {
            let err = match intent.kind {
                PlatformIntentKind::NotifyProfessional => ActionError::Unsupported(intent.kind),
                kind => ActionError::UnregisteredHandler(kind),
            };
            warn!(user_id = %user_id, error = %err, "No handler for platform intent");
            return ActionResult::failed(UNSUPPORTED_MESSAGE, err);
        };

        match handler.execute(user_id, context).await {
            Ok(result) => {
                info!(action = %handler.describe(user_id), "Platform action executed");
                result
            }
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    kind = %intent.kind,
                    error = %err,
                    "Platform action failed"
                );
                ActionResult::failed(failure_message(intent.kind, &err), err)
            }
        }
    }
}

fn failure_message(kind: PlatformIntentKind, err: &ActionError) -> &'static str {
    match err {
        ActionError::InvalidInput(_) => INVALID_INPUT_MESSAGE,
        ActionError::SessionAbsent(_)
        | ActionError::Assessment(AssessmentError::SessionAbsent(_)) => NO_SESSION_PROMPT,
        ActionError::Unsupported(_) | ActionError::UnregisteredHandler(_) => UNSUPPORTED_MESSAGE,
        _ => match kind {
            PlatformIntentKind::AssessmentComplete => REPORT_FAILURE_APOLOGY,
            PlatformIntentKind::ReportGenerate => REPORT_UNAVAILABLE_MESSAGE,
            PlatformIntentKind::DashboardQuery => DASHBOARD_UNAVAILABLE_MESSAGE,
            _ => STORAGE_FAILURE_APOLOGY,
        },
    }
}
