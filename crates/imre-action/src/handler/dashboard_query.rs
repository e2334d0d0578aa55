//! Dashboard query action handler.

use std::sync::Arc;

use async_trait::async_trait;
use imre_core::{with_timeout, ReportService};

use crate::error::ActionError;
use crate::handler::{require_user, ActionHandler};
use crate::types::{ActionContext, ActionData, ActionResult, DashboardSummary, PlatformIntentKind};

pub struct DashboardQueryHandler {
    reports: Arc<dyn ReportService>,
    timeout_ms: u64,
}

impl DashboardQueryHandler {
    pub fn new(reports: Arc<dyn ReportService>, timeout_ms: u64) -> Self {
        Self {
            reports,
            timeout_ms,
        }
    }
}

#[async_trait]
impl ActionHandler for DashboardQueryHandler {
    fn kind(&self) -> PlatformIntentKind {
        PlatformIntentKind::DashboardQuery
    }

    async fn execute(
        &self,
        user_id: &str,
        context: &ActionContext,
    ) -> Result<ActionResult, ActionError> {
        require_user(user_id)?;

        let reports = with_timeout(
            "report service",
            self.timeout_ms,
            self.reports.list_reports(user_id),
        )
        .await
        .map_err(|e| ActionError::Collaborator(e.to_string()))?;

        let summary = DashboardSummary {
            report_count: reports.len(),
            latest_report_id: reports.first().map(|r| r.id),
            active_step: context.session.as_ref().map(|s| s.step),
        };

        let mut message = match summary.report_count {
            0 => "Você ainda não tem relatórios clínicos registrados.".to_string(),
            1 => "Você tem 1 relatório clínico registrado.".to_string(),
            n => format!("Você tem {} relatórios clínicos registrados.", n),
        };
        if let Some(step) = summary.active_step {
            message.push_str(&format!(" Há uma avaliação em andamento (etapa: {}).", step));
        }

        Ok(ActionResult::ok(message, ActionData::Dashboard(summary)))
    }

    fn describe(&self, user_id: &str) -> String {
        format!("Query dashboard for {}", user_id)
    }
}
