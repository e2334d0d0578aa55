//! Report generation action handler.
//!
//! Generates a clinical report from the sections the caller prepared, or
//! from configured defaults when none were supplied. Does not touch the
//! user's interview.

use std::sync::Arc;

use async_trait::async_trait;
use imre_assessment::report::{patient_name, sections_from_notes};
use imre_core::config::AssessmentConfig;
use imre_core::{with_timeout, ReportService};

use crate::error::ActionError;
use crate::handler::{require_user, ActionHandler};
use crate::types::{ActionContext, ActionData, ActionResult, PlatformIntentKind};

pub struct ReportGenerateHandler {
    reports: Arc<dyn ReportService>,
    config: AssessmentConfig,
    timeout_ms: u64,
}

impl ReportGenerateHandler {
    pub fn new(reports: Arc<dyn ReportService>, config: AssessmentConfig, timeout_ms: u64) -> Self {
        Self {
            reports,
            config,
            timeout_ms,
        }
    }
}

#[async_trait]
impl ActionHandler for ReportGenerateHandler {
    fn kind(&self) -> PlatformIntentKind {
        PlatformIntentKind::ReportGenerate
    }

    async fn execute(
        &self,
        user_id: &str,
        context: &ActionContext,
    ) -> Result<ActionResult, ActionError> {
        require_user(user_id)?;

        let sections = context
            .sections
            .clone()
            .unwrap_or_else(|| sections_from_notes(&[], &self.config));
        let name = context
            .session
            .as_ref()
            .map(patient_name)
            .unwrap_or_else(|| user_id.to_string());

        let report = with_timeout(
            "report service",
            self.timeout_ms,
            self.reports.generate_report(user_id, &name, sections),
        )
        .await
        .map_err(|e| ActionError::Collaborator(e.to_string()))?;

        tracing::info!(user_id = %user_id, report_id = %report.id, "Report generated on request");

        Ok(ActionResult::ok(
            format!("Relatório clínico gerado (ID: {}).", report.id),
            ActionData::Report {
                report_id: report.id,
                patient_name: report.patient_name,
            },
        ))
    }

    fn describe(&self, user_id: &str) -> String {
        format!("Generate clinical report for {}", user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imre_core::services::local::LocalReportService;
    use imre_core::ReportSections;

    fn handler(reports: Arc<LocalReportService>) -> ReportGenerateHandler {
        ReportGenerateHandler::new(reports, AssessmentConfig::default(), 1_000)
    }

    #[tokio::test]
    async fn test_generates_from_supplied_sections() {
        let reports = Arc::new(LocalReportService::new());
        let context = ActionContext {
            text: "gerar relatório".to_string(),
            session: None,
            sections: Some(ReportSections {
                investigation: "- dor nas costas".to_string(),
                ..Default::default()
            }),
        };

        let result = handler(reports.clone()).execute("u-1", &context).await.unwrap();
        assert!(result.success);
        assert!(result.message.contains("Relatório clínico gerado"));

        let stored = reports.list_reports("u-1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sections.investigation, "- dor nas costas");
        assert_eq!(stored[0].patient_name, "u-1");
    }

    #[tokio::test]
    async fn test_defaults_without_sections() {
        let reports = Arc::new(LocalReportService::new());
        handler(reports.clone())
            .execute("u-1", &ActionContext::default())
            .await
            .unwrap();
        let stored = reports.list_reports("u-1").await.unwrap();
        assert_eq!(
            stored[0].sections.methodology,
            AssessmentConfig::default().default_methodology
        );
    }

    #[tokio::test]
    async fn test_missing_user_is_invalid_input() {
        let reports = Arc::new(LocalReportService::new());
        let err = handler(reports.clone())
            .execute(" ", &ActionContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidInput(_)));
        assert_eq!(reports.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_collaborator_failure() {
        let reports = Arc::new(LocalReportService::new());
        reports.set_failing(true);
        let err = handler(reports)
            .execute("u-1", &ActionContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Collaborator(_)));
    }
}
