//! Collaborator contracts consumed by the dialogue engine.
//!
//! None of these are implemented by the engine itself; production wiring
//! supplies real backends, and [`local`] provides in-process versions for the
//! binary and for tests.

pub mod local;

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ImreError, Result};
use crate::types::Timestamp;

// =============================================================================
// Knowledge search
// =============================================================================

/// A knowledge-base document returned by search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub category: String,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    /// Relevance score (0.0 to 1.0).
    pub relevance_score: f32,
}

/// Options for a knowledge search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Only documents linked to the clinical knowledge base.
    pub linked_only: bool,
    /// Maximum number of documents.
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            linked_only: true,
            limit: 5,
        }
    }
}

#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    /// Documents ordered by descending relevance.
    async fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<Document>>;
}

// =============================================================================
// Reports
// =============================================================================

/// Structured content of a clinical report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSections {
    pub investigation: String,
    pub methodology: String,
    pub result: String,
    pub evolution: String,
    pub recommendations: Vec<String>,
    pub scores: BTreeMap<String, i64>,
}

/// A generated clinical report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub patient_id: String,
    pub patient_name: String,
    pub sections: ReportSections,
    pub created_at: Timestamp,
}

#[async_trait]
pub trait ReportService: Send + Sync {
    async fn generate_report(
        &self,
        patient_id: &str,
        patient_name: &str,
        sections: ReportSections,
    ) -> Result<Report>;

    async fn list_reports(&self, patient_id: &str) -> Result<Vec<Report>>;
}

// =============================================================================
// Assistant
// =============================================================================

/// Which path produced an assistant reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantSource {
    Assistant,
    Fallback,
}

/// Reply from the external assistant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub content: String,
    pub from: AssistantSource,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait AssistantService: Send + Sync {
    async fn send_message(
        &self,
        prompt: &str,
        user_id: &str,
        route_context: &str,
    ) -> Result<AssistantReply>;
}

// =============================================================================
// Patient records
// =============================================================================

/// One exchange as persisted to the patient record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionSnapshot {
    pub user_message: String,
    pub assistant_message: String,
    pub intent: String,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_intent: Option<String>,
    pub timestamp: Timestamp,
}

#[async_trait]
pub trait PatientRecordStore: Send + Sync {
    async fn record_interaction(&self, patient_id: &str, snapshot: InteractionSnapshot)
        -> Result<()>;

    async fn upsert_assessment_record(
        &self,
        patient_id: &str,
        status: &str,
        data: serde_json::Value,
    ) -> Result<()>;
}

// =============================================================================
// Timeouts
// =============================================================================

/// Await a collaborator call, converting an elapsed deadline into
/// [`ImreError::Timeout`].
pub async fn with_timeout<T, F>(service: &str, millis: u64, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_millis(millis), fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(service, millis, "Collaborator call timed out");
            Err(ImreError::Timeout {
                service: service.to_string(),
                millis,
            })
        }
    }
}
