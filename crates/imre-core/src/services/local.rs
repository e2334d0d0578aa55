//! In-process collaborator implementations.
//!
//! Used by the `imre` binary when no external backends are wired, and by
//! tests across the workspace. Each type can be switched into a failing
//! mode to exercise degraded paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{ImreError, Result};
use crate::services::{
    AssistantReply, AssistantService, AssistantSource, Document, InteractionSnapshot,
    KnowledgeSearch, PatientRecordStore, Report, ReportSections, ReportService, SearchOptions,
};
use crate::text::normalize;
use crate::types::Timestamp;

fn lock_poisoned(e: impl std::fmt::Display) -> ImreError {
    ImreError::Storage(format!("Lock poisoned: {}", e))
}

// =============================================================================
// LocalKnowledgeBase
// =============================================================================

struct StoredDocument {
    document: Document,
    linked: bool,
}

/// Keyword-overlap search over an in-memory document list.
pub struct LocalKnowledgeBase {
    documents: Vec<StoredDocument>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl LocalKnowledgeBase {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Knowledge base seeded with the platform's core clinical references.
    pub fn with_defaults() -> Self {
        let mut kb = Self::new();
        kb.add(
            seed(
                "kb-cannabis-dor",
                "Cannabis medicinal no manejo da dor crônica",
                "Revisão de evidências sobre canabinoides (CBD e THC) na dor crônica e neuropática.",
                "knowledge",
                &["cannabis", "dor cronica", "cbd", "thc"],
            ),
            true,
        );
        kb.add(
            seed(
                "kb-nefro-drc",
                "Doença renal crônica: estadiamento e acompanhamento",
                "Critérios de estadiamento por taxa de filtração glomerular e creatinina.",
                "knowledge",
                &["nefrologia", "renal", "creatinina", "dialise"],
            ),
            true,
        );
        kb.add(
            seed(
                "kb-imre-protocolo",
                "Protocolo IMRE: investigação, metodologia, resultado e evolução",
                "Estrutura da entrevista clínica triaxial e geração do relatório.",
                "training",
                &["imre", "entrevista", "avaliacao clinica", "anamnese"],
            ),
            true,
        );
        kb.add(
            seed(
                "kb-sim-nefro",
                "Simulação de pacientes nefrológicos",
                "Casos simulados de pacientes renais para treinamento de raciocínio clínico.",
                "simulation",
                &["simulacao", "paciente simulado", "nefro", "caso clinico"],
            ),
            true,
        );
        kb.add(
            seed(
                "kb-cannabis-posologia",
                "Titulação e posologia de canabidiol",
                "Esquemas de titulação, interações e eventos adversos do canabidiol.",
                "knowledge",
                &["canabidiol", "posologia", "cannabis", "tratamento"],
            ),
            true,
        );
        kb.add(
            seed(
                "kb-rascunho",
                "Rascunho interno sem revisão",
                "Anotações não vinculadas à base clínica.",
                "draft",
                &["cannabis", "rascunho"],
            ),
            false,
        );
        kb
    }

    /// Add a document; `linked` marks membership in the clinical knowledge base.
    pub fn add(&mut self, document: Document, linked: bool) {
        self.documents.push(StoredDocument { document, linked });
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of search calls served (including failed ones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for LocalKnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

fn seed(id: &str, title: &str, summary: &str, category: &str, keywords: &[&str]) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        category: category.to_string(),
        tags: vec![category.to_string()],
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        relevance_score: 0.0,
    }
}

#[async_trait]
impl KnowledgeSearch for LocalKnowledgeBase {
    async fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ImreError::collaborator("knowledge search", "index unavailable"));
        }

        let query = normalize(query);
        let terms: Vec<&str> = query.split_whitespace().filter(|t| t.len() >= 3).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| d.linked || !options.linked_only)
            .filter_map(|d| {
                let doc = &d.document;
                let haystack = normalize(&format!(
                    "{} {} {} {}",
                    doc.title,
                    doc.summary,
                    doc.keywords.join(" "),
                    doc.tags.join(" ")
                ));
                let matched = terms.iter().filter(|t| haystack.contains(*t)).count();
                if matched == 0 {
                    return None;
                }
                let mut hit = doc.clone();
                hit.relevance_score = matched as f32 / terms.len() as f32;
                Some(hit)
            })
            .collect();

        hits.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(options.limit);
        Ok(hits)
    }
}

// =============================================================================
// LocalReportService
// =============================================================================

/// Keeps generated reports in memory.
pub struct LocalReportService {
    reports: Mutex<Vec<Report>>,
    generate_calls: AtomicUsize,
    failing: AtomicBool,
}

impl LocalReportService {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            generate_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `generate_report` calls, including failed ones.
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Number of reports actually stored.
    pub fn report_count(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for LocalReportService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportService for LocalReportService {
    async fn generate_report(
        &self,
        patient_id: &str,
        patient_name: &str,
        sections: ReportSections,
    ) -> Result<Report> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ImreError::collaborator("report service", "generation failed"));
        }

        let report = Report {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            patient_name: patient_name.to_string(),
            sections,
            created_at: Timestamp::now(),
        };
        self.reports
            .lock()
            .map_err(lock_poisoned)?
            .push(report.clone());
        tracing::info!(patient_id, report_id = %report.id, "Report stored");
        Ok(report)
    }

    async fn list_reports(&self, patient_id: &str) -> Result<Vec<Report>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ImreError::collaborator("report service", "listing failed"));
        }
        let reports = self.reports.lock().map_err(lock_poisoned)?;
        let mut found: Vec<Report> = reports
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        // Newest first
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

// =============================================================================
// LocalPatientRecords
// =============================================================================

/// A stored assessment record.
#[derive(Clone, Debug, PartialEq)]
pub struct AssessmentRecord {
    pub patient_id: String,
    pub status: String,
    pub data: serde_json::Value,
}

/// Patient-record persistence held in memory.
pub struct LocalPatientRecords {
    interactions: Mutex<Vec<(String, InteractionSnapshot)>>,
    assessments: Mutex<Vec<AssessmentRecord>>,
    failing: AtomicBool,
}

impl LocalPatientRecords {
    pub fn new() -> Self {
        Self {
            interactions: Mutex::new(Vec::new()),
            assessments: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Interactions recorded for one patient, in arrival order.
    pub fn interactions_for(&self, patient_id: &str) -> Vec<InteractionSnapshot> {
        self.interactions
            .lock()
            .map(|all| {
                all.iter()
                    .filter(|(id, _)| id == patient_id)
                    .map(|(_, s)| s.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Latest assessment record for one patient.
    pub fn assessment_for(&self, patient_id: &str) -> Option<AssessmentRecord> {
        self.assessments
            .lock()
            .ok()
            .and_then(|all| all.iter().find(|r| r.patient_id == patient_id).cloned())
    }
}

impl Default for LocalPatientRecords {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatientRecordStore for LocalPatientRecords {
    async fn record_interaction(
        &self,
        patient_id: &str,
        snapshot: InteractionSnapshot,
    ) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ImreError::collaborator("patient records", "write rejected"));
        }
        self.interactions
            .lock()
            .map_err(lock_poisoned)?
            .push((patient_id.to_string(), snapshot));
        Ok(())
    }

    async fn upsert_assessment_record(
        &self,
        patient_id: &str,
        status: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ImreError::collaborator("patient records", "write rejected"));
        }
        let mut records = self.assessments.lock().map_err(lock_poisoned)?;
        let record = AssessmentRecord {
            patient_id: patient_id.to_string(),
            status: status.to_string(),
            data,
        };
        match records.iter_mut().find(|r| r.patient_id == patient_id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }
}

// =============================================================================
// ScriptedAssistant
// =============================================================================

/// Assistant that answers with a fixed reply (or fails when none is set)
/// and records every prompt it receives.
pub struct ScriptedAssistant {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAssistant {
    pub fn answering(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AssistantService for ScriptedAssistant {
    async fn send_message(
        &self,
        prompt: &str,
        _user_id: &str,
        route_context: &str,
    ) -> Result<AssistantReply> {
        self.prompts
            .lock()
            .map_err(lock_poisoned)?
            .push(prompt.to_string());
        match &self.reply {
            Some(content) => {
                let mut metadata = serde_json::Map::new();
                metadata.insert(
                    "route".to_string(),
                    serde_json::Value::String(route_context.to_string()),
                );
                Ok(AssistantReply {
                    content: content.clone(),
                    from: AssistantSource::Assistant,
                    metadata,
                })
            }
            None => Err(ImreError::collaborator("assistant", "service unavailable")),
        }
    }
}
