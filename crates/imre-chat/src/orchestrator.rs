//! Conversation orchestrator: the engine's single entry point.
//!
//! One `handle` call classifies the message, detects and executes any
//! platform action, then picks the reply from the first source that applies:
//! the external assistant (only outside an interview), the action outcome,
//! the interview state machine, or the response synthesizer. The exchange is
//! then recorded in history and memory and queued for persistence.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use imre_action::{ActionContext, ActionDispatcher, ActionResult, PlatformIntent, PlatformIntentKind};
use imre_assessment::prompts::STORAGE_FAILURE_APOLOGY;
use imre_assessment::report::{build_sections, sections_from_notes};
use imre_assessment::{AssessmentMachine, InterviewSession, SessionStore};
use imre_core::{
    with_timeout, AssistantService, AssistantSource, ConversationMessage, Document, ImreConfig,
    ImreError, InteractionSnapshot, KnowledgeSearch, MemoryEntry, MessageRole, PatientRecordStore,
    ReportSections, ReportService, SearchOptions, Timestamp,
};
use imre_intent::{Intent, IntentClassifier, IntentType};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::memory::MemoryBuffer;
use crate::persist::PersistenceWorker;
use crate::phrases::{PhraseSource, RandomPhrases};
use crate::response::{Payload, PlatformStatus, ResponseSynthesizer, SynthesisOptions};
use crate::types::{Reply, ReplySource};

const ASSISTANT_CONFIDENCE: f32 = 0.9;
const ASSISTANT_FALLBACK_CONFIDENCE: f32 = 0.6;
const ASSESSMENT_CONFIDENCE: f32 = 0.95;

/// Memory entries used as notes for a report requested outside an interview.
const REPORT_NOTES_LIMIT: usize = 10;

/// External services the orchestrator talks to.
pub struct Collaborators {
    pub knowledge: Arc<dyn KnowledgeSearch>,
    pub reports: Arc<dyn ReportService>,
    pub records: Option<Arc<dyn PatientRecordStore>>,
    pub assistant: Option<Arc<dyn AssistantService>>,
}

/// Reply chosen for a turn, before confidence adjustment.
struct Composed {
    content: String,
    source: ReplySource,
    confidence: f32,
    degraded: bool,
    extra: Map<String, Value>,
}

impl Composed {
    fn new(content: impl Into<String>, source: ReplySource, confidence: f32) -> Self {
        Self {
            content: content.into(),
            source,
            confidence,
            degraded: false,
            extra: Map::new(),
        }
    }
}

type SearchOutcome = Option<Result<Vec<Document>, ImreError>>;

pub struct ConversationOrchestrator {
    classifier: IntentClassifier,
    machine: Arc<AssessmentMachine>,
    dispatcher: ActionDispatcher,
    synthesizer: ResponseSynthesizer,
    knowledge: Arc<dyn KnowledgeSearch>,
    assistant: Option<Arc<dyn AssistantService>>,
    persistence: Option<PersistenceWorker>,
    memory: Mutex<MemoryBuffer>,
    history: Mutex<HashMap<String, Vec<ConversationMessage>>>,
    user_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    config: ImreConfig,
}

impl ConversationOrchestrator {
    /// Build the orchestrator and its owned components.
    ///
    /// Spawns the persistence worker when a patient-record store is given,
    /// so this must run inside a Tokio runtime.
    pub fn new(config: ImreConfig, collaborators: Collaborators) -> Self {
        let timeout_ms = config.collaborators.timeout_ms;

        let mut machine = AssessmentMachine::new(
            Arc::new(SessionStore::new()),
            collaborators.reports,
            config.assessment.clone(),
            timeout_ms,
        );
        if let Some(records) = &collaborators.records {
            machine = machine.with_records(records.clone());
        }
        let machine = Arc::new(machine);

        let persistence = collaborators
            .records
            .map(|records| PersistenceWorker::spawn(records, timeout_ms));

        info!(
            assistant = collaborators.assistant.is_some(),
            persistence = persistence.is_some(),
            memory_capacity = config.memory.capacity,
            "Conversation orchestrator ready"
        );

        Self {
            classifier: IntentClassifier::new(),
            dispatcher: ActionDispatcher::with_defaults(machine.clone(), timeout_ms),
            machine,
            synthesizer: ResponseSynthesizer::new(Arc::new(RandomPhrases)),
            knowledge: collaborators.knowledge,
            assistant: collaborators.assistant,
            persistence,
            memory: Mutex::new(MemoryBuffer::new(config.memory.capacity)),
            history: Mutex::new(HashMap::new()),
            user_locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Replace the phrase source used for reply intros.
    pub fn with_phrases(mut self, phrases: Arc<dyn PhraseSource>) -> Self {
        self.synthesizer = ResponseSynthesizer::new(phrases);
        self
    }

    /// Handle one user message.
    ///
    /// Calls for the same user run one at a time. Collaborator failures never
    /// surface as errors; they produce a degraded reply with penalized
    /// confidence.
    pub async fn handle(&self, user_id: &str, text: &str) -> Result<Reply, ChatError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ChatError::EmptyUserId);
        }
        let max_len = self.config.response.max_message_len;
        if text.chars().count() > max_len {
            return Err(ChatError::MessageTooLong(max_len));
        }

        let guard = self.user_guard(user_id)?;
        let reply = {
            let _turn = guard.lock().await;
            self.respond(user_id, text).await
        };
        drop(guard);
        self.release_guard(user_id)?;
        reply
    }

    async fn respond(&self, user_id: &str, text: &str) -> Result<Reply, ChatError> {
        self.machine.expire_idle();

        let intent = self.classifier.classify(text);
        let platform = self.dispatcher.detect(text, user_id);
        let session = self.machine.session_state(user_id)?;
        debug!(
            user_id = %user_id,
            intent = %intent.intent_type,
            domain = %intent.domain,
            platform = %platform.kind,
            "Message classified"
        );

        let context = ActionContext {
            text: text.to_string(),
            sections: self.report_sections(&platform, session.as_ref(), user_id)?,
            session,
        };
        let search = context.session.is_none() && carries_documents(intent.intent_type);
        let (action, documents) = tokio::join!(
            self.dispatcher.execute(&platform, user_id, &context),
            self.search_documents(text, search),
        );

        let interview_active = self.machine.session_state(user_id)?.is_some();
        let mut assistant_failed = false;
        let mut composed = None;
        if let Some(assistant) = self.assistant.as_deref() {
            if !interview_active && !text.trim().is_empty() {
                match self
                    .ask_assistant(assistant, user_id, text, &intent, &platform, &action, &documents)
                    .await
                {
                    Ok(reply) => composed = Some(reply),
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "Assistant unavailable, using fallback");
                        assistant_failed = true;
                    }
                }
            }
        }
        let mut composed = match composed {
            Some(composed) => composed,
            None => {
                self.fallback(user_id, text, &intent, &platform, &action, interview_active, documents)
                    .await?
            }
        };
        composed.degraded |= assistant_failed;

        let reply = self.finish(composed, &intent, &platform, &action);
        self.record_exchange(user_id, text, &intent, &platform, &reply)?;
        Ok(reply)
    }

    /// All memory entries, oldest first.
    pub fn get_memory(&self) -> Result<Vec<MemoryEntry>, ChatError> {
        Ok(self.lock_memory()?.entries())
    }

    pub fn clear_memory(&self) -> Result<(), ChatError> {
        self.lock_memory()?.clear();
        info!("Conversation memory cleared");
        Ok(())
    }

    /// The user's live interview, if any.
    pub fn get_session_state(&self, user_id: &str) -> Result<Option<InterviewSession>, ChatError> {
        Ok(self.machine.session_state(user_id)?)
    }

    /// The user's conversation log, in order.
    pub fn get_history(&self, user_id: &str) -> Result<Vec<ConversationMessage>, ChatError> {
        let history = self
            .history
            .lock()
            .map_err(|e| ChatError::Storage(format!("History lock poisoned: {}", e)))?;
        Ok(history.get(user_id).cloned().unwrap_or_default())
    }

    /// Purge idle interviews now, returning the affected user ids.
    pub fn expire_idle(&self) -> Vec<String> {
        self.machine.expire_idle()
    }

    pub fn active_sessions(&self) -> usize {
        self.machine.store().len()
    }

    /// Wait for queued interaction snapshots to be written.
    pub async fn flush(&self) {
        if let Some(worker) = &self.persistence {
            worker.flush().await;
        }
    }

    /// Write any queued snapshots and stop the persistence worker.
    pub async fn shutdown(self) {
        if let Some(worker) = self.persistence {
            worker.shutdown().await;
        }
        info!("Conversation orchestrator stopped");
    }

    // =========================================================================
    // Reply sources
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    async fn ask_assistant(
        &self,
        assistant: &dyn AssistantService,
        user_id: &str,
        text: &str,
        intent: &Intent,
        platform: &PlatformIntent,
        action: &ActionResult,
        documents: &SearchOutcome,
    ) -> Result<Composed, ImreError> {
        let prompt = assistant_prompt(text, platform, action, documents);
        let route = format!("{}:{}", intent.intent_type, intent.domain);
        let reply = with_timeout(
            "assistant",
            self.config.collaborators.timeout_ms,
            assistant.send_message(&prompt, user_id, &route),
        )
        .await?;

        let confidence = match reply.from {
            AssistantSource::Assistant => ASSISTANT_CONFIDENCE,
            AssistantSource::Fallback => ASSISTANT_FALLBACK_CONFIDENCE,
        };
        let mut composed = Composed::new(reply.content, ReplySource::Assistant, confidence);
        composed.extra.insert("assistant_from".into(), json!(reply.from));
        if !reply.metadata.is_empty() {
            composed
                .extra
                .insert("assistant".into(), Value::Object(reply.metadata));
        }
        Ok(composed)
    }

    #[allow(clippy::too_many_arguments)]
    async fn fallback(
        &self,
        user_id: &str,
        text: &str,
        intent: &Intent,
        platform: &PlatformIntent,
        action: &ActionResult,
        interview_active: bool,
        documents: SearchOutcome,
    ) -> Result<Composed, ChatError> {
        if !platform.is_none() && action.requires_response {
            let mut composed =
                Composed::new(action.message.clone(), ReplySource::Action, platform.confidence);
            composed.degraded = !action.success;
            return Ok(composed);
        }

        if interview_active {
            return Ok(match self.machine.advance(user_id, text).await {
                Ok(outcome) => {
                    let mut composed = Composed::new(
                        outcome.reply.clone(),
                        ReplySource::Assessment,
                        ASSESSMENT_CONFIDENCE,
                    );
                    composed.degraded = outcome.is_degraded();
                    composed.extra.insert("status".into(), json!(outcome.status));
                    if let Some(step) = outcome.step {
                        composed.extra.insert("step".into(), json!(step));
                    }
                    if let Some(report_id) = outcome.report_id {
                        composed.extra.insert("report_id".into(), json!(report_id));
                    }
                    composed
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Interview turn failed");
                    let mut composed = Composed::new(
                        STORAGE_FAILURE_APOLOGY,
                        ReplySource::Assessment,
                        ASSESSMENT_CONFIDENCE,
                    );
                    composed.degraded = true;
                    composed
                }
            });
        }

        let mut degraded = false;
        let payload = match documents {
            Some(Ok(docs)) => Payload::documents(intent.intent_type, docs),
            Some(Err(e)) => {
                warn!(user_id = %user_id, error = %e, "Knowledge search failed");
                degraded = true;
                None
            }
            None => self.static_payload(intent.intent_type)?,
        };

        let reply = self
            .synthesizer
            .synthesize(intent, payload.as_ref(), &SynthesisOptions::default());
        let mut composed = Composed::new(reply.text(), ReplySource::Synthesizer, intent.confidence);
        composed.degraded = degraded;
        if let Some(ids) = payload.as_ref().and_then(document_ids) {
            composed.extra.insert("documents".into(), json!(ids));
        }
        Ok(composed)
    }

    /// Payload for intent types that do not need a knowledge search.
    fn static_payload(&self, intent_type: IntentType) -> Result<Option<Payload>, ChatError> {
        Ok(match intent_type {
            IntentType::Status => {
                let conversations = self
                    .history
                    .lock()
                    .map_err(|e| ChatError::Storage(format!("History lock poisoned: {}", e)))?
                    .len();
                Some(Payload::Status(PlatformStatus {
                    active_sessions: self.machine.store().len(),
                    memory_entries: self.lock_memory()?.len(),
                    conversations,
                }))
            }
            IntentType::SmallTalk => Some(Payload::SmallTalk),
            IntentType::Unknown => Some(Payload::Unknown),
            _ => None,
        })
    }

    async fn search_documents(&self, query: &str, enabled: bool) -> SearchOutcome {
        if !enabled {
            return None;
        }
        let options = SearchOptions {
            linked_only: self.config.knowledge.linked_only,
            limit: self.config.knowledge.limit,
        };
        Some(
            with_timeout(
                "knowledge search",
                self.config.collaborators.timeout_ms,
                self.knowledge.search(query, options),
            )
            .await,
        )
    }

    /// Sections for an explicit report request: from the live interview if
    /// there is one, else from the user's recent messages.
    fn report_sections(
        &self,
        platform: &PlatformIntent,
        session: Option<&InterviewSession>,
        user_id: &str,
    ) -> Result<Option<ReportSections>, ChatError> {
        if platform.kind != PlatformIntentKind::ReportGenerate {
            return Ok(None);
        }
        let sections = match session {
            Some(session) => build_sections(session, &self.config.assessment),
            None => {
                let notes: Vec<String> = self
                    .lock_memory()?
                    .recent_tagged(&user_tag(user_id), REPORT_NOTES_LIMIT)
                    .into_iter()
                    .map(|entry| entry.content)
                    .collect();
                sections_from_notes(&notes, &self.config.assessment)
            }
        };
        Ok(Some(sections))
    }

    // =========================================================================
    // Bookkeeping
    // =========================================================================

    fn finish(
        &self,
        composed: Composed,
        intent: &Intent,
        platform: &PlatformIntent,
        action: &ActionResult,
    ) -> Reply {
        let mut confidence = composed.confidence.clamp(0.0, 1.0);
        if composed.degraded {
            confidence *= self.config.response.degraded_confidence_penalty;
        }

        let mut metadata = Map::new();
        metadata.insert("source".into(), json!(composed.source));
        metadata.insert("domain".into(), json!(intent.domain));
        metadata.insert("keywords".into(), json!(intent.keywords));
        metadata.insert("platform_intent".into(), json!(platform.kind));
        if !platform.is_none() {
            metadata.insert(
                "action".into(),
                serde_json::to_value(action).unwrap_or_default(),
            );
        }
        metadata.insert("degraded".into(), json!(composed.degraded));
        metadata.extend(composed.extra);

        if composed.degraded {
            warn!(source = %composed.source, confidence, "Degraded reply");
        }

        Reply {
            content: composed.content,
            confidence,
            reply_type: intent.intent_type,
            metadata,
        }
    }

    fn record_exchange(
        &self,
        user_id: &str,
        text: &str,
        intent: &Intent,
        platform: &PlatformIntent,
        reply: &Reply,
    ) -> Result<(), ChatError> {
        let intent_label = intent.intent_type.to_string();
        {
            let mut history = self
                .history
                .lock()
                .map_err(|e| ChatError::Storage(format!("History lock poisoned: {}", e)))?;
            let log = history.entry(user_id.to_string()).or_default();
            log.push(ConversationMessage::new(MessageRole::User, text).with_intent(&intent_label));
            log.push(
                ConversationMessage::new(MessageRole::Assistant, reply.content.clone())
                    .with_intent(&intent_label)
                    .with_metadata(reply.metadata.clone()),
            );
        }

        if !text.trim().is_empty() {
            let mut tags: BTreeSet<String> = intent.keywords.clone();
            tags.insert(intent.domain.to_string());
            tags.insert(user_tag(user_id));
            let entry = MemoryEntry::new(text.trim(), &intent_label, intent.confidence, tags);
            if let Some(evicted) = self.lock_memory()?.push(entry) {
                debug!(entry_id = %evicted.id, "Memory entry evicted");
            }
        }

        if let Some(worker) = &self.persistence {
            worker.enqueue(
                user_id,
                InteractionSnapshot {
                    user_message: text.to_string(),
                    assistant_message: reply.content.clone(),
                    intent: intent_label,
                    confidence: reply.confidence,
                    platform_intent: (!platform.is_none()).then(|| platform.kind.to_string()),
                    timestamp: Timestamp::now(),
                },
            );
        }
        Ok(())
    }

    fn user_guard(&self, user_id: &str) -> Result<Arc<tokio::sync::Mutex<()>>, ChatError> {
        let mut locks = self
            .user_locks
            .lock()
            .map_err(|e| ChatError::Storage(format!("User lock map poisoned: {}", e)))?;
        Ok(locks.entry(user_id.to_string()).or_default().clone())
    }

    /// Drop the user's guard once no other call holds or waits on it.
    fn release_guard(&self, user_id: &str) -> Result<(), ChatError> {
        let mut locks = self
            .user_locks
            .lock()
            .map_err(|e| ChatError::Storage(format!("User lock map poisoned: {}", e)))?;
        if locks
            .get(user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(user_id);
        }
        Ok(())
    }

    fn lock_memory(&self) -> Result<std::sync::MutexGuard<'_, MemoryBuffer>, ChatError> {
        self.memory
            .lock()
            .map_err(|e| ChatError::Storage(format!("Memory lock poisoned: {}", e)))
    }
}

fn carries_documents(intent_type: IntentType) -> bool {
    matches!(
        intent_type,
        IntentType::Training
            | IntentType::Simulation
            | IntentType::Knowledge
            | IntentType::ClinicalReasoning
    )
}

fn user_tag(user_id: &str) -> String {
    format!("user:{}", user_id)
}

fn document_ids(payload: &Payload) -> Option<Vec<String>> {
    match payload {
        Payload::Training(docs)
        | Payload::Simulation(docs)
        | Payload::Knowledge(docs)
        | Payload::ClinicalReasoning(docs) => Some(docs.iter().map(|d| d.id.clone()).collect()),
        _ => None,
    }
}

/// The user's text plus whatever the platform did this turn and the titles
/// of matching documents.
fn assistant_prompt(
    text: &str,
    platform: &PlatformIntent,
    action: &ActionResult,
    documents: &SearchOutcome,
) -> String {
    let mut prompt = text.trim().to_string();
    if !platform.is_none() && action.requires_response {
        prompt.push_str(&format!(
            "\n\n[Ação da plataforma: {} | sucesso: {} | {}]",
            platform.kind, action.success, action.message
        ));
    }
    if let Some(Ok(docs)) = documents {
        if !docs.is_empty() {
            let titles: Vec<&str> = docs.iter().map(|d| d.title.as_str()).collect();
            prompt.push_str(&format!("\n\n[Documentos relevantes: {}]", titles.join("; ")));
        }
    }
    prompt
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrases::FixedPhrases;
    use imre_assessment::prompts::{
        CHIEF_REASON_PROMPT, EVOLUTION_PROMPT, METHODOLOGY_PROMPT, PRESENTATION_PROMPT,
        REPORT_FAILURE_APOLOGY, RESULT_PROMPT, WHAT_ELSE_PROMPT,
    };
    use imre_assessment::Step;
    use imre_core::services::local::{
        LocalKnowledgeBase, LocalPatientRecords, LocalReportService, ScriptedAssistant,
    };

    struct Fixture {
        orchestrator: ConversationOrchestrator,
        knowledge: Arc<LocalKnowledgeBase>,
        reports: Arc<LocalReportService>,
        records: Arc<LocalPatientRecords>,
    }

    fn fixture_with(assistant: Option<Arc<dyn AssistantService>>) -> Fixture {
        let mut config = ImreConfig::default();
        config.collaborators.timeout_ms = 1_000;
        let knowledge = Arc::new(LocalKnowledgeBase::with_defaults());
        let reports = Arc::new(LocalReportService::new());
        let records = Arc::new(LocalPatientRecords::new());
        let orchestrator = ConversationOrchestrator::new(
            config,
            Collaborators {
                knowledge: knowledge.clone(),
                reports: reports.clone(),
                records: Some(records.clone()),
                assistant,
            },
        )
        .with_phrases(Arc::new(FixedPhrases::new(0)));
        Fixture {
            orchestrator,
            knowledge,
            reports,
            records,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(None)
    }

    async fn say(f: &Fixture, text: &str) -> Reply {
        f.orchestrator.handle("u-1", text).await.unwrap()
    }

    fn step(f: &Fixture) -> Option<Step> {
        f.orchestrator
            .get_session_state("u-1")
            .unwrap()
            .map(|s| s.step)
    }

    // =========================================================================
    // Interview flow
    // =========================================================================

    #[tokio::test]
    async fn test_full_interview_through_handle() {
        let f = fixture();

        let reply = say(&f, "Quero iniciar avaliação").await;
        assert_eq!(reply.content, PRESENTATION_PROMPT);
        assert_eq!(reply.source(), Some(ReplySource::Action));

        let reply = say(&f, "Sou a Ana, tenho 40 anos").await;
        assert_eq!(reply.content, CHIEF_REASON_PROMPT);
        assert_eq!(reply.source(), Some(ReplySource::Assessment));

        assert_eq!(say(&f, "Dor de cabeça").await.content, WHAT_ELSE_PROMPT);
        assert_eq!(say(&f, "Insônia").await.content, WHAT_ELSE_PROMPT);

        let reply = say(&f, "só isso").await;
        assert!(reply.content.contains("1. Dor de cabeça"));
        assert!(reply.content.contains("2. Insônia"));

        let reply = say(&f, "a dor de cabeça").await;
        assert!(reply.content.contains("Dor de cabeça"));

        say(&f, "Na testa").await;
        say(&f, "Há um mês").await;
        say(&f, "Pontada forte").await;
        say(&f, "Enjoo").await;
        let reply = say(&f, "Melhora com repouso e piora com barulho").await;
        assert_eq!(reply.content, METHODOLOGY_PROMPT);
        assert_eq!(step(&f), Some(Step::Methodology));

        assert_eq!(say(&f, "Uso analgésico").await.content, RESULT_PROMPT);
        assert_eq!(say(&f, "Alívio parcial").await.content, EVOLUTION_PROMPT);
        assert_eq!(step(&f), Some(Step::Evolution));

        let reply = say(&f, "Estou melhorando aos poucos").await;
        assert!(reply.content.contains("Avaliação concluída"));
        assert!(!reply.is_degraded());

        assert_eq!(f.reports.generate_calls(), 1);
        assert!(f.orchestrator.get_session_state("u-1").unwrap().is_none());
        assert_eq!(f.orchestrator.active_sessions(), 0);

        let reports = f.reports.list_reports("u-1").await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].sections.evolution, "Estou melhorando aos poucos");
        assert!(reports[0].sections.investigation.contains("piora com barulho"));
    }

    #[tokio::test]
    async fn test_neutral_factors_answer_through_handle() {
        let f = fixture();
        for text in [
            "iniciar avaliação",
            "Sou a Ana",
            "Dor de cabeça",
            "Insônia",
            "só isso",
            "dor de cabeça",
            "na testa",
            "há um mês",
            "pontada",
            "enjoo",
        ] {
            say(&f, text).await;
        }
        let reply = say(&f, "repouso no escuro").await;
        assert_eq!(reply.content, METHODOLOGY_PROMPT);

        say(&f, "uso analgésico").await;
        say(&f, "alívio parcial").await;
        let reply = say(&f, "estou estável").await;
        assert!(reply.content.contains("Avaliação concluída"));
        assert!(step(&f).is_none());
        assert_eq!(f.reports.generate_calls(), 1);

        let reports = f.reports.list_reports("u-1").await.unwrap();
        let sections = &reports[0].sections;
        assert_eq!(sections.methodology, "uso analgésico");
        assert_eq!(sections.result, "alívio parcial");
        assert_eq!(sections.evolution, "estou estável");
    }

    #[tokio::test]
    async fn test_answer_mentioning_a_command_is_recorded() {
        let f = fixture();
        say(&f, "iniciar avaliação").await;
        let store = f.orchestrator.machine.store();
        let mut session = store.get("u-1").unwrap().unwrap();
        session.step = Step::Methodology;
        store.set(session).unwrap();

        let reply = say(&f, "Fiz uma avaliação clínica e fisioterapia").await;
        assert_eq!(reply.content, RESULT_PROMPT);
        assert_eq!(reply.source(), Some(ReplySource::Assessment));

        let reply = say(&f, "Registrei tudo em meus dados").await;
        assert_eq!(reply.content, EVOLUTION_PROMPT);

        let session = f.orchestrator.get_session_state("u-1").unwrap().unwrap();
        assert_eq!(session.methodology, "Fiz uma avaliação clínica e fisioterapia");
        assert_eq!(session.result, "Registrei tudo em meus dados");
        assert_eq!(f.reports.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_start_twice_keeps_one_session() {
        let f = fixture();
        say(&f, "iniciar avaliação").await;
        say(&f, "Sou o João").await;

        let reply = say(&f, "iniciar avaliação").await;
        assert!(reply.content.contains(CHIEF_REASON_PROMPT));
        assert_eq!(f.orchestrator.active_sessions(), 1);
        assert_eq!(
            f.orchestrator
                .get_session_state("u-1")
                .unwrap()
                .unwrap()
                .investigation
                .presenting_self
                .as_deref(),
            Some("Sou o João")
        );
    }

    #[tokio::test]
    async fn test_report_failure_keeps_session_for_retry() {
        let f = fixture();
        say(&f, "iniciar avaliação").await;
        let store = f.orchestrator.machine.store();
        let mut session = store.get("u-1").unwrap().unwrap();
        session.step = Step::Evolution;
        store.set(session).unwrap();

        f.reports.set_failing(true);
        let reply = say(&f, "Estou melhor").await;
        assert_eq!(reply.content, REPORT_FAILURE_APOLOGY);
        assert!(reply.is_degraded());
        assert!(reply.confidence < 0.9 * 0.51);
        assert_eq!(step(&f), Some(Step::Evolution));

        f.reports.set_failing(false);
        let reply = say(&f, "Estou melhor").await;
        assert!(!reply.is_degraded());
        assert!(step(&f).is_none());
        assert_eq!(f.reports.generate_calls(), 2);
        assert_eq!(f.reports.report_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_starts_for_same_user() {
        let f = fixture();
        let (a, b) = tokio::join!(
            f.orchestrator.handle("u-1", "iniciar avaliação"),
            f.orchestrator.handle("u-1", "iniciar avaliação"),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(f.orchestrator.active_sessions(), 1);
        assert!(f.orchestrator.user_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_guards_are_released_after_each_turn() {
        let f = fixture();
        for i in 0..20 {
            f.orchestrator
                .handle(&format!("u-{}", i), "oi")
                .await
                .unwrap();
        }
        assert!(f.orchestrator.user_locks.lock().unwrap().is_empty());
        assert_eq!(f.orchestrator.get_history("u-7").unwrap().len(), 2);
    }

    // =========================================================================
    // Synthesized replies
    // =========================================================================

    #[tokio::test]
    async fn test_knowledge_reply_lists_documents() {
        let f = fixture();
        let reply = say(
            &f,
            "Preciso consultar a biblioteca sobre cannabis medicinal para dor crônica.",
        )
        .await;
        assert_eq!(reply.reply_type, IntentType::Knowledge);
        assert_eq!(reply.source(), Some(ReplySource::Synthesizer));
        assert!(reply.content.contains("Referências sobre cannabis medicinal:"));
        assert!(reply
            .content
            .contains("Cannabis medicinal no manejo da dor crônica"));
        assert_eq!(f.knowledge.call_count(), 1);
        assert!(reply.metadata["documents"]
            .as_array()
            .unwrap()
            .iter()
            .any(|id| id == "kb-cannabis-dor"));
    }

    #[tokio::test]
    async fn test_knowledge_failure_degrades_reply() {
        let f = fixture();
        f.knowledge.set_failing(true);
        let reply = say(
            &f,
            "Preciso consultar a biblioteca sobre cannabis medicinal para dor crônica.",
        )
        .await;
        assert!(reply.is_degraded());
        assert!(reply.content.contains(crate::response::NO_DATA_SUMMARY));
    }

    #[tokio::test]
    async fn test_no_search_during_interview() {
        let f = fixture();
        say(&f, "iniciar avaliação").await;
        say(&f, "Sou médica e estudo cannabis medicinal na biblioteca").await;
        assert_eq!(f.knowledge.call_count(), 0);
    }

    #[tokio::test]
    async fn test_status_reply() {
        let f = fixture();
        let reply = say(&f, "Qual o status atual da plataforma?").await;
        assert_eq!(reply.reply_type, IntentType::Status);
        assert!(reply.content.starts_with("Olá! Estou aqui para ajudar."));
        assert!(reply.content.contains("Avaliações em andamento: 0"));
    }

    // =========================================================================
    // Assistant
    // =========================================================================

    #[tokio::test]
    async fn test_assistant_is_authoritative_outside_interview() {
        let assistant = Arc::new(ScriptedAssistant::answering("Resposta do assistente"));
        let f = fixture_with(Some(assistant.clone()));

        let reply = say(&f, "Qual o status atual da plataforma?").await;
        assert_eq!(reply.content, "Resposta do assistente");
        assert_eq!(reply.source(), Some(ReplySource::Assistant));
        assert_eq!(reply.confidence, ASSISTANT_CONFIDENCE);
        assert_eq!(assistant.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_assistant_prompt_carries_action_context() {
        let assistant = Arc::new(ScriptedAssistant::answering("Relatório pronto."));
        let f = fixture_with(Some(assistant.clone()));

        let reply = say(&f, "Pode gerar relatório?").await;
        assert_eq!(reply.content, "Relatório pronto.");
        assert_eq!(f.reports.report_count(), 1);

        let prompts = assistant.prompts();
        assert!(prompts[0].starts_with("Pode gerar relatório?"));
        assert!(prompts[0].contains("report_generate"));
    }

    #[tokio::test]
    async fn test_assistant_skipped_during_interview() {
        let assistant = Arc::new(ScriptedAssistant::answering("nunca"));
        let f = fixture_with(Some(assistant.clone()));

        let reply = say(&f, "iniciar avaliação").await;
        assert_eq!(reply.content, PRESENTATION_PROMPT);
        let reply = say(&f, "Sou a Ana").await;
        assert_eq!(reply.content, CHIEF_REASON_PROMPT);
        assert!(assistant.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_assistant_failure_falls_back() {
        let f = fixture_with(Some(Arc::new(ScriptedAssistant::failing())));
        let reply = say(&f, "Qual o status atual da plataforma?").await;
        assert_eq!(reply.source(), Some(ReplySource::Synthesizer));
        assert!(reply.is_degraded());

        let intent = IntentClassifier::new().classify("Qual o status atual da plataforma?");
        assert!((reply.confidence - intent.confidence * 0.5).abs() < 1e-6);
    }

    // =========================================================================
    // Memory, history, persistence
    // =========================================================================

    #[tokio::test]
    async fn test_memory_is_bounded_fifo() {
        let f = fixture();
        for i in 0..60 {
            say(&f, &format!("mensagem {}", i)).await;
        }
        let memory = f.orchestrator.get_memory().unwrap();
        assert_eq!(memory.len(), 50);
        assert_eq!(memory[0].content, "mensagem 10");
        assert_eq!(memory[49].content, "mensagem 59");

        f.orchestrator.clear_memory().unwrap();
        assert!(f.orchestrator.get_memory().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_without_interview_uses_recent_messages() {
        let f = fixture();
        say(&f, "Tenho dor nas costas há semanas").await;
        f.orchestrator.handle("u-2", "Outro usuário").await.unwrap();

        let reply = say(&f, "gerar relatório").await;
        assert!(reply.content.contains("Relatório clínico gerado"));

        let reports = f.reports.list_reports("u-1").await.unwrap();
        assert_eq!(reports.len(), 1);
        let investigation = &reports[0].sections.investigation;
        assert!(investigation.contains("dor nas costas"));
        assert!(!investigation.contains("Outro usuário"));
    }

    #[tokio::test]
    async fn test_history_and_persistence() {
        let f = fixture();
        say(&f, "oi").await;
        say(&f, "iniciar avaliação").await;

        let history = f.orchestrator.get_history("u-1").unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[3].content, PRESENTATION_PROMPT);
        assert!(f.orchestrator.get_history("nobody").unwrap().is_empty());

        f.orchestrator.flush().await;
        let stored = f.records.interactions_for("u-1");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].platform_intent, None);
        assert_eq!(stored[1].platform_intent.as_deref(), Some("assessment_start"));
    }

    #[tokio::test]
    async fn test_shutdown_writes_pending_snapshots() {
        let f = fixture();
        say(&f, "oi").await;
        say(&f, "tudo bem?").await;

        let records = f.records.clone();
        f.orchestrator.shutdown().await;
        assert_eq!(records.interactions_for("u-1").len(), 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_fail_handle() {
        let f = fixture();
        f.records.set_failing(true);
        let reply = f.orchestrator.handle("u-1", "oi").await;
        assert!(reply.is_ok());
        f.orchestrator.flush().await;
        assert!(f.records.interactions_for("u-1").is_empty());
    }

    #[tokio::test]
    async fn test_envelope_validation() {
        let f = fixture();
        assert!(matches!(
            f.orchestrator.handle("  ", "oi").await,
            Err(ChatError::EmptyUserId)
        ));
        let long = "a".repeat(4001);
        assert!(matches!(
            f.orchestrator.handle("u-1", &long).await,
            Err(ChatError::MessageTooLong(4000))
        ));
    }
}
