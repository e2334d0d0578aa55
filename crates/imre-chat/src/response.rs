//! Scripted reply composition.
//!
//! A reply is an intro (greeting plus an empathetic phrase), a fixed
//! confirmation for the clinical intent type, and a summary formatted from a
//! typed payload. No I/O and no business logic: given the same phrase source
//! the output is deterministic.

use std::sync::Arc;

use imre_core::Document;
use imre_intent::{Domain, Intent, IntentType};
use serde::{Deserialize, Serialize};

use crate::phrases::{PhraseSource, RandomPhrases};

pub const EMPATHY_PHRASES: &[&str] = &[
    "Estou aqui para ajudar.",
    "Vamos juntos nessa.",
    "Conte comigo.",
    "Fico feliz em poder ajudar.",
];

pub const NO_DATA_SUMMARY: &str = "Ainda não há dados disponíveis para esta consulta.";

/// Documents listed in a summary.
const MAX_DOCUMENTS: usize = 5;

// =============================================================================
// Payload
// =============================================================================

/// Figures shown for a status question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStatus {
    pub active_sessions: usize,
    pub memory_entries: usize,
    /// Users with at least one message in history.
    pub conversations: usize,
}

/// Data backing a scripted reply, one variant per clinical intent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Status(PlatformStatus),
    Training(Vec<Document>),
    Simulation(Vec<Document>),
    Knowledge(Vec<Document>),
    ClinicalReasoning(Vec<Document>),
    SmallTalk,
    Unknown,
}

impl Payload {
    /// Document variants with no documents carry nothing to summarize.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Training(docs)
            | Payload::Simulation(docs)
            | Payload::Knowledge(docs)
            | Payload::ClinicalReasoning(docs) => docs.is_empty(),
            Payload::Status(_) | Payload::SmallTalk | Payload::Unknown => false,
        }
    }

    /// Wrap search results in the variant matching `intent_type`.
    /// `None` for intent types that do not carry documents.
    pub fn documents(intent_type: IntentType, docs: Vec<Document>) -> Option<Self> {
        match intent_type {
            IntentType::Training => Some(Payload::Training(docs)),
            IntentType::Simulation => Some(Payload::Simulation(docs)),
            IntentType::Knowledge => Some(Payload::Knowledge(docs)),
            IntentType::ClinicalReasoning => Some(Payload::ClinicalReasoning(docs)),
            _ => None,
        }
    }
}

// =============================================================================
// ResponseSynthesizer
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    /// Personalizes the greeting.
    pub user_name: Option<String>,
}

/// The three parts of a scripted reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizedReply {
    pub intro: String,
    pub confirmation: String,
    pub summary: String,
}

impl SynthesizedReply {
    pub fn text(&self) -> String {
        format!("{} {}\n\n{}", self.intro, self.confirmation, self.summary)
    }
}

pub struct ResponseSynthesizer {
    phrases: Arc<dyn PhraseSource>,
}

impl ResponseSynthesizer {
    pub fn new(phrases: Arc<dyn PhraseSource>) -> Self {
        Self { phrases }
    }

    pub fn synthesize(
        &self,
        intent: &Intent,
        payload: Option<&Payload>,
        options: &SynthesisOptions,
    ) -> SynthesizedReply {
        SynthesizedReply {
            intro: self.intro(options),
            confirmation: confirmation(intent.intent_type).to_string(),
            summary: match payload {
                Some(payload) if !payload.is_empty() => summarize(payload, intent.domain),
                _ => NO_DATA_SUMMARY.to_string(),
            },
        }
    }

    fn intro(&self, options: &SynthesisOptions) -> String {
        let greeting = match options.user_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("Olá, {}!", name),
            _ => "Olá!".to_string(),
        };
        match self.phrases.pick(EMPATHY_PHRASES) {
            Some(phrase) => format!("{} {}", greeting, phrase),
            None => greeting,
        }
    }
}

impl Default for ResponseSynthesizer {
    fn default() -> Self {
        Self::new(Arc::new(RandomPhrases))
    }
}

fn confirmation(intent_type: IntentType) -> &'static str {
    match intent_type {
        IntentType::Status => "Aqui está o status atual da plataforma.",
        IntentType::Training => "Separei conteúdos de formação para você.",
        IntentType::Simulation => "Veja os materiais de simulação clínica disponíveis.",
        IntentType::Knowledge => "Consultei a base de conhecimento.",
        IntentType::ClinicalReasoning => "Vamos analisar o caso com raciocínio clínico.",
        IntentType::SmallTalk => "É um prazer conversar com você.",
        IntentType::Unknown => "Não tenho certeza se entendi sua pergunta.",
    }
}

fn summarize(payload: &Payload, domain: Domain) -> String {
    match payload {
        Payload::Status(status) => format!(
            "Avaliações em andamento: {}. Conversas ativas: {}. Registros em memória: {}.",
            status.active_sessions, status.conversations, status.memory_entries
        ),
        Payload::Training(docs) | Payload::Simulation(docs) | Payload::Knowledge(docs) => {
            document_list(docs, domain)
        }
        Payload::ClinicalReasoning(docs) => format!(
            "{}\nUse essas referências como apoio; a decisão clínica cabe ao profissional.",
            document_list(docs, domain)
        ),
        Payload::SmallTalk => "Como posso ajudar hoje? Posso iniciar uma avaliação clínica IMRE, \
             consultar a base de conhecimento ou gerar relatórios."
            .to_string(),
        Payload::Unknown => "Você pode perguntar sobre o status da plataforma, formação, \
             simulações ou a base de conhecimento, ou iniciar uma avaliação IMRE."
            .to_string(),
    }
}

fn document_list(docs: &[Document], domain: Domain) -> String {
    let header = match domain {
        Domain::Cannabis => "Referências sobre cannabis medicinal:",
        Domain::Nephrology => "Referências em nefrologia:",
        Domain::General => "Referências encontradas:",
    };
    let lines: Vec<String> = docs
        .iter()
        .take(MAX_DOCUMENTS)
        .enumerate()
        .map(|(i, doc)| format!("{}. {}: {}", i + 1, doc.title, doc.summary))
        .collect();
    format!("{}\n{}", header, lines.join("\n"))
}

// =============================================================================
// Tests
// =============================================================================
