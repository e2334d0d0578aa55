//! Platform-intent detection.
//!
//! First match wins:
//! 1. a live session with a closing phrase, or at the Evolution step, is
//!    an assessment completion;
//! 2. start phrases;
//! 3. report phrases;
//! 4. dashboard phrases.
//!
//! While a session is live, 2-4 fire only when the whole message is the
//! command; otherwise the text is an interview answer.

use std::sync::Arc;

use imre_assessment::{SessionStore, Step};
use imre_core::text::{matched_phrases, normalize, padded};

use crate::types::{PlatformIntent, PlatformIntentKind};

pub static CLOSING_PHRASES: &[&str] = &[
    "finalizar avaliacao",
    "encerrar avaliacao",
    "concluir avaliacao",
    "finalizar a avaliacao",
    "encerrar a avaliacao",
    "concluir a avaliacao",
    "terminar avaliacao",
    "gerar relatorio final",
];

pub static START_PHRASES: &[&str] = &[
    "iniciar avaliacao",
    "comecar avaliacao",
    "nova avaliacao",
    "avaliacao clinica",
    "avaliacao imre",
    "protocolo imre",
    "iniciar imre",
    "quero ser avaliad",
    "fazer avaliacao",
];

pub static REPORT_PHRASES: &[&str] = &[
    "gerar relatorio",
    "relatorio clinico",
    "emitir relatorio",
    "meu relatorio",
];

pub static DASHBOARD_PHRASES: &[&str] = &[
    "dashboard",
    "painel",
    "meus dados",
    "minhas avaliacoes",
    "meus relatorios",
];

pub struct PlatformIntentDetector {
    sessions: Arc<SessionStore>,
}

impl PlatformIntentDetector {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    /// Detect the platform intent of `text` for `user_id`.
    pub fn detect(&self, text: &str, user_id: &str) -> PlatformIntent {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return PlatformIntent::none();
        }
        let haystack = padded(&normalized);

        let session = match self.sessions.get(user_id) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Session lookup failed during detection");
                None
            }
        };

        let interviewing = session.is_some();
        if let Some(session) = session {
            let closing = matched_phrases(&haystack, CLOSING_PHRASES);
            if let Some(phrase) = closing.first() {
                return PlatformIntent::new(PlatformIntentKind::AssessmentComplete, 0.95)
                    .with_meta("trigger", "closing_phrase")
                    .with_meta("phrase", *phrase)
                    .with_meta("step", session.step.to_string());
            }
            if session.step == Step::Evolution {
                return PlatformIntent::new(PlatformIntentKind::AssessmentComplete, 0.9)
                    .with_meta("trigger", "evolution_step")
                    .with_meta("step", session.step.to_string());
            }
        }

        let tables = [
            (PlatformIntentKind::AssessmentStart, START_PHRASES, 0.9),
            (PlatformIntentKind::ReportGenerate, REPORT_PHRASES, 0.85),
            (PlatformIntentKind::DashboardQuery, DASHBOARD_PHRASES, 0.8),
        ];
        for (kind, phrases, confidence) in tables {
            let matched = if interviewing {
                phrases.iter().find(|p| **p == normalized).copied()
            } else {
                matched_phrases(&haystack, phrases).first().copied()
            };
            if let Some(phrase) = matched {
                tracing::debug!(user_id = %user_id, %kind, phrase, "Platform intent detected");
                return PlatformIntent::new(kind, confidence).with_meta("phrase", phrase);
            }
        }

        PlatformIntent::none()
    }
}
