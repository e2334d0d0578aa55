//! Keyword-scoring intent classifier.

use std::collections::BTreeSet;

use imre_core::text::{matched_phrases, normalize, padded};

use crate::keywords::{CANNABIS_KEYWORDS, CATCH_ALL, CATEGORY_KEYWORDS, NEPHROLOGY_KEYWORDS};
use crate::types::{Domain, Intent, IntentType};

/// Keyword hits needed for full confidence.
const FULL_CONFIDENCE_HITS: f32 = 3.0;

/// Confidence bonus for utterances tagged with a clinical domain.
const DOMAIN_BONUS: f32 = 0.1;

/// Rule-based classifier over the static keyword tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify one utterance.
    ///
    /// Each category scores one point per keyword phrase found in the
    /// normalized text. The strictly highest score wins; ties keep the
    /// category declared first. With no hit at all, domain-tagged text falls
    /// back to the clinical-reasoning catch-all with score 1, anything else
    /// is `Unknown` with confidence 0.
    pub fn classify(&self, text: &str) -> Intent {
        let normalized = normalize(text);
        let haystack = padded(&normalized);

        let (domain, domain_hits) = detect_domain(&haystack);

        if normalized.is_empty() {
            return unknown(text, domain);
        }

        let mut best: Option<(IntentType, Vec<&str>)> = None;
        for (intent_type, phrases) in CATEGORY_KEYWORDS {
            let hits = matched_phrases(&haystack, phrases);
            let beats = match &best {
                Some((_, current)) => hits.len() > current.len(),
                None => !hits.is_empty(),
            };
            if beats {
                best = Some((*intent_type, hits));
            }
        }

        let (intent_type, score, mut keywords) = match best {
            Some((t, hits)) => (t, hits.len(), to_keyword_set(&hits)),
            None if domain != Domain::General => (CATCH_ALL, 1, BTreeSet::new()),
            None => return unknown(text, domain),
        };
        keywords.extend(to_keyword_set(&domain_hits));

        let bonus = if domain != Domain::General {
            DOMAIN_BONUS
        } else {
            0.0
        };
        let confidence = (score as f32 / FULL_CONFIDENCE_HITS + bonus).min(1.0);

        tracing::debug!(
            intent = %intent_type,
            %domain,
            score,
            confidence,
            "Utterance classified"
        );

        Intent {
            intent_type,
            confidence,
            keywords,
            domain,
            raw_input: text.to_string(),
        }
    }
}

/// Scan both domain keyword sets. The set with more hits wins; ties go to
/// cannabis; no hit at all is `General`.
fn detect_domain(haystack: &str) -> (Domain, Vec<&'static str>) {
    let cannabis = matched_phrases(haystack, CANNABIS_KEYWORDS);
    let nephrology = matched_phrases(haystack, NEPHROLOGY_KEYWORDS);

    if cannabis.is_empty() && nephrology.is_empty() {
        (Domain::General, Vec::new())
    } else if cannabis.len() >= nephrology.len() {
        (Domain::Cannabis, cannabis)
    } else {
        (Domain::Nephrology, nephrology)
    }
}

fn to_keyword_set(hits: &[&str]) -> BTreeSet<String> {
    hits.iter().map(|k| k.trim().to_string()).collect()
}

fn unknown(text: &str, domain: Domain) -> Intent {
    Intent {
        intent_type: IntentType::Unknown,
        confidence: 0.0,
        keywords: BTreeSet::new(),
        domain,
        raw_input: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        IntentClassifier::new().classify(text)
    }

    // ---- Empty input ----

    #[test]
    fn test_empty_input_is_unknown() {
        let intent = classify("");
        assert_eq!(intent.intent_type, IntentType::Unknown);
        assert_eq!(intent.confidence, 0.0);
        assert_eq!(intent.domain, Domain::General);
    }

    #[test]
    fn test_whitespace_only_is_unknown() {
        let intent = classify("   ");
        assert_eq!(intent.intent_type, IntentType::Unknown);
        assert_eq!(intent.confidence, 0.0);
        assert_eq!(intent.raw_input, "   ");
    }

    #[test]
    fn test_punctuation_only_is_unknown() {
        let intent = classify("?!...");
        assert_eq!(intent.intent_type, IntentType::Unknown);
        assert_eq!(intent.confidence, 0.0);
    }

    // ---- Category detection ----

    #[test]
    fn test_status_question() {
        let intent = classify("Qual o status atual da plataforma?");
        assert_eq!(intent.intent_type, IntentType::Status);
        assert!(intent.confidence > 0.2);
        assert!(intent.keywords.contains("status"));
        assert_eq!(intent.domain, Domain::General);
    }

    #[test]
    fn test_knowledge_with_cannabis_domain() {
        let intent =
            classify("Preciso consultar a biblioteca sobre cannabis medicinal para dor crônica.");
        assert_eq!(intent.intent_type, IntentType::Knowledge);
        assert_eq!(intent.domain, Domain::Cannabis);
        assert!(intent.keywords.contains("biblioteca"));
        assert!(intent.keywords.contains("cannabis"));
        // 2 hits / 3 + domain bonus
        assert!((intent.confidence - (2.0 / 3.0 + 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_simulation_with_nephrology_domain() {
        let intent = classify("Atualize as simulações de pacientes nefro em andamento.");
        assert_eq!(intent.intent_type, IntentType::Simulation);
        assert_eq!(intent.domain, Domain::Nephrology);
    }

    #[test]
    fn test_training_request() {
        let intent = classify("Quero acessar o módulo do curso de formação");
        assert_eq!(intent.intent_type, IntentType::Training);
        assert_eq!(intent.confidence, 1.0);
    }

    #[test]
    fn test_small_talk_whole_word_greeting() {
        let intent = classify("Oi, tudo bem?");
        assert_eq!(intent.intent_type, IntentType::SmallTalk);

        // "oi" inside another word must not count
        let intent = classify("dois comprimidos");
        assert_ne!(intent.intent_type, IntentType::SmallTalk);
    }

    // ---- Catch-all fallback ----

    #[test]
    fn test_clinical_vocabulary_falls_back_to_reasoning() {
        let intent = classify("Paciente em dor crônica precisa de análise IMRE triaxial.");
        assert_eq!(intent.intent_type, IntentType::ClinicalReasoning);
        assert_eq!(intent.domain, Domain::Cannabis);
        assert!((intent.confidence - (1.0 / 3.0 + 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_general_text_without_hits_is_unknown() {
        let intent = classify("O céu está azul hoje");
        assert_eq!(intent.intent_type, IntentType::Unknown);
        assert_eq!(intent.confidence, 0.0);
    }

    #[test]
    fn test_nephrology_only_falls_back() {
        let intent = classify("Minha creatinina subiu");
        assert_eq!(intent.intent_type, IntentType::ClinicalReasoning);
        assert_eq!(intent.domain, Domain::Nephrology);
    }

    // ---- Tie-break ----

    #[test]
    fn test_tie_keeps_first_declared_category() {
        // One Status hit, one Knowledge hit: Status is declared first.
        let intent = classify("status do artigo");
        assert_eq!(intent.intent_type, IntentType::Status);

        // One Training hit, one ClinicalReasoning hit: Training is declared first.
        let intent = classify("curso sobre diagnostico");
        assert_eq!(intent.intent_type, IntentType::Training);
    }

    #[test]
    fn test_higher_score_beats_declared_order() {
        // One Status hit vs. two Knowledge hits
        let intent = classify("status: consultar a biblioteca");
        assert_eq!(intent.intent_type, IntentType::Knowledge);
    }

    // ---- Domain ----

    #[test]
    fn test_domain_majority_and_tie() {
        let intent = classify("cannabis e canabidiol para doença renal");
        assert_eq!(intent.domain, Domain::Cannabis);

        let intent = classify("nefrologia, diálise e creatinina com cbd");
        assert_eq!(intent.domain, Domain::Nephrology);

        // One hit each: cannabis wins the tie
        let intent = classify("cannabis e função renal");
        assert_eq!(intent.domain, Domain::Cannabis);
    }

    // ---- Accents and case ----

    #[test]
    fn test_accents_and_case_are_ignored() {
        let a = classify("SIMULAÇÃO de caso clínico");
        let b = classify("simulacao de caso clinico");
        assert_eq!(a.intent_type, b.intent_type);
        assert_eq!(a.confidence, b.confidence);
    }

    // ---- Bounds ----

    #[test]
    fn test_confidence_always_in_bounds() {
        let inputs = [
            "",
            " ",
            "status plataforma situacao funcionando metricas estatisticas cannabis",
            "treinamento curso modulo aprender formacao capacitacao contexto ensino",
            "oi",
            "Paciente renal com dor crônica",
            "🙂🙂🙂",
            "1234 5678",
        ];
        for input in inputs {
            let intent = classify(input);
            assert!(
                (0.0..=1.0).contains(&intent.confidence),
                "confidence {} out of bounds for {:?}",
                intent.confidence,
                input
            );
        }
    }

    #[test]
    fn test_classifier_is_deterministic() {
        let text = "Preciso consultar a biblioteca sobre cannabis";
        assert_eq!(classify(text), classify(text));
    }
}
