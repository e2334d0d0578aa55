//! Keyword tables for intent and domain detection.
//!
//! Phrases are matched as substrings of normalized text padded with one
//! space on each side (see [`imre_core::text::padded`]); a phrase written
//! with surrounding spaces therefore only matches a whole word.

use crate::types::IntentType;

/// Category keyword table in tie-break order. `Unknown` has no entry.
pub static CATEGORY_KEYWORDS: &[(IntentType, &[&str])] = &[
    (
        IntentType::Status,
        &[
            "status",
            "plataforma",
            "situacao",
            "funcionando",
            " online ",
            "fora do ar",
            "instabilidade",
            "metricas",
            "estatisticas",
        ],
    ),
    (
        IntentType::Training,
        &[
            "treinamento",
            "curso",
            " aula",
            "modulo",
            "aprender",
            "aprendizado",
            "formacao",
            "capacitacao",
            "contexto",
            "ensino",
        ],
    ),
    (
        IntentType::Simulation,
        &[
            "simulacao",
            "simulacoes",
            "simular",
            "simulado",
            "paciente virtual",
            "caso clinico",
            "casos clinicos",
            "roleplay",
        ],
    ),
    (
        IntentType::Knowledge,
        &[
            "biblioteca",
            "consultar",
            "artigo",
            "literatura",
            "referencia",
            "evidencia",
            "estudo",
            "documento",
            "base de conhecimento",
            "pesquisa",
        ],
    ),
    (
        IntentType::ClinicalReasoning,
        &[
            "diagnostico",
            "raciocinio clinico",
            "conduta",
            "hipotese",
            "sintoma",
            "prescricao",
            "tratamento",
            "posologia",
            " exame",
            " dose ",
        ],
    ),
    (
        IntentType::SmallTalk,
        &[
            " oi ",
            " ola ",
            "bom dia",
            "boa tarde",
            "boa noite",
            "obrigad",
            "tudo bem",
            "tchau",
            "valeu",
            "como vai",
        ],
    ),
];

/// Category used when clinical vocabulary is present but no category matched.
pub const CATCH_ALL: IntentType = IntentType::ClinicalReasoning;

pub static CANNABIS_KEYWORDS: &[&str] = &[
    "cannabis",
    "canabidiol",
    "canabinoide",
    "fitocanabinoide",
    " cbd ",
    " thc ",
    "maconha",
    "dor cronica",
];

pub static NEPHROLOGY_KEYWORDS: &[&str] = &[
    "nefro",
    "renal",
    " rim ",
    " rins ",
    "dialise",
    "creatinina",
    "filtracao glomerular",
    "glomerul",
    " ureia ",
];

/// Keywords for one category, empty for `Unknown`.
pub fn keywords_for(intent_type: IntentType) -> &'static [&'static str] {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(t, _)| *t == intent_type)
        .map(|(_, k)| *k)
        .unwrap_or(&[])
}
