//! Report sections synthesized from an interview session.

use std::collections::BTreeMap;

use imre_core::config::AssessmentConfig;
use imre_core::text::prefix_chars;
use imre_core::ReportSections;

use crate::session::{ComplaintDetail, InterviewSession};

const PATIENT_NAME_MAX_CHARS: usize = 60;

/// Build report sections from the session's structured fields, substituting
/// configured defaults for steps the user never answered.
pub fn build_sections(session: &InterviewSession, config: &AssessmentConfig) -> ReportSections {
    let investigation = &session.investigation;
    let detailed = investigation
        .complaint_details
        .values()
        .filter(|d| d.is_complete())
        .count();
    let any_worsens = investigation
        .complaint_details
        .values()
        .any(|d| d.worsens.is_some());

    let methodology = or_default(&session.methodology, &config.default_methodology);
    let result = or_default(&session.result, &config.default_result);
    let evolution = or_default(&session.evolution, &config.default_evolution);

    let mut recommendations = vec!["Manter acompanhamento clínico periódico".to_string()];
    if investigation.complaints_list.len() > detailed {
        recommendations
            .push("Aprofundar a investigação das queixas não detalhadas no retorno".to_string());
    }
    if any_worsens {
        recommendations.push("Orientar o paciente a evitar os fatores de piora relatados".to_string());
    }
    if session.methodology.trim().is_empty() {
        recommendations.push("Registrar as abordagens terapêuticas já utilizadas".to_string());
    }

    let mut scores = BTreeMap::new();
    scores.insert(
        "complaints".to_string(),
        investigation.complaints_list.len() as i64,
    );
    scores.insert("detailed_complaints".to_string(), detailed as i64);
    scores.insert("completeness".to_string(), completeness(session));

    ReportSections {
        investigation: investigation_summary(session),
        methodology,
        result,
        evolution,
        recommendations,
        scores,
    }
}

/// Report sections for a user with no interview, from free-text notes
/// (most recent last).
pub fn sections_from_notes(notes: &[String], config: &AssessmentConfig) -> ReportSections {
    let investigation = if notes.is_empty() {
        "Sem registros de investigação".to_string()
    } else {
        notes
            .iter()
            .map(|n| format!("- {}", n))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let mut scores = BTreeMap::new();
    scores.insert("notes".to_string(), notes.len() as i64);
    ReportSections {
        investigation,
        methodology: config.default_methodology.clone(),
        result: config.default_result.clone(),
        evolution: config.default_evolution.clone(),
        recommendations: vec!["Realizar avaliação clínica IMRE completa".to_string()],
        scores,
    }
}

/// Display name for the report: the presentation answer if there is one,
/// else the user id.
pub fn patient_name(session: &InterviewSession) -> String {
    match session.investigation.presenting_self.as_deref().map(str::trim) {
        Some(presentation) if !presentation.is_empty() => {
            prefix_chars(presentation, PATIENT_NAME_MAX_CHARS).to_string()
        }
        _ => session.user_id.clone(),
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn investigation_summary(session: &InterviewSession) -> String {
    let investigation = &session.investigation;
    let mut lines = Vec::new();

    if let Some(presentation) = &investigation.presenting_self {
        lines.push(format!("Apresentação: {}", presentation));
    }
    if !investigation.complaints_list.is_empty() {
        lines.push(format!(
            "Queixas relatadas: {}",
            investigation.complaints_list.join("; ")
        ));
    }
    if let Some(main) = &investigation.main_complaint {
        lines.push(format!("Queixa principal: {}", main));
    }
    for (complaint, detail) in &investigation.complaint_details {
        lines.push(format!("{}: {}", complaint, describe_detail(detail)));
    }

    if lines.is_empty() {
        "Sem registros de investigação".to_string()
    } else {
        lines.join("\n")
    }
}

fn describe_detail(detail: &ComplaintDetail) -> String {
    [
        ("local", &detail.location),
        ("início", &detail.when),
        ("características", &detail.how),
        ("sintomas associados", &detail.associated),
        ("melhora", &detail.improves),
        ("piora", &detail.worsens),
    ]
    .iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{} {}", label, v)))
    .collect::<Vec<_>>()
    .join("; ")
}

/// Share of interview fields answered, 0..=100.
fn completeness(session: &InterviewSession) -> i64 {
    let investigation = &session.investigation;
    // presentation + main complaint + 6 detail fields + methodology/result/evolution
    let total = 11;
    let mut filled = 0;
    if investigation.presenting_self.is_some() {
        filled += 1;
    }
    if let Some(main) = &investigation.main_complaint {
        filled += 1;
        filled += investigation
            .complaint_details
            .get(main)
            .map(ComplaintDetail::filled)
            .unwrap_or(0);
    }
    for value in [&session.methodology, &session.result, &session.evolution] {
        if !value.trim().is_empty() {
            filled += 1;
        }
    }
    (filled * 100 / total) as i64
}
