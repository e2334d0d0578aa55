//! User-facing interview copy (pt-BR).

use uuid::Uuid;

use crate::session::DetailQuestion;

pub const PRESENTATION_PROMPT: &str = "Vamos iniciar sua avaliação clínica pelo protocolo IMRE. \
     Para começar, apresente-se: conte um pouco sobre você.";

pub const CHIEF_REASON_PROMPT: &str =
    "Obrigado. O que trouxe você até aqui hoje? Qual o principal motivo da consulta?";

pub const WHAT_ELSE_PROMPT: &str = "O que mais?";

pub const NEED_ONE_COMPLAINT_PROMPT: &str =
    "Antes de seguir, preciso de pelo menos uma queixa. O que está incomodando você?";

pub const METHODOLOGY_PROMPT: &str = "Agora vamos à metodologia: quais tratamentos ou \
     abordagens você já utilizou ou utiliza para essas queixas?";

pub const RESULT_PROMPT: &str = "E quais resultados você observou com essas abordagens?";

pub const EVOLUTION_PROMPT: &str =
    "Por fim, como você percebe a evolução do seu quadro ao longo do tempo?";

pub const NO_SESSION_PROMPT: &str = "Você não tem uma avaliação em andamento. Deseja iniciar \
     uma avaliação clínica IMRE? Diga \"iniciar avaliação\".";

pub const REPORT_FAILURE_APOLOGY: &str = "Desculpe, não consegui gerar seu relatório agora. \
     Suas respostas foram preservadas; envie sua mensagem novamente para tentar outra vez.";

pub const STORAGE_FAILURE_APOLOGY: &str =
    "Desculpe, tive um problema ao registrar sua resposta. Pode repetir, por favor?";

/// Numbered list of complaints asking which one bothers the user most.
pub fn main_complaint_prompt(complaints: &[String]) -> String {
    let list = complaints
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Entendi. Você relatou:\n{}\nQual delas mais incomoda você?",
        list
    )
}

/// Drill-down question about one complaint.
pub fn detail_prompt(question: DetailQuestion, complaint: &str) -> String {
    match question {
        DetailQuestion::Location => {
            format!("Vamos falar sobre \"{}\". Onde você sente isso?", complaint)
        }
        DetailQuestion::Onset => "Quando isso começou?".to_string(),
        DetailQuestion::Character => {
            "Como é essa sensação? Descreva as características.".to_string()
        }
        DetailQuestion::Associated => "Você sente mais alguma coisa junto com isso?".to_string(),
        DetailQuestion::Factors => "O que melhora e o que piora?".to_string(),
    }
}

pub fn resume_message(prompt: &str) -> String {
    format!(
        "Você já tem uma avaliação em andamento. Continuando de onde paramos: {}",
        prompt
    )
}

pub fn completion_message(report_id: Uuid) -> String {
    format!(
        "Avaliação concluída! Seu relatório clínico foi gerado (ID: {}).",
        report_id
    )
}
