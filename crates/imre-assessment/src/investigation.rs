//! The four Investigation phases: presentation, open complaint collection,
//! main-complaint selection and per-complaint drill-down.

use crate::heuristics::{is_closing, select_complaint, split_factors};
use crate::prompts::{
    detail_prompt, main_complaint_prompt, CHIEF_REASON_PROMPT, METHODOLOGY_PROMPT,
    NEED_ONE_COMPLAINT_PROMPT, PRESENTATION_PROMPT, WHAT_ELSE_PROMPT,
};
use crate::session::{ComplaintDetail, DetailQuestion, InvestigationState};

/// Knobs for the investigation heuristics.
#[derive(Debug, Clone, Copy)]
pub struct InvestigationOptions {
    pub closing_max_len: usize,
    pub drill_all_complaints: bool,
}

/// Result of feeding one answer into the investigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvestigationTurn {
    /// Stay in Investigation and ask this.
    Prompt(String),
    /// Every drilled complaint is complete; move on to Methodology.
    Finished,
}

impl InvestigationState {
    /// Apply one non-empty answer.
    pub fn answer(&mut self, answer: &str, options: InvestigationOptions) -> InvestigationTurn {
        if self.presenting_self.is_none() {
            self.presenting_self = Some(answer.to_string());
            self.collecting_complaints = true;
            return InvestigationTurn::Prompt(CHIEF_REASON_PROMPT.to_string());
        }

        if self.collecting_complaints {
            return self.collect(answer, options);
        }

        if self.selecting_main_complaint {
            let index = select_complaint(answer, &self.complaints_list);
            return self.fix_main_complaint(index, options);
        }

        self.drill(answer, options)
    }

    fn collect(&mut self, answer: &str, options: InvestigationOptions) -> InvestigationTurn {
        if is_closing(answer, options.closing_max_len) {
            return match self.complaints_list.len() {
                0 => InvestigationTurn::Prompt(NEED_ONE_COMPLAINT_PROMPT.to_string()),
                1 => {
                    self.collecting_complaints = false;
                    self.fix_main_complaint(0, options)
                }
                _ => {
                    self.collecting_complaints = false;
                    self.selecting_main_complaint = true;
                    InvestigationTurn::Prompt(main_complaint_prompt(&self.complaints_list))
                }
            };
        }

        let duplicate = self
            .complaints_list
            .iter()
            .any(|c| c.to_lowercase() == answer.to_lowercase());
        if !duplicate {
            self.complaints_list.push(answer.to_string());
        }
        InvestigationTurn::Prompt(WHAT_ELSE_PROMPT.to_string())
    }

    fn fix_main_complaint(&mut self, index: usize, options: InvestigationOptions) -> InvestigationTurn {
        let Some(main) = self.complaints_list.get(index).cloned() else {
            self.collecting_complaints = true;
            self.selecting_main_complaint = false;
            return InvestigationTurn::Prompt(NEED_ONE_COMPLAINT_PROMPT.to_string());
        };
        tracing::debug!(complaint = %main, "Main complaint selected");
        self.main_complaint = Some(main);
        self.selecting_main_complaint = false;
        self.current_complaint_index = 0;
        self.next_prompt(options)
    }

    fn drill(&mut self, answer: &str, options: InvestigationOptions) -> InvestigationTurn {
        let Some(complaint) = self.current_complaint(options.drill_all_complaints) else {
            return InvestigationTurn::Finished;
        };

        let detail = self.complaint_details.entry(complaint).or_default();
        record_detail(detail, answer);
        if detail.is_complete() {
            self.current_complaint_index += 1;
        }
        self.next_prompt(options)
    }

    /// The question to ask next, or `Finished` once the drill-down is done.
    fn next_prompt(&self, options: InvestigationOptions) -> InvestigationTurn {
        let Some(complaint) = self.current_complaint(options.drill_all_complaints) else {
            return InvestigationTurn::Finished;
        };
        let question = self
            .complaint_details
            .get(&complaint)
            .and_then(ComplaintDetail::next_question)
            .unwrap_or(DetailQuestion::Location);
        InvestigationTurn::Prompt(detail_prompt(question, &complaint))
    }

    /// The prompt that is pending for this state, repeated on empty input or
    /// when the interview is resumed.
    pub fn current_prompt(&self, options: InvestigationOptions) -> String {
        if self.presenting_self.is_none() {
            return PRESENTATION_PROMPT.to_string();
        }
        if self.collecting_complaints {
            return if self.complaints_list.is_empty() {
                CHIEF_REASON_PROMPT.to_string()
            } else {
                WHAT_ELSE_PROMPT.to_string()
            };
        }
        if self.selecting_main_complaint {
            return main_complaint_prompt(&self.complaints_list);
        }
        match self.next_prompt(options) {
            InvestigationTurn::Prompt(prompt) => prompt,
            InvestigationTurn::Finished => METHODOLOGY_PROMPT.to_string(),
        }
    }
}

/// Store `answer` in the first unanswered field of `detail`.
fn record_detail(detail: &mut ComplaintDetail, answer: &str) {
    let Some(question) = detail.next_question() else {
        return;
    };
    let value = Some(answer.to_string());
    match question {
        DetailQuestion::Location => detail.location = value,
        DetailQuestion::Onset => detail.when = value,
        DetailQuestion::Character => detail.how = value,
        DetailQuestion::Associated => detail.associated = value,
        // one answer closes the question even when only one side is named
        DetailQuestion::Factors => {
            let split = split_factors(answer);
            detail.improves = split.improves;
            detail.worsens = split.worsens;
        }
    }
}
