//! Text heuristics for the interview: closing detection, main-complaint
//! matching and the improves/worsens split.

use std::sync::LazyLock;

use imre_core::text::{contains_any, normalize, padded, prefix_chars};
use regex::Regex;

/// "Nothing else" phrases that end open complaint collection. Normalized,
/// padded so they match whole words.
pub static NOTHING_ELSE_PHRASES: &[&str] = &[
    " so isso ",
    " e so ",
    " apenas isso ",
    " somente isso ",
    " mais nada ",
    " nada mais ",
    " nao tenho mais ",
    " nao tenho outra ",
    " nenhuma outra ",
    " por enquanto e isso ",
    " e isso ai ",
];

/// Characters compared when matching a selection against a complaint.
const MATCH_PREFIX_CHARS: usize = 10;

static NEGATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:nao|nada|nenhum|nenhuma)\b").unwrap());

static IMPROVES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bmelhor").unwrap());

static WORSENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bpior").unwrap());

/// True when `text` ends open complaint collection: it contains a "nothing
/// else" phrase, or it is a short utterance (at most `max_len` normalized
/// chars) containing a negation word.
pub fn is_closing(text: &str, max_len: usize) -> bool {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return false;
    }
    if contains_any(&padded(&normalized), NOTHING_ELSE_PHRASES) {
        return true;
    }
    normalized.chars().count() <= max_len && NEGATION_RE.is_match(&normalized)
}

/// Index of the complaint `answer` selects from `complaints`.
///
/// A 1-based list number wins. Otherwise the first complaint whose leading
/// characters occur in the answer (or vice versa) is chosen, comparing
/// normalized text. Defaults to the first complaint.
pub fn select_complaint(answer: &str, complaints: &[String]) -> usize {
    let normalized = normalize(answer);

    if let Ok(n) = normalized.parse::<usize>() {
        if (1..=complaints.len()).contains(&n) {
            return n - 1;
        }
    }

    if normalized.is_empty() {
        return 0;
    }
    let answer_prefix = prefix_chars(&normalized, MATCH_PREFIX_CHARS);

    complaints
        .iter()
        .position(|complaint| {
            let candidate = normalize(complaint);
            if candidate.is_empty() {
                return false;
            }
            normalized.contains(prefix_chars(&candidate, MATCH_PREFIX_CHARS))
                || candidate.contains(answer_prefix)
        })
        .unwrap_or(0)
}

/// Outcome of splitting an aggravating/relieving factors answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorSplit {
    pub improves: Option<String>,
    pub worsens: Option<String>,
}

/// Split a combined "what improves / what worsens" answer.
///
/// With both keywords the answer is cut at the later one. With only one,
/// the whole answer fills that side. With neither it fills `improves`.
pub fn split_factors(answer: &str) -> FactorSplit {
    let answer = answer.trim();
    let improves_at = IMPROVES_RE.find(answer).map(|m| m.start());
    let worsens_at = WORSENS_RE.find(answer).map(|m| m.start());

    match (improves_at, worsens_at) {
        (Some(i), Some(w)) => {
            let cut = i.max(w);
            let first = trim_connector(&answer[..cut]);
            let second = trim_connector(&answer[cut..]);
            let (improves, worsens) = if i < w {
                (first, second)
            } else {
                (second, first)
            };
            FactorSplit {
                improves: Some(improves),
                worsens: Some(worsens),
            }
        }
        (None, Some(_)) => FactorSplit {
            improves: None,
            worsens: Some(answer.to_string()),
        },
        _ => FactorSplit {
            improves: Some(answer.to_string()),
            worsens: None,
        },
    }
}

/// Trim whitespace, trailing punctuation and a dangling conjunction.
fn trim_connector(segment: &str) -> String {
    let mut s = segment.trim().trim_end_matches([',', ';', '.']).trim_end();
    for conjunction in [" e", " mas", " porém", " porem"] {
        let Some(at) = s.len().checked_sub(conjunction.len()) else {
            continue;
        };
        if at > 0 && s.is_char_boundary(at) {
            let (head, tail) = s.split_at(at);
            if tail.eq_ignore_ascii_case(conjunction) {
                s = head.trim_end().trim_end_matches([',', ';']).trim_end();
                break;
            }
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Closing heuristic
    // =========================================================================

    #[test]
    fn test_nothing_else_phrases_close() {
        assert!(is_closing("só isso", 15));
        assert!(is_closing("Acho que é só isso, doutor.", 15));
        assert!(is_closing("Não tenho mais nenhuma queixa no momento", 15));
        assert!(is_closing("mais nada", 15));
    }

    #[test]
    fn test_short_negation_closes() {
        assert!(is_closing("não", 15));
        assert!(is_closing("Nada.", 15));
        assert!(is_closing("nenhuma", 15));
    }

    #[test]
    fn test_long_negation_does_not_close() {
        assert!(!is_closing(
            "não consigo dormir direito há semanas",
            15
        ));
    }

    #[test]
    fn test_negation_must_be_whole_word() {
        // "nadar" contains "nada" but is not a negation
        assert!(!is_closing("dor ao nadar", 15));
    }

    #[test]
    fn test_regular_complaints_do_not_close() {
        assert!(!is_closing("dor de cabeça", 15));
        assert!(!is_closing("Insônia", 15));
        assert!(!is_closing("", 15));
        assert!(!is_closing("   ", 15));
    }

    #[test]
    fn test_closing_threshold_is_configurable() {
        assert!(!is_closing("não, obrigado", 5));
        assert!(is_closing("não, obrigado", 15));
    }

    // =========================================================================
    // Main-complaint selection
    // =========================================================================

    fn complaints() -> Vec<String> {
        vec![
            "Dor de cabeça frequente".to_string(),
            "Insônia".to_string(),
            "Ansiedade no trabalho".to_string(),
        ]
    }

    #[test]
    fn test_select_by_number() {
        assert_eq!(select_complaint("2", &complaints()), 1);
        assert_eq!(select_complaint(" 3. ", &complaints()), 2);
    }

    #[test]
    fn test_out_of_range_number_falls_back() {
        assert_eq!(select_complaint("7", &complaints()), 0);
        assert_eq!(select_complaint("0", &complaints()), 0);
    }

    #[test]
    fn test_select_by_substring_either_direction() {
        // complaint prefix inside the answer
        assert_eq!(
            select_complaint("Com certeza a ansiedade no trabalho", &complaints()),
            2
        );
        // answer prefix inside the complaint
        assert_eq!(select_complaint("insônia", &complaints()), 1);
        assert_eq!(select_complaint("DOR DE CABECA", &complaints()), 0);
    }

    #[test]
    fn test_no_match_defaults_to_first() {
        assert_eq!(select_complaint("não sei dizer", &complaints()), 0);
        assert_eq!(select_complaint("", &complaints()), 0);
    }

    // =========================================================================
    // Factors split
    // =========================================================================

    #[test]
    fn test_split_both_keywords_improves_first() {
        let split = split_factors("Melhora com repouso e piora com barulho");
        assert_eq!(split.improves.as_deref(), Some("Melhora com repouso"));
        assert_eq!(split.worsens.as_deref(), Some("piora com barulho"));
    }

    #[test]
    fn test_split_both_keywords_worsens_first() {
        let split = split_factors("Piora à noite, mas melhora com analgésico.");
        assert_eq!(split.worsens.as_deref(), Some("Piora à noite"));
        assert_eq!(split.improves.as_deref(), Some("melhora com analgésico"));
    }

    #[test]
    fn test_split_single_keyword() {
        let split = split_factors("piora quando fico em pé");
        assert!(split.improves.is_none());
        assert_eq!(split.worsens.as_deref(), Some("piora quando fico em pé"));

        let split = split_factors("melhora deitado");
        assert_eq!(split.improves.as_deref(), Some("melhora deitado"));
        assert!(split.worsens.is_none());
    }

    #[test]
    fn test_split_without_keywords_fills_improves() {
        let split = split_factors("repouso e compressa fria");
        assert_eq!(split.improves.as_deref(), Some("repouso e compressa fria"));
        assert!(split.worsens.is_none());
    }
}
