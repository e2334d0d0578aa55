//! Text normalization shared by the classifier and the interview heuristics.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize free text for keyword matching.
///
/// Lowercases, decomposes (NFD) and drops combining marks so accented and
/// unaccented spellings compare equal, turns every character that is not a
/// letter, digit or whitespace into a space, then collapses runs of
/// whitespace. Total: never fails, empty in gives empty out.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pad normalized text with one space on each side so phrases declared with
/// surrounding spaces match whole words at the edges too.
pub fn padded(normalized: &str) -> String {
    format!(" {} ", normalized)
}

/// Every phrase from `phrases` that occurs in `haystack`, in declaration order.
pub fn matched_phrases<'a>(haystack: &str, phrases: &[&'a str]) -> Vec<&'a str> {
    phrases
        .iter()
        .copied()
        .filter(|p| haystack.contains(p))
        .collect()
}

/// True if any phrase from `phrases` occurs in `haystack`.
pub fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| haystack.contains(p))
}

/// First `n` characters of `s` (by char, not byte).
pub fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
