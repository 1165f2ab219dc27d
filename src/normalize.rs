// src/normalize.rs
//! Canonical comparison keys for names and keyword tokens.
//!
//! - `slugify` turns an official/lobbyist name into an entity key: diacritics
//!   stripped, case-folded, runs of non-alphanumerics collapsed to `-`.
//! - `normalize_token` turns a raw word into a keyword-index token using a
//!   small suffix-stripping heuristic. It is not a linguistic stemmer; the
//!   exact outputs are pinned by tests.
//!
//! Known limitation: keys only collapse spellings that are identical after
//! decomposition. Letters with no decomposition ("ø", "ð", "ß") are kept as-is,
//! so "Søren" and "Soren" remain distinct entities.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const SLUG_SEPARATOR: char = '-';

/// Tokens shorter than this are dropped both before and after stemming.
pub const MIN_TOKEN_LEN: usize = 3;

/// `(suffix, replacement, word length must exceed)`; the first applicable rule wins.
const SUFFIX_RULES: &[(&str, &str, usize)] = &[
    ("ies", "y", 4),
    ("ing", "", 5),
    ("ed", "", 4),
    ("es", "", 4),
    ("s", "", 3),
];

/// Domain filler plus short common English words.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // lobbying-register filler
        "lobbying", "lobby", "meeting", "meetings", "email", "emails", "call", "calls",
        "letter", "minister", "department", "government", "official", "officials",
        "relevant", "matter", "matters", "intended", "result", "results", "details",
        "subject", "activity", "activities", "return", "returns", "period", "regarding",
        "discuss", "discussed", "discussion", "issue", "issues", "ireland", "irish",
        "national", "public", "sector", "related", "ensure", "support", "update",
        // common English
        "the", "and", "for", "with", "that", "this", "from", "are", "was", "were", "has",
        "have", "had", "not", "but", "all", "any", "can", "our", "out", "its", "into",
        "also", "been", "being", "will", "would", "should", "could", "their", "there",
        "these", "those", "which", "who", "whom", "what", "when", "where", "how",
        "about", "above", "after", "again", "other", "such", "than", "then", "them",
        "they", "you", "your", "his", "her", "she", "him", "per", "via", "etc", "may",
        "more", "most", "some", "each", "very", "just", "over", "under", "only", "own",
        "same", "both", "few", "off", "once", "here", "why", "yes", "one", "two", "new",
        "including", "between", "during", "within", "upon", "onto", "too",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, decompose, and drop combining marks.
fn fold(input: &str) -> String {
    input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Entity key for a person or organisation name.
///
/// Deterministic, and case/accent variants of the same spelling map to one key.
/// Returns an empty string for blank or punctuation-only input.
pub fn slugify(name: &str) -> String {
    let folded = fold(name);
    let mut out = String::with_capacity(folded.len());
    let mut pending_sep = false;
    for ch in folded.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push(SLUG_SEPARATOR);
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Keyword-index token for a raw word, or `None` when the word is rejected
/// (too short, digits only, or a stopword).
pub fn normalize_token(raw: &str) -> Option<String> {
    let word: String = fold(raw)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();

    if word.len() < MIN_TOKEN_LEN {
        return None;
    }
    if word.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if STOPWORDS.contains(word.as_str()) {
        return None;
    }

    let stemmed = strip_suffix(word);
    (stemmed.len() >= MIN_TOKEN_LEN).then_some(stemmed)
}

fn strip_suffix(word: String) -> String {
    for &(suffix, replacement, min_len) in SUFFIX_RULES {
        if word.len() > min_len && word.ends_with(suffix) {
            let stem = &word[..word.len() - suffix.len()];
            return format!("{stem}{replacement}");
        }
    }
    word
}
