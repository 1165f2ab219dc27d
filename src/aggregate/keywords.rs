// src/aggregate/keywords.rs
use std::collections::HashMap;

use super::ranking::by_count_then_name;
use super::RankedEntry;
use crate::model::KeywordRow;
use crate::normalize::normalize_token;

/// Most frequent normalized tokens across the free-text fields of `rows`.
pub fn keyword_frequency(rows: &[KeywordRow], n: usize) -> Vec<RankedEntry> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in rows {
        for word in row.text().split_whitespace() {
            if let Some(token) = normalize_token(word) {
                *counts.entry(token).or_default() += 1;
            }
        }
    }

    let mut out: Vec<RankedEntry> = counts
        .into_iter()
        .map(|(token, count)| RankedEntry {
            slug: token.clone(),
            name: token,
            count,
        })
        .collect();
    out.sort_by(by_count_then_name);
    out.truncate(n);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(subject: &str, details: Option<&str>) -> KeywordRow {
        KeywordRow {
            record_id: "r".into(),
            subject: Some(subject.to_string()),
            details: details.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn counts_normalized_tokens() {
        let rows = vec![
            row("Housing grants for the rural sector", Some("grant scheme")),
            row("Social housing", None),
        ];
        let out = keyword_frequency(&rows, 30);
        assert_eq!(out[0].name, "grant");
        assert_eq!(out[0].count, 2);
        assert_eq!(out[1].name, "hous");
        assert_eq!(out[1].count, 2);
        assert!(out.iter().all(|e| e.name != "the" && e.name != "sector"));
    }

    #[test]
    fn ties_sort_by_token_and_truncate() {
        let rows = vec![row("zebra apple mango", None)];
        let out = keyword_frequency(&rows, 2);
        let names: Vec<_> = out.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "mango"]);
    }

    #[test]
    fn empty_rows() {
        assert!(keyword_frequency(&[], 30).is_empty());
        assert!(keyword_frequency(&[KeywordRow::default()], 30).is_empty());
    }
}
