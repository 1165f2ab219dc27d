// src/aggregate/search.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MIN_SEARCH_LEN;
use crate::model::SearchRow;
use crate::normalize::slugify;

/// One matching record with the officials it contacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub record_id: String,
    pub lobbyist_name: String,
    pub lobbyist_slug: String,
    pub period: String,
    pub published_at: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub officials: Vec<String>,
}

/// Trimmed, lowercased term, or `None` when it is too short to search.
pub fn search_needle(term: &str) -> Option<String> {
    let needle = term.trim().to_lowercase();
    (needle.chars().count() >= MIN_SEARCH_LEN).then_some(needle)
}

/// Case-insensitive substring search over `rows`, grouped per record.
///
/// A row matches when any searchable field contains the term. Officials are
/// collected per record (deduplicated on entity key, first spelling kept).
/// Newest records first; at most `limit` records.
pub fn search(term: &str, rows: &[SearchRow], limit: usize) -> Vec<SearchHit> {
    let Some(needle) = search_needle(term) else {
        return Vec::new();
    };

    let mut hits: HashMap<&str, (SearchHit, Vec<String>)> = HashMap::new();
    for row in rows {
        let matched = row
            .searchable()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
        if !matched {
            continue;
        }

        let (hit, seen) = hits.entry(row.record_id.as_str()).or_insert_with(|| {
            (
                SearchHit {
                    record_id: row.record_id.clone(),
                    lobbyist_name: row.lobbyist_name.trim().to_string(),
                    lobbyist_slug: slugify(&row.lobbyist_name),
                    period: row.period.clone(),
                    published_at: row.published_at,
                    subject: row.subject.clone(),
                    officials: Vec::new(),
                },
                Vec::new(),
            )
        });

        if let Some(official) = row.official_name.as_deref() {
            let slug = slugify(official);
            if !slug.is_empty() && !seen.contains(&slug) {
                seen.push(slug);
                hit.officials.push(official.trim().to_string());
            }
        }
    }

    let mut out: Vec<SearchHit> = hits.into_values().map(|(hit, _)| hit).collect();
    out.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.record_id.cmp(&b.record_id))
    });
    out.truncate(limit);
    out
}
