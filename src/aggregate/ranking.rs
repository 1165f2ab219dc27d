// src/aggregate/ranking.rs
use std::cmp::Ordering;
use std::collections::HashMap;

use super::RankedEntry;
use crate::model::{ActivityRow, NameCountRow};
use crate::normalize::slugify;

/// Count descending, then name ascending.
pub(crate) fn by_count_then_name(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name))
}

/// Top `n` of pre-aggregated `(name, count)` rows. Blank names are skipped.
pub fn top_n(rows: &[NameCountRow], n: usize) -> Vec<RankedEntry> {
    let mut out: Vec<RankedEntry> = rows
        .iter()
        .filter_map(|r| {
            let name = r.name.trim();
            let slug = slugify(name);
            (!slug.is_empty()).then(|| RankedEntry {
                name: name.to_string(),
                count: r.count,
                slug,
            })
        })
        .collect();
    out.sort_by(by_count_then_name);
    out.truncate(n);
    out
}

/// Rank contact methods ("Meeting", "Email", ...) across activity strings.
///
/// Each row contributes one occurrence of its method, located with the rule for
/// the row's encoding. Methods that differ only in case or accents are merged
/// under the first spelling seen.
pub fn rank_methods(rows: &[ActivityRow], n: usize) -> Vec<RankedEntry> {
    let mut counts: HashMap<String, RankedEntry> = HashMap::new();
    for row in rows {
        let Some(method) = row.encoding.extract_method(&row.text) else {
            continue;
        };
        let slug = slugify(&method);
        if slug.is_empty() {
            continue;
        }
        counts
            .entry(slug.clone())
            .or_insert_with(|| RankedEntry {
                name: method,
                count: 0,
                slug,
            })
            .count += 1;
    }

    let mut out: Vec<RankedEntry> = counts.into_values().collect();
    out.sort_by(by_count_then_name);
    out.truncate(n);
    out
}
