// src/aggregate/periods.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::PeriodRow;

/// Distinct period labels, most recent first.
///
/// A label's position is decided by the newest publish timestamp among its
/// rows; the label text itself is never parsed. Labels without any timestamp
/// sort last, ties go by label.
pub fn order_periods(rows: &[PeriodRow]) -> Vec<String> {
    let mut newest: HashMap<&str, Option<DateTime<Utc>>> = HashMap::new();
    for row in rows {
        let label = row.label.trim();
        if label.is_empty() {
            continue;
        }
        let slot = newest.entry(label).or_insert(None);
        if row.published_at > *slot {
            *slot = row.published_at;
        }
    }

    let mut ordered: Vec<(&str, Option<DateTime<Utc>>)> = newest.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ordered.into_iter().map(|(l, _)| l.to_string()).collect()
}

/// Latest and previous period labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub latest: Option<String>,
    pub previous: Option<String>,
}

impl PeriodWindow {
    pub fn from_ordered(ordered: &[String]) -> Self {
        Self {
            latest: ordered.first().cloned(),
            previous: ordered.get(1).cloned(),
        }
    }

    pub fn from_rows(rows: &[PeriodRow]) -> Self {
        Self::from_ordered(&order_periods(rows))
    }
}
