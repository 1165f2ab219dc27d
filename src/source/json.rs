// src/source/json.rs
//! In-memory source over a JSON array of [`Record`]s.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::InsightsSource;
use crate::model::{ActivityRow, EdgeRow, KeywordRow, NameCountRow, PeriodRow, Record, SearchRow};
use crate::normalize::slugify;

#[derive(Debug, Clone, Default)]
pub struct JsonSource {
    records: Vec<Record>,
}

impl JsonSource {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let records: Vec<Record> = serde_json::from_str(s).context("parsing records JSON")?;
        Ok(Self::from_records(records))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading dataset from {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("loading dataset {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn in_period<'a>(&'a self, period: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        let period = period.trim();
        self.records.iter().filter(move |r| r.period.trim() == period)
    }
}

/// Distinct record ids per entity key, keeping the first spelling seen.
fn count_distinct<'a>(pairs: impl Iterator<Item = (&'a str, String)>) -> Vec<NameCountRow> {
    let mut by_key: HashMap<String, (String, HashSet<&'a str>)> = HashMap::new();
    for (record_id, name) in pairs {
        let key = slugify(&name);
        if key.is_empty() {
            continue;
        }
        by_key
            .entry(key)
            .or_insert_with(|| (name.trim().to_string(), HashSet::new()))
            .1
            .insert(record_id);
    }
    by_key
        .into_values()
        .map(|(name, ids)| NameCountRow::new(name, ids.len() as u64))
        .collect()
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}

#[async_trait::async_trait]
impl InsightsSource for JsonSource {
    async fn period_rows(&self) -> Result<Vec<PeriodRow>> {
        Ok(self
            .records
            .iter()
            .map(|r| PeriodRow {
                label: r.period.trim().to_string(),
                published_at: r.published_at,
            })
            .collect())
    }

    async fn official_counts(&self, period: &str) -> Result<Vec<NameCountRow>> {
        Ok(count_distinct(self.in_period(period).flat_map(|r| {
            r.contacts().map(move |c| (r.id.as_str(), c.name))
        })))
    }

    async fn lobbyist_counts(&self, period: &str) -> Result<Vec<NameCountRow>> {
        Ok(count_distinct(
            self.in_period(period)
                .map(|r| (r.id.as_str(), r.lobbyist_name.clone())),
        ))
    }

    async fn contact_edges(&self, period: &str) -> Result<Vec<EdgeRow>> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for r in self.in_period(period) {
            for c in r.contacts() {
                let edge = EdgeRow::new(c.name, r.lobbyist_name.trim());
                if seen.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }
        Ok(edges)
    }

    async fn keyword_rows(&self, period: &str) -> Result<Vec<KeywordRow>> {
        Ok(self.in_period(period).map(KeywordRow::from_record).collect())
    }

    async fn activity_rows(&self, period: &str) -> Result<Vec<ActivityRow>> {
        Ok(self
            .in_period(period)
            .flat_map(|r| {
                r.activities.iter().map(move |a| ActivityRow {
                    text: a.clone(),
                    encoding: r.activity_encoding,
                })
            })
            .collect())
    }

    async fn search_rows(&self, term: &str) -> Result<Vec<SearchRow>> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        for r in &self.records {
            let hit = contains_ci(Some(r.lobbyist_name.as_str()), &needle)
                || contains_ci(r.subject.as_deref(), &needle)
                || contains_ci(r.intended_result.as_deref(), &needle)
                || contains_ci(r.details.as_deref(), &needle)
                || contains_ci(r.policy_area.as_deref(), &needle);
            if !hit {
                continue;
            }

            let base = SearchRow {
                record_id: r.id.clone(),
                lobbyist_name: r.lobbyist_name.clone(),
                period: r.period.clone(),
                published_at: r.published_at,
                subject: r.subject.clone(),
                intended_result: r.intended_result.clone(),
                details: r.details.clone(),
                policy_area: r.policy_area.clone(),
                official_name: None,
            };
            let mut contacts = r.contacts().peekable();
            if contacts.peek().is_none() {
                rows.push(base);
                continue;
            }
            for c in contacts {
                rows.push(SearchRow {
                    official_name: Some(c.name),
                    ..base.clone()
                });
            }
        }
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
