// src/model.rs
//! Input records and the row shapes a storage collaborator hands to the aggregator.
//!
//! Rows are read-only inputs. Every text field is tolerant: a missing field
//! deserializes to `None`/empty and is treated as absent downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{ContactField, MethodEncoding};

/// One lobbying return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub lobbyist_name: String,
    /// Reporting label such as "1 Jan, 2024 to 30 Apr, 2024". Never parsed.
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub intended_result: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub policy_area: Option<String>,
    #[serde(default)]
    pub relevant_matter: Option<String>,
    #[serde(default)]
    pub contacts: Vec<ContactInput>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub activity_encoding: MethodEncoding,
}

impl Record {
    /// Contacts with a non-blank name, packed entries parsed.
    pub fn contacts(&self) -> impl Iterator<Item = ContactField> + '_ {
        self.contacts.iter().filter_map(ContactInput::resolve)
    }
}

/// A contact either as structured JSON or as a packed `name|title|body` string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContactInput {
    Structured(ContactField),
    Packed(String),
}

impl ContactInput {
    pub fn resolve(&self) -> Option<ContactField> {
        match self {
            ContactInput::Structured(c) if !c.name.trim().is_empty() => Some(ContactField {
                name: c.name.trim().to_string(),
                ..c.clone()
            }),
            ContactInput::Structured(_) => None,
            ContactInput::Packed(s) => ContactField::parse(s),
        }
    }
}

/// Period label with a publish timestamp; several rows per label are allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodRow {
    pub label: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Pre-aggregated `(name, count)` row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCountRow {
    pub name: String,
    pub count: u64,
}

impl NameCountRow {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Official ↔ lobbyist contact within one period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRow {
    pub official: String,
    pub lobbyist: String,
}

impl EdgeRow {
    pub fn new(official: impl Into<String>, lobbyist: impl Into<String>) -> Self {
        Self {
            official: official.into(),
            lobbyist: lobbyist.into(),
        }
    }
}

/// Free-text fields of one record, for the keyword index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordRow {
    pub record_id: String,
    pub subject: Option<String>,
    pub intended_result: Option<String>,
    pub details: Option<String>,
    pub policy_area: Option<String>,
    pub relevant_matter: Option<String>,
}

impl KeywordRow {
    pub fn from_record(r: &Record) -> Self {
        Self {
            record_id: r.id.clone(),
            subject: r.subject.clone(),
            intended_result: r.intended_result.clone(),
            details: r.details.clone(),
            policy_area: r.policy_area.clone(),
            relevant_matter: r.relevant_matter.clone(),
        }
    }

    /// All indexed fields joined by a space; missing fields count as empty.
    pub fn text(&self) -> String {
        [
            &self.subject,
            &self.intended_result,
            &self.details,
            &self.policy_area,
            &self.relevant_matter,
        ]
        .iter()
        .map(|f| f.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Raw activity string plus the encoding it was written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub text: String,
    #[serde(default)]
    pub encoding: MethodEncoding,
}

/// One `(record, official)` row for free-text search; grouped by `record_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRow {
    pub record_id: String,
    pub lobbyist_name: String,
    pub period: String,
    pub published_at: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub intended_result: Option<String>,
    pub details: Option<String>,
    pub policy_area: Option<String>,
    pub official_name: Option<String>,
}

impl SearchRow {
    /// Fields matched by the substring search.
    pub fn searchable(&self) -> [&str; 5] {
        [
            self.lobbyist_name.as_str(),
            self.subject.as_deref().unwrap_or(""),
            self.intended_result.as_deref().unwrap_or(""),
            self.details.as_deref().unwrap_or(""),
            self.policy_area.as_deref().unwrap_or(""),
        ]
    }
}
