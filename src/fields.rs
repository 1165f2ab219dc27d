// src/fields.rs
//! Parsers for the delimiter-packed compound fields found in register data.
//!
//! Grammar (delimiter `|`, fields trimmed, blank fields treated as absent):
//!
//! ```text
//! contact  := name [ "|" job_title [ "|" public_body ] ]
//! activity := description [ "|" method [ "|" count ] ]
//! ```
//!
//! Two activity encodings coexist. Packed entries carry the method right after
//! the first delimiter. Trailing entries carry free text (which may itself
//! contain delimiters) followed by the method after the last delimiter. Both
//! extraction rules are kept as separate functions.

use serde::{Deserialize, Serialize};

pub const FIELD_DELIMITER: char = '|';

/// Official contacted by a return, parsed from `name|title|body`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactField {
    pub name: String,
    pub job_title: Option<String>,
    pub public_body: Option<String>,
}

impl ContactField {
    /// `None` when the name segment is blank.
    pub fn parse(packed: &str) -> Option<Self> {
        let mut parts = packed.split(FIELD_DELIMITER);
        let name = non_blank(parts.next())?;
        Some(Self {
            name,
            job_title: non_blank(parts.next()),
            public_body: non_blank(parts.next()),
        })
    }
}

/// Activity line parsed from `description|method|count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub description: String,
    pub method: Option<String>,
    pub count: Option<u32>,
}

impl ActivityEntry {
    pub fn parse(packed: &str) -> Self {
        let mut parts = packed.split(FIELD_DELIMITER);
        let description = parts.next().unwrap_or_default().trim().to_string();
        let method = non_blank(parts.next());
        let count = parts.next().and_then(|c| c.trim().parse::<u32>().ok());
        Self {
            description,
            method,
            count,
        }
    }
}

/// Which rule locates the method inside an activity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodEncoding {
    /// `description|method|count`
    #[default]
    Packed,
    /// `free text ...|method`
    Trailing,
}

impl MethodEncoding {
    pub fn extract_method(self, activity: &str) -> Option<String> {
        match self {
            MethodEncoding::Packed => method_after_first_delimiter(activity),
            MethodEncoding::Trailing => method_after_last_delimiter(activity),
        }
    }
}

/// Segment after the first delimiter, if present and non-blank.
pub fn method_after_first_delimiter(activity: &str) -> Option<String> {
    non_blank(activity.split(FIELD_DELIMITER).nth(1))
}

/// Segment after the last delimiter, if present and non-blank.
pub fn method_after_last_delimiter(activity: &str) -> Option<String> {
    non_blank(activity.rsplit_once(FIELD_DELIMITER).map(|(_, tail)| tail))
}

fn non_blank(segment: Option<&str>) -> Option<String> {
    segment
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
