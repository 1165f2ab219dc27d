// src/source/mod.rs
//! Storage collaborator contract.
//!
//! Implementations own the records and answer with whole row sets in the shapes
//! from [`crate::model`]. Counts are expected pre-aggregated: distinct records
//! per official or lobbyist within the requested period.

pub mod json;

use anyhow::Result;

use crate::model::{ActivityRow, EdgeRow, KeywordRow, NameCountRow, PeriodRow, SearchRow};

#[async_trait::async_trait]
pub trait InsightsSource: Send + Sync {
    /// Period label and publish timestamp rows; one per record is fine.
    async fn period_rows(&self) -> Result<Vec<PeriodRow>>;

    /// Distinct records contacting each official in `period`.
    async fn official_counts(&self, period: &str) -> Result<Vec<NameCountRow>>;

    /// Distinct records filed by each lobbyist in `period`.
    async fn lobbyist_counts(&self, period: &str) -> Result<Vec<NameCountRow>>;

    /// Distinct official ↔ lobbyist contacts in `period`.
    async fn contact_edges(&self, period: &str) -> Result<Vec<EdgeRow>>;

    async fn keyword_rows(&self, period: &str) -> Result<Vec<KeywordRow>>;

    async fn activity_rows(&self, period: &str) -> Result<Vec<ActivityRow>>;

    /// Candidate `(record, official)` rows for a term of at least two characters.
    /// Callers re-apply the match, so a coarse prefilter is enough.
    async fn search_rows(&self, term: &str) -> Result<Vec<SearchRow>>;

    fn name(&self) -> &'static str;
}
