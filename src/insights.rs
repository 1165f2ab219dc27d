// src/insights.rs
//! Composite insights request.
//!
//! [`InsightsQuery::run`] is a plain producer: it resolves the period window,
//! fans out to the source for the row sets each view needs and hands them to
//! the aggregators. [`InsightsService`] wraps it in the shared [`CacheStore`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::histogram;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::{
    biggest_movers, keyword_frequency, lobbyist_degrees, official_degrees, rank_methods, search,
    search_needle, shared_lobbyists, top_n, DegreeEntry, Mover, PeriodWindow, RankedEntry,
    SearchHit, SharedNeighbors, KEYWORD_LIMIT, RANKING_LIMIT, SEARCH_LIMIT,
};
use crate::cache::{build_key, CacheStore, Lookup};
use crate::model::{ActivityRow, EdgeRow, KeywordRow, NameCountRow};
use crate::source::InsightsSource;

pub const INSIGHTS_KEY_PREFIX: &str = "insights";

/// Every view plus echo-back metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub generated_at: DateTime<Utc>,
    pub latest_period: Option<String>,
    pub previous_period: Option<String>,
    pub search_term: Option<String>,
    #[serde(default)]
    pub top_officials: Vec<RankedEntry>,
    #[serde(default)]
    pub top_lobbyists: Vec<RankedEntry>,
    #[serde(default)]
    pub top_methods: Vec<RankedEntry>,
    #[serde(default)]
    pub official_movers: Vec<Mover>,
    #[serde(default)]
    pub lobbyist_movers: Vec<Mover>,
    #[serde(default)]
    pub official_centrality: Vec<DegreeEntry>,
    #[serde(default)]
    pub lobbyist_centrality: Vec<DegreeEntry>,
    #[serde(default)]
    pub shared_lobbyists: Vec<SharedNeighbors>,
    #[serde(default)]
    pub keywords: Vec<RankedEntry>,
    #[serde(default)]
    pub search_results: Vec<SearchHit>,
}

impl InsightsResponse {
    /// Response with metadata only and every view empty.
    pub fn empty(search_term: Option<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            latest_period: None,
            previous_period: None,
            search_term,
            top_officials: Vec::new(),
            top_lobbyists: Vec::new(),
            top_methods: Vec::new(),
            official_movers: Vec::new(),
            lobbyist_movers: Vec::new(),
            official_centrality: Vec::new(),
            lobbyist_centrality: Vec::new(),
            shared_lobbyists: Vec::new(),
            keywords: Vec::new(),
            search_results: Vec::new(),
        }
    }
}

/// Row sets for the latest period.
struct LatestRows {
    officials: Vec<NameCountRow>,
    lobbyists: Vec<NameCountRow>,
    edges: Vec<EdgeRow>,
    keywords: Vec<KeywordRow>,
    activities: Vec<ActivityRow>,
}

/// Counts for the previous period; only the movers need them.
struct PreviousRows {
    officials: Vec<NameCountRow>,
    lobbyists: Vec<NameCountRow>,
}

async fn latest_rows<S>(source: &S, period: &str) -> Result<LatestRows>
where
    S: InsightsSource + ?Sized,
{
    let (officials, lobbyists, edges, keywords, activities) = tokio::try_join!(
        async {
            source
                .official_counts(period)
                .await
                .context("official counts")
        },
        async {
            source
                .lobbyist_counts(period)
                .await
                .context("lobbyist counts")
        },
        async { source.contact_edges(period).await.context("contact edges") },
        async { source.keyword_rows(period).await.context("keyword rows") },
        async { source.activity_rows(period).await.context("activity rows") },
    )?;
    Ok(LatestRows {
        officials,
        lobbyists,
        edges,
        keywords,
        activities,
    })
}

async fn previous_rows<S>(source: &S, period: &str) -> Result<PreviousRows>
where
    S: InsightsSource + ?Sized,
{
    let (officials, lobbyists) = tokio::try_join!(
        async {
            source
                .official_counts(period)
                .await
                .context("previous official counts")
        },
        async {
            source
                .lobbyist_counts(period)
                .await
                .context("previous lobbyist counts")
        },
    )?;
    Ok(PreviousRows {
        officials,
        lobbyists,
    })
}

/// Trimmed term, or `None` when blank.
fn clean_term(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub struct InsightsQuery;

impl InsightsQuery {
    /// Build the composite response.
    ///
    /// Any source failure fails the whole request; no partial response is built.
    pub async fn run<S>(source: &S, search_term: Option<&str>) -> Result<InsightsResponse>
    where
        S: InsightsSource + ?Sized,
    {
        let started = Instant::now();
        let term = clean_term(search_term);

        let period_rows = source
            .period_rows()
            .await
            .with_context(|| format!("{}: loading periods", source.name()))?;
        let window = PeriodWindow::from_rows(&period_rows);
        debug!(
            target: "insights",
            source = source.name(),
            latest = ?window.latest,
            previous = ?window.previous,
            "resolved period window"
        );

        // Short terms never reach the source.
        let searchable = term.as_deref().filter(|t| search_needle(t).is_some());

        let (latest, previous, search_rows) = tokio::try_join!(
            async {
                match window.latest.as_deref() {
                    Some(p) => latest_rows(source, p).await.map(Some),
                    None => Ok(None),
                }
            },
            async {
                match window.previous.as_deref() {
                    Some(p) => previous_rows(source, p).await.map(Some),
                    None => Ok(None),
                }
            },
            async {
                match searchable {
                    Some(t) => source.search_rows(t).await.context("search rows"),
                    None => Ok(Vec::new()),
                }
            },
        )
        .with_context(|| format!("{}: fetching insight rows", source.name()))?;

        let mut out = InsightsResponse::empty(term.clone());
        out.latest_period = window.latest.clone();
        out.previous_period = window.previous.clone();

        if let Some(latest) = &latest {
            out.top_officials = top_n(&latest.officials, RANKING_LIMIT);
            out.top_lobbyists = top_n(&latest.lobbyists, RANKING_LIMIT);
            out.top_methods = rank_methods(&latest.activities, RANKING_LIMIT);
            out.official_centrality = official_degrees(&latest.edges, RANKING_LIMIT);
            out.lobbyist_centrality = lobbyist_degrees(&latest.edges, RANKING_LIMIT);
            out.shared_lobbyists = shared_lobbyists(&latest.edges, RANKING_LIMIT);
            out.keywords = keyword_frequency(&latest.keywords, KEYWORD_LIMIT);

            // A single period has nothing to move against.
            if let Some(previous) = &previous {
                out.official_movers =
                    biggest_movers(&latest.officials, &previous.officials, RANKING_LIMIT);
                out.lobbyist_movers =
                    biggest_movers(&latest.lobbyists, &previous.lobbyists, RANKING_LIMIT);
            }
        }

        if let Some(t) = searchable {
            out.search_results = search(t, &search_rows, SEARCH_LIMIT);
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("insights_compute_ms").record(elapsed_ms);
        debug!(
            target: "insights",
            elapsed_ms,
            term_len = term.as_deref().map_or(0, str::len),
            officials = out.top_officials.len(),
            hits = out.search_results.len(),
            "insights computed"
        );
        Ok(out)
    }
}

/// Cached entry point shared by every request handler.
#[derive(Clone)]
pub struct InsightsService {
    source: Arc<dyn InsightsSource>,
    cache: CacheStore<InsightsResponse>,
    ttl: Duration,
}

impl InsightsService {
    pub fn new(
        source: Arc<dyn InsightsSource>,
        cache: CacheStore<InsightsResponse>,
        ttl: Duration,
    ) -> Self {
        Self { source, cache, ttl }
    }

    /// `insights:searchTerm=<term>`; a blank or absent term renders empty.
    pub fn cache_key(search_term: Option<&str>) -> String {
        build_key(INSIGHTS_KEY_PREFIX, [("searchTerm", clean_term(search_term))])
    }

    pub fn cache(&self) -> &CacheStore<InsightsResponse> {
        &self.cache
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached composite response. Concurrent identical requests share one run.
    pub async fn get(&self, search_term: Option<&str>) -> Result<Lookup<InsightsResponse>> {
        let key = Self::cache_key(search_term);
        let source = Arc::clone(&self.source);
        let term = clean_term(search_term);
        let lookup = self
            .cache
            .get_or_set(&key, self.ttl, move || async move {
                InsightsQuery::run(source.as_ref(), term.as_deref()).await
            })
            .await?;
        Ok(lookup)
    }

    /// Like [`get`](Self::get) but gives up waiting after `timeout`.
    ///
    /// `Ok(None)` means the caller timed out. The producer keeps running and
    /// its result still lands in the cache for the next caller.
    pub async fn get_with_timeout(
        &self,
        search_term: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<Lookup<InsightsResponse>>> {
        match tokio::time::timeout(timeout, self.get(search_term)).await {
            Ok(res) => res.map(Some),
            Err(_) => {
                warn!(
                    target: "insights",
                    timeout_ms = timeout.as_millis() as u64,
                    "insights request timed out; producer left running"
                );
                Ok(None)
            }
        }
    }

    /// Bypass the cache entirely.
    pub async fn compute(&self, search_term: Option<&str>) -> Result<InsightsResponse> {
        InsightsQuery::run(self.source.as_ref(), search_term).await
    }
}
