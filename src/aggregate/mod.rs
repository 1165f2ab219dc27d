// src/aggregate/mod.rs
//! Pure aggregation over row collections handed over by a storage collaborator.
//!
//! Every function here is total: empty input yields an empty result, blank
//! names are skipped, and missing fields count as empty. No I/O.

pub mod keywords;
pub mod movers;
pub mod network;
pub mod periods;
pub mod ranking;
pub mod search;

use serde::{Deserialize, Serialize};

pub use keywords::keyword_frequency;
pub use movers::biggest_movers;
pub use network::{lobbyist_degrees, official_degrees, shared_lobbyists};
pub use periods::{order_periods, PeriodWindow};
pub use ranking::{rank_methods, top_n};
pub use search::{search, search_needle, SearchHit};

/// Entries kept by rankings, movers, centrality and overlap views.
pub const RANKING_LIMIT: usize = 20;
/// Entries kept by the keyword view.
pub const KEYWORD_LIMIT: usize = 30;
/// Records returned by free-text search.
pub const SEARCH_LIMIT: usize = 50;
/// Shorter search terms return nothing.
pub const MIN_SEARCH_LEN: usize = 2;

/// `{name, count, slug}` ranking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub count: u64,
    pub slug: String,
}

/// Entity whose count changed between the previous and latest period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mover {
    pub name: String,
    pub previous: u64,
    pub current: u64,
    pub delta: i64,
    pub slug: String,
}

/// Distinct counterparts of one entity in a period's edge set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeEntry {
    pub name: String,
    pub degree: u64,
    pub slug: String,
}

/// Two officials and the number of lobbyists that contacted both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedNeighbors {
    pub official_a: String,
    pub official_b: String,
    pub shared_lobbyists: u64,
    pub slug_a: String,
    pub slug_b: String,
}
