// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fields;
pub mod insights;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod source;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::cache::{build_key, CacheStatus, CacheStore, Lookup};
pub use crate::error::CacheError;
pub use crate::insights::{InsightsQuery, InsightsResponse, InsightsService};
pub use crate::source::{json::JsonSource, InsightsSource};
