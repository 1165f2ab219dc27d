// src/cache/mod.rs
//! In-process memoization for expensive insight computations.
//!
//! - `key`: deterministic cache keys from a prefix and named parameters.
//! - `store`: TTL entries, per-key coalescing of in-flight producers, and
//!   bounded size with oldest-first eviction.

pub mod key;
pub mod store;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub use key::{build_key, KeyParam};
pub use store::{CacheStatus, CacheStore, Lookup};

/// One-time metrics registration (so series show up on /metrics).
///
/// Descriptions go to the recorder installed at call time, so this runs
/// after the Prometheus recorder is installed.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "insights_cache_hits_total",
            "Lookups served from a fresh cache entry."
        );
        describe_counter!(
            "insights_cache_coalesced_total",
            "Lookups that joined an in-flight producer."
        );
        describe_counter!(
            "insights_cache_misses_total",
            "Lookups that started a producer."
        );
        describe_counter!(
            "insights_cache_evictions_total",
            "Entries removed to stay within capacity."
        );
        describe_counter!(
            "insights_cache_producer_errors_total",
            "Producers that failed; failures are never cached."
        );
        describe_histogram!(
            "insights_compute_ms",
            "Time to assemble one insights response in milliseconds."
        );
    });
}
