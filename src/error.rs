// src/error.rs
use std::sync::Arc;

use thiserror::Error;

/// Failure observed by every caller waiting on the same cache key.
///
/// Cloneable so a single producer failure can be handed to all coalesced waiters.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("producer failed: {0:#}")]
    Producer(Arc<anyhow::Error>),

    #[error("producer aborted: {0}")]
    Aborted(String),
}

impl CacheError {
    pub fn producer(err: anyhow::Error) -> Self {
        CacheError::Producer(Arc::new(err))
    }
}
