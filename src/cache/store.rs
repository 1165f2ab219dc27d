// src/cache/store.rs
//! Process-wide memo store.
//!
//! Entry states: pending (a producer task is running), fresh (value set and
//! unexpired), or absent. At most one producer per key is in flight while its
//! entry is resident.
//!
//! Producers run in their own tokio task. A caller that stops waiting (dropped
//! future, caller-side timeout) never cancels the producer, and the task
//! settles the entry itself. Eviction is oldest-created-first and does not
//! special-case pending entries: when the store is oversubscribed a pending
//! entry can be evicted, after which a new caller starts a second producer and
//! the first one's result is returned to its waiters but not stored.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;
use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::CacheError;

type SharedResult<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

/// How a lookup was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Fresh entry, producer not invoked.
    Hit,
    /// Joined a producer started by another caller.
    Coalesced,
    /// This call started the producer.
    Miss,
}

impl CacheStatus {
    /// Diagnostics header value; coalesced lookups count as hits.
    pub fn as_header(self) -> &'static str {
        match self {
            CacheStatus::Hit | CacheStatus::Coalesced => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Value returned by [`CacheStore::get_or_set`].
#[derive(Debug, Clone)]
pub struct Lookup<V> {
    pub value: V,
    pub status: CacheStatus,
}

impl<V> Lookup<V> {
    pub fn is_hit(&self) -> bool {
        !matches!(self.status, CacheStatus::Miss)
    }
}

enum Slot<V> {
    Pending(SharedResult<V>),
    /// `expires_at == None` means the TTL overflowed `Instant`; never expires.
    Ready {
        value: V,
        expires_at: Option<Instant>,
    },
}

struct Entry<V> {
    slot: Slot<V>,
    created_at: Instant,
    /// Distinguishes successive entries under the same key.
    generation: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    next_generation: u64,
}

impl<V> Inner<V> {
    fn next_generation(&mut self) -> u64 {
        let g = self.next_generation;
        self.next_generation += 1;
        g
    }
}

enum Found<V> {
    Fresh(V),
    Pending(SharedResult<V>),
    Missing,
}

/// Thread-safe memo store; clones share the same entries.
pub struct CacheStore<V> {
    inner: Arc<Mutex<Inner<V>>>,
    max_entries: usize,
}

impl<V> Clone for CacheStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            max_entries: self.max_entries,
        }
    }
}

fn lock<V>(m: &Mutex<Inner<V>>) -> MutexGuard<'_, Inner<V>> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn expiry(now: Instant, ttl: Duration) -> Option<Instant> {
    now.checked_add(ttl)
}

fn is_live(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.map_or(true, |t| now < t)
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Store holding at most `max_entries` entries (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                next_generation: 0,
            })),
            max_entries: max_entries.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Number of resident entries, including pending and not-yet-collected expired ones.
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the fresh value for `key`, or run `producer` once and cache its result.
    ///
    /// Concurrent callers for the same key share one producer run and observe the
    /// same success value or failure. Failures are not cached.
    ///
    /// `producer` is called while the store's lock is held; it should only
    /// construct the future and leave the work to the future itself.
    pub async fn get_or_set<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<Lookup<V>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let (pending, status) = {
            let mut inner = lock(&self.inner);
            let now = Instant::now();
            let found = match inner.entries.get(key).map(|e| &e.slot) {
                Some(Slot::Ready { value, expires_at }) if is_live(*expires_at, now) => {
                    Found::Fresh(value.clone())
                }
                Some(Slot::Pending(shared)) => Found::Pending(shared.clone()),
                _ => Found::Missing,
            };

            match found {
                Found::Fresh(value) => {
                    counter!("insights_cache_hits_total").increment(1);
                    trace!(target: "cache", key, "hit");
                    return Ok(Lookup {
                        value,
                        status: CacheStatus::Hit,
                    });
                }
                Found::Pending(shared) => {
                    counter!("insights_cache_coalesced_total").increment(1);
                    trace!(target: "cache", key, "joined in-flight producer");
                    (shared, CacheStatus::Coalesced)
                }
                Found::Missing => {
                    counter!("insights_cache_misses_total").increment(1);
                    debug!(
                        target: "cache",
                        key,
                        ttl_ms = ttl.as_millis() as u64,
                        "miss; starting producer"
                    );
                    let shared = self.start(&mut inner, key, ttl, producer());
                    (shared, CacheStatus::Miss)
                }
            }
        };

        let value = pending.await?;
        Ok(Lookup { value, status })
    }

    /// Non-blocking read of a fresh value. Expired entries found here are dropped.
    pub fn read(&self, key: &str) -> Option<V> {
        let mut inner = lock(&self.inner);
        let now = Instant::now();
        match inner.entries.get(key).map(|e| &e.slot) {
            Some(Slot::Ready { value, expires_at }) => {
                if is_live(*expires_at, now) {
                    return Some(value.clone());
                }
            }
            _ => return None,
        }
        inner.entries.remove(key);
        trace!(target: "cache", key, "expired entry collected on read");
        None
    }

    /// Unconditional upsert with a fresh TTL window.
    ///
    /// A producer still running for `key` keeps serving its own waiters but will
    /// not overwrite this value.
    pub fn write(&self, key: &str, value: V, ttl: Duration) {
        let mut inner = lock(&self.inner);
        let now = Instant::now();
        let generation = inner.next_generation();
        inner.entries.insert(
            key.to_string(),
            Entry {
                slot: Slot::Ready {
                    value,
                    expires_at: expiry(now, ttl),
                },
                created_at: now,
                generation,
            },
        );
        self.evict(&mut inner);
    }

    /// Remove `key` regardless of state. Returns whether an entry existed.
    pub fn invalidate(&self, key: &str) -> bool {
        lock(&self.inner).entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        lock(&self.inner).entries.clear();
    }

    fn start<Fut>(
        &self,
        inner: &mut Inner<V>,
        key: &str,
        ttl: Duration,
        fut: Fut,
    ) -> SharedResult<V>
    where
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let generation = inner.next_generation();
        let store = Arc::clone(&self.inner);
        let owned_key = key.to_string();

        let handle = tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(CacheError::producer(err)),
                Err(_) => Err(CacheError::Aborted("producer panicked".to_string())),
            };
            settle(&store, &owned_key, generation, ttl, outcome)
        });

        let shared = handle
            .map(|joined| joined.unwrap_or_else(|e| Err(CacheError::Aborted(e.to_string()))))
            .boxed()
            .shared();

        inner.entries.insert(
            key.to_string(),
            Entry {
                slot: Slot::Pending(shared.clone()),
                created_at: Instant::now(),
                generation,
            },
        );
        self.evict(inner);
        shared
    }

    /// Drop oldest-created entries until within capacity. Ties go by insertion order.
    fn evict(&self, inner: &mut Inner<V>) {
        let len = inner.entries.len();
        if len <= self.max_entries {
            return;
        }
        let excess = len - self.max_entries;

        let mut by_age: Vec<(Instant, u64, String)> = inner
            .entries
            .iter()
            .map(|(k, e)| (e.created_at, e.generation, k.clone()))
            .collect();
        by_age.sort();

        for (_, _, key) in by_age.into_iter().take(excess) {
            inner.entries.remove(&key);
            debug!(target: "cache", key = key.as_str(), "evicted");
        }
        counter!("insights_cache_evictions_total").increment(excess as u64);
    }
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + DeserializeOwned + 'static,
{
    /// Load a precomputed JSON snapshot into `key`. The file's shape is trusted.
    pub fn preload_json(&self, key: &str, path: &Path, ttl: Duration) -> anyhow::Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading cache snapshot from {}", path.display()))?;
        let value: V = serde_json::from_str(&raw)
            .with_context(|| format!("parsing cache snapshot {}", path.display()))?;
        self.write(key, value, ttl);
        debug!(target: "cache", key, path = %path.display(), "snapshot preloaded");
        Ok(())
    }
}

/// Store or discard the producer's outcome, but only if the entry is still ours.
fn settle<V: Clone>(
    store: &Mutex<Inner<V>>,
    key: &str,
    generation: u64,
    ttl: Duration,
    outcome: Result<V, CacheError>,
) -> Result<V, CacheError> {
    let mut inner = lock(store);
    let owned = inner
        .entries
        .get(key)
        .is_some_and(|e| e.generation == generation);

    if !owned {
        debug!(target: "cache", key, "producer settled after its entry was replaced or evicted");
        return outcome;
    }

    match &outcome {
        Ok(value) => {
            // The TTL window starts at settle time; age for eviction stays at creation.
            let now = Instant::now();
            if let Some(entry) = inner.entries.get_mut(key) {
                entry.slot = Slot::Ready {
                    value: value.clone(),
                    expires_at: expiry(now, ttl),
                };
            }
        }
        Err(err) => {
            inner.entries.remove(key);
            counter!("insights_cache_producer_errors_total").increment(1);
            debug!(target: "cache", key, error = %err, "producer failed; entry removed");
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let store = CacheStore::<u32>::new(8);
        let first = store
            .get_or_set("k", ms(1_000), || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(first.status, CacheStatus::Miss);
        assert!(!first.is_hit());

        let second = store
            .get_or_set("k", ms(1_000), || async { Ok(99) })
            .await
            .unwrap();
        assert_eq!(second.value, 7);
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.status.as_header(), "HIT");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_write_is_absent_on_next_read() {
        let store = CacheStore::<u32>::new(8);
        store.write("k", 1, Duration::ZERO);
        assert_eq!(store.read("k"), None);
        assert_eq!(store.len(), 0, "expired entry is collected by the read");
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expiry_triggers_recompute() {
        let store = CacheStore::<u32>::new(8);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let c = Arc::clone(&calls);
            store
                .get_or_set("k", ms(50), move || async move {
                    Ok(c.fetch_add(1, Ordering::SeqCst) as u32)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(ms(51)).await;
        let c = Arc::clone(&calls);
        let again = store
            .get_or_set("k", ms(50), move || async move {
                Ok(c.fetch_add(1, Ordering::SeqCst) as u32)
            })
            .await
            .unwrap();
        assert_eq!(again.status, CacheStatus::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let store = CacheStore::<u32>::new(8);
        let err = store
            .get_or_set("k", ms(1_000), || async { Err(anyhow::anyhow!("upstream down")) })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("upstream down"));
        assert!(store.is_empty());

        let ok = store
            .get_or_set("k", ms(1_000), || async { Ok(3) })
            .await
            .unwrap();
        assert_eq!(ok.value, 3);
        assert_eq!(ok.status, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn panicking_producer_is_aborted_and_removed() {
        let store = CacheStore::<u32>::new(8);
        let err = store
            .get_or_set("k", ms(1_000), || async {
                let fail = true;
                if fail {
                    panic!("boom");
                }
                Ok(0)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Aborted(_)));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn write_overflow_evicts_oldest() {
        let store = CacheStore::<u32>::new(3);
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            store.write(k, i as u32, ms(10_000));
            tokio::time::advance(ms(1)).await;
        }
        assert_eq!(store.len(), 3);
        assert_eq!(store.read("a"), None);
        assert_eq!(store.read("d"), Some(3));
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let store = CacheStore::<u32>::new(4);
        store.write("a", 1, ms(10_000));
        store.write("b", 2, ms(10_000));
        assert!(store.invalidate("a"));
        assert!(!store.invalidate("a"));
        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn settled_entry_keeps_its_creation_time() {
        let store = CacheStore::<u32>::new(2);
        let gate = Arc::new(tokio::sync::Notify::new());

        let slow = {
            let store = store.clone();
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                store
                    .get_or_set("slow", ms(10_000), move || async move {
                        gate.notified().await;
                        Ok(1)
                    })
                    .await
            })
        };
        while store.is_empty() {
            tokio::task::yield_now().await;
        }

        tokio::time::advance(ms(5)).await;
        store.write("a", 2, ms(10_000));
        tokio::time::advance(ms(5)).await;
        gate.notify_one();
        assert_eq!(slow.await.unwrap().unwrap().value, 1);
        assert_eq!(store.read("slow"), Some(1));

        // "slow" was created before "a", so it goes first.
        tokio::time::advance(ms(5)).await;
        store.write("b", 3, ms(10_000));
        assert_eq!(store.read("slow"), None);
        assert_eq!(store.read("a"), Some(2));
        assert_eq!(store.read("b"), Some(3));
    }

    #[tokio::test]
    async fn preload_json_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, r#"["Anne Murphy", "Brian Kelly"]"#).unwrap();

        let store = CacheStore::<Vec<String>>::new(4);
        store
            .preload_json("insights:searchTerm=", &path, ms(10_000))
            .unwrap();
        assert_eq!(
            store.read("insights:searchTerm="),
            Some(vec!["Anne Murphy".to_string(), "Brian Kelly".to_string()])
        );

        let hit = store
            .get_or_set("insights:searchTerm=", ms(10_000), || async {
                Ok(Vec::new())
            })
            .await
            .unwrap();
        assert_eq!(hit.status, CacheStatus::Hit);
        assert_eq!(hit.value.len(), 2);
    }

    #[tokio::test]
    async fn preload_json_rejects_malformed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken_snapshot.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = CacheStore::<Vec<String>>::new(4);
        let err = store
            .preload_json("insights:searchTerm=", &path, ms(10_000))
            .unwrap_err();
        assert!(format!("{err:#}").contains("broken_snapshot.json"));
        assert!(store.is_empty());

        let missing = dir.path().join("absent.json");
        assert!(store.preload_json("k", &missing, ms(10_000)).is_err());
        assert!(store.is_empty());
    }
}
