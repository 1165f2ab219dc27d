// tests/cache_coalescing.rs
//
// Concurrency behaviour of the shared store: one producer per key, shared
// outcomes, caller timeouts, and eviction of in-flight entries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use lobby_insights::{CacheError, CacheStatus, CacheStore};
use tokio::sync::Notify;

const TTL: Duration = Duration::from_secs(60);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_run_one_producer() {
    let store: CacheStore<String> = CacheStore::new(10);
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks = (0..16).map(|_| {
        let store = store.clone();
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
            store
                .get_or_set("insights:searchTerm=", TTL, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok("composite".to_string())
                })
                .await
        })
    });

    let results = join_all(tasks).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let mut misses = 0;
    for r in results {
        let lookup = r.expect("task").expect("value");
        assert_eq!(lookup.value, "composite");
        if lookup.status == CacheStatus::Miss {
            misses += 1;
        }
    }
    assert_eq!(misses, 1);

    let hit = store
        .get_or_set("insights:searchTerm=", TTL, || async { Ok("other".to_string()) })
        .await
        .unwrap();
    assert_eq!(hit.status, CacheStatus::Hit);
    assert_eq!(hit.value, "composite");
}

// Every waiter is registered before the producer is released, so exactly
// one call starts it and the rest report joining it.
#[tokio::test]
async fn joined_waiters_report_coalesced() {
    let store: CacheStore<u32> = CacheStore::new(10);
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let mut waiters: Vec<_> = (0..8)
        .map(|_| {
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            Box::pin(store.get_or_set("k", TTL, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Ok(5)
            }))
        })
        .collect();

    for waiter in waiters.iter_mut() {
        assert!(futures::poll!(waiter.as_mut()).is_pending());
    }
    assert_eq!(store.len(), 1);

    gate.notify_one();
    let lookups: Vec<_> = join_all(waiters)
        .await
        .into_iter()
        .map(|r| r.expect("value"))
        .collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(lookups.iter().all(|l| l.value == 5));
    let misses = lookups.iter().filter(|l| l.status == CacheStatus::Miss).count();
    let coalesced = lookups
        .iter()
        .filter(|l| l.status == CacheStatus::Coalesced)
        .count();
    assert_eq!((misses, coalesced), (1, 7));
    assert_eq!(lookups[0].status, CacheStatus::Miss);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failure_reaches_every_waiter_and_is_not_cached() {
    let store: CacheStore<u32> = CacheStore::new(10);
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks = (0..8).map(|_| {
        let store = store.clone();
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
            store
                .get_or_set("k", TTL, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err::<u32, _>(anyhow::anyhow!("storage unreachable"))
                })
                .await
        })
    });

    for r in join_all(tasks).await {
        let err = r.expect("task").unwrap_err();
        assert!(matches!(err, CacheError::Producer(_)));
        assert!(err.to_string().contains("storage unreachable"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.is_empty());

    // Next caller retries.
    let ok = store.get_or_set("k", TTL, || async { Ok(7) }).await.unwrap();
    assert_eq!(ok.status, CacheStatus::Miss);
    assert_eq!(ok.value, 7);
}

#[tokio::test]
async fn caller_timeout_does_not_cancel_producer() {
    let store: CacheStore<u32> = CacheStore::new(10);

    let slow = store.get_or_set("k", TTL, || async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(42)
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(5), slow).await;
    assert!(timed_out.is_err());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.read("k"), Some(42));
}

#[tokio::test]
async fn overflow_evicts_oldest_created() {
    let store: CacheStore<u32> = CacheStore::new(3);
    for (i, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
        let v = i as u32;
        store.get_or_set(key, TTL, move || async move { Ok(v) }).await.unwrap();
    }
    assert_eq!(store.len(), 3);
    assert_eq!(store.read("a"), None);
    assert_eq!(store.read("d"), Some(3));
}

// Pending entries are eviction candidates too. An evicted producer still
// answers its own waiters but cannot overwrite the entry that replaced it.
#[tokio::test]
async fn evicted_pending_producer_does_not_overwrite_newer_entry() {
    let store: CacheStore<u32> = CacheStore::new(2);
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let first = {
        let store = store.clone();
        let calls = Arc::clone(&calls);
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            store
                .get_or_set("slow", TTL, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    gate.notified().await;
                    Ok(1)
                })
                .await
        })
    };
    while store.is_empty() {
        tokio::task::yield_now().await;
    }

    store.write("a", 10, TTL);
    store.write("b", 20, TTL);
    assert_eq!(store.len(), 2);
    assert_eq!(store.read("slow"), None);

    let second = {
        let calls = Arc::clone(&calls);
        store
            .get_or_set("slow", TTL, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await
            .unwrap()
    };
    assert_eq!(second.status, CacheStatus::Miss);
    assert_eq!(second.value, 2);

    gate.notify_one();
    let first = first.await.expect("task").expect("value");
    assert_eq!(first.value, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.read("slow"), Some(2));
}
