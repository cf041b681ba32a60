//! Anticipatory fetching into the tiered cache.

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::coalesce::{FetchCoalescer, FetchOutcome, Registration};
use super::error::FetchError;
use super::record::{PreloadRecord, PreloadStats, RecordBook};
use crate::cache::{CacheKey, CacheStats, SetOptions, TieredCacheStore};
use crate::config::DEFAULT_MAX_CONCURRENT_FETCHES;
use crate::events::CacheEvent;

/// Per-key result of a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    /// Fetched and stored by this schedule.
    pub loaded: Vec<CacheKey>,
    /// Already cached, nothing fetched.
    pub skipped: Vec<CacheKey>,
    /// Another schedule's fetch was already in flight and was awaited.
    pub coalesced: Vec<CacheKey>,
    /// Fetched after a reset; the result was dropped.
    pub discarded: Vec<CacheKey>,
    /// Fetch or store failed, with the reason.
    pub failed: Vec<(CacheKey, String)>,
}

impl PreloadReport {
    /// Total keys accounted for.
    pub fn total(&self) -> usize {
        self.loaded.len()
            + self.skipped.len()
            + self.coalesced.len()
            + self.discarded.len()
            + self.failed.len()
    }
}

enum KeyResult {
    Loaded,
    Skipped,
    Coalesced,
    Discarded,
    Failed(String),
}

/// Schedules fetches of likely navigation targets into the store.
///
/// Keys already cached are skipped. Overlapping schedules share in-flight
/// fetches, so each key is fetched at most once at a time. Stored values
/// are marked as preloaded and recorded until they leave the cache or the
/// preload set is [`reset`](Self::reset).
pub struct Preloader {
    store: Arc<TieredCacheStore>,
    records: Mutex<RecordBook>,
    coalescer: FetchCoalescer,
    max_concurrent_fetches: usize,
}

impl Preloader {
    /// Create a preloader running at most `max_concurrent_fetches` fetches
    /// per schedule (at least one).
    pub fn new(store: Arc<TieredCacheStore>, max_concurrent_fetches: usize) -> Self {
        Self {
            store,
            records: Mutex::new(RecordBook::default()),
            coalescer: FetchCoalescer::new(),
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    /// Create a preloader with the default concurrency.
    pub fn with_defaults(store: Arc<TieredCacheStore>) -> Self {
        Self::new(store, DEFAULT_MAX_CONCURRENT_FETCHES)
    }

    pub fn store(&self) -> &Arc<TieredCacheStore> {
        &self.store
    }

    /// Fetch every key not already cached and store the results.
    ///
    /// Duplicate keys are fetched once. A failing key is logged and
    /// reported; it never stops the rest of the schedule.
    pub async fn schedule<I, K, F, Fut, T, E>(&self, keys: I, fetch: F) -> PreloadReport
    where
        I: IntoIterator<Item = K>,
        K: Into<CacheKey>,
        F: Fn(CacheKey) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let mut seen = HashSet::new();
        let keys: Vec<CacheKey> = keys
            .into_iter()
            .map(Into::into)
            .filter(|key: &CacheKey| seen.insert(key.clone()))
            .collect();
        let requested = keys.len();
        let fetch = &fetch;

        let results: Vec<(CacheKey, KeyResult)> = stream::iter(keys)
            .map(|key| async move {
                let result = self.preload_one(&key, fetch).await;
                (key, result)
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        let mut report = PreloadReport::default();
        for (key, result) in results {
            match result {
                KeyResult::Loaded => report.loaded.push(key),
                KeyResult::Skipped => report.skipped.push(key),
                KeyResult::Coalesced => report.coalesced.push(key),
                KeyResult::Discarded => report.discarded.push(key),
                KeyResult::Failed(reason) => report.failed.push((key, reason)),
            }
        }

        info!(
            requested,
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            coalesced = report.coalesced.len(),
            discarded = report.discarded.len(),
            failed = report.failed.len(),
            "Preload schedule finished"
        );
        report
    }

    async fn preload_one<F, Fut, T, E>(&self, key: &CacheKey, fetch: &F) -> KeyResult
    where
        F: Fn(CacheKey) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let guard = match self.coalescer.register(key, |k| self.store.contains(k)) {
            Registration::Present => return KeyResult::Skipped,
            Registration::Waiter(mut rx) => {
                return match rx.recv().await {
                    Ok(FetchOutcome::Failed(reason)) => KeyResult::Failed(reason),
                    Ok(_) => KeyResult::Coalesced,
                    Err(_) => KeyResult::Failed("in-flight fetch was abandoned".to_string()),
                };
            }
            Registration::Leader(guard) => guard,
        };

        let ticket = self.records.lock().open(key, Utc::now());
        debug!(key = %key, "Preload fetch issued");

        let outcome = match fetch(key.clone()).await {
            Ok(value) => self.store_fetched(key, ticket, &value),
            Err(e) => {
                let err = FetchError::new(key.clone(), e.to_string());
                warn!(key = %key, error = %err, "Preload fetch failed");
                self.records.lock().abandon(key, ticket);
                FetchOutcome::Failed(err.message)
            }
        };

        guard.complete(outcome.clone());
        match outcome {
            FetchOutcome::Loaded => KeyResult::Loaded,
            FetchOutcome::Discarded => KeyResult::Discarded,
            FetchOutcome::Failed(reason) => KeyResult::Failed(reason),
        }
    }

    fn store_fetched<T: Serialize>(&self, key: &CacheKey, ticket: u64, value: &T) -> FetchOutcome {
        let admitted = self.store.set_if(key, value, SetOptions::preloaded(), || {
            self.records.lock().finish(key, ticket)
        });

        match admitted {
            Ok(true) => {
                self.store.events().publish(&CacheEvent::preload(key.clone()));
                FetchOutcome::Loaded
            }
            Ok(false) => {
                debug!(key = %key, "Preload set was reset, discarding fetched value");
                FetchOutcome::Discarded
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to store preloaded value");
                self.records.lock().abandon(key, ticket);
                FetchOutcome::Failed(e.to_string())
            }
        }
    }

    /// Preloaded keys still present in the cache, in request order.
    ///
    /// Records of keys that have since left the cache are pruned.
    pub fn get_preload_stats(&self) -> PreloadStats {
        self.combined_stats().1
    }

    /// Store and preload statistics read under one store lock.
    pub(crate) fn combined_stats(&self) -> (CacheStats, PreloadStats) {
        self.store.with_view(|view| {
            let preload = self.records.lock().prune_and_report(view);
            (view.stats(), preload)
        })
    }

    /// Records for preloaded keys, in request order. Not pruned.
    pub fn records(&self) -> Vec<PreloadRecord> {
        self.records.lock().records()
    }

    /// Forget every preload record. Fetches still in flight have their
    /// results discarded.
    pub fn reset(&self) {
        let cleared = self.records.lock().clear();
        info!(cleared, "Preload records reset");
    }

    /// Number of keys with a fetch in flight.
    pub fn in_flight_count(&self) -> usize {
        self.coalescer.in_flight_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StoreConfig;
    use crate::events::CacheEventChannel;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn preloader() -> Preloader {
        let store = TieredCacheStore::open(
            StoreConfig::default(),
            Arc::new(MemoryStorage::new()),
            CacheEventChannel::new(),
        )
        .unwrap();
        Preloader::new(Arc::new(store), 2)
    }

    #[tokio::test]
    async fn test_schedule_loads_and_records() {
        let preloader = preloader();

        let report = preloader
            .schedule(["users", "orders"], |key| async move {
                Ok::<_, String>(format!("value of {}", key))
            })
            .await;

        assert_eq!(report.loaded, vec![CacheKey::new("users"), CacheKey::new("orders")]);
        let stats = preloader.get_preload_stats();
        assert_eq!(stats.preloaded_count, 2);
        assert_eq!(
            stats.preloaded_keys,
            vec![CacheKey::new("users"), CacheKey::new("orders")]
        );
        assert_eq!(
            preloader.store().get::<String>(&CacheKey::new("users")).as_deref(),
            Some("value of users")
        );
    }

    #[tokio::test]
    async fn test_present_key_is_not_fetched() {
        let preloader = preloader();
        let key = CacheKey::new("users");
        preloader
            .store()
            .set(&key, "cached", SetOptions::default())
            .unwrap();
        let before = preloader.store().stats();

        let calls = AtomicUsize::new(0);
        let report = preloader
            .schedule([key.clone()], |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>("fresh") }
            })
            .await;

        assert_eq!(report.skipped, vec![key.clone()]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(preloader.store().stats(), before);
        assert_eq!(preloader.get_preload_stats().preloaded_count, 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_siblings() {
        let preloader = preloader();

        let report = preloader
            .schedule(["ok-1", "bad", "ok-2"], |key| async move {
                if key.as_str() == "bad" {
                    Err("503 Service Unavailable")
                } else {
                    Ok(1)
                }
            })
            .await;

        assert_eq!(report.loaded.len(), 2);
        assert_eq!(
            report.failed,
            vec![(CacheKey::new("bad"), "503 Service Unavailable".to_string())]
        );
        assert!(!preloader.store().contains(&CacheKey::new("bad")));
        assert_eq!(preloader.get_preload_stats().preloaded_count, 2);
    }

    #[tokio::test]
    async fn test_duplicate_keys_fetched_once() {
        let preloader = preloader();
        let calls = AtomicUsize::new(0);

        let report = preloader
            .schedule(["a", "a", "b", "a"], |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>(0) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.total(), 2);
    }

    #[tokio::test]
    async fn test_evicted_records_are_pruned() {
        let preloader = preloader();
        preloader
            .schedule(["a", "b"], |_| async { Ok::<_, String>(1) })
            .await;

        preloader.store().invalidate(&CacheKey::new("a"));
        let stats = preloader.get_preload_stats();
        assert_eq!(stats.preloaded_keys, vec![CacheKey::new("b")]);
        assert_eq!(preloader.records().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_records_but_not_cache() {
        let preloader = preloader();
        preloader
            .schedule(["a"], |_| async { Ok::<_, String>(1) })
            .await;

        preloader.reset();
        assert_eq!(preloader.get_preload_stats(), PreloadStats::default());
        assert!(preloader.store().contains(&CacheKey::new("a")));
    }

    #[tokio::test]
    async fn test_preload_event_published() {
        let preloader = preloader();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = preloader
            .store()
            .events()
            .subscribe(move |event| sink.lock().push(event.clone()));

        preloader
            .schedule(["a"], |_| async { Ok::<_, String>(1) })
            .await;

        assert_eq!(*seen.lock(), vec![CacheEvent::preload("a")]);
    }
}
