//! In-flight fetch coalescing for the preloader.
//!
//! When overlapping schedules ask for the same key, only the first issues
//! a fetch. Later requests subscribe to the leader's outcome.
//!
//! ```text
//! schedule A ─┐
//!             ├──► FetchCoalescer ──► one fetch ──► store
//! schedule B ─┘          ▲                  │
//!                        └── outcome ◄──────┘
//! ```

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::cache::CacheKey;

/// How a leader's fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    /// Fetched and stored.
    Loaded,
    /// Fetched, but the preload set was reset meanwhile.
    Discarded,
    /// Fetch or store failed.
    Failed(String),
}

/// Result of registering interest in a key.
pub(crate) enum Registration<'a> {
    /// The caller must fetch and then complete the guard.
    Leader(LeaderGuard<'a>),
    /// Another fetch is running; await its outcome.
    Waiter(broadcast::Receiver<FetchOutcome>),
    /// The key is already cached and nothing is in flight.
    Present,
}

/// Tracks keys with a fetch in flight.
#[derive(Default)]
pub(crate) struct FetchCoalescer {
    in_flight: DashMap<CacheKey, broadcast::Sender<FetchOutcome>>,
}

impl FetchCoalescer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register interest in `key`.
    ///
    /// `is_present` is consulted only when no fetch is in flight, while the
    /// key's slot is locked. A leader stores its value before completing, so
    /// a registration always sees either the running fetch or its result.
    pub(crate) fn register(
        &self,
        key: &CacheKey,
        is_present: impl FnOnce(&CacheKey) -> bool,
    ) -> Registration<'_> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!(key = %key, "Coalescing preload with in-flight fetch");
                Registration::Waiter(entry.get().subscribe())
            }
            Entry::Vacant(entry) => {
                if is_present(key) {
                    return Registration::Present;
                }
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                Registration::Leader(LeaderGuard {
                    coalescer: self,
                    key: key.clone(),
                    sender: Some(tx),
                })
            }
        }
    }

    /// Number of keys with a fetch in flight.
    pub(crate) fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Held by the task that owns a key's fetch.
///
/// Dropping the guard without completing (e.g. the fetch future was
/// cancelled) releases the key; waiters then see a closed channel.
pub(crate) struct LeaderGuard<'a> {
    coalescer: &'a FetchCoalescer,
    key: CacheKey,
    sender: Option<broadcast::Sender<FetchOutcome>>,
}

impl LeaderGuard<'_> {
    /// Release the key and hand `outcome` to all waiters.
    pub(crate) fn complete(mut self, outcome: FetchOutcome) {
        self.coalescer.in_flight.remove(&self.key);
        if let Some(tx) = self.sender.take() {
            let waiters = tx.receiver_count();
            // no receivers is fine
            let _ = tx.send(outcome);
            if waiters > 0 {
                debug!(key = %self.key, waiters, "Broadcast preload outcome");
            }
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.sender.take().is_some() {
            self.coalescer.in_flight.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CacheKey {
        CacheKey::new(s)
    }

    #[tokio::test]
    async fn test_second_registration_waits_for_leader() {
        let coalescer = FetchCoalescer::new();

        let Registration::Leader(guard) = coalescer.register(&key("a"), |_| false) else {
            panic!("expected leader");
        };
        let Registration::Waiter(mut rx) = coalescer.register(&key("a"), |_| false) else {
            panic!("expected waiter");
        };
        assert_eq!(coalescer.in_flight_count(), 1);

        guard.complete(FetchOutcome::Loaded);
        assert_eq!(rx.recv().await.unwrap(), FetchOutcome::Loaded);
        assert_eq!(coalescer.in_flight_count(), 0);
    }

    #[test]
    fn test_present_key_needs_no_fetch() {
        let coalescer = FetchCoalescer::new();
        assert!(matches!(
            coalescer.register(&key("a"), |_| true),
            Registration::Present
        ));
        assert_eq!(coalescer.in_flight_count(), 0);
    }

    #[test]
    fn test_presence_not_checked_while_in_flight() {
        let coalescer = FetchCoalescer::new();
        let _leader = coalescer.register(&key("a"), |_| false);

        let registration = coalescer.register(&key("a"), |_| panic!("checked presence"));
        assert!(matches!(registration, Registration::Waiter(_)));
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_key() {
        let coalescer = FetchCoalescer::new();
        let leader = coalescer.register(&key("a"), |_| false);
        let Registration::Waiter(mut rx) = coalescer.register(&key("a"), |_| false) else {
            panic!("expected waiter");
        };

        drop(leader);
        assert!(rx.recv().await.is_err());
        assert!(matches!(
            coalescer.register(&key("a"), |_| false),
            Registration::Leader(_)
        ));
    }
}
