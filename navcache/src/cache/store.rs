//! The two-tier cache store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::StoreConfig;
use super::entry::{is_expired, CacheEntry};
use super::memory::MemoryTier;
use super::persistent::PersistentTier;
use super::stats::CacheStats;
use super::types::{CacheError, CacheKey, SetOptions, Tier, TierMode};
use crate::events::{CacheEvent, CacheEventChannel};
use crate::storage::PersistentStorage;

/// Diagnostic view of one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub key: CacheKey,
    pub size_bytes: u64,
    pub in_memory: bool,
    pub in_persistent: bool,
    pub created_at: DateTime<Utc>,
    pub preloaded: bool,
}

struct Tiers {
    memory: MemoryTier,
    persistent: PersistentTier,
}

/// Read-only view of both tiers taken under a single lock.
pub(crate) struct StoreView<'a> {
    tiers: &'a Tiers,
    ttl: Option<Duration>,
    now: DateTime<Utc>,
}

impl StoreView<'_> {
    /// Whether `key` holds a live (unexpired) entry in either tier.
    pub(crate) fn contains(&self, key: &CacheKey) -> bool {
        let in_memory = self
            .tiers
            .memory
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(self.ttl, self.now));
        in_memory
            || self
                .tiers
                .persistent
                .peek(key)
                .is_some_and(|meta| !is_expired(meta.created_at, self.ttl, self.now))
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats::from_tiers(self.tiers.memory.stats(), self.tiers.persistent.stats())
    }
}

/// Two-tier key/value cache: volatile memory in front of persistent storage.
///
/// Reads check memory first, then the persistent tier, promoting persistent
/// hits into memory. Writes go to memory and, unless asked otherwise,
/// through to persistent storage. Every lookup publishes a [`CacheEvent`].
///
/// Values are stored as serialized JSON. Each tier evicts its least
/// recently used entries when a configured item or byte limit is passed.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use navcache::cache::{CacheKey, SetOptions, StoreConfig, TieredCacheStore};
/// use navcache::events::CacheEventChannel;
/// use navcache::storage::MemoryStorage;
///
/// let store = TieredCacheStore::open(
///     StoreConfig::default(),
///     Arc::new(MemoryStorage::new()),
///     CacheEventChannel::new(),
/// )
/// .unwrap();
///
/// let key = CacheKey::new("users:list:page=1");
/// store.set(&key, &vec!["ada", "grace"], SetOptions::default()).unwrap();
///
/// let users: Option<Vec<String>> = store.get(&key);
/// assert_eq!(users.unwrap(), vec!["ada", "grace"]);
/// ```
pub struct TieredCacheStore {
    /// One lock over both tiers, so promotion and write-through are atomic
    /// with respect to other operations.
    tiers: Mutex<Tiers>,
    ttl: Option<Duration>,
    events: CacheEventChannel,
}

impl TieredCacheStore {
    /// Open the store over `storage`, rebuilding the persistent index from
    /// entries already there.
    pub fn open(
        config: StoreConfig,
        storage: Arc<dyn PersistentStorage>,
        events: CacheEventChannel,
    ) -> Result<Self, CacheError> {
        // reads fall back to memory when a persistent write degrades
        if config.memory.max_items == Some(0) {
            return Err(CacheError::InvalidConfig(
                "memory tier must allow at least one item".to_string(),
            ));
        }

        let (persistent, rehydrated) = PersistentTier::open(
            storage,
            config.persistent,
            config.key_prefix,
            config.quota_retry_budget,
        )?;

        info!(
            loaded = rehydrated.loaded,
            skipped = rehydrated.skipped,
            evicted = rehydrated.evicted.len(),
            "Opened tiered cache store"
        );

        let store = Self {
            tiers: Mutex::new(Tiers {
                memory: MemoryTier::new(config.memory),
                persistent,
            }),
            ttl: config.ttl,
            events,
        };
        store.publish(
            rehydrated
                .evicted
                .into_iter()
                .map(|key| CacheEvent::evict(key, Tier::Persistent))
                .collect(),
        );
        Ok(store)
    }

    /// The channel this store publishes on.
    pub fn events(&self) -> &CacheEventChannel {
        &self.events
    }

    /// Look up and decode a value.
    ///
    /// A stored value that does not decode as `T` is treated as a miss and
    /// removed from both tiers.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let (found, mut events) = self.lookup(key);

        let value = found.and_then(|entry| match serde_json::from_slice(entry.payload()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value failed to decode, treating as miss");
                events.retain(|event| !event.is_hit());
                events.extend(self.remove_everywhere(key));
                events.push(CacheEvent::miss(key.clone()));
                None
            }
        });

        self.publish(events);
        value
    }

    /// Look up the serialized payload for `key`.
    pub fn get_raw(&self, key: &CacheKey) -> Option<Bytes> {
        let (found, events) = self.lookup(key);
        self.publish(events);
        found.map(|entry| entry.payload().clone())
    }

    /// Serialize and store a value, replacing any existing entry.
    ///
    /// Fails only when `value` cannot be serialized, in which case nothing
    /// changes. Persistent write failures degrade the entry to memory-only.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        options: SetOptions,
    ) -> Result<(), CacheError> {
        self.set_if(key, value, options, || true).map(|_| ())
    }

    /// Like [`set`](Self::set), but writes only if `admit` returns true.
    ///
    /// `admit` runs while the tiers are locked, so whatever it checks cannot
    /// change between the check and the write. It must not call back into
    /// the store. Returns whether the value was written.
    pub(crate) fn set_if<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        options: SetOptions,
        admit: impl FnOnce() -> bool,
    ) -> Result<bool, CacheError> {
        let payload = serde_json::to_vec(value).map_err(|source| CacheError::Serialization {
            key: key.clone(),
            source,
        })?;
        Ok(self.write(key, Bytes::from(payload), options, admit))
    }

    /// Return the cached value, or fetch, store and return it.
    ///
    /// Fetch errors propagate unchanged. A value that cannot be cached is
    /// still returned.
    pub async fn get_or_fetch<T, F, Fut, E>(&self, key: &CacheKey, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(CacheKey) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = fetch(key.clone()).await?;
        if let Err(e) = self.set(key, &value, SetOptions::default()) {
            warn!(key = %key, error = %e, "Fetched value not cached");
        }
        Ok(value)
    }

    /// Remove `key` from both tiers. Returns true if anything was removed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let events = self.remove_everywhere(key);
        let removed = !events.is_empty();
        self.publish(events);
        removed
    }

    /// Remove every entry from both tiers. Returns the number of entries
    /// removed, counting each tier separately.
    pub fn clear(&self) -> usize {
        let events: Vec<CacheEvent> = {
            let mut tiers = self.tiers.lock();
            let memory = tiers.memory.clear();
            let persistent = tiers.persistent.clear();
            memory
                .into_iter()
                .map(|key| CacheEvent::evict(key, Tier::Memory))
                .chain(
                    persistent
                        .into_iter()
                        .map(|key| CacheEvent::evict(key, Tier::Persistent)),
                )
                .collect()
        };
        let removed = events.len();
        info!(removed, "Cleared cache");
        self.publish(events);
        removed
    }

    /// Whether `key` has a live entry in either tier.
    ///
    /// Does not affect recency and publishes nothing.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.with_view(|view| view.contains(key))
    }

    /// Statistics computed over the entries currently stored.
    pub fn stats(&self) -> CacheStats {
        self.with_view(|view| view.stats())
    }

    /// All keys present in either tier, sorted.
    pub fn keys(&self) -> Vec<CacheKey> {
        let tiers = self.tiers.lock();
        let mut keys = tiers.memory.keys();
        keys.extend(tiers.persistent.keys());
        keys.sort();
        keys.dedup();
        keys
    }

    /// Diagnostic details for `key`, without touching recency.
    pub fn entry_info(&self, key: &CacheKey) -> Option<EntryInfo> {
        let tiers = self.tiers.lock();
        let memory = tiers.memory.peek(key);
        let persistent = tiers.persistent.peek(key);

        match (memory, persistent) {
            (Some(entry), _) => Some(EntryInfo {
                key: key.clone(),
                size_bytes: entry.size_bytes(),
                in_memory: true,
                in_persistent: persistent.is_some(),
                created_at: entry.created_at(),
                preloaded: entry.preloaded(),
            }),
            (None, Some(meta)) => Some(EntryInfo {
                key: key.clone(),
                size_bytes: meta.size_bytes,
                in_memory: false,
                in_persistent: true,
                created_at: meta.created_at,
                preloaded: meta.preloaded,
            }),
            (None, None) => None,
        }
    }

    /// Run `f` against both tiers under one lock acquisition.
    pub(crate) fn with_view<R>(&self, f: impl FnOnce(&StoreView<'_>) -> R) -> R {
        let tiers = self.tiers.lock();
        f(&StoreView {
            tiers: &tiers,
            ttl: self.ttl,
            now: Utc::now(),
        })
    }

    /// Find `key`, promoting persistent hits and dropping expired entries.
    ///
    /// Returns the events to publish once the lock is released.
    fn lookup(&self, key: &CacheKey) -> (Option<CacheEntry>, Vec<CacheEvent>) {
        let now = Utc::now();
        let mut events = Vec::new();
        let mut tiers = self.tiers.lock();

        if let Some(entry) = tiers.memory.get(key).cloned() {
            if !entry.is_expired(self.ttl, now) {
                events.push(CacheEvent::hit(key.clone(), Tier::Memory));
                return (Some(entry), events);
            }
            tiers.memory.remove(key);
            events.push(CacheEvent::evict(key.clone(), Tier::Memory));
        }

        let expired = tiers
            .persistent
            .peek(key)
            .map(|meta| is_expired(meta.created_at, self.ttl, now));
        match expired {
            Some(true) => {
                tiers.persistent.remove(key);
                events.push(CacheEvent::evict(key.clone(), Tier::Persistent));
            }
            Some(false) => {
                if let Some(entry) = tiers.persistent.get(key) {
                    for victim in tiers.memory.insert(entry.in_tier(Tier::Memory)) {
                        events.push(CacheEvent::evict(victim.key().clone(), Tier::Memory));
                    }
                    events.push(CacheEvent::hit(key.clone(), Tier::Persistent));
                    return (Some(entry), events);
                }
            }
            None => {}
        }

        events.push(CacheEvent::miss(key.clone()));
        (None, events)
    }

    fn write(
        &self,
        key: &CacheKey,
        payload: Bytes,
        options: SetOptions,
        admit: impl FnOnce() -> bool,
    ) -> bool {
        let entry = CacheEntry::new(
            key.clone(),
            payload,
            Tier::Memory,
            Utc::now(),
            options.preloaded,
        );
        let mut events = Vec::new();

        {
            let mut tiers = self.tiers.lock();
            if !admit() {
                return false;
            }
            for victim in tiers.memory.insert(entry.clone()) {
                events.push(CacheEvent::evict(victim.key().clone(), Tier::Memory));
            }

            match options.tier {
                TierMode::MemoryOnly => {
                    tiers.persistent.remove(key);
                }
                TierMode::Both => {
                    let outcome = tiers.persistent.insert(&entry.in_tier(Tier::Persistent));
                    events.extend(
                        outcome
                            .evicted
                            .into_iter()
                            .map(|victim| CacheEvent::evict(victim, Tier::Persistent)),
                    );
                    if let Some(failure) = outcome.failure {
                        warn!(
                            key = %key,
                            attempts = failure.attempts,
                            error = %failure.source,
                            "Persistent write failed, entry kept in memory only"
                        );
                    }
                }
            }
        }

        debug!(
            key = %key,
            size = entry.size_bytes(),
            preloaded = options.preloaded,
            "Cached entry"
        );
        self.publish(events);
        true
    }

    fn remove_everywhere(&self, key: &CacheKey) -> Vec<CacheEvent> {
        let mut tiers = self.tiers.lock();
        let mut events = Vec::new();
        if tiers.memory.remove(key).is_some() {
            events.push(CacheEvent::evict(key.clone(), Tier::Memory));
        }
        if tiers.persistent.remove(key).is_some() {
            events.push(CacheEvent::evict(key.clone(), Tier::Persistent));
        }
        events
    }

    fn publish(&self, events: Vec<CacheEvent>) {
        for event in &events {
            if let CacheEvent::Evict { key, tier } = event {
                debug!(key = %key, tier = %tier, "Evicted cache entry");
            }
            self.events.publish(event);
        }
    }
}
