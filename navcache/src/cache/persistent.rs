//! Persistent tier: an LRU index over a [`PersistentStorage`] backend.
//!
//! Each entry is written as a JSON envelope holding its metadata and the
//! raw payload:
//!
//! ```text
//! {"created_at":"2026-01-05T10:00:00Z","preloaded":true,"payload":{"id":7}}
//! ```
//!
//! The index is rebuilt from the backend on open, oldest entries first, so
//! entries survive restarts the way browser storage survives a reload.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;
use tracing::{debug, warn};

use super::config::TierLimits;
use super::entry::CacheEntry;
use super::stats::TierStats;
use super::types::{CacheKey, Tier};
use crate::storage::{PersistentStorage, StorageError};

/// A write to the persistent tier that could not be completed.
///
/// Never surfaced to callers of the store: the entry stays in memory only
/// and the condition is logged.
#[derive(Debug, Error)]
#[error("Persistent write of '{key}' failed after {attempts} eviction(s): {source}")]
pub struct StorageQuotaError {
    pub key: CacheKey,
    /// Evictions attempted before giving up.
    pub attempts: usize,
    #[source]
    pub source: StorageError,
}

/// Index metadata for one persisted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntryMeta {
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub preloaded: bool,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    created_at: DateTime<Utc>,
    preloaded: bool,
    payload: &'a RawValue,
}

#[derive(Deserialize)]
struct Envelope {
    created_at: DateTime<Utc>,
    preloaded: bool,
    payload: Box<RawValue>,
}

fn encode(entry: &CacheEntry) -> Result<Vec<u8>, StorageError> {
    let payload: &RawValue =
        serde_json::from_slice(entry.payload()).map_err(|e| StorageError::Io(e.into()))?;
    serde_json::to_vec(&EnvelopeRef {
        created_at: entry.created_at(),
        preloaded: entry.preloaded(),
        payload,
    })
    .map_err(|e| StorageError::Io(e.into()))
}

fn decode(key: CacheKey, bytes: &[u8]) -> Result<CacheEntry, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    Ok(CacheEntry::new(
        key,
        Bytes::copy_from_slice(envelope.payload.get().as_bytes()),
        Tier::Persistent,
        envelope.created_at,
        envelope.preloaded,
    ))
}

/// Result of a persistent write.
#[derive(Debug, Default)]
pub(crate) struct PersistOutcome {
    /// Keys evicted to make room, whether or not the write succeeded.
    pub evicted: Vec<CacheKey>,
    /// Set when the entry could not be persisted.
    pub failure: Option<StorageQuotaError>,
}

/// Counts from rebuilding the index on open.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Rehydrated {
    pub loaded: usize,
    /// Undecodable envelopes, removed from the backend.
    pub skipped: usize,
    /// Entries dropped because the tier was over its limits.
    pub evicted: Vec<CacheKey>,
}

pub(crate) struct PersistentTier {
    storage: Arc<dyn PersistentStorage>,
    index: LruCache<CacheKey, EntryMeta>,
    limits: TierLimits,
    prefix: String,
    retry_budget: usize,
    size_bytes: u64,
}

impl PersistentTier {
    /// Open the tier, rebuilding the index from entries already in `storage`.
    pub(crate) fn open(
        storage: Arc<dyn PersistentStorage>,
        limits: TierLimits,
        prefix: impl Into<String>,
        retry_budget: usize,
    ) -> Result<(Self, Rehydrated), StorageError> {
        let mut tier = Self {
            storage,
            index: LruCache::unbounded(),
            limits,
            prefix: prefix.into(),
            retry_budget,
            size_bytes: 0,
        };
        let mut report = Rehydrated::default();

        let mut found = Vec::new();
        for storage_key in tier.storage.keys()? {
            let Some(key) = storage_key.strip_prefix(&tier.prefix) else {
                continue;
            };
            let key = CacheKey::new(key);
            let Some(bytes) = tier.storage.get_item(&storage_key)? else {
                continue;
            };
            match decode(key.clone(), &bytes) {
                Ok(entry) => found.push((
                    key,
                    EntryMeta {
                        size_bytes: entry.size_bytes(),
                        created_at: entry.created_at(),
                        preloaded: entry.preloaded(),
                    },
                )),
                Err(e) => {
                    warn!(key = %key, error = %e, "Removing undecodable persistent entry");
                    tier.storage.remove_item(&storage_key)?;
                    report.skipped += 1;
                }
            }
        }

        // oldest first so the newest end up most recently used
        found.sort_by(|(ka, a), (kb, b)| {
            a.created_at.cmp(&b.created_at).then_with(|| ka.cmp(kb))
        });
        report.loaded = found.len();
        for (key, meta) in found {
            tier.size_bytes += meta.size_bytes;
            tier.index.push(key, meta);
        }
        report.evicted = tier.enforce_limits(None);
        report.loaded -= report.evicted.len();

        Ok((tier, report))
    }

    fn storage_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Metadata for `key` without touching recency.
    pub(crate) fn peek(&self, key: &CacheKey) -> Option<&EntryMeta> {
        self.index.peek(key)
    }

    /// Read an entry, marking it most recently used.
    ///
    /// An entry missing from the backend or failing to decode is dropped
    /// from the index and reported as absent.
    pub(crate) fn get(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.index.get(key)?;

        let storage_key = self.storage_key(key);
        let bytes = match self.storage.get_item(&storage_key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %key, "Persistent entry vanished from storage");
                self.forget(key);
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read persistent entry");
                return None;
            }
        };

        match decode(key.clone(), &bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping undecodable persistent entry");
                self.remove(key);
                None
            }
        }
    }

    /// Persist `entry`, evicting least recently used entries on quota
    /// pressure and to stay within the tier limits.
    pub(crate) fn insert(&mut self, entry: &CacheEntry) -> PersistOutcome {
        let key = entry.key();
        let mut outcome = PersistOutcome::default();

        if self.limits.rejects(entry.size_bytes()) {
            outcome.failure = Some(StorageQuotaError {
                key: key.clone(),
                attempts: 0,
                source: StorageError::QuotaExceeded {
                    required: entry.size_bytes(),
                    available: self.limits.max_bytes.unwrap_or(0),
                },
            });
            self.remove(key);
            return outcome;
        }

        let bytes = match encode(entry) {
            Ok(bytes) => bytes,
            Err(source) => {
                outcome.failure = Some(StorageQuotaError {
                    key: key.clone(),
                    attempts: 0,
                    source,
                });
                self.remove(key);
                return outcome;
            }
        };

        let storage_key = self.storage_key(key);
        let mut attempts = 0;
        loop {
            let err = match self.storage.set_item(&storage_key, &bytes) {
                Ok(()) => break,
                Err(err) => err,
            };
            let victim = if err.is_quota_exceeded() && attempts < self.retry_budget {
                self.pop_lru_except(key)
            } else {
                None
            };
            match victim {
                Some(victim) => {
                    attempts += 1;
                    debug!(
                        key = %key,
                        victim = %victim,
                        attempts,
                        "Evicted persistent entry to free quota"
                    );
                    outcome.evicted.push(victim);
                }
                None => {
                    outcome.failure = Some(StorageQuotaError {
                        key: key.clone(),
                        attempts,
                        source: err,
                    });
                    // the old value must not outlive the newer in-memory one
                    self.remove(key);
                    return outcome;
                }
            }
        }

        let meta = EntryMeta {
            size_bytes: entry.size_bytes(),
            created_at: entry.created_at(),
            preloaded: entry.preloaded(),
        };
        self.size_bytes += meta.size_bytes;
        if let Some((_, old)) = self.index.push(key.clone(), meta) {
            self.size_bytes -= old.size_bytes;
        }
        outcome.evicted.extend(self.enforce_limits(Some(key)));
        outcome
    }

    /// Remove `key` from the index and the backend.
    pub(crate) fn remove(&mut self, key: &CacheKey) -> Option<EntryMeta> {
        let meta = self.forget(key)?;
        if let Err(e) = self.storage.remove_item(&self.storage_key(key)) {
            warn!(key = %key, error = %e, "Failed to remove persistent entry");
        }
        Some(meta)
    }

    /// Remove every entry, returning the removed keys.
    pub(crate) fn clear(&mut self) -> Vec<CacheKey> {
        let keys = self.keys();
        for key in &keys {
            self.remove(key);
        }
        keys
    }

    /// Keys from most to least recently used.
    pub(crate) fn keys(&self) -> Vec<CacheKey> {
        self.index.iter().map(|(key, _)| key.clone()).collect()
    }

    pub(crate) fn stats(&self) -> TierStats {
        TierStats::from_sizes(self.index.iter().map(|(_, meta)| meta.size_bytes))
    }

    fn forget(&mut self, key: &CacheKey) -> Option<EntryMeta> {
        let meta = self.index.pop(key)?;
        self.size_bytes -= meta.size_bytes;
        Some(meta)
    }

    /// Evict the least recently used entry other than `keep`.
    fn pop_lru_except(&mut self, keep: &CacheKey) -> Option<CacheKey> {
        let victim = self
            .index
            .iter()
            .rev()
            .map(|(key, _)| key)
            .find(|key| *key != keep)?
            .clone();
        self.remove(&victim);
        Some(victim)
    }

    fn enforce_limits(&mut self, keep: Option<&CacheKey>) -> Vec<CacheKey> {
        let mut evicted = Vec::new();
        while self.index.len() > 1 && self.limits.exceeded_by(self.index.len(), self.size_bytes) {
            let victim = match keep {
                Some(keep) => self.pop_lru_except(keep),
                None => {
                    let lru = self.index.peek_lru().map(|(key, _)| key.clone());
                    if let Some(key) = &lru {
                        self.remove(key);
                    }
                    lru
                }
            };
            let Some(victim) = victim else {
                break;
            };
            debug!(key = %victim, "Evicted persistent entry over tier limit");
            evicted.push(victim);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn entry(key: &str, json: &str) -> CacheEntry {
        CacheEntry::new(
            CacheKey::new(key),
            Bytes::copy_from_slice(json.as_bytes()),
            Tier::Memory,
            Utc::now(),
            false,
        )
    }

    fn open(storage: Arc<MemoryStorage>, limits: TierLimits) -> PersistentTier {
        PersistentTier::open(storage, limits, "nc:", 4).unwrap().0
    }

    #[test]
    fn test_envelope_layout() {
        let e = entry("users", r#"{"id":7}"#);
        let bytes = encode(&e).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["payload"]["id"], 7);
        assert_eq!(value["preloaded"], false);
        assert!(value["created_at"].is_string());
    }

    #[test]
    fn test_decode_preserves_payload_bytes() {
        let e = entry("k", r#"{"a": [1, 2,3]}"#);
        let decoded = decode(CacheKey::new("k"), &encode(&e).unwrap()).unwrap();

        assert_eq!(decoded.payload(), e.payload());
        assert_eq!(decoded.size_bytes(), e.size_bytes());
        assert_eq!(decoded.tier(), Tier::Persistent);
    }

    #[test]
    fn test_insert_and_get() {
        let storage = Arc::new(MemoryStorage::new());
        let mut tier = open(Arc::clone(&storage), TierLimits::unbounded());

        let outcome = tier.insert(&entry("a", "[1]"));
        assert!(outcome.failure.is_none());
        assert!(storage.get_item("nc:a").unwrap().is_some());

        let got = tier.get(&CacheKey::new("a")).unwrap();
        assert_eq!(got.payload().as_ref(), b"[1]");
    }

    #[test]
    fn test_item_limit_evicts_lru() {
        let storage = Arc::new(MemoryStorage::new());
        let mut tier = open(Arc::clone(&storage), TierLimits::items(2));

        tier.insert(&entry("a", "1"));
        tier.insert(&entry("b", "2"));
        let outcome = tier.insert(&entry("c", "3"));

        assert_eq!(outcome.evicted, vec![CacheKey::new("a")]);
        assert!(storage.get_item("nc:a").unwrap().is_none());
        assert_eq!(tier.stats().item_count, 2);
    }

    #[test]
    fn test_quota_pressure_evicts_then_succeeds() {
        // each envelope is well over 40 bytes, so the quota fits two
        let storage = Arc::new(MemoryStorage::with_quota(200));
        let mut tier = open(Arc::clone(&storage), TierLimits::unbounded());

        tier.insert(&entry("a", "1"));
        tier.insert(&entry("b", "2"));
        let outcome = tier.insert(&entry("c", "3"));

        assert!(outcome.failure.is_none());
        assert!(!outcome.evicted.is_empty());
        assert_eq!(outcome.evicted[0], CacheKey::new("a"));
        assert!(tier.peek(&CacheKey::new("c")).is_some());
    }

    #[test]
    fn test_quota_failure_drops_stale_copy() {
        let storage = Arc::new(MemoryStorage::with_quota(100));
        let mut tier = open(Arc::clone(&storage), TierLimits::unbounded());

        tier.insert(&entry("k", "1"));
        let big = format!("\"{}\"", "x".repeat(200));
        let outcome = tier.insert(&entry("k", &big));

        let failure = outcome.failure.unwrap();
        assert_eq!(failure.key, CacheKey::new("k"));
        assert!(failure.source.is_quota_exceeded());
        assert!(tier.peek(&CacheKey::new("k")).is_none());
        assert!(storage.get_item("nc:k").unwrap().is_none());
    }

    #[test]
    fn test_oversize_entry_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let mut tier = open(Arc::clone(&storage), TierLimits::bytes(4));

        let outcome = tier.insert(&entry("k", "123456"));
        assert!(outcome.failure.is_some());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_reopen_rebuilds_index_in_age_order() {
        let storage = Arc::new(MemoryStorage::new());
        let base = Utc::now() - chrono::Duration::seconds(60);
        {
            let mut tier = open(Arc::clone(&storage), TierLimits::unbounded());
            for (i, key) in ["old", "mid", "new"].iter().enumerate() {
                let e = CacheEntry::new(
                    CacheKey::new(*key),
                    Bytes::from_static(b"1"),
                    Tier::Memory,
                    base + chrono::Duration::seconds(i as i64),
                    i == 2,
                );
                tier.insert(&e);
            }
        }
        storage.set_item("other-app:key", b"untouched").unwrap();

        let (mut tier, report) =
            PersistentTier::open(storage.clone(), TierLimits::items(2), "nc:", 4).unwrap();

        assert_eq!(report.loaded, 2);
        assert_eq!(report.evicted, vec![CacheKey::new("old")]);
        assert!(tier.peek(&CacheKey::new("new")).unwrap().preloaded);
        assert!(tier.get(&CacheKey::new("mid")).is_some());
        assert!(storage.get_item("other-app:key").unwrap().is_some());
    }

    #[test]
    fn test_reopen_skips_undecodable() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("nc:broken", b"not json").unwrap();

        let (tier, report) =
            PersistentTier::open(storage.clone(), TierLimits::unbounded(), "nc:", 4).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(tier.stats().item_count, 0);
        assert!(storage.get_item("nc:broken").unwrap().is_none());
    }

    #[test]
    fn test_vanished_entry_is_forgotten() {
        let storage = Arc::new(MemoryStorage::new());
        let mut tier = open(Arc::clone(&storage), TierLimits::unbounded());
        tier.insert(&entry("k", "1"));

        storage.remove_item("nc:k").unwrap();
        assert!(tier.get(&CacheKey::new("k")).is_none());
        assert_eq!(tier.stats(), TierStats::default());
    }

    #[test]
    fn test_clear() {
        let storage = Arc::new(MemoryStorage::new());
        let mut tier = open(Arc::clone(&storage), TierLimits::unbounded());
        tier.insert(&entry("a", "1"));
        tier.insert(&entry("b", "2"));

        let mut removed = tier.clear();
        removed.sort();
        assert_eq!(removed, vec![CacheKey::new("a"), CacheKey::new("b")]);
        assert!(storage.is_empty());
    }
}
