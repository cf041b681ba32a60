//! Immutable cache entries.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::types::{CacheKey, Tier};

/// A stored value together with its bookkeeping.
///
/// Entries are immutable: an update replaces the entry, so `size_bytes`
/// always matches the payload it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    key: CacheKey,
    payload: Bytes,
    size_bytes: u64,
    tier: Tier,
    created_at: DateTime<Utc>,
    preloaded: bool,
}

impl CacheEntry {
    /// Create an entry from an already serialized payload.
    pub fn new(
        key: CacheKey,
        payload: Bytes,
        tier: Tier,
        created_at: DateTime<Utc>,
        preloaded: bool,
    ) -> Self {
        let size_bytes = payload.len() as u64;
        Self {
            key,
            payload,
            size_bytes,
            tier,
            created_at,
            preloaded,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Serialized (JSON) payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Byte length of the serialized payload.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn preloaded(&self) -> bool {
        self.preloaded
    }

    /// Copy of this entry placed in another tier.
    pub(crate) fn in_tier(&self, tier: Tier) -> Self {
        Self {
            tier,
            ..self.clone()
        }
    }

    pub(crate) fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        is_expired(self.created_at, ttl, now)
    }
}

/// Whether something created at `created_at` has outlived `ttl`.
///
/// Timestamps in the future (clock skew) never count as expired.
pub(crate) fn is_expired(
    created_at: DateTime<Utc>,
    ttl: Option<Duration>,
    now: DateTime<Utc>,
) -> bool {
    let Some(ttl) = ttl else {
        return false;
    };
    (now - created_at)
        .to_std()
        .map(|age| age >= ttl)
        .unwrap_or(false)
}
