//! Memory tier: access-ordered LRU over immutable entries.

use lru::LruCache;

use super::config::TierLimits;
use super::entry::CacheEntry;
use super::stats::TierStats;
use super::types::CacheKey;

/// Volatile tier holding entries in recency order.
///
/// Not synchronized on its own; the store guards it.
pub(crate) struct MemoryTier {
    entries: LruCache<CacheKey, CacheEntry>,
    limits: TierLimits,
    /// Sum of `size_bytes` over `entries`, kept for the eviction loop.
    size_bytes: u64,
}

impl MemoryTier {
    pub(crate) fn new(limits: TierLimits) -> Self {
        Self {
            entries: LruCache::unbounded(),
            limits,
            size_bytes: 0,
        }
    }

    /// Look up an entry and mark it most recently used.
    pub(crate) fn get(&mut self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Look up an entry without touching recency.
    pub(crate) fn peek(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.peek(key)
    }

    /// Insert or replace an entry, then evict least recently used entries
    /// until the tier is back within its limits.
    ///
    /// The entry just written is never evicted, even when it alone exceeds
    /// a limit. Returns the evicted entries, oldest first.
    pub(crate) fn insert(&mut self, entry: CacheEntry) -> Vec<CacheEntry> {
        self.size_bytes += entry.size_bytes();
        if let Some((_, old)) = self.entries.push(entry.key().clone(), entry) {
            self.size_bytes -= old.size_bytes();
        }

        let mut evicted = Vec::new();
        while self.entries.len() > 1 && self.limits.exceeded_by(self.entries.len(), self.size_bytes)
        {
            let Some((_, victim)) = self.entries.pop_lru() else {
                break;
            };
            self.size_bytes -= victim.size_bytes();
            evicted.push(victim);
        }
        evicted
    }

    pub(crate) fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let removed = self.entries.pop(key)?;
        self.size_bytes -= removed.size_bytes();
        Some(removed)
    }

    /// Remove everything, returning the removed keys.
    pub(crate) fn clear(&mut self) -> Vec<CacheKey> {
        let keys = self.keys();
        self.entries.clear();
        self.size_bytes = 0;
        keys
    }

    /// Keys from most to least recently used.
    pub(crate) fn keys(&self) -> Vec<CacheKey> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Statistics computed from the live entries.
    pub(crate) fn stats(&self) -> TierStats {
        TierStats::from_sizes(self.entries.iter().map(|(_, entry)| entry.size_bytes()))
    }
}
