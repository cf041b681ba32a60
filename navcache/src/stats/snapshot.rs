//! Point-in-time cache summary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheKey, CacheStats};
use crate::preload::PreloadStats;

/// Store and preload statistics taken in one consistent read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub memory_items: usize,
    pub persistent_items: usize,
    /// Payload bytes across both tiers.
    pub total_size_bytes: u64,
    pub preloaded_count: usize,
    /// Preloaded keys still cached, in request order.
    pub preloaded_keys: Vec<CacheKey>,
    pub taken_at: DateTime<Utc>,
}

impl StatsSnapshot {
    pub fn new(cache: CacheStats, preload: PreloadStats, taken_at: DateTime<Utc>) -> Self {
        Self {
            memory_items: cache.memory_items,
            persistent_items: cache.persistent_items,
            total_size_bytes: cache.total_size_bytes,
            preloaded_count: preload.preloaded_count,
            preloaded_keys: preload.preloaded_keys,
            taken_at,
        }
    }

    /// Snapshot of an empty cache.
    pub fn empty() -> Self {
        Self::new(CacheStats::default(), PreloadStats::default(), Utc::now())
    }

    /// Entries across both tiers. A key cached in both counts twice.
    pub fn total_items(&self) -> usize {
        self.memory_items + self.persistent_items
    }

    /// Share of cached entries that came from preloading, as a rounded
    /// percentage. 0 for an empty cache.
    pub fn efficiency(&self) -> u32 {
        let total = self.total_items();
        if total == 0 {
            return 0;
        }
        (self.preloaded_count as f64 / total as f64 * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(memory: usize, persistent: usize, preloaded: usize) -> StatsSnapshot {
        StatsSnapshot {
            memory_items: memory,
            persistent_items: persistent,
            total_size_bytes: 0,
            preloaded_count: preloaded,
            preloaded_keys: Vec::new(),
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn test_efficiency() {
        assert_eq!(snapshot(3, 1, 2).efficiency(), 50);
        assert_eq!(snapshot(0, 0, 0).efficiency(), 0);
        assert_eq!(snapshot(2, 1, 1).efficiency(), 33);
        assert_eq!(snapshot(2, 1, 2).efficiency(), 67);
        assert_eq!(snapshot(4, 4, 8).efficiency(), 100);
    }

    #[test]
    fn test_new_copies_fields() {
        let cache = CacheStats {
            memory_items: 2,
            persistent_items: 1,
            memory_size_bytes: 10,
            persistent_size_bytes: 5,
            total_size_bytes: 15,
        };
        let preload = PreloadStats {
            preloaded_count: 1,
            preloaded_keys: vec![CacheKey::new("a")],
        };

        let snap = StatsSnapshot::new(cache, preload, Utc::now());
        assert_eq!(snap.total_items(), 3);
        assert_eq!(snap.total_size_bytes, 15);
        assert_eq!(snap.preloaded_keys, vec![CacheKey::new("a")]);
    }

    #[test]
    fn test_serializes_keys_as_strings() {
        let mut snap = snapshot(1, 0, 1);
        snap.preloaded_keys = vec![CacheKey::new("users")];
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["preloaded_keys"][0], "users");
    }
}
