//! Derived cache statistics.
//!
//! Nothing here is stored alongside the entries. Every value is computed
//! from the live entry set when requested, so it cannot drift.

use serde::Serialize;

/// Counts for one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    /// Number of live entries.
    pub item_count: usize,
    /// Sum of `size_bytes` over live entries.
    pub total_size_bytes: u64,
}

impl TierStats {
    /// Build tier stats from an iterator of entry sizes.
    pub fn from_sizes(sizes: impl IntoIterator<Item = u64>) -> Self {
        sizes
            .into_iter()
            .fold(Self::default(), |acc, size| Self {
                item_count: acc.item_count + 1,
                total_size_bytes: acc.total_size_bytes + size,
            })
    }
}

/// Statistics for the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries in the memory tier.
    pub memory_items: usize,
    /// Entries in the persistent tier.
    pub persistent_items: usize,
    /// Payload bytes held in the memory tier.
    pub memory_size_bytes: u64,
    /// Payload bytes held in the persistent tier.
    pub persistent_size_bytes: u64,
    /// Payload bytes across both tiers. A key present in both tiers is
    /// counted once per tier.
    pub total_size_bytes: u64,
}

impl CacheStats {
    /// Combine per-tier statistics.
    pub fn from_tiers(memory: TierStats, persistent: TierStats) -> Self {
        Self {
            memory_items: memory.item_count,
            persistent_items: persistent.item_count,
            memory_size_bytes: memory.total_size_bytes,
            persistent_size_bytes: persistent.total_size_bytes,
            total_size_bytes: memory.total_size_bytes + persistent.total_size_bytes,
        }
    }

    /// Total entries across both tiers.
    pub fn total_items(&self) -> usize {
        self.memory_items + self.persistent_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_stats_from_sizes() {
        let stats = TierStats::from_sizes([10, 20, 30]);
        assert_eq!(stats.item_count, 3);
        assert_eq!(stats.total_size_bytes, 60);

        assert_eq!(TierStats::from_sizes([]), TierStats::default());
    }

    #[test]
    fn test_cache_stats_from_tiers() {
        let stats = CacheStats::from_tiers(
            TierStats {
                item_count: 3,
                total_size_bytes: 300,
            },
            TierStats {
                item_count: 1,
                total_size_bytes: 100,
            },
        );

        assert_eq!(stats.memory_items, 3);
        assert_eq!(stats.persistent_items, 1);
        assert_eq!(stats.total_items(), 4);
        assert_eq!(stats.total_size_bytes, 400);
    }
}
