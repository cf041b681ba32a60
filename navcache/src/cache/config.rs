//! Configuration types for the tiered cache store.

use std::time::Duration;

use crate::config::{
    DEFAULT_KEY_PREFIX, DEFAULT_MEMORY_MAX_ITEMS, DEFAULT_MEMORY_MAX_SIZE,
    DEFAULT_PERSISTENT_MAX_ITEMS, DEFAULT_PERSISTENT_MAX_SIZE, DEFAULT_QUOTA_RETRY_BUDGET,
};

/// Capacity limits for a single tier.
///
/// Either limit may be absent. With both absent the tier is unbounded
/// (the persistent tier is still bounded by its storage quota).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    /// Maximum number of entries.
    pub max_items: Option<usize>,
    /// Maximum total payload size in bytes.
    pub max_bytes: Option<u64>,
}

impl TierLimits {
    /// Limits with both an item cap and a byte cap.
    pub fn new(max_items: usize, max_bytes: u64) -> Self {
        Self {
            max_items: Some(max_items),
            max_bytes: Some(max_bytes),
        }
    }

    /// No limits.
    pub fn unbounded() -> Self {
        Self {
            max_items: None,
            max_bytes: None,
        }
    }

    /// Limit on item count only.
    pub fn items(max_items: usize) -> Self {
        Self {
            max_items: Some(max_items),
            max_bytes: None,
        }
    }

    /// Limit on total bytes only.
    pub fn bytes(max_bytes: u64) -> Self {
        Self {
            max_items: None,
            max_bytes: Some(max_bytes),
        }
    }

    /// True when a tier holding `items` entries totalling `bytes` is over a limit.
    pub(crate) fn exceeded_by(&self, items: usize, bytes: u64) -> bool {
        self.max_items.is_some_and(|max| items > max)
            || self.max_bytes.is_some_and(|max| bytes > max)
    }

    /// True when a single payload of `bytes` could never fit.
    pub(crate) fn rejects(&self, bytes: u64) -> bool {
        self.max_items == Some(0) || self.max_bytes.is_some_and(|max| bytes > max)
    }
}

/// Configuration for a [`TieredCacheStore`](super::TieredCacheStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Memory tier limits.
    pub memory: TierLimits,
    /// Persistent tier limits.
    pub persistent: TierLimits,
    /// Optional time-to-live. `None` means entries only leave by eviction
    /// or invalidation.
    pub ttl: Option<Duration>,
    /// Number of evictions attempted after a quota failure before the
    /// write degrades to memory-only.
    pub quota_retry_budget: usize,
    /// Prefix for keys in the persistent storage namespace.
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            memory: TierLimits::new(DEFAULT_MEMORY_MAX_ITEMS, DEFAULT_MEMORY_MAX_SIZE as u64),
            persistent: TierLimits::new(
                DEFAULT_PERSISTENT_MAX_ITEMS,
                DEFAULT_PERSISTENT_MAX_SIZE as u64,
            ),
            ttl: None,
            quota_retry_budget: DEFAULT_QUOTA_RETRY_BUDGET,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl StoreConfig {
    /// Set memory tier limits.
    pub fn with_memory_limits(mut self, limits: TierLimits) -> Self {
        self.memory = limits;
        self
    }

    /// Set persistent tier limits.
    pub fn with_persistent_limits(mut self, limits: TierLimits) -> Self {
        self.persistent = limits;
        self
    }

    /// Set the entry time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the quota retry budget.
    pub fn with_quota_retry_budget(mut self, budget: usize) -> Self {
        self.quota_retry_budget = budget;
        self
    }

    /// Set the persistent key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}
