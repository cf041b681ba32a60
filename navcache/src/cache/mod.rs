//! Two-tier cache for serialized resources.
//!
//! A volatile memory tier sits in front of a persistent tier backed by a
//! [`PersistentStorage`](crate::storage::PersistentStorage) implementation.
//! Both tiers evict least recently used entries past their configured
//! limits, and all statistics are derived from the live entries.

mod config;
mod entry;
mod memory;
mod persistent;
mod stats;
mod store;
mod types;

pub use config::{StoreConfig, TierLimits};
pub use entry::CacheEntry;
pub use persistent::StorageQuotaError;
pub use stats::{CacheStats, TierStats};
pub use store::{EntryInfo, TieredCacheStore};
pub use types::{CacheError, CacheKey, SetOptions, Tier, TierMode};

pub(crate) use store::StoreView;
