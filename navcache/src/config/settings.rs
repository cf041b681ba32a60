//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{StoreConfig, TierLimits};

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub preload: PreloadSettings,
    pub stats: StatsSettings,
    pub ui: UiSettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Directory for the file storage backend
    pub directory: PathBuf,
    pub memory_max_items: usize,
    /// Memory tier byte cap
    pub memory_max_size: usize,
    pub persistent_max_items: usize,
    /// Persistent tier byte cap
    pub persistent_max_size: usize,
    /// Entry time-to-live in seconds. `None` disables expiry.
    pub ttl_secs: Option<u64>,
    /// Evictions attempted after a storage quota failure
    pub quota_retry_budget: usize,
    /// Byte quota of the storage backend. `None` means unlimited.
    pub storage_quota: Option<usize>,
    /// Namespace prefix for storage keys
    pub key_prefix: String,
}

/// `[preload]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadSettings {
    /// Fetches running at once within a single schedule
    pub max_concurrent_fetches: usize,
}

/// `[stats]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSettings {
    pub refresh_interval_secs: u64,
}

/// `[ui]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSettings {
    /// How long the instant-navigation badge stays visible
    pub badge_dismiss_ms: u64,
}

impl ConfigFile {
    /// Store configuration described by the `[cache]` section.
    pub fn store_config(&self) -> StoreConfig {
        let cache = &self.cache;
        let mut config = StoreConfig::default()
            .with_memory_limits(TierLimits::new(
                cache.memory_max_items,
                cache.memory_max_size as u64,
            ))
            .with_persistent_limits(TierLimits::new(
                cache.persistent_max_items,
                cache.persistent_max_size as u64,
            ))
            .with_quota_retry_budget(cache.quota_retry_budget)
            .with_key_prefix(cache.key_prefix.clone());
        if let Some(secs) = cache.ttl_secs {
            config = config.with_ttl(Duration::from_secs(secs));
        }
        config
    }

    /// Stats refresh interval.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.stats.refresh_interval_secs)
    }

    /// Instant-navigation badge lifetime.
    pub fn badge_dismiss(&self) -> Duration {
        Duration::from_millis(self.ui.badge_dismiss_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_from_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.store_config(), StoreConfig::default());
    }

    #[test]
    fn test_store_config_applies_ttl() {
        let mut config = ConfigFile::default();
        config.cache.ttl_secs = Some(90);
        config.cache.memory_max_items = 10;

        let store = config.store_config();
        assert_eq!(store.ttl, Some(Duration::from_secs(90)));
        assert_eq!(store.memory.max_items, Some(10));
    }

    #[test]
    fn test_durations() {
        let config = ConfigFile::default();
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.badge_dismiss(), Duration::from_millis(3000));
    }
}
