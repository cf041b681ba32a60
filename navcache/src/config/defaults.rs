//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::path::PathBuf;

use super::settings::*;

// =============================================================================
// Cache tiers
// =============================================================================

/// Default memory tier item cap.
pub const DEFAULT_MEMORY_MAX_ITEMS: usize = 500;

/// Default memory tier byte cap (16 MB).
pub const DEFAULT_MEMORY_MAX_SIZE: usize = 16 * 1024 * 1024;

/// Default persistent tier item cap.
pub const DEFAULT_PERSISTENT_MAX_ITEMS: usize = 2000;

/// Default persistent tier byte cap (5 MB, the typical browser storage quota).
pub const DEFAULT_PERSISTENT_MAX_SIZE: usize = 5 * 1024 * 1024;

/// Default storage backend quota (6 MB). Leaves room for the envelope and
/// key overhead on top of the persistent tier's payload cap.
pub const DEFAULT_STORAGE_QUOTA: usize = 6 * 1024 * 1024;

/// Default number of evictions attempted after a quota failure.
pub const DEFAULT_QUOTA_RETRY_BUDGET: usize = 8;

/// Default namespace prefix for persistent storage keys.
pub const DEFAULT_KEY_PREFIX: &str = "navcache:";

// =============================================================================
// Preload / stats / ui
// =============================================================================

/// Default number of preload fetches running at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Default stats refresh interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5;

/// Default instant-navigation badge lifetime in milliseconds.
pub const DEFAULT_BADGE_DISMISS_MS: u64 = 3000;

/// Default cache directory (platform cache dir + `navcache`).
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("navcache")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                directory: default_cache_directory(),
                memory_max_items: DEFAULT_MEMORY_MAX_ITEMS,
                memory_max_size: DEFAULT_MEMORY_MAX_SIZE,
                persistent_max_items: DEFAULT_PERSISTENT_MAX_ITEMS,
                persistent_max_size: DEFAULT_PERSISTENT_MAX_SIZE,
                ttl_secs: None,
                quota_retry_budget: DEFAULT_QUOTA_RETRY_BUDGET,
                storage_quota: Some(DEFAULT_STORAGE_QUOTA),
                key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            },
            preload: PreloadSettings {
                max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            },
            stats: StatsSettings {
                refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            },
            ui: UiSettings {
                badge_dismiss_ms: DEFAULT_BADGE_DISMISS_MS,
            },
        }
    }
}
