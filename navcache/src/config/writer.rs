//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written to `config.ini`. The
//! output always parses back to an equal `ConfigFile`.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let cache = &config.cache;
    let storage_quota = cache.storage_quota.map(format_size).unwrap_or_default();

    format!(
        r#"[cache]
; Directory used by the file storage backend
directory = {}
; Memory tier limits (least recently used entries are evicted first)
memory_max_items = {}
; Supports: KB, MB, GB suffixes (e.g., 512KB, 16MB)
memory_max_size = {}
; Persistent tier limits
persistent_max_items = {}
persistent_max_size = {}
; Entry time-to-live in seconds (0 = entries never expire)
ttl_secs = {}
; Evictions attempted when the storage quota is hit before the write
; falls back to memory only
quota_retry_budget = {}
; Byte quota of the storage backend (empty = unlimited)
storage_quota = {}
; Prefix for keys written to persistent storage
key_prefix = {}

[preload]
; Fetches run at once by a single preload schedule
max_concurrent_fetches = {}

[stats]
; Seconds between periodic stats snapshots
refresh_interval_secs = {}

[ui]
; How long the instant navigation badge stays visible (milliseconds)
badge_dismiss_ms = {}
"#,
        path_to_string(&cache.directory),
        cache.memory_max_items,
        format_size(cache.memory_max_size),
        cache.persistent_max_items,
        format_size(cache.persistent_max_size),
        cache.ttl_secs.unwrap_or(0),
        cache.quota_retry_budget,
        storage_quota,
        cache.key_prefix,
        config.preload.max_concurrent_fetches,
        config.stats.refresh_interval_secs,
        config.ui.badge_dismiss_ms,
    )
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.cache.memory_max_items = 42;
        config.cache.memory_max_size = 3 * 1024 * 1024;
        config.cache.persistent_max_size = 1000;
        config.cache.ttl_secs = Some(120);
        config.cache.storage_quota = None;
        config.cache.key_prefix = "admin:".to_string();
        config.preload.max_concurrent_fetches = 2;
        config.stats.refresh_interval_secs = 10;
        config.ui.badge_dismiss_ms = 500;

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_defaults_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        ConfigFile::default().save_to(&config_path).unwrap();
        assert_eq!(
            ConfigFile::load_from(&config_path).unwrap(),
            ConfigFile::default()
        );
    }

    #[test]
    fn test_output_is_commented() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("[cache]"));
        assert!(content.contains("memory_max_size = 16MB"));
        assert!(content.contains("persistent_max_size = 5MB"));
        assert!(content.contains("; Entry time-to-live"));
    }
}
