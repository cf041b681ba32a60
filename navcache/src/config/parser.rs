//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

const SIZE_REASON: &str = "expected format like '16MB', '512KB', or a byte count";
const NUMBER_REASON: &str = "must be a non-negative integer";
const COUNT_REASON: &str = "must be a positive integer";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        let cache = &mut config.cache;
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                cache.directory = expand_tilde(v);
            }
        }
        if let Some(v) = parse_positive(section, "cache", "memory_max_items", COUNT_REASON)? {
            cache.memory_max_items = v;
        }
        if let Some(v) = get_size(section, "cache", "memory_max_size")? {
            cache.memory_max_size = v;
        }
        if let Some(v) = parse_number(section, "cache", "persistent_max_items", NUMBER_REASON)? {
            cache.persistent_max_items = v;
        }
        if let Some(v) = get_size(section, "cache", "persistent_max_size")? {
            cache.persistent_max_size = v;
        }
        if let Some(v) = section.get("ttl_secs") {
            // empty or 0 disables expiry
            let v = v.trim();
            cache.ttl_secs = match v {
                "" | "0" => None,
                _ => Some(v.parse().map_err(|_| {
                    invalid("cache", "ttl_secs", v, "must be a positive integer (seconds)")
                })?),
            };
        }
        if let Some(v) = parse_number(section, "cache", "quota_retry_budget", NUMBER_REASON)? {
            cache.quota_retry_budget = v;
        }
        if let Some(v) = section.get("storage_quota") {
            let v = v.trim();
            cache.storage_quota = if v.is_empty() {
                None
            } else {
                Some(parse_size(v).map_err(|_| invalid("cache", "storage_quota", v, SIZE_REASON))?)
            };
        }
        if let Some(v) = section.get("key_prefix") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("cache", "key_prefix", v, "must not be empty"));
            }
            cache.key_prefix = v.to_string();
        }
    }

    // [preload] section
    if let Some(section) = ini.section(Some("preload")) {
        let key = "max_concurrent_fetches";
        if let Some(v) = parse_positive(section, "preload", key, COUNT_REASON)? {
            config.preload.max_concurrent_fetches = v;
        }
    }

    // [stats] section
    if let Some(section) = ini.section(Some("stats")) {
        let reason = "must be a positive integer (seconds)";
        if let Some(v) = parse_positive(section, "stats", "refresh_interval_secs", reason)? {
            config.stats.refresh_interval_secs = v as u64;
        }
    }

    // [ui] section
    if let Some(section) = ini.section(Some("ui")) {
        let reason = "must be a non-negative integer (milliseconds)";
        if let Some(v) = parse_number(section, "ui", "badge_dismiss_ms", reason)? {
            config.ui.badge_dismiss_ms = v;
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    section: &Properties,
    name: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    let v = v.trim();
    v.parse()
        .map(Some)
        .map_err(|_| invalid(name, key, v, reason))
}

/// Like [`parse_number`], rejecting zero.
fn parse_positive(
    section: &Properties,
    name: &str,
    key: &str,
    reason: &str,
) -> Result<Option<usize>, ConfigFileError> {
    match parse_number::<usize>(section, name, key, reason)? {
        Some(0) => Err(invalid(name, key, "0", reason)),
        other => Ok(other),
    }
}

fn get_size(section: &Properties, name: &str, key: &str) -> Result<Option<usize>, ConfigFileError> {
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    parse_size(v)
        .map(Some)
        .map_err(|_| invalid(name, key, v, SIZE_REASON))
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_cache_section() {
        let config = parse(
            "[cache]\n\
             memory_max_items = 100\n\
             memory_max_size = 2MB\n\
             persistent_max_items = 50\n\
             persistent_max_size = 512KB\n\
             ttl_secs = 600\n\
             quota_retry_budget = 3\n\
             storage_quota = 1MB\n\
             key_prefix = admin:\n\
             directory = /tmp/navcache-test\n",
        )
        .unwrap();

        assert_eq!(config.cache.memory_max_items, 100);
        assert_eq!(config.cache.memory_max_size, 2 * 1024 * 1024);
        assert_eq!(config.cache.persistent_max_items, 50);
        assert_eq!(config.cache.persistent_max_size, 512 * 1024);
        assert_eq!(config.cache.ttl_secs, Some(600));
        assert_eq!(config.cache.quota_retry_budget, 3);
        assert_eq!(config.cache.storage_quota, Some(1024 * 1024));
        assert_eq!(config.cache.key_prefix, "admin:");
        assert_eq!(config.cache.directory, PathBuf::from("/tmp/navcache-test"));
    }

    #[test]
    fn test_ttl_zero_disables_expiry() {
        let config = parse("[cache]\nttl_secs = 0\n").unwrap();
        assert!(config.cache.ttl_secs.is_none());
    }

    #[test]
    fn test_empty_storage_quota_is_unlimited() {
        let config = parse("[cache]\nstorage_quota =\n").unwrap();
        assert!(config.cache.storage_quota.is_none());
    }

    #[test]
    fn test_other_sections() {
        let config = parse(
            "[preload]\nmax_concurrent_fetches = 8\n\
             [stats]\nrefresh_interval_secs = 30\n\
             [ui]\nbadge_dismiss_ms = 1500\n",
        )
        .unwrap();

        assert_eq!(config.preload.max_concurrent_fetches, 8);
        assert_eq!(config.stats.refresh_interval_secs, 30);
        assert_eq!(config.ui.badge_dismiss_ms, 1500);
        assert_eq!(config.cache.memory_max_items, DEFAULT_MEMORY_MAX_ITEMS);
    }

    #[test]
    fn test_invalid_size() {
        match parse("[cache]\nmemory_max_size = lots\n") {
            Err(ConfigFileError::InvalidValue {
                section,
                key,
                value,
                ..
            }) => {
                assert_eq!(section, "cache");
                assert_eq!(key, "memory_max_size");
                assert_eq!(value, "lots");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_number() {
        let err = parse("[cache]\nmemory_max_items = -1\n").unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = parse("[preload]\nmax_concurrent_fetches = 0\n").unwrap_err();
        assert!(err.to_string().contains("preload.max_concurrent_fetches"));
    }

    #[test]
    fn test_zero_memory_items_rejected() {
        match parse("[cache]\nmemory_max_items = 0\n") {
            Err(ConfigFileError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, "memory_max_items");
                assert_eq!(value, "0");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
        // the persistent tier may be disabled
        let config = parse("[cache]\npersistent_max_items = 0\n").unwrap();
        assert_eq!(config.cache.persistent_max_items, 0);
    }

    #[test]
    fn test_zero_refresh_rejected() {
        assert!(parse("[stats]\nrefresh_interval_secs = 0\n").is_err());
    }

    #[test]
    fn test_empty_key_prefix_rejected() {
        assert!(parse("[cache]\nkey_prefix =\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/cache"), home.join("cache"));
        }
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}
