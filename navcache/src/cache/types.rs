//! Core types for the tiered cache.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::storage::StorageError;

/// Key identifying a logical resource in the cache.
///
/// The cache treats keys as opaque strings. Callers typically use a
/// fingerprint of the resource query, e.g. `"users:list:page=1&sort=name"`.
/// Cloning is cheap (reference counted).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Create a new cache key.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(Arc::from(key))
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for CacheKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// One of the two cache backing stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Volatile in-process storage.
    Memory,
    /// Storage that survives a restart.
    Persistent,
}

impl Tier {
    /// Lowercase name used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Memory => "memory",
            Tier::Persistent => "persistent",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tiers a `set` writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TierMode {
    /// Write-through to memory and persistent storage.
    #[default]
    Both,
    /// Memory only. Any persistent copy of the key is dropped.
    MemoryOnly,
}

/// Options for [`TieredCacheStore::set`](super::TieredCacheStore::set).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Entry was populated by the preloader rather than a user request.
    pub preloaded: bool,
    /// Target tiers.
    pub tier: TierMode,
}

impl SetOptions {
    /// Options for a preload-populated write-through entry.
    pub fn preloaded() -> Self {
        Self {
            preloaded: true,
            tier: TierMode::Both,
        }
    }

    /// Options for a memory-only entry.
    pub fn memory_only() -> Self {
        Self {
            preloaded: false,
            tier: TierMode::MemoryOnly,
        }
    }
}

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The value could not be encoded. Nothing was written.
    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialization {
        key: CacheKey,
        #[source]
        source: serde_json::Error,
    },

    /// The persistent storage backend failed outside of a write path
    /// (e.g. while rebuilding the index on open).
    #[error("Persistent storage error: {0}")]
    Storage(#[from] StorageError),

    /// The store configuration cannot hold any entry.
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_cache_key_equality() {
        let a = CacheKey::new("users:list:page=1");
        let b = CacheKey::from("users:list:page=1".to_string());
        let c = CacheKey::from("users:list:page=2");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "users:list:page=1");
        assert_eq!(a.to_string(), "users:list:page=1");
    }

    #[test]
    fn test_cache_key_borrow_lookup() {
        let mut map = HashMap::new();
        map.insert(CacheKey::new("orders"), 1);

        assert_eq!(map.get("orders"), Some(&1));
    }

    #[test]
    fn test_cache_key_serializes_as_string() {
        let json = serde_json::to_string(&CacheKey::new("a:b")).unwrap();
        assert_eq!(json, "\"a:b\"");
    }

    #[test]
    fn test_tier_names() {
        assert_eq!(Tier::Memory.to_string(), "memory");
        assert_eq!(Tier::Persistent.as_str(), "persistent");
    }

    #[test]
    fn test_set_options() {
        let default = SetOptions::default();
        assert!(!default.preloaded);
        assert_eq!(default.tier, TierMode::Both);

        assert!(SetOptions::preloaded().preloaded);
        assert_eq!(SetOptions::memory_only().tier, TierMode::MemoryOnly);
    }
}
