//! In-process storage backend.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;

use super::r#trait::{check_quota, PersistentStorage, StorageError};

#[derive(Default)]
struct Inner {
    items: HashMap<String, Bytes>,
    used: u64,
}

/// Map-backed storage with an optional quota.
///
/// Usage counts key bytes plus value bytes, the way browser storage
/// accounts for its quota.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    quota: Option<u64>,
}

impl MemoryStorage {
    /// Storage without a quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once `quota` bytes are used.
    pub fn with_quota(quota: u64) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            quota: Some(quota),
        }
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }
}

fn usage(key: &str, value: &[u8]) -> u64 {
    (key.len() + value.len()) as u64
}

impl PersistentStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self.inner.lock().items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let replaced = inner
            .items
            .get(key)
            .map(|old| usage(key, old))
            .unwrap_or(0);
        let required = usage(key, value);

        check_quota(self.quota, inner.used, replaced, required)?;

        inner
            .items
            .insert(key.to_string(), Bytes::copy_from_slice(value));
        inner.used = inner.used - replaced + required;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if let Some(old) = inner.items.remove(key) {
            inner.used -= usage(key, &old);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.inner.lock().items.keys().cloned().collect())
    }

    fn used_bytes(&self) -> u64 {
        self.inner.lock().used
    }

    fn quota_bytes(&self) -> Option<u64> {
        self.quota
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set_item("a", b"hello").unwrap();

        assert_eq!(storage.get_item("a").unwrap().unwrap().as_ref(), b"hello");
        assert_eq!(storage.used_bytes(), 6);

        storage.remove_item("a").unwrap();
        assert!(storage.get_item("a").unwrap().is_none());
        assert_eq!(storage.used_bytes(), 0);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_overwrite_adjusts_usage() {
        let storage = MemoryStorage::new();
        storage.set_item("k", b"1234").unwrap();
        storage.set_item("k", b"12").unwrap();

        assert_eq!(storage.used_bytes(), 3);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_quota_rejects_and_keeps_previous_value() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("k", b"abc").unwrap();

        let err = storage.set_item("k", b"0123456789").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(storage.get_item("k").unwrap().unwrap().as_ref(), b"abc");
        assert_eq!(storage.used_bytes(), 4);
    }

    #[test]
    fn test_remove_frees_quota() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("a", b"1234").unwrap();
        assert!(storage.set_item("b", b"12345").is_err());

        storage.remove_item("a").unwrap();
        storage.set_item("b", b"12345").unwrap();
        assert_eq!(storage.quota_bytes(), Some(10));
    }

    #[test]
    fn test_keys() {
        let storage = MemoryStorage::new();
        storage.set_item("x", b"1").unwrap();
        storage.set_item("y", b"2").unwrap();

        let mut keys = storage.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
    }
}
