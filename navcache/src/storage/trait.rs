//! Storage trait definition.

use bytes::Bytes;
use thiserror::Error;

/// Errors returned by a [`PersistentStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would exceed the backend's quota.
    #[error("Storage quota exceeded: need {required} bytes, {available} available")]
    QuotaExceeded { required: u64, available: u64 },

    /// I/O failure in the backend.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend cannot represent this key.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    /// True for quota failures, which callers may recover from by evicting.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

/// Persistent key/value storage.
///
/// Mirrors the shape of browser local storage: string keys, opaque byte
/// values, and a quota that makes writes fail rather than silently drop.
/// Implementations must be safe to share across threads.
pub trait PersistentStorage: Send + Sync {
    /// Read the value stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Fails with [`StorageError::QuotaExceeded`] when the backend is full.
    /// A failed write leaves the previous value in place.
    fn set_item(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Bytes currently counted against the quota.
    fn used_bytes(&self) -> u64;

    /// Quota in bytes, if any.
    fn quota_bytes(&self) -> Option<u64>;
}

/// Quota check shared by the backends.
///
/// `used` is the current usage, `replaced` the usage of the value being
/// overwritten (0 for a new key) and `required` the usage of the new value.
pub(crate) fn check_quota(
    quota: Option<u64>,
    used: u64,
    replaced: u64,
    required: u64,
) -> Result<(), StorageError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let available = quota.saturating_sub(used.saturating_sub(replaced));
    if required > available {
        return Err(StorageError::QuotaExceeded {
            required,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_quota_unbounded() {
        assert!(check_quota(None, u64::MAX, 0, u64::MAX).is_ok());
    }

    #[test]
    fn test_check_quota_counts_replaced_value() {
        // 90 used, of which 40 belong to the value being replaced
        assert!(check_quota(Some(100), 90, 40, 50).is_ok());
        assert!(check_quota(Some(100), 90, 0, 50).is_err());
    }

    #[test]
    fn test_quota_error_reports_available() {
        match check_quota(Some(100), 80, 0, 30) {
            Err(StorageError::QuotaExceeded {
                required,
                available,
            }) => {
                assert_eq!(required, 30);
                assert_eq!(available, 20);
            }
            other => panic!("expected quota error, got {:?}", other),
        }
    }

    #[test]
    fn test_is_quota_exceeded() {
        let quota = StorageError::QuotaExceeded {
            required: 1,
            available: 0,
        };
        assert!(quota.is_quota_exceeded());
        assert!(!StorageError::InvalidKey("x".into()).is_quota_exceeded());
    }
}
