//! Preload error types.

use thiserror::Error;

use crate::cache::CacheKey;

/// A preload fetch failed.
///
/// Logged and recorded in the [`PreloadReport`](super::PreloadReport); the
/// key stays absent from the cache and the rest of the schedule carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Preload fetch for '{key}' failed: {message}")]
pub struct FetchError {
    pub key: CacheKey,
    pub message: String,
}

impl FetchError {
    pub fn new(key: CacheKey, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}
