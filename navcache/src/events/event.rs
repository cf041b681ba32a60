//! Cache event definitions.

use crate::cache::{CacheKey, Tier};

/// Something that happened to a cache key.
///
/// Events are transient: they are delivered to current subscribers and
/// never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    /// A lookup was served from `tier`.
    Hit { key: CacheKey, tier: Tier },

    /// A lookup found nothing in either tier.
    Miss { key: CacheKey },

    /// The preloader populated `key`.
    Preload { key: CacheKey },

    /// `key` left `tier` through invalidation, capacity eviction or expiry.
    Evict { key: CacheKey, tier: Tier },
}

impl CacheEvent {
    pub fn hit(key: impl Into<CacheKey>, tier: Tier) -> Self {
        Self::Hit {
            key: key.into(),
            tier,
        }
    }

    pub fn miss(key: impl Into<CacheKey>) -> Self {
        Self::Miss { key: key.into() }
    }

    pub fn preload(key: impl Into<CacheKey>) -> Self {
        Self::Preload { key: key.into() }
    }

    pub fn evict(key: impl Into<CacheKey>, tier: Tier) -> Self {
        Self::Evict {
            key: key.into(),
            tier,
        }
    }

    /// The key the event is about.
    pub fn key(&self) -> &CacheKey {
        match self {
            Self::Hit { key, .. }
            | Self::Miss { key }
            | Self::Preload { key }
            | Self::Evict { key, .. } => key,
        }
    }

    /// The tier involved, for hit and evict events.
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::Hit { tier, .. } | Self::Evict { tier, .. } => Some(*tier),
            Self::Miss { .. } | Self::Preload { .. } => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    /// Name of the event type, used in logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Hit { .. } => "hit",
            Self::Miss { .. } => "miss",
            Self::Preload { .. } => "preload",
            Self::Evict { .. } => "evict",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let hit = CacheEvent::hit("users", Tier::Persistent);
        assert_eq!(hit.key().as_str(), "users");
        assert_eq!(hit.tier(), Some(Tier::Persistent));
        assert!(hit.is_hit());

        let preload = CacheEvent::preload("orders");
        assert_eq!(preload.tier(), None);
        assert!(!preload.is_hit());
    }

    #[test]
    fn test_event_type() {
        assert_eq!(CacheEvent::hit("k", Tier::Memory).event_type(), "hit");
        assert_eq!(CacheEvent::miss("k").event_type(), "miss");
        assert_eq!(CacheEvent::preload("k").event_type(), "preload");
        assert_eq!(CacheEvent::evict("k", Tier::Memory).event_type(), "evict");
    }
}
