//! Synchronous publish/subscribe channel for cache events.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use super::event::CacheEvent;

type Handler = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

struct Inner {
    handlers: RwLock<Vec<(u64, Handler)>>,
    next_id: AtomicU64,
}

/// Fan-out channel for [`CacheEvent`]s.
///
/// Cloning gives another handle to the same channel. `publish` calls every
/// current handler in subscription order on the caller's thread. There is
/// no buffering, so a handler registered after an event never sees it.
///
/// Handlers run without any channel lock held and may subscribe,
/// unsubscribe or publish re-entrantly. Changes made during a publish take
/// effect from the next publish.
#[derive(Clone)]
pub struct CacheEventChannel {
    inner: Arc<Inner>,
}

impl CacheEventChannel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                handlers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register `handler`. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers.write().push((id, Arc::new(handler)));
        Subscription {
            channel: Arc::downgrade(&self.inner),
            id,
            active: true,
        }
    }

    /// Deliver `event` to all current subscribers.
    pub fn publish(&self, event: &CacheEvent) {
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        trace!(
            event = event.event_type(),
            key = %event.key(),
            subscribers = handlers.len(),
            "Publishing cache event"
        );

        for handler in handlers {
            handler(event);
        }
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.read().len()
    }
}

impl Default for CacheEventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheEventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEventChannel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle for a registered handler. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the handler immediately"]
pub struct Subscription {
    channel: Weak<Inner>,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Deregister the handler.
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the handler registered for the lifetime of the channel.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn remove(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        if let Some(inner) = self.channel.upgrade() {
            inner.handlers.write().retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
