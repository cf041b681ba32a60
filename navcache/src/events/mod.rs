//! Typed cache observability.
//!
//! The store and the preloader publish [`CacheEvent`]s on a
//! [`CacheEventChannel`]; UI components subscribe to them. Delivery is
//! synchronous and unbuffered: a handler sees only events published while
//! it is subscribed.
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use navcache::events::{CacheEvent, CacheEventChannel};
//!
//! let channel = CacheEventChannel::new();
//! let hits = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&hits);
//! let subscription = channel.subscribe(move |event| {
//!     if event.is_hit() {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     }
//! });
//!
//! channel.publish(&CacheEvent::miss("users"));
//! assert_eq!(hits.load(Ordering::Relaxed), 0);
//! subscription.unsubscribe();
//! ```

mod channel;
mod event;

pub use channel::{CacheEventChannel, Subscription};
pub use event::CacheEvent;
