//! navcache - client-side two-tier cache and preload layer
//!
//! A volatile memory tier in front of persistent key/value storage, fed by
//! a background preloader and observed through a typed event channel.
//!
//! ```
//! use std::sync::Arc;
//! use navcache::cache::{CacheKey, StoreConfig, TieredCacheStore};
//! use navcache::events::CacheEventChannel;
//! use navcache::preload::Preloader;
//! use navcache::stats::StatsReporter;
//! use navcache::storage::MemoryStorage;
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! rt.block_on(async {
//!     let store = Arc::new(
//!         TieredCacheStore::open(
//!             StoreConfig::default(),
//!             Arc::new(MemoryStorage::new()),
//!             CacheEventChannel::new(),
//!         )
//!         .unwrap(),
//!     );
//!     let preloader = Arc::new(Preloader::new(Arc::clone(&store), 4));
//!
//!     preloader
//!         .schedule(["users:list", "orders:list"], |key| async move {
//!             Ok::<_, std::io::Error>(format!("payload for {}", key))
//!         })
//!         .await;
//!
//!     let reporter = StatsReporter::new(Arc::clone(&preloader), None);
//!     assert_eq!(reporter.snapshot().preloaded_count, 2);
//!     assert!(store.contains(&CacheKey::new("users:list")));
//! });
//! ```

pub mod cache;
pub mod config;
pub mod events;
pub mod logging;
pub mod preload;
pub mod stats;
pub mod storage;

/// Version of the navcache library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
