//! Background preloading of likely navigation targets.
//!
//! The [`Preloader`] fetches resources before they are requested and
//! stores them in the [`TieredCacheStore`](crate::cache::TieredCacheStore)
//! marked as preloaded. It keeps its own [`PreloadRecord`]s, separate from
//! the cache entries, to report which cached keys it populated.

mod coalesce;
mod error;
mod preloader;
mod record;

pub use error::FetchError;
pub use preloader::{PreloadReport, Preloader};
pub use record::{PreloadRecord, PreloadStats};
