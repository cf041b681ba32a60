//! Dashboard widgets for the TUI.
//!
//! - `CacheStatsWidget` - tier counts, size, preloaded keys, efficiency
//! - `InstantNavigationBadge` - transient notice for cache hits
//! - `EfficiencyBand` - colour band for the preload efficiency percentage
//! - `format_size` - human-readable byte counts

mod badge;
mod efficiency;
mod format;
mod stats;

pub use badge::{BadgeHit, InstantNavigationBadge};
pub use efficiency::EfficiencyBand;
pub use format::format_size;
pub use stats::CacheStatsWidget;
