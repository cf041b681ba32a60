//! UI-facing cache statistics.
//!
//! [`StatsReporter`] merges store and preloader state into a
//! [`StatsSnapshot`], on demand and on a timer, and publishes snapshots
//! through a `tokio::sync::watch` channel.

mod reporter;
mod snapshot;

pub use reporter::StatsReporter;
pub use snapshot::StatsSnapshot;
