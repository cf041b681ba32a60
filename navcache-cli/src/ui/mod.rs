//! Terminal UI for navcache.
//!
//! Provides a live dashboard of cache contents and preload efficiency.

pub mod dashboard;
pub mod widgets;

pub use dashboard::{Dashboard, DashboardEvent};
