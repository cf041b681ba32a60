//! CLI command implementations.
//!
//! - [`cache`] - Inspect and modify cached entries (get, invalidate, clear, stats)
//! - [`config`] - Show the configuration file and its location
//! - [`preload`] - Preload keys from a directory of JSON documents
//! - [`watch`] - Live dashboard

pub mod cache;
pub mod config;
pub mod preload;
pub mod watch;
