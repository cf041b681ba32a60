//! Byte-oriented key/value storage behind the persistent cache tier.
//!
//! The persistent tier only needs a small surface: get, set, remove and
//! key listing, plus quota reporting. Two backends are provided:
//!
//! - [`MemoryStorage`]: in-process map with an optional byte quota, useful
//!   for tests and for hosts without a writable directory
//! - [`FileStorage`]: one file per key in a directory

mod file;
mod memory;
mod r#trait;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use r#trait::{PersistentStorage, StorageError};
