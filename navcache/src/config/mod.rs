//! Configuration for navcache components.
//!
//! Settings are read from an INI file (`~/.navcache/config.ini` by
//! default). A missing file yields defaults; a present file overlays the
//! defaults section by section.
//!
//! ```
//! use navcache::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let store_config = config.store_config();
//! assert_eq!(store_config.memory.max_items, Some(500));
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheSettings, ConfigFile, PreloadSettings, StatsSettings, UiSettings};
pub use size::{format_size, parse_size, SizeParseError};
