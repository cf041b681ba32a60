//! CLI error handling with user-friendly messages.
//!
//! Every command returns `Result<(), CliError>`; `main` prints the error
//! and exits with status 1.

use std::fmt;
use std::path::PathBuf;
use std::process;

use navcache::cache::CacheError;
use navcache::config::ConfigFileError;
use navcache::storage::StorageError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Storage directory could not be opened
    Storage { path: PathBuf, error: StorageError },
    /// Cache could not be opened or written
    Cache(CacheError),
    /// Key is not cached
    NotCached(String),
    /// Preload source directory is unusable
    Source { path: PathBuf, error: std::io::Error },
    /// Some preload fetches failed
    Preload { failed: usize, total: usize },
    /// Terminal dashboard error
    Dashboard(std::io::Error),
    /// Output could not be encoded as JSON
    Json(serde_json::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Storage { .. } => {
                eprintln!();
                eprintln!("Check that the [cache] directory in config.ini is writable,");
                eprintln!("or point --config at a file with a different directory.");
            }
            CliError::Preload { .. } => {
                eprintln!();
                eprintln!("Each key is read from <source>/<key>.json; see the log for details.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Storage { path, error } => {
                write!(f, "Failed to open cache storage '{}': {}", path.display(), error)
            }
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::NotCached(key) => write!(f, "Key '{}' is not cached", key),
            CliError::Source { path, error } => {
                write!(f, "Cannot read preload source '{}': {}", path.display(), error)
            }
            CliError::Preload { failed, total } => {
                write!(f, "{} of {} preload fetches failed", failed, total)
            }
            CliError::Dashboard(e) => write!(f, "Dashboard error: {}", e),
            CliError::Json(e) => write!(f, "Failed to encode JSON output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Storage { error, .. } => Some(error),
            CliError::Cache(e) => Some(e),
            CliError::Source { error, .. } => Some(error),
            CliError::Dashboard(e) => Some(e),
            CliError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}
