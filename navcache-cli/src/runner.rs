//! CLI runner for common setup.
//!
//! Loads the configuration, initializes logging and opens the cache
//! components every command works with.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use navcache::cache::TieredCacheStore;
use navcache::config::{config_directory, config_file_path, ConfigFile};
use navcache::events::CacheEventChannel;
use navcache::logging::{init_logging, LogTarget, LoggingGuard};
use navcache::preload::Preloader;
use navcache::stats::StatsReporter;
use navcache::storage::FileStorage;

use crate::error::CliError;

/// Runner that owns the configuration and keeps logging alive.
pub struct CliRunner {
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Load the configuration and initialize logging.
    ///
    /// `console` mirrors log output to stderr; the dashboard disables it.
    pub fn new(config_path: Option<PathBuf>, console: bool) -> Result<Self, CliError> {
        let config_path = config_path.unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let mut target = LogTarget::default_for(&config_directory());
        if !console {
            target = target.without_console();
        }
        let logging_guard =
            init_logging(&target).map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!(version = navcache::VERSION, command, "navcache CLI starting");
    }

    /// Open the store on the configured cache directory.
    pub fn open_store(&self) -> Result<Arc<TieredCacheStore>, CliError> {
        let cache = &self.config.cache;
        let quota = cache.storage_quota.map(|q| q as u64);
        let storage =
            FileStorage::open(cache.directory.clone(), quota).map_err(|error| CliError::Storage {
                path: cache.directory.clone(),
                error,
            })?;

        let store = TieredCacheStore::open(
            self.config.store_config(),
            Arc::new(storage),
            CacheEventChannel::new(),
        )?;
        Ok(Arc::new(store))
    }

    /// Preloader over `store` with the configured concurrency.
    pub fn preloader(&self, store: Arc<TieredCacheStore>) -> Arc<Preloader> {
        Arc::new(Preloader::new(
            store,
            self.config.preload.max_concurrent_fetches,
        ))
    }

    /// Stats reporter with the configured refresh interval.
    pub fn reporter(&self, preloader: Arc<Preloader>) -> StatsReporter {
        StatsReporter::new(preloader, Some(self.config.refresh_interval()))
    }
}
