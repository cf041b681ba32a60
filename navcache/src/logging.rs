//! Logging setup for navcache binaries.
//!
//! - Writes to `~/.navcache/navcache.log` (truncated at startup)
//! - Optionally mirrors to stderr; the terminal dashboard turns this off
//!   so log lines don't tear the display
//! - Filtered through `RUST_LOG`, defaulting to `info`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the log writer alive. Dropping it flushes and closes the file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub dir: PathBuf,
    pub file_name: String,
    /// Also write to stderr.
    pub console: bool,
}

impl LogTarget {
    /// Default target under the config directory, with console output.
    pub fn default_for(config_dir: &Path) -> Self {
        Self {
            dir: config_dir.to_path_buf(),
            file_name: DEFAULT_LOG_FILE.to_string(),
            console: true,
        }
    }

    pub fn without_console(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "navcache.log";

/// Install the global subscriber.
///
/// Creates the log directory if needed and clears the previous log.
/// Can only succeed once per process.
pub fn init_logging(target: &LogTarget) -> Result<LoggingGuard, io::Error> {
    prepare_log_file(target)?;

    let file_appender = tracing_appender::rolling::never(&target.dir, &target.file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let console_layer = target.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .compact()
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Create the log directory and truncate the log file.
fn prepare_log_file(target: &LogTarget) -> io::Result<()> {
    fs::create_dir_all(&target.dir)?;
    fs::write(target.path(), "")
}
