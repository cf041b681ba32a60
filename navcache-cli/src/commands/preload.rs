//! Preload keys from a directory of JSON documents.
//!
//! Each key `k` is fetched from `<source>/k.json`, standing in for the data
//! layer an application would call.

use std::io;
use std::path::PathBuf;

use clap::Args;

use navcache::cache::CacheKey;
use navcache::preload::PreloadReport;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for `navcache preload`.
#[derive(Debug, Args)]
pub struct PreloadArgs {
    /// Directory holding one `<key>.json` file per key
    #[arg(long)]
    pub source: PathBuf,

    /// Keys to preload
    #[arg(required = true)]
    pub keys: Vec<String>,
}

/// Directory of JSON documents served as fetch results.
#[derive(Debug, Clone)]
pub struct SourceDir {
    root: PathBuf,
}

impl SourceDir {
    pub fn open(root: PathBuf) -> Result<Self, CliError> {
        if !root.is_dir() {
            return Err(CliError::Source {
                path: root,
                error: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            });
        }
        Ok(Self { root })
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    /// Read and parse the document for `key`.
    pub async fn fetch(self, key: CacheKey) -> Result<serde_json::Value, String> {
        let path = self.path_for(&key);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        serde_json::from_slice(&bytes).map_err(|e| format!("{}: {}", path.display(), e))
    }
}

/// Run `navcache preload`.
pub async fn run(runner: &CliRunner, args: PreloadArgs) -> Result<(), CliError> {
    let source = SourceDir::open(args.source)?;
    let store = runner.open_store()?;
    let preloader = runner.preloader(store);

    let report = preloader
        .schedule(args.keys, move |key| source.clone().fetch(key))
        .await;
    print_report(&report);

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::Preload {
            failed: report.failed.len(),
            total: report.total(),
        })
    }
}

fn print_report(report: &PreloadReport) {
    let line = |label: &str, keys: &[CacheKey]| {
        if !keys.is_empty() {
            let names: Vec<&str> = keys.iter().map(CacheKey::as_str).collect();
            println!("{:<10} {}", label, names.join(", "));
        }
    };
    line("Loaded:", &report.loaded);
    line("Skipped:", &report.skipped);
    line("Shared:", &report.coalesced);
    line("Dropped:", &report.discarded);
    for (key, reason) in &report.failed {
        println!("{:<10} {} ({})", "Failed:", key, reason);
    }
}
