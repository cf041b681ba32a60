//! Live dashboard command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tracing::info;

use crate::commands::preload::SourceDir;
use crate::error::CliError;
use crate::runner::CliRunner;
use crate::ui::widgets::InstantNavigationBadge;
use crate::ui::{Dashboard, DashboardEvent};

const TICK: Duration = Duration::from_millis(100);

/// Arguments for `navcache watch`.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Preload these keys from a directory while the dashboard runs
    #[arg(long, requires = "keys")]
    pub source: Option<PathBuf>,

    /// Keys to preload from `--source`
    pub keys: Vec<String>,
}

/// Run `navcache watch` until the user quits.
pub async fn run(runner: &CliRunner, args: WatchArgs) -> Result<(), CliError> {
    let store = runner.open_store()?;
    let preloader = runner.preloader(Arc::clone(&store));
    let reporter = runner.reporter(Arc::clone(&preloader));
    let badge = InstantNavigationBadge::attach(store.events(), runner.config().badge_dismiss());

    let preload_task = match args.source {
        Some(dir) => {
            let source = SourceDir::open(dir)?;
            let preloader = Arc::clone(&preloader);
            let keys = args.keys;
            Some(tokio::spawn(async move {
                preloader
                    .schedule(keys, move |key| source.clone().fetch(key))
                    .await
            }))
        }
        None => None,
    };

    let mut updates = reporter.subscribe();
    let mut snapshot = reporter.refresh();
    let mut dashboard = Dashboard::new().map_err(CliError::Dashboard)?;
    let mut cursor = 0usize;

    loop {
        if updates.has_changed().unwrap_or(false) {
            snapshot = updates.borrow_and_update().clone();
        }
        dashboard
            .draw(&snapshot, badge.visible().as_ref())
            .map_err(CliError::Dashboard)?;

        match dashboard.poll_event(TICK).map_err(CliError::Dashboard)? {
            Some(DashboardEvent::Quit) => break,
            Some(DashboardEvent::Refresh) => snapshot = reporter.refresh(),
            Some(DashboardEvent::Navigate) => {
                let keys = &snapshot.preloaded_keys;
                if !keys.is_empty() {
                    let key = keys[cursor % keys.len()].clone();
                    cursor += 1;
                    store.get_raw(&key);
                    snapshot = reporter.refresh();
                }
            }
            Some(DashboardEvent::Reset) => {
                preloader.reset();
                snapshot = reporter.refresh();
            }
            None => {}
        }
    }

    drop(dashboard);
    reporter.shutdown().await;
    if let Some(task) = preload_task {
        if !task.is_finished() {
            info!("Dashboard closed with preload still running, aborting it");
            task.abort();
        }
    }
    Ok(())
}
