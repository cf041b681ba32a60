//! Periodic and on-demand stats publishing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::snapshot::StatsSnapshot;
use crate::config::DEFAULT_REFRESH_INTERVAL_SECS;
use crate::preload::Preloader;

struct RefreshTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Publishes [`StatsSnapshot`]s of a store and its preloader.
///
/// Snapshots are taken on [`refresh`](Self::refresh) and, while anyone is
/// subscribed, at a fixed interval. The periodic task starts with the first
/// [`subscribe`](Self::subscribe) call and stops on
/// [`shutdown`](Self::shutdown), when the reporter is dropped, or once
/// every receiver has been dropped. A later `subscribe` starts it again.
pub struct StatsReporter {
    preloader: Arc<Preloader>,
    interval: Duration,
    tx: Arc<watch::Sender<StatsSnapshot>>,
    task: Mutex<Option<RefreshTask>>,
}

impl StatsReporter {
    /// Create a reporter. `refresh_interval` defaults to five seconds.
    pub fn new(preloader: Arc<Preloader>, refresh_interval: Option<Duration>) -> Self {
        let interval = refresh_interval
            .unwrap_or(Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS))
            .max(Duration::from_millis(1));
        let (tx, _rx) = watch::channel(StatsSnapshot::empty());
        Self {
            preloader,
            interval,
            tx: Arc::new(tx),
            task: Mutex::new(None),
        }
    }

    /// Take a snapshot without publishing it.
    pub fn snapshot(&self) -> StatsSnapshot {
        take_snapshot(&self.preloader)
    }

    /// Take a snapshot and publish it to subscribers.
    pub fn refresh(&self) -> StatsSnapshot {
        let snapshot = self.snapshot();
        self.tx.send_replace(snapshot.clone());
        snapshot
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> StatsSnapshot {
        self.tx.borrow().clone()
    }

    /// Efficiency of a fresh snapshot.
    pub fn efficiency(&self) -> u32 {
        self.snapshot().efficiency()
    }

    /// Receive published snapshots, starting the periodic task if needed.
    ///
    /// Outside a Tokio runtime no task is started and the receiver only
    /// sees on-demand refreshes.
    pub fn subscribe(&self) -> watch::Receiver<StatsSnapshot> {
        let rx = self.tx.subscribe();
        self.ensure_task();
        rx
    }

    /// Whether the periodic task is running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Stop the periodic task and wait for it to finish.
    pub async fn shutdown(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!(error = %e, "Stats refresh task ended abnormally");
            }
        }
    }

    fn ensure_task(&self) {
        let mut slot = self.task.lock();
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            debug!("No Tokio runtime, stats refresh task not started");
            return;
        };

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(run_refresh(
            Arc::clone(&self.preloader),
            Arc::clone(&self.tx),
            self.interval,
            cancel.clone(),
        ));
        *slot = Some(RefreshTask { cancel, handle });
    }
}

impl Drop for StatsReporter {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel.cancel();
        }
    }
}

fn take_snapshot(preloader: &Preloader) -> StatsSnapshot {
    let (cache, preload) = preloader.combined_stats();
    StatsSnapshot::new(cache, preload, Utc::now())
}

async fn run_refresh(
    preloader: Arc<Preloader>,
    tx: Arc<watch::Sender<StatsSnapshot>>,
    period: Duration,
    cancel: CancellationToken,
) {
    debug!(interval_ms = period.as_millis() as u64, "Stats refresh task starting");

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = tx.closed() => {
                // a subscriber may have arrived since the last one left
                if tx.receiver_count() == 0 {
                    break;
                }
            }

            _ = ticker.tick() => {
                tx.send_replace(take_snapshot(&preloader));
            }
        }
    }

    debug!("Stats refresh task stopped");
}
