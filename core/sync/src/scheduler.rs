//! Sync scheduling - manual requests and periodic mode.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, error, info};

use accuread_common::{Error, Result};

use crate::orchestrator::SyncOutcome;

/// Sync mode configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Sync only when requested.
    Manual,
    /// Also sync at regular intervals.
    Periodic { interval: Duration },
}

/// Sync request types.
#[derive(Debug)]
pub enum SyncRequest {
    /// Upload the offline queue.
    Sync,
    /// Shutdown the scheduler.
    Shutdown,
}

type Reply = oneshot::Sender<Result<SyncOutcome>>;

/// Front end for requesting syncs from a running scheduler.
pub struct SyncScheduler {
    /// Current sync mode; the running loop is woken on every change.
    mode: watch::Sender<SyncMode>,
    /// Channel to send sync requests.
    request_tx: mpsc::Sender<(SyncRequest, Reply)>,
    /// Shutdown signal.
    shutdown: Arc<AtomicBool>,
}

impl SyncScheduler {
    /// Create a new scheduler with the given mode.
    pub fn new(mode: SyncMode) -> (Self, SyncSchedulerHandle) {
        let (request_tx, request_rx) = mpsc::channel(32);
        let (mode, mode_rx) = watch::channel(mode);
        let shutdown = Arc::new(AtomicBool::new(false));

        let scheduler = Self {
            mode,
            request_tx,
            shutdown: shutdown.clone(),
        };

        let handle = SyncSchedulerHandle {
            mode: mode_rx,
            request_rx,
            shutdown,
        };

        (scheduler, handle)
    }

    /// Request a sync and wait for its outcome.
    pub async fn request_sync(&self) -> Result<SyncOutcome> {
        let (response_tx, response_rx) = oneshot::channel();

        self.request_tx
            .send((SyncRequest::Sync, response_tx))
            .await
            .map_err(|_| Error::InvalidInput("Scheduler not running".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::InvalidInput("Scheduler stopped before replying".to_string()))?
    }

    /// Change the sync mode. A running scheduler switches immediately.
    pub fn set_mode(&self, mode: SyncMode) {
        self.mode.send_if_modified(|current| {
            if *current == mode {
                return false;
            }
            *current = mode;
            true
        });
    }

    /// Get current sync mode.
    pub fn get_mode(&self) -> SyncMode {
        self.mode.borrow().clone()
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);

        let (response_tx, _) = oneshot::channel();
        let _ = self
            .request_tx
            .send((SyncRequest::Shutdown, response_tx))
            .await;
    }
}

/// Handle for the scheduler background task.
pub struct SyncSchedulerHandle {
    mode: watch::Receiver<SyncMode>,
    request_rx: mpsc::Receiver<(SyncRequest, Reply)>,
    shutdown: Arc<AtomicBool>,
}

impl SyncSchedulerHandle {
    /// Run the scheduler background task.
    ///
    /// This should be spawned in a tokio task. The `sync_fn` is called
    /// whenever a sync is needed. The loop ends on shutdown or once every
    /// [`SyncScheduler`] has been dropped.
    pub async fn run<F, Fut>(mut self, sync_fn: F)
    where
        F: Fn(SyncRequest) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<SyncOutcome>> + Send,
    {
        let mut periodic = periodic_interval(&self.mode.borrow_and_update());

        info!("Sync scheduler started ({:?})", *self.mode.borrow());

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            tokio::select! {
                request = self.request_rx.recv() => {
                    match request {
                        Some((SyncRequest::Sync, response_tx)) => {
                            debug!("Processing sync request");
                            let result = sync_fn(SyncRequest::Sync).await;
                            let _ = response_tx.send(result);
                        }
                        Some((SyncRequest::Shutdown, _)) | None => break,
                    }
                }

                changed = self.mode.changed() => {
                    // Every scheduler is gone.
                    if changed.is_err() {
                        break;
                    }
                    let mode = self.mode.borrow_and_update().clone();
                    debug!("Sync mode changed to {:?}", mode);
                    periodic = periodic_interval(&mode);
                }

                _ = wait_for_periodic(&mut periodic) => {
                    debug!("Triggering periodic sync");
                    match sync_fn(SyncRequest::Sync).await {
                        Ok(SyncOutcome::Completed { uploaded, duration }) => {
                            info!("Periodic sync completed in {:?}: {} uploaded", duration, uploaded);
                        }
                        Ok(SyncOutcome::Skipped(reason)) => {
                            debug!("Periodic sync skipped: {:?}", reason);
                        }
                        Err(e) => {
                            error!("Periodic sync failed: {}", e);
                        }
                    }
                }
            }
        }

        info!("Sync scheduler shutting down");
    }
}

fn periodic_interval(mode: &SyncMode) -> Option<Interval> {
    match mode {
        SyncMode::Periodic { interval } => Some(interval_at(Instant::now() + *interval, *interval)),
        SyncMode::Manual => None,
    }
}

async fn wait_for_periodic(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn completed() -> Result<SyncOutcome> {
        Ok(SyncOutcome::Completed {
            uploaded: 1,
            duration: Duration::from_millis(5),
        })
    }

    fn counting(
        handle: SyncSchedulerHandle,
    ) -> (Arc<AtomicU32>, tokio::task::JoinHandle<()>) {
        let sync_count = Arc::new(AtomicU32::new(0));
        let count_clone = sync_count.clone();

        let task = tokio::spawn(handle.run(move |_request| {
            let count = count_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                completed()
            }
        }));
        (sync_count, task)
    }

    #[tokio::test]
    async fn test_mode_change() {
        let (scheduler, _handle) = SyncScheduler::new(SyncMode::Manual);
        assert_eq!(scheduler.get_mode(), SyncMode::Manual);

        scheduler.set_mode(SyncMode::Periodic {
            interval: Duration::from_secs(60),
        });

        assert!(matches!(scheduler.get_mode(), SyncMode::Periodic { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_to_periodic_takes_effect_without_requests() {
        let (scheduler, handle) = SyncScheduler::new(SyncMode::Manual);
        let (sync_count, task) = counting(handle);
        tokio::task::yield_now().await;

        scheduler.set_mode(SyncMode::Periodic {
            interval: Duration::from_secs(30),
        });
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(sync_count.load(Ordering::SeqCst), 3);

        scheduler.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_to_manual_stops_periodic_syncs() {
        let (scheduler, handle) = SyncScheduler::new(SyncMode::Periodic {
            interval: Duration::from_secs(30),
        });
        let (sync_count, task) = counting(handle);

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(sync_count.load(Ordering::SeqCst), 1);

        scheduler.set_mode(SyncMode::Manual);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sync_count.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_sync_request() {
        let (scheduler, handle) = SyncScheduler::new(SyncMode::Manual);

        let sync_count = Arc::new(AtomicU32::new(0));
        let count_clone = sync_count.clone();

        let handle_task = tokio::spawn(handle.run(move |_request| {
            let count = count_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                completed()
            }
        }));

        let outcome = scheduler.request_sync().await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Completed { uploaded: 1, .. }));
        assert_eq!(sync_count.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;
        handle_task.await.unwrap();

        assert!(scheduler.request_sync().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sync() {
        let (scheduler, handle) = SyncScheduler::new(SyncMode::Periodic {
            interval: Duration::from_secs(30),
        });

        let sync_count = Arc::new(AtomicU32::new(0));
        let count_clone = sync_count.clone();

        let handle_task = tokio::spawn(handle.run(move |_request| {
            let count = count_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                completed()
            }
        }));

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(sync_count.load(Ordering::SeqCst), 3);

        scheduler.shutdown().await;
        handle_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropping_scheduler_stops_handle() {
        let (scheduler, handle) = SyncScheduler::new(SyncMode::Manual);
        let handle_task = tokio::spawn(handle.run(|_request| async { completed() }));

        drop(scheduler);
        handle_task.await.unwrap();
    }
}
