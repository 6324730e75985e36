//! Offline capture queue and sync state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use accuread_common::{Error, QueueItem, Result};
use accuread_storage::PersistentQueueStore;

use crate::connectivity::{AlwaysOnline, ConnectivityEvent, ConnectivityMonitor};
use crate::retry::RetryPolicy;
use crate::scheduler::{SyncMode, SyncScheduler};
use crate::state::SyncState;
use crate::upload::UploadCollaborator;

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Retries for transient network failures within one sync.
    pub upload_retries: u32,
    /// Initial backoff delay between those retries.
    pub retry_initial_delay_ms: u64,
    /// Cap on any single backoff delay.
    pub retry_max_delay_ms: u64,
    /// Randomize backoff delays by +/-25%.
    pub retry_jitter: bool,
    /// Schedule a sync whenever connectivity comes back.
    pub sync_on_reconnect: bool,
    /// Scheduling mode for the background scheduler.
    pub mode: SyncMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            upload_retries: 0,
            retry_initial_delay_ms: 1000,
            retry_max_delay_ms: 30_000,
            retry_jitter: true,
            sync_on_reconnect: true,
            mode: SyncMode::Manual,
        }
    }
}

impl SyncConfig {
    /// Upload retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.upload_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            jitter: self.retry_jitter,
        }
    }
}

/// Why a sync request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The connectivity monitor reports offline.
    Offline,
    /// Nothing is queued.
    EmptyQueue,
    /// Another sync is already in flight.
    AlreadyInProgress,
}

/// Result of a sync request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The whole snapshot was uploaded and the queue cleared.
    Completed { uploaded: usize, duration: Duration },
    /// The request was a no-op.
    Skipped(SkipReason),
}

/// Owns the offline queue mirror and drives the sync state machine.
///
/// At most one sync is in flight at a time. `add_to_queue` and `clear_queue`
/// wait for an in-flight sync to finish before touching the store, so a sync
/// only ever clears the items it uploaded.
pub struct SyncOrchestrator<S, U>
where
    S: PersistentQueueStore + ?Sized,
    U: UploadCollaborator + ?Sized,
{
    /// Durable queue storage.
    store: Arc<S>,
    /// Batch uploader.
    uploader: Arc<U>,
    /// Online/offline source.
    connectivity: Arc<dyn ConnectivityMonitor>,
    /// In-memory mirror of the persisted queue.
    mirror: RwLock<Vec<QueueItem>>,
    /// Serializes queue mutations with the snapshot-upload-clear section of a sync.
    queue_lock: Mutex<()>,
    /// Non-blocking guard against concurrent syncs.
    sync_in_progress: AtomicBool,
    /// Published state for observers.
    state: watch::Sender<SyncState>,
    /// Backoff for transient upload failures.
    retry: RetryPolicy,
    /// Configuration.
    config: SyncConfig,
}

impl<S, U> SyncOrchestrator<S, U>
where
    S: PersistentQueueStore + ?Sized + 'static,
    U: UploadCollaborator + ?Sized + 'static,
{
    /// Create a new orchestrator that assumes it is always online.
    ///
    /// The mirror starts empty; call [`load`](Self::load) to pick up items
    /// persisted by a previous run.
    pub fn new(store: Arc<S>, uploader: Arc<U>, config: SyncConfig) -> Self {
        let (state, _) = watch::channel(SyncState::new());

        Self {
            store,
            uploader,
            connectivity: Arc::new(AlwaysOnline),
            mirror: RwLock::new(Vec::new()),
            queue_lock: Mutex::new(()),
            sync_in_progress: AtomicBool::new(false),
            state,
            retry: config.retry_policy(),
            config,
        }
    }

    /// Use the given connectivity monitor instead of assuming online.
    pub fn with_connectivity(mut self, monitor: Arc<dyn ConnectivityMonitor>) -> Self {
        let online = monitor.is_online();
        self.connectivity = monitor;
        self.state.send_modify(|s| s.is_online = online);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Load the mirror from the store.
    pub async fn load(&self) -> Result<()> {
        let _queue = self.queue_lock.lock().await;
        let items = self.reload().await?;
        info!("Loaded offline queue: {} pending", items.len());
        Ok(())
    }

    /// Whether the connectivity monitor reports online.
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Number of captures in the mirror.
    pub fn queue_count(&self) -> usize {
        self.state.borrow().queue_count
    }

    /// Whether a sync is currently in flight.
    pub fn sync_in_progress(&self) -> bool {
        self.sync_in_progress.load(Ordering::SeqCst)
    }

    /// Snapshot of the mirror.
    pub async fn queue(&self) -> Vec<QueueItem> {
        self.mirror.read().await.clone()
    }

    /// Snapshot of the published state.
    ///
    /// `is_online` is refreshed from the monitor first, so it is current even
    /// without a running connectivity listener.
    pub fn state(&self) -> SyncState {
        self.refresh_online();
        self.state.borrow().clone()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Enqueue a capture.
    ///
    /// Never consults connectivity and never deduplicates. Waits for an
    /// in-flight sync to finish first.
    ///
    /// # Errors
    /// - `Error::Persistence` if the store write fails; the queue is unchanged
    pub async fn add_to_queue(&self, payload_ref: impl Into<String>) -> Result<QueueItem> {
        let item = QueueItem::new(payload_ref);

        let _queue = self.queue_lock.lock().await;
        self.store.add_to_offline_queue(item.clone()).await?;
        let items = self.reload().await?;

        debug!("Queued {} ({}), {} pending", item.id, item.payload_ref, items.len());
        Ok(item)
    }

    /// Discard every queued capture without uploading.
    ///
    /// # Errors
    /// - `Error::Persistence` if the store write fails
    pub async fn clear_queue(&self) -> Result<()> {
        let _queue = self.queue_lock.lock().await;
        self.store.clear_offline_queue().await?;
        self.reload().await?;

        info!("Offline queue discarded");
        Ok(())
    }

    /// Upload the queued captures as one batch.
    ///
    /// Returns `Skipped` without side effects when offline, when the queue is
    /// empty, or when another sync is in flight. The store is cleared only if
    /// the upload of the whole snapshot succeeded.
    ///
    /// # Errors
    /// - `Error::Upload` if the batch failed; the queue is left intact
    /// - `Error::Persistence` if the store could not be read or cleared
    pub async fn sync_offline_data(&self) -> Result<SyncOutcome> {
        if !self.refresh_online() {
            debug!("Sync skipped: offline");
            return Ok(SyncOutcome::Skipped(SkipReason::Offline));
        }

        let Some(_guard) = SyncGuard::acquire(&self.sync_in_progress, &self.state) else {
            debug!("Sync skipped: already in progress");
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadyInProgress));
        };

        let _queue = self.queue_lock.lock().await;
        let snapshot = self.reload().await?;
        if snapshot.is_empty() {
            debug!("Sync skipped: queue empty");
            return Ok(SyncOutcome::Skipped(SkipReason::EmptyQueue));
        }

        let start = Instant::now();
        self.state.send_modify(|s| s.mark_syncing());
        info!(
            "Starting sync of {} captures via {}",
            snapshot.len(),
            self.uploader.name()
        );

        if let Err(err) = self
            .retry
            .execute(|| self.uploader.upload(&snapshot))
            .await
        {
            let err = match err {
                Error::Network(msg) => Error::Upload(format!("network unavailable: {}", msg)),
                other => other,
            };
            error!("Sync failed, {} captures kept: {}", snapshot.len(), err);
            self.state.send_modify(|s| s.mark_failed(err.to_string()));
            return Err(err);
        }

        if let Err(err) = self.store.clear_offline_queue().await {
            error!("Uploaded batch but could not clear queue: {}", err);
            self.state.send_modify(|s| s.mark_failed(err.to_string()));
            return Err(err);
        }
        if let Err(err) = self.reload().await {
            // The store was cleared under the queue lock, so it is empty.
            error!("Queue cleared but could not be re-read: {}", err);
            self.mirror.write().await.clear();
            self.state.send_modify(|s| {
                s.queue_count = 0;
                s.mark_failed(err.to_string());
            });
            return Err(err);
        }

        let duration = start.elapsed();
        self.state.send_modify(|s| s.mark_synced(chrono::Utc::now()));
        info!("Sync completed in {:?}: {} uploaded", duration, snapshot.len());

        Ok(SyncOutcome::Completed {
            uploaded: snapshot.len(),
            duration,
        })
    }

    /// Watch the connectivity monitor in the background.
    ///
    /// Publishes every transition and, when `sync_on_reconnect` is set,
    /// spawns a sync on each offline-to-online transition. The task holds
    /// only a weak reference and ends once the orchestrator is dropped or the
    /// monitor goes away, deregistering its subscription.
    pub fn spawn_connectivity_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let mut subscription = self.connectivity.subscribe();
        let mut state_rx = self.state.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = subscription.recv() => {
                        let Some(event) = event else { break };
                        if !Self::on_connectivity_event(&weak, event) {
                            break;
                        }
                    }
                    // Errs once the orchestrator, and with it the state sender, is dropped.
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Connectivity listener stopped");
        })
    }

    /// Returns false if the orchestrator is gone.
    fn on_connectivity_event(weak: &Weak<Self>, event: ConnectivityEvent) -> bool {
        let Some(orchestrator) = weak.upgrade() else {
            return false;
        };

        let online = event == ConnectivityEvent::Online;
        orchestrator.state.send_modify(|s| s.is_online = online);
        info!("Connectivity {}", if online { "restored" } else { "lost" });

        if online && orchestrator.config.sync_on_reconnect {
            tokio::spawn(async move {
                if let Err(e) = orchestrator.sync_offline_data().await {
                    error!("Reconnect sync failed: {}", e);
                }
            });
        }
        true
    }

    /// Start the background scheduler in the configured mode.
    pub fn spawn_scheduler(self: &Arc<Self>) -> (SyncScheduler, JoinHandle<()>) {
        let (scheduler, handle) = SyncScheduler::new(self.config.mode.clone());
        let orchestrator = Arc::clone(self);

        let task = tokio::spawn(handle.run(move |_request| {
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.sync_offline_data().await }
        }));

        (scheduler, task)
    }

    /// Publish the monitor's current online state. Returns it.
    fn refresh_online(&self) -> bool {
        let online = self.connectivity.is_online();
        self.state.send_if_modified(|s| {
            let changed = s.is_online != online;
            s.is_online = online;
            changed
        });
        online
    }

    /// Refresh the mirror from the store. Caller holds `queue_lock`.
    async fn reload(&self) -> Result<Vec<QueueItem>> {
        let items = self.store.get_offline_queue().await?;
        let count = items.len();
        *self.mirror.write().await = items.clone();
        self.state.send_modify(|s| s.queue_count = count);
        Ok(items)
    }
}

/// Holds the sync flag; releasing it returns the state machine to idle.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
    state: &'a watch::Sender<SyncState>,
}

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool, state: &'a watch::Sender<SyncState>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag, state })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.state.send_if_modified(|s| {
            let was_syncing = s.sync_in_progress;
            s.mark_idle();
            was_syncing
        });
    }
}
