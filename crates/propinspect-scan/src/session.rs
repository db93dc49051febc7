//! Scan sessions: one user-triggered scan at a time, run in the background.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;

use strum::Display;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use propinspect_core::{ModelHost, ScanConfig, ScanError, ScanOutcome, ScanSnapshot};

use crate::progress::{ProgressTracker, ScanProgress};
use crate::walker::ItemWalker;
use crate::PROGRESS_CHANNEL_SIZE;

const WORKER_PANICKED: &str = "scan worker panicked";

/// Lifecycle state of a [`ScanSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ScanState {
    /// No scan has been started.
    Idle,
    /// A scan is in progress.
    Running,
    /// The last scan traversed its whole scope.
    Completed,
    /// The last scan was cancelled; partial results are kept.
    Cancelled,
    /// The host failed during the last scan; partial results are kept.
    Failed,
}

impl ScanState {
    /// Check if this is a finished-scan state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    fn from_outcome(outcome: &ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Running => Self::Running,
            ScanOutcome::Completed => Self::Completed,
            ScanOutcome::Cancelled => Self::Cancelled,
            ScanOutcome::Failed { .. } => Self::Failed,
        }
    }
}

/// Where the current scan's snapshot lives.
#[derive(Debug)]
enum Slot {
    /// Being written by the worker.
    Live(ScanSnapshot),
    /// Finished and immutable.
    Frozen(Arc<ScanSnapshot>),
}

type SharedSlot = Arc<RwLock<Slot>>;

fn read_slot(slot: &RwLock<Slot>) -> RwLockReadGuard<'_, Slot> {
    slot.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_slot(slot: &RwLock<Slot>) -> RwLockWriteGuard<'_, Slot> {
    slot.write().unwrap_or_else(PoisonError::into_inner)
}

/// Finish the live snapshot with `outcome` and freeze it.
fn freeze(slot: &RwLock<Slot>, outcome: ScanOutcome) -> Arc<ScanSnapshot> {
    let mut guard = write_slot(slot);
    let frozen = match &mut *guard {
        Slot::Live(snapshot) => {
            snapshot.finish(outcome);
            let scope = snapshot.scope;
            Arc::new(std::mem::replace(snapshot, ScanSnapshot::new(scope)))
        }
        Slot::Frozen(frozen) => return Arc::clone(frozen),
    };
    *guard = Slot::Frozen(Arc::clone(&frozen));
    frozen
}

/// Orchestrates property scans over a host model.
///
/// At most one scan runs per session. [`ScanSession::start`] returns at once;
/// traversal and aggregation happen on a dedicated worker thread, which is
/// the only writer of the snapshot. Readers see a consistent view through
/// [`ScanSession::with_snapshot`] at any time, or take the frozen result with
/// [`ScanSession::snapshot`] once the scan has ended.
pub struct ScanSession {
    slot: Option<SharedSlot>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
    state_tx: Arc<watch::Sender<ScanState>>,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl ScanSession {
    /// Create an idle session.
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(ScanState::Idle);
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Self {
            slot: None,
            cancel: CancellationToken::new(),
            worker: None,
            state_tx: Arc::new(state_tx),
            progress_tx,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ScanState {
        *self.state_tx.borrow()
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Watch lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<ScanState> {
        self.state_tx.subscribe()
    }

    /// Start a new scan of `host`.
    ///
    /// Valid when idle or after a previous scan ended. The previous snapshot
    /// is released by the session; callers holding its `Arc` keep it.
    pub fn start<H>(&mut self, host: Arc<H>, config: ScanConfig) -> Result<(), ScanError>
    where
        H: ModelHost + Send + Sync + 'static + ?Sized,
    {
        let previous = self.state();
        if previous == ScanState::Running {
            return Err(ScanError::AlreadyInProgress);
        }
        config.category_filter()?;

        if let Some(handle) = self.worker.take() {
            // Already finished, so this does not block.
            let _ = handle.join();
        }

        let cancel = CancellationToken::new();
        let slot: SharedSlot = Arc::new(RwLock::new(Slot::Live(ScanSnapshot::new(config.scope))));
        self.state_tx.send_replace(ScanState::Running);

        let worker = Worker {
            slot: Arc::clone(&slot),
            cancel: cancel.clone(),
            state_tx: Arc::clone(&self.state_tx),
            progress_tx: self.progress_tx.clone(),
        };
        let spawned = std::thread::Builder::new()
            .name("propinspect-scan".to_string())
            .spawn(move || worker.run(&*host, &config));

        match spawned {
            Ok(handle) => {
                self.slot = Some(slot);
                self.cancel = cancel;
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.state_tx.send_replace(previous);
                Err(ScanError::WorkerSpawn(err))
            }
        }
    }

    /// Request cooperative cancellation of the running scan.
    ///
    /// The worker stops after the item it is currently reading. No effect
    /// when no scan is running.
    pub fn cancel(&self) {
        if self.state() == ScanState::Running {
            debug!("scan cancellation requested");
            self.cancel.cancel();
        }
    }

    /// Block until the worker has finished and return the final state.
    pub fn join(&mut self) -> ScanState {
        let panicked = self
            .worker
            .take()
            .is_some_and(|handle| handle.join().is_err());
        if panicked {
            warn!("scan worker panicked");
            if let Some(slot) = &self.slot {
                let frozen = freeze(
                    slot,
                    ScanOutcome::Failed {
                        reason: WORKER_PANICKED.to_string(),
                    },
                );
                self.state_tx
                    .send_replace(ScanState::from_outcome(&frozen.outcome));
            }
        }
        self.state()
    }

    /// Wait asynchronously for the running scan to end.
    ///
    /// Returns immediately when no scan is running.
    pub async fn finished(&self) -> ScanState {
        let mut rx = self.state_tx.subscribe();
        match rx.wait_for(|state| *state != ScanState::Running).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }

    /// Read the current snapshot, live or frozen, under a brief lock.
    ///
    /// Returns `None` if no scan was ever started.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&ScanSnapshot) -> R) -> Option<R> {
        let slot = self.slot.as_ref()?;
        let guard = read_slot(slot);
        Some(match &*guard {
            Slot::Live(snapshot) => f(snapshot),
            Slot::Frozen(snapshot) => f(snapshot),
        })
    }

    /// The frozen snapshot of the last scan, once it has ended.
    pub fn snapshot(&self) -> Option<Arc<ScanSnapshot>> {
        let slot = self.slot.as_ref()?;
        match &*read_slot(slot) {
            Slot::Live(_) => None,
            Slot::Frozen(snapshot) => Some(Arc::clone(snapshot)),
        }
    }

    /// Items visited so far by the current or last scan.
    pub fn items_visited(&self) -> u64 {
        self.with_snapshot(|snapshot| snapshot.items_visited)
            .unwrap_or(0)
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        // Let a detached worker wind down instead of scanning to the end.
        self.cancel.cancel();
    }
}

/// State moved onto the worker thread.
struct Worker {
    slot: SharedSlot,
    cancel: CancellationToken,
    state_tx: Arc<watch::Sender<ScanState>>,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl Worker {
    fn run<H: ModelHost + ?Sized>(self, host: &H, config: &ScanConfig) {
        info!(scope = %config.scope, "property scan started");
        let mut tracker = ProgressTracker::new(config.progress_interval);

        // A panicking host must still leave the session in a terminal state.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.scan(host, config, &mut tracker)
        }))
        .unwrap_or_else(|_| {
            warn!("scan worker panicked, keeping partial results");
            ScanOutcome::Failed {
                reason: WORKER_PANICKED.to_string(),
            }
        });

        let frozen = freeze(&self.slot, outcome);
        let _ = self.progress_tx.send(tracker.snapshot(frozen.index.key_count()));

        let state = ScanState::from_outcome(&frozen.outcome);
        info!(
            state = %state,
            items = frozen.items_visited,
            keys = frozen.index.key_count(),
            "property scan finished"
        );
        self.state_tx.send_replace(state);
    }

    fn scan<H: ModelHost + ?Sized>(
        &self,
        host: &H,
        config: &ScanConfig,
        tracker: &mut ProgressTracker,
    ) -> ScanOutcome {
        match ItemWalker::new(host, config, self.cancel.clone()) {
            Ok(mut walker) => self.drive(&mut walker, tracker),
            Err(err) => {
                warn!(error = %err, "could not read scan roots");
                ScanOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn drive<H: ModelHost + ?Sized>(
        &self,
        walker: &mut ItemWalker<'_, H>,
        tracker: &mut ProgressTracker,
    ) -> ScanOutcome {
        for result in walker.by_ref() {
            let visited = match result {
                Ok(visited) => visited,
                Err(err) => {
                    warn!(error = %err, "host model access failed, keeping partial results");
                    return ScanOutcome::Failed {
                        reason: err.to_string(),
                    };
                }
            };

            let due = tracker.record_item(visited.item, visited.properties.len());
            let distinct_keys = {
                let mut guard = write_slot(&self.slot);
                match &mut *guard {
                    Slot::Live(snapshot) => {
                        snapshot.record_item(visited.item, visited.depth, visited.properties);
                        snapshot.index.key_count()
                    }
                    Slot::Frozen(_) => 0,
                }
            };
            if due {
                let _ = self.progress_tx.send(tracker.snapshot(distinct_keys));
            }
        }

        if walker.was_cancelled() {
            debug!(items = walker.items_visited(), "scan stopped on cancellation");
            ScanOutcome::Cancelled
        } else {
            ScanOutcome::Completed
        }
    }
}
