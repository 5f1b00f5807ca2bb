//! The sync orchestrator: state machine, single-flight guard and cycle.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote_name::encode_remote_name;
use crate::scheduler::{Scheduler, SchedulerMsg, Trigger};
use crate::status::{StatusCallback, StatusEvent, StatusFeed, SyncRecord, SyncState};
use crate::store::{LocalStore, RemoteFileInfo, RemoteStore};
use parking_lot::{Mutex, RwLock};
use regsync_model::{Snapshot, Timestamp};
use regsync_reconcile::{compare, resolve, DiffReport, Direction};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Orchestrates reconciliation cycles between the local and remote store.
///
/// Constructed once by the host and passed by handle to any caller
/// needing control or status. Timers and the watcher subscription are
/// owned resources, started by [`enable`](Self::enable) and torn down by
/// [`disable`](Self::disable).
pub struct SyncOrchestrator<L: LocalStore + 'static, R: RemoteStore + 'static> {
    inner: Arc<Inner<L, R>>,
    control: Mutex<Option<Enabled>>,
}

struct Enabled {
    scheduler: Scheduler,
    watch_token: u64,
}

struct Inner<L, R> {
    config: SyncConfig,
    local: Arc<L>,
    remote: Arc<R>,
    record: RwLock<SyncRecord>,
    status: StatusFeed,
}

impl<L: LocalStore + 'static, R: RemoteStore + 'static> SyncOrchestrator<L, R> {
    /// Creates a disabled orchestrator over the two stores.
    pub fn new(config: SyncConfig, local: Arc<L>, remote: Arc<R>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                local,
                remote,
                record: RwLock::new(SyncRecord::default()),
                status: StatusFeed::new(),
            }),
            control: Mutex::new(None),
        }
    }

    /// Starts the timers and subscribes to the local-store watcher.
    /// A no-op when already enabled.
    pub fn enable(&self) {
        let mut control = self.control.lock();
        if control.is_some() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let scheduler = Scheduler::start(
            self.inner.config.startup_delay,
            self.inner.config.periodic_interval,
            self.inner.config.debounce_delay,
            move |trigger| {
                inner.run_cycle(trigger);
            },
        );

        let change_tx = scheduler.change_sender();
        let watch_token = self.inner.local.watch(Box::new(move || {
            let _ = change_tx.send(SchedulerMsg::Change);
        }));

        *control = Some(Enabled {
            scheduler,
            watch_token,
        });
        info!("sync orchestrator enabled");
    }

    /// Cancels the periodic and debounce timers and unsubscribes the
    /// watcher. A transfer already started runs to completion; only
    /// future scheduling is suppressed. A no-op when already disabled.
    pub fn disable(&self) {
        let enabled = self.control.lock().take();
        if let Some(mut enabled) = enabled {
            self.inner.local.unwatch(enabled.watch_token);
            enabled.scheduler.stop();
            info!("sync orchestrator disabled");
        }
    }

    /// Whether timers and the watcher subscription are active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.control.lock().is_some()
    }

    /// Cancels any pending debounce and immediately runs a cycle on the
    /// caller's thread. Returns false when a cycle is already in flight
    /// (the trigger is dropped, never queued). Works whether or not the
    /// orchestrator is enabled; enablement only governs the timers and
    /// the watcher subscription.
    pub fn manual_sync(&self) -> bool {
        if let Some(enabled) = self.control.lock().as_ref() {
            enabled.scheduler.cancel_debounce();
        }
        self.inner.run_cycle(Trigger::Manual)
    }

    /// Returns a copy of the orchestrator's state record.
    #[must_use]
    pub fn status(&self) -> SyncRecord {
        self.inner.record.read().clone()
    }

    /// Subscribes to status events on a channel.
    pub fn subscribe(&self) -> Receiver<StatusEvent> {
        self.inner.status.subscribe()
    }

    /// Registers a status observer; returns a token for removal.
    pub fn on_state_change(&self, callback: StatusCallback) -> u64 {
        self.inner.status.observe(callback)
    }

    /// Removes a previously registered status observer.
    pub fn remove_observer(&self, token: u64) {
        self.inner.status.unobserve(token);
    }

    /// Compares the local snapshot against the latest remote snapshot
    /// without applying anything. Returns `None` when no remote snapshot
    /// exists. Independent of the automated path: safe at any time.
    pub fn review_remote(&self) -> SyncResult<Option<DiffReport>> {
        let Some(info) = self.inner.remote_list_latest()? else {
            return Ok(None);
        };

        let bytes = self.inner.remote_download(&info.id)?;
        let remote = Snapshot::from_json_bytes(&bytes).map_err(SyncError::MalformedRemoteContent)?;
        let local = self.inner.local.read_snapshot()?;
        Ok(Some(compare(&local, &remote)))
    }
}

impl<L: LocalStore + 'static, R: RemoteStore + 'static> Drop for SyncOrchestrator<L, R> {
    fn drop(&mut self) {
        self.disable();
    }
}

impl<L: LocalStore + 'static, R: RemoteStore + 'static> Inner<L, R> {
    /// Runs a remote-store call on a worker thread and waits at most
    /// `op_timeout` for its result. On timeout the cycle fails with
    /// [`SyncError::Timeout`]; the stalled call is abandoned, not
    /// interrupted, and its result is discarded.
    fn with_op_timeout<T, F>(&self, call: F) -> SyncResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> SyncResult<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(call());
        });
        match rx.recv_timeout(self.config.op_timeout) {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout),
        }
    }

    fn remote_list_latest(&self) -> SyncResult<Option<RemoteFileInfo>> {
        let remote = Arc::clone(&self.remote);
        let prefix = self.config.remote_prefix.clone();
        self.with_op_timeout(move || remote.list_latest(&prefix))
    }

    fn remote_upload(&self, content: Vec<u8>, filename: String) -> SyncResult<RemoteFileInfo> {
        let remote = Arc::clone(&self.remote);
        self.with_op_timeout(move || remote.upload(&content, &filename))
    }

    fn remote_download(&self, id: &str) -> SyncResult<Vec<u8>> {
        let remote = Arc::clone(&self.remote);
        let id = id.to_string();
        self.with_op_timeout(move || remote.download(&id))
    }

    /// Runs one reconciliation cycle. Returns false when the trigger was
    /// dropped by the single-flight guard.
    fn run_cycle(&self, trigger: Trigger) -> bool {
        if !self.begin_cycle() {
            debug!(?trigger, "trigger dropped, cycle already in flight");
            return false;
        }
        info!(?trigger, "sync cycle started");

        if let Err(err) = self.execute_cycle() {
            self.fail_cycle(&err);
        }
        true
    }

    /// Single-flight guard: moves {Idle, Error, Conflict} to Checking;
    /// drops the trigger from any other state.
    fn begin_cycle(&self) -> bool {
        {
            let mut record = self.record.write();
            if record.is_syncing || !record.state.can_trigger() {
                return false;
            }
            record.state = SyncState::Checking;
            record.is_syncing = true;
            record.last_check_time = Some(Timestamp::now());
            record.last_error = None;
        }
        self.emit_status();
        true
    }

    fn execute_cycle(&self) -> SyncResult<()> {
        let remote_info = self.remote_list_latest()?;
        let local_mtime = self.local.last_modified_time()?;
        let last_sync = self.record.read().last_sync_time;

        let direction = resolve(
            remote_info.as_ref().map(|info| info.modified_time),
            last_sync,
            local_mtime,
        );
        info!(?direction, "sync direction resolved");

        match (direction, remote_info) {
            (Direction::None, _) => self.finish_cycle(None),
            (Direction::Upload, _) => self.upload()?,
            (Direction::Download, Some(info)) => self.download(&info)?,
            (Direction::Conflict, Some(info)) => {
                // Policy: last-writer-wins from the remote side. Local
                // edits made since the last sync are overwritten.
                warn!("concurrent edits on both replicas; remote wins");
                self.transition(SyncState::Conflict);
                self.download(&info)?;
            }
            // resolve never yields Download/Conflict without a remote.
            (_, None) => self.finish_cycle(None),
        }
        Ok(())
    }

    fn upload(&self) -> SyncResult<()> {
        self.transition(SyncState::SyncingUp);

        let snapshot = self.local.read_snapshot()?;
        let filename = encode_remote_name(&self.config.remote_prefix, &snapshot.metadata);
        let content = snapshot
            .to_json_bytes()
            .map_err(|e| SyncError::local_io(e.to_string()))?;

        let info = self.remote_upload(content, filename)?;
        info!(name = %info.name, entities = snapshot.entity_count(), "snapshot uploaded");
        self.finish_cycle(Some(info));
        Ok(())
    }

    fn download(&self, info: &RemoteFileInfo) -> SyncResult<()> {
        self.transition(SyncState::SyncingDown);

        let bytes = self.remote_download(&info.id)?;
        // The local store stays untouched until parsing succeeds.
        let snapshot = Snapshot::from_json_bytes(&bytes).map_err(SyncError::MalformedRemoteContent)?;
        self.local.write_snapshot(&snapshot)?;

        info!(name = %info.name, entities = snapshot.entity_count(), "snapshot downloaded");
        self.finish_cycle(Some(info.clone()));
        Ok(())
    }

    /// Records a successful cycle and returns to Idle.
    ///
    /// `last_sync_time` is clamped to the remote modification time so a
    /// remote clock slightly ahead of ours cannot make the next cycle
    /// re-download our own upload.
    fn finish_cycle(&self, transferred: Option<RemoteFileInfo>) {
        {
            let mut record = self.record.write();
            if let Some(info) = transferred {
                record.last_sync_time = Some(Timestamp::now().max(info.modified_time));
                record.remote_modified_time = Some(info.modified_time);
                record.remote_snapshot_id = Some(info.id);
            }
            record.state = SyncState::Idle;
            record.is_syncing = false;
        }
        self.emit_status();
    }

    fn fail_cycle(&self, err: &SyncError) {
        error!(%err, recoverable = err.is_recoverable(), "sync cycle failed");
        {
            let mut record = self.record.write();
            record.state = SyncState::Error;
            record.last_error = Some(err.to_string());
            record.is_syncing = false;
        }
        self.emit_status();
    }

    fn transition(&self, state: SyncState) {
        self.record.write().state = state;
        self.emit_status();
    }

    fn emit_status(&self) {
        let event = {
            let record = self.record.read();
            StatusEvent {
                state: record.state,
                error: record.last_error.clone(),
                last_sync_time: record.last_sync_time,
            }
        };
        self.status.emit(event);
    }
}
