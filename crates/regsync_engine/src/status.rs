//! Orchestrator state, status record and the status feed.

use parking_lot::RwLock;
use regsync_model::Timestamp;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// The current state of the sync orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No cycle in progress.
    Idle,
    /// Resolving the sync direction.
    Checking,
    /// Uploading the local snapshot.
    SyncingUp,
    /// Downloading the remote snapshot.
    SyncingDown,
    /// Concurrent edits detected on both replicas.
    Conflict,
    /// The last cycle failed; the message is in `last_error`.
    Error,
}

impl SyncState {
    /// Whether a trigger may start a new cycle from this state.
    #[must_use]
    pub fn can_trigger(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Error | SyncState::Conflict)
    }
}

/// The orchestrator's own state record.
///
/// Owned exclusively by the orchestrator and mutated only on state
/// transitions; callers get a copy via `status()`.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRecord {
    /// Current state machine state.
    pub state: SyncState,
    /// Completion time of the last successful cycle.
    pub last_sync_time: Option<Timestamp>,
    /// Start time of the last cycle, successful or not.
    pub last_check_time: Option<Timestamp>,
    /// Message of the last failure, cleared when a new cycle begins.
    pub last_error: Option<String>,
    /// Id of the remote snapshot from the last transfer.
    pub remote_snapshot_id: Option<String>,
    /// Remote modification time from the last transfer.
    pub remote_modified_time: Option<Timestamp>,
    /// Whether a cycle is currently in flight.
    pub is_syncing: bool,
}

impl Default for SyncRecord {
    fn default() -> Self {
        Self {
            state: SyncState::Idle,
            last_sync_time: None,
            last_check_time: None,
            last_error: None,
            remote_snapshot_id: None,
            remote_modified_time: None,
            is_syncing: false,
        }
    }
}

/// Payload pushed on every state transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    /// State after the transition.
    pub state: SyncState,
    /// Current error message, if any.
    pub error: Option<String>,
    /// Completion time of the last successful cycle.
    pub last_sync_time: Option<Timestamp>,
}

/// Callback registered by a status observer.
pub type StatusCallback = Box<dyn Fn(&StatusEvent) + Send + Sync>;

/// Distributes status events to channel subscribers and observers.
///
/// Channel subscribers receive every event on an mpsc receiver
/// (disconnected receivers are pruned on emit); observers are invoked
/// inline on the emitting thread.
#[derive(Default)]
pub struct StatusFeed {
    subscribers: RwLock<Vec<Sender<StatusEvent>>>,
    observers: RwLock<Vec<(u64, StatusCallback)>>,
    next_token: AtomicU64,
}

impl StatusFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to all future status events.
    pub fn subscribe(&self) -> Receiver<StatusEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Registers an observer callback; returns a token for removal.
    pub fn observe(&self, callback: StatusCallback) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.observers.write().push((token, callback));
        token
    }

    /// Removes a previously registered observer.
    pub fn unobserve(&self, token: u64) {
        self.observers.write().retain(|(t, _)| *t != token);
    }

    /// Emits an event to every subscriber and observer.
    pub fn emit(&self, event: StatusEvent) {
        {
            let mut subscribers = self.subscribers.write();
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
        for (_, callback) in self.observers.read().iter() {
            callback(&event);
        }
    }

    /// Number of active channel subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
