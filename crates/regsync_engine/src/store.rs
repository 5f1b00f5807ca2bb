//! Store capability traits and in-memory fakes.
//!
//! The orchestrator only sees these narrow interfaces, so it can be
//! exercised against in-memory fakes in tests. The real collaborators
//! (the record CRUD layer's store and the authorized remote drive
//! client) live in the host application.

use crate::error::{SyncError, SyncResult};
use parking_lot::{Mutex, RwLock};
use regsync_model::{Snapshot, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback invoked when the local store changes.
pub type WatchCallback = Box<dyn Fn() + Send + Sync>;

/// The local structured document store.
///
/// The orchestrator reads whole snapshots for upload and writes whole
/// snapshots on download; individual entities are mutated only by the
/// external CRUD layer. Implementations must serialize all writes behind
/// a single writer lock and apply overwrites atomically.
pub trait LocalStore: Send + Sync {
    /// Reads the full current snapshot.
    fn read_snapshot(&self) -> SyncResult<Snapshot>;

    /// Replaces the store contents with the given snapshot, atomically.
    fn write_snapshot(&self, snapshot: &Snapshot) -> SyncResult<()>;

    /// Modification time of the store contents.
    fn last_modified_time(&self) -> SyncResult<Timestamp>;

    /// Registers a change callback; returns a token for `unwatch`.
    ///
    /// Callbacks fire for changes made by the external CRUD layer. The
    /// orchestrator's own `write_snapshot` does not notify, since the
    /// writer already knows.
    fn watch(&self, on_change: WatchCallback) -> u64;

    /// Removes a previously registered change callback.
    fn unwatch(&self, token: u64);
}

/// Description of the latest remote snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileInfo {
    /// Remote file id, used for download.
    pub id: String,
    /// Remote filename (encodes both platform counters).
    pub name: String,
    /// Remote modification time.
    pub modified_time: Timestamp,
}

/// The remote copy of the store, content addressed by filename.
pub trait RemoteStore: Send + Sync {
    /// Returns the latest remote snapshot whose name starts with
    /// `prefix`, or `None` when no remote snapshot exists.
    fn list_latest(&self, prefix: &str) -> SyncResult<Option<RemoteFileInfo>>;

    /// Uploads content under the given filename.
    fn upload(&self, content: &[u8], filename: &str) -> SyncResult<RemoteFileInfo>;

    /// Downloads the content of the file with the given id.
    fn download(&self, id: &str) -> SyncResult<Vec<u8>>;
}

/// In-memory local store for tests and embedding.
pub struct MemoryLocalStore {
    snapshot: RwLock<Snapshot>,
    mtime: RwLock<Timestamp>,
    watchers: RwLock<Vec<(u64, WatchCallback)>>,
    next_token: AtomicU64,
    // Single writer lock per the shared-resource policy.
    write_lock: Mutex<()>,
}

impl MemoryLocalStore {
    /// Creates a store holding the given snapshot.
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            mtime: RwLock::new(Timestamp::now()),
            watchers: RwLock::new(Vec::new()),
            next_token: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Replaces the snapshot the way the external CRUD layer would:
    /// bumps the modification time and notifies watchers.
    pub fn replace_snapshot(&self, snapshot: Snapshot) {
        {
            let _guard = self.write_lock.lock();
            *self.snapshot.write() = snapshot;
            *self.mtime.write() = Timestamp::now();
        }
        self.notify();
    }

    /// Overrides the modification time (test hook).
    pub fn set_modified_time(&self, mtime: Timestamp) {
        *self.mtime.write() = mtime;
    }

    /// Current number of registered watchers.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }

    fn notify(&self) {
        for (_, callback) in self.watchers.read().iter() {
            callback();
        }
    }
}

impl Default for MemoryLocalStore {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

impl LocalStore for MemoryLocalStore {
    fn read_snapshot(&self) -> SyncResult<Snapshot> {
        Ok(self.snapshot.read().clone())
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> SyncResult<()> {
        let _guard = self.write_lock.lock();
        *self.snapshot.write() = snapshot.clone();
        *self.mtime.write() = Timestamp::now();
        Ok(())
    }

    fn last_modified_time(&self) -> SyncResult<Timestamp> {
        Ok(*self.mtime.read())
    }

    fn watch(&self, on_change: WatchCallback) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.watchers.write().push((token, on_change));
        token
    }

    fn unwatch(&self, token: u64) {
        self.watchers.write().retain(|(t, _)| *t != token);
    }
}

struct StoredFile {
    info: RemoteFileInfo,
    content: Vec<u8>,
}

/// In-memory remote store with failure injection, for tests.
#[derive(Default)]
pub struct MemoryRemoteStore {
    stored: RwLock<Option<StoredFile>>,
    next_id: AtomicU64,
    fail_next: Mutex<Option<SyncError>>,
}

impl MemoryRemoteStore {
    /// Creates an empty remote store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next remote operation fail with the given error.
    pub fn fail_next(&self, error: SyncError) {
        *self.fail_next.lock() = Some(error);
    }

    /// Seeds the remote store directly with content and an explicit
    /// modification time, bypassing `upload` (test hook).
    pub fn put(&self, content: Vec<u8>, name: &str, modified_time: Timestamp) -> RemoteFileInfo {
        let id = format!("file-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let info = RemoteFileInfo {
            id,
            name: name.to_string(),
            modified_time,
        };
        *self.stored.write() = Some(StoredFile {
            info: info.clone(),
            content,
        });
        info
    }

    /// Name of the currently stored file, if any.
    #[must_use]
    pub fn latest_name(&self) -> Option<String> {
        self.stored.read().as_ref().map(|f| f.info.name.clone())
    }

    fn take_injected_failure(&self) -> SyncResult<()> {
        match self.fail_next.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn list_latest(&self, prefix: &str) -> SyncResult<Option<RemoteFileInfo>> {
        self.take_injected_failure()?;
        Ok(self
            .stored
            .read()
            .as_ref()
            .filter(|f| f.info.name.starts_with(prefix))
            .map(|f| f.info.clone()))
    }

    fn upload(&self, content: &[u8], filename: &str) -> SyncResult<RemoteFileInfo> {
        self.take_injected_failure()?;
        Ok(self.put(content.to_vec(), filename, Timestamp::now()))
    }

    fn download(&self, id: &str) -> SyncResult<Vec<u8>> {
        self.take_injected_failure()?;
        let stored = self.stored.read();
        match stored.as_ref() {
            Some(f) if f.info.id == id => Ok(f.content.clone()),
            _ => Err(SyncError::transfer(format!("remote file {id} not found"))),
        }
    }
}
