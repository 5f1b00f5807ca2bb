//! File-backed local store.
//!
//! The whole record store lives in a single JSON document on disk.
//! Overwrites use the write-then-rename pattern so a crash mid-write can
//! never leave a partial snapshot behind.

use crate::error::{SyncError, SyncResult};
use crate::store::{LocalStore, WatchCallback};
use parking_lot::{Mutex, RwLock};
use regsync_model::{Snapshot, Timestamp};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

/// A local store backed by one JSON file.
pub struct FileLocalStore {
    path: PathBuf,
    watchers: RwLock<Vec<(u64, WatchCallback)>>,
    next_token: AtomicU64,
    // Single writer lock per the shared-resource policy.
    write_lock: Mutex<()>,
}

impl FileLocalStore {
    /// Opens a store at the given path. The file need not exist yet;
    /// reads fail until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            watchers: RwLock::new(Vec::new()),
            next_token: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Notifies watchers of a change made by the external CRUD layer.
    ///
    /// The CRUD layer writes the file through its own handle, so it must
    /// call this after committing a change.
    pub fn notify_external_change(&self) {
        for (_, callback) in self.watchers.read().iter() {
            callback();
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Fsyncs the parent directory so the rename is durable.
    #[cfg(unix)]
    fn sync_directory(&self) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            let dir = File::open(parent).map_err(|e| SyncError::local_io(e.to_string()))?;
            dir.sync_all()
                .map_err(|e| SyncError::local_io(e.to_string()))?;
        }
        Ok(())
    }

    /// Windows NTFS journals metadata updates; no directory fsync there.
    #[cfg(not(unix))]
    fn sync_directory(&self) -> SyncResult<()> {
        Ok(())
    }
}

impl LocalStore for FileLocalStore {
    fn read_snapshot(&self) -> SyncResult<Snapshot> {
        let bytes = fs::read(&self.path).map_err(|e| SyncError::local_io(e.to_string()))?;
        Snapshot::from_json_bytes(&bytes).map_err(|e| SyncError::local_io(e.to_string()))
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> SyncResult<()> {
        let _guard = self.write_lock.lock();

        let bytes = snapshot
            .to_json_bytes()
            .map_err(|e| SyncError::local_io(e.to_string()))?;

        // Write to temp file, fsync, rename over the target.
        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path).map_err(|e| SyncError::local_io(e.to_string()))?;
        file.write_all(&bytes)
            .map_err(|e| SyncError::local_io(e.to_string()))?;
        file.sync_all()
            .map_err(|e| SyncError::local_io(e.to_string()))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| SyncError::local_io(e.to_string()))?;
        self.sync_directory()
    }

    fn last_modified_time(&self) -> SyncResult<Timestamp> {
        let metadata = fs::metadata(&self.path).map_err(|e| SyncError::local_io(e.to_string()))?;
        let modified = metadata
            .modified()
            .map_err(|e| SyncError::local_io(e.to_string()))?;
        let millis = modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Ok(Timestamp::from_millis(millis as i64))
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

#[cfg(test)]
mod tests {
    use super::*;
    use regsync_model::{Entity, EntityId, Metadata};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sample() -> Snapshot {
        Snapshot::new(Metadata::new(2, 1)).with_collection(
            "members",
            vec![Entity::new(EntityId::new(1)).with_field("name", json!("Asha"))],
        )
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempdir().unwrap();
        let store = FileLocalStore::new(dir.path().join("store.json"));

        let snapshot = sample();
        store.write_snapshot(&snapshot).unwrap();
        assert_eq!(store.read_snapshot().unwrap(), snapshot);
    }

    #[test]
    fn read_before_first_write_fails() {
        let dir = tempdir().unwrap();
        let store = FileLocalStore::new(dir.path().join("missing.json"));
        assert!(matches!(
            store.read_snapshot(),
            Err(SyncError::LocalIo { .. })
        ));
    }

    #[test]
    fn overwrite_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = FileLocalStore::new(dir.path().join("store.json"));

        store.write_snapshot(&sample()).unwrap();
        store.write_snapshot(&Snapshot::default()).unwrap();

        assert!(!store.temp_path().exists());
        assert_eq!(store.read_snapshot().unwrap(), Snapshot::default());
    }

    #[test]
    fn modification_time_tracks_writes() {
        let dir = tempdir().unwrap();
        let store = FileLocalStore::new(dir.path().join("store.json"));

        store.write_snapshot(&sample()).unwrap();
        let mtime = store.last_modified_time().unwrap();
        assert!(mtime.as_millis() > 0);
    }

    #[test]
    fn external_change_notification_reaches_watchers() {
        let dir = tempdir().unwrap();
        let store = FileLocalStore::new(dir.path().join("store.json"));
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_clone = Arc::clone(&fired);
        let token = store.watch(Box::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        store.notify_external_change();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        store.unwatch(token);
        store.notify_external_change();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn corrupt_file_reads_as_local_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"{{{").unwrap();

        let store = FileLocalStore::new(path);
        assert!(matches!(
            store.read_snapshot(),
            Err(SyncError::LocalIo { .. })
        ));
    }
}
