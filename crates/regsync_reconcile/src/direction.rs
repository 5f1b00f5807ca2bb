//! Direction resolution: which way a sync cycle should move data.

use regsync_model::Timestamp;

/// Outcome of comparing the two replicas' modification times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Neither side changed since the last sync.
    None,
    /// Local changed; push the local snapshot to the remote store.
    Upload,
    /// Remote changed; pull the remote snapshot into the local store.
    Download,
    /// Both sides changed since the last sync.
    Conflict,
}

/// Resolves the sync direction from the three relevant times.
///
/// `remote_modified` is `None` when no remote snapshot exists, which
/// always resolves to [`Direction::Upload`]. An unset `last_sync` counts
/// both sides as newer, so a first-ever sync against a pre-existing
/// remote snapshot resolves to [`Direction::Conflict`] rather than
/// silently favoring one side.
#[must_use]
pub fn resolve(
    remote_modified: Option<Timestamp>,
    last_sync: Option<Timestamp>,
    local_mtime: Timestamp,
) -> Direction {
    let Some(remote_mtime) = remote_modified else {
        return Direction::Upload;
    };

    let remote_newer = last_sync.map_or(true, |t| remote_mtime > t);
    let local_newer = last_sync.map_or(true, |t| local_mtime > t);

    match (remote_newer, local_newer) {
        (true, true) => Direction::Conflict,
        (true, false) => Direction::Download,
        (false, true) => Direction::Upload,
        (false, false) => Direction::None,
    }
}
