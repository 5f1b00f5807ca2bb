//! Snapshots: full point-in-time copies of the record store.

use crate::entity::Entity;
use crate::error::ModelResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Per-platform sync counters carried by every snapshot.
///
/// Each platform increments its own counter whenever it performs a change
/// meant to be synchronized. Together the two counters form a coarse
/// version vector over the whole snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Counter incremented by the desktop platform.
    pub win_version: u64,
    /// Counter incremented by the mobile platform.
    pub android_version: u64,
}

impl Metadata {
    /// Creates metadata with the given counter values.
    #[must_use]
    pub const fn new(win_version: u64, android_version: u64) -> Self {
        Self {
            win_version,
            android_version,
        }
    }

    /// Increments the desktop counter. Called by the CRUD layer after a
    /// synchronizable local change.
    pub fn bump_win(&mut self) {
        self.win_version += 1;
    }

    /// Increments the mobile counter.
    pub fn bump_android(&mut self) {
        self.android_version += 1;
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "win:{} android:{}", self.win_version, self.android_version)
    }
}

/// A full copy of the record store: every collection plus the counters.
///
/// Snapshots are plain values. The orchestrator only ever reads a whole
/// snapshot for upload or writes a whole snapshot on download; individual
/// entities are mutated by the external CRUD layer, never here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The two platform counters.
    pub metadata: Metadata,
    /// Collections by name, each an ordered sequence of entities.
    pub collections: BTreeMap<String, Vec<Entity>>,
}

impl Snapshot {
    /// Creates an empty snapshot with the given metadata.
    #[must_use]
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            collections: BTreeMap::new(),
        }
    }

    /// Adds a collection, builder style.
    #[must_use]
    pub fn with_collection(mut self, name: impl Into<String>, entities: Vec<Entity>) -> Self {
        self.collections.insert(name.into(), entities);
        self
    }

    /// Returns the entities of a collection, if present.
    pub fn collection(&self, name: &str) -> Option<&[Entity]> {
        self.collections.get(name).map(Vec::as_slice)
    }

    /// Total number of entities across all collections.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Encodes the snapshot as JSON bytes.
    pub fn to_json_bytes(&self) -> ModelResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a snapshot from JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> ModelResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use serde_json::json;

    fn sample() -> Snapshot {
        Snapshot::new(Metadata::new(5, 2)).with_collection(
            "members",
            vec![
                Entity::new(EntityId::new(1)).with_field("name", json!("Asha")),
                Entity::new(EntityId::new(2)).with_field("name", json!("Omar")),
            ],
        )
    }

    #[test]
    fn snapshot_json_roundtrip() {
        let snapshot = sample();
        let bytes = snapshot.to_json_bytes().unwrap();
        let back = Snapshot::from_json_bytes(&bytes).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn snapshot_rejects_malformed_content() {
        let result = Snapshot::from_json_bytes(b"not json at all");
        assert!(result.is_err());
    }

    #[test]
    fn entity_count_spans_collections() {
        let snapshot = sample().with_collection(
            "marriages",
            vec![Entity::new(EntityId::new(1))
                .with_field("groom", json!("Omar"))
                .with_field("bride", json!("Asha"))],
        );
        assert_eq!(snapshot.entity_count(), 3);
    }

    #[test]
    fn metadata_bumps_are_independent() {
        let mut meta = Metadata::default();
        meta.bump_win();
        meta.bump_win();
        meta.bump_android();
        assert_eq!(meta, Metadata::new(2, 1));
    }
}
