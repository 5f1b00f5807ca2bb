//! Structural diff engine over two snapshots.
//!
//! `compare` walks every collection of both snapshots, partitions the
//! entities into added/removed/modified/unchanged via hashed identity
//! maps, and records per-field changes for co-present entities. The
//! output is a pure value consumed by a review surface; it never gates
//! the orchestrator's automated path.

use crate::conflict::is_conflict;
use crate::display::{display_name, format_value};
use regsync_model::{Entity, EntityId, Metadata, Snapshot};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Audit fields excluded from field comparison.
pub const AUDIT_FIELDS: &[&str] = &["created_at", "updated_at"];

/// One changed field of a modified entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Field name.
    pub field: String,
    /// Value on the local side (null if absent locally).
    pub old_value: Value,
    /// Value on the remote side (null if absent remotely).
    pub new_value: Value,
    /// Display rendering of the local value.
    pub display_old: String,
    /// Display rendering of the remote value.
    pub display_new: String,
}

/// An entity listed in the added, removed or unchanged partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangedEntity {
    /// Entity id.
    pub id: EntityId,
    /// Human-readable name for review surfaces.
    pub display_name: String,
    /// The full entity.
    pub entity: Entity,
}

/// An entity present on both sides with at least one differing field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifiedEntity {
    /// Entity id.
    pub id: EntityId,
    /// Human-readable name for review surfaces.
    pub display_name: String,
    /// Every differing field, with old/new values and renderings.
    pub changes: Vec<FieldChange>,
}

/// The four partitions of one collection's diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionDiff {
    /// Entities present remotely but absent locally (remote order).
    pub added: Vec<ChangedEntity>,
    /// Entities present locally but absent remotely (local order).
    pub removed: Vec<ChangedEntity>,
    /// Entities on both sides with differing fields (remote order).
    pub modified: Vec<ModifiedEntity>,
    /// Entities on both sides with no differing fields (remote order).
    pub unchanged: Vec<ChangedEntity>,
}

impl CollectionDiff {
    /// Partition sizes for this collection.
    #[must_use]
    pub fn counts(&self) -> CollectionCounts {
        CollectionCounts {
            added: self.added.len(),
            removed: self.removed.len(),
            modified: self.modified.len(),
            unchanged: self.unchanged.len(),
        }
    }
}

/// Partition sizes of a single collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionCounts {
    /// Number of added entities.
    pub added: usize,
    /// Number of removed entities.
    pub removed: usize,
    /// Number of modified entities.
    pub modified: usize,
    /// Number of unchanged entities.
    pub unchanged: usize,
}

impl CollectionCounts {
    /// added + removed + modified.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.added + self.removed + self.modified
    }
}

/// Aggregate counts across all collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffSummary {
    /// Counts per collection name.
    pub per_collection: BTreeMap<String, CollectionCounts>,
    /// Total added across all collections.
    pub added: usize,
    /// Total removed across all collections.
    pub removed: usize,
    /// Total modified across all collections.
    pub modified: usize,
    /// Total unchanged across all collections.
    pub unchanged: usize,
}

impl DiffSummary {
    /// Total number of added, removed and modified entities.
    #[must_use]
    pub fn total_changed(&self) -> usize {
        self.added + self.removed + self.modified
    }

    /// Whether the report needs user attention at all.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.total_changed() > 0
    }
}

/// A reviewable summary of the differences between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffReport {
    /// Whether the two counter pairs indicate concurrent divergence.
    pub conflict: bool,
    /// Raw counters of the local snapshot.
    pub local_meta: Metadata,
    /// Raw counters of the remote snapshot.
    pub remote_meta: Metadata,
    /// Per-collection partitions, keyed by collection name.
    pub collections: BTreeMap<String, CollectionDiff>,
    /// Aggregate counts.
    pub summary: DiffSummary,
}

/// Compares two snapshots collection-by-collection and field-by-field.
///
/// Runs in O(total entities) via hashed identity maps, plus O(fields)
/// per co-present pair. Output ordering follows the remote sequence for
/// added/modified/unchanged and the local sequence for removed.
#[must_use]
pub fn compare(local: &Snapshot, remote: &Snapshot) -> DiffReport {
    let empty: Vec<Entity> = Vec::new();

    let names: BTreeSet<&String> = local
        .collections
        .keys()
        .chain(remote.collections.keys())
        .collect();

    let mut collections = BTreeMap::new();
    let mut summary = DiffSummary::default();

    for name in names {
        let local_entities = local.collections.get(name).unwrap_or(&empty);
        let remote_entities = remote.collections.get(name).unwrap_or(&empty);
        let diff = compare_collection(name, local_entities, remote_entities);

        let counts = diff.counts();
        summary.added += counts.added;
        summary.removed += counts.removed;
        summary.modified += counts.modified;
        summary.unchanged += counts.unchanged;
        summary.per_collection.insert(name.clone(), counts);

        collections.insert(name.clone(), diff);
    }

    DiffReport {
        conflict: is_conflict(&local.metadata, &remote.metadata),
        local_meta: local.metadata,
        remote_meta: remote.metadata,
        collections,
        summary,
    }
}

fn compare_collection(name: &str, local: &[Entity], remote: &[Entity]) -> CollectionDiff {
    let local_by_id: HashMap<EntityId, &Entity> = local.iter().map(|e| (e.id, e)).collect();
    let remote_by_id: HashMap<EntityId, &Entity> = remote.iter().map(|e| (e.id, e)).collect();

    let mut diff = CollectionDiff::default();

    for remote_entity in remote {
        match local_by_id.get(&remote_entity.id) {
            None => diff.added.push(changed(name, remote_entity)),
            Some(local_entity) => {
                let changes = field_changes(local_entity, remote_entity);
                if changes.is_empty() {
                    diff.unchanged.push(changed(name, remote_entity));
                } else {
                    diff.modified.push(ModifiedEntity {
                        id: remote_entity.id,
                        display_name: display_name(name, remote_entity),
                        changes,
                    });
                }
            }
        }
    }

    for local_entity in local {
        if !remote_by_id.contains_key(&local_entity.id) {
            diff.removed.push(changed(name, local_entity));
        }
    }

    diff
}

fn changed(collection: &str, entity: &Entity) -> ChangedEntity {
    ChangedEntity {
        id: entity.id,
        display_name: display_name(collection, entity),
        entity: entity.clone(),
    }
}

/// Compares the union of both field sets, excluding audit fields.
///
/// A field absent on one side compares as null, so setting a field to
/// null and deleting it are equivalent for diffing purposes. Equality is
/// `serde_json::Value` equality: object keys are order-independent
/// (BTreeMap-backed maps), array elements are positional.
fn field_changes(local: &Entity, remote: &Entity) -> Vec<FieldChange> {
    let names: BTreeSet<&String> = local.fields.keys().chain(remote.fields.keys()).collect();

    let mut changes = Vec::new();
    for field in names {
        if AUDIT_FIELDS.contains(&field.as_str()) {
            continue;
        }

        let old_value = local.fields.get(field).cloned().unwrap_or(Value::Null);
        let new_value = remote.fields.get(field).cloned().unwrap_or(Value::Null);

        if old_value != new_value {
            changes.push(FieldChange {
                field: field.clone(),
                display_old: format_value(&old_value),
                display_new: format_value(&new_value),
                old_value,
                new_value,
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use regsync_model::Metadata;
    use serde_json::json;

    fn member(id: i64, name: &str) -> Entity {
        Entity::new(EntityId::new(id)).with_field("name", json!(name))
    }

    #[test]
    fn identical_snapshots_diff_empty() {
        let snapshot = Snapshot::new(Metadata::new(3, 3))
            .with_collection("members", vec![member(1, "Asha"), member(2, "Omar")]);

        let report = compare(&snapshot, &snapshot);
        assert!(!report.conflict);
        assert_eq!(report.summary.total_changed(), 0);
        assert!(!report.summary.has_changes());
        assert_eq!(report.collections["members"].unchanged.len(), 2);
    }

    #[test]
    fn remote_only_entity_is_added() {
        let local = Snapshot::default().with_collection("members", vec![member(1, "A")]);
        let remote =
            Snapshot::default().with_collection("members", vec![member(1, "A"), member(2, "B")]);

        let report = compare(&local, &remote);
        let members = &report.collections["members"];
        assert_eq!(members.added.len(), 1);
        assert_eq!(members.added[0].id, EntityId::new(2));
        assert_eq!(members.added[0].display_name, "B");
        assert!(members.removed.is_empty());
        assert!(members.modified.is_empty());
        assert_eq!(members.unchanged.len(), 1);
        assert_eq!(members.unchanged[0].id, EntityId::new(1));
    }

    #[test]
    fn local_only_entity_is_removed() {
        let local =
            Snapshot::default().with_collection("members", vec![member(1, "A"), member(3, "C")]);
        let remote = Snapshot::default().with_collection("members", vec![member(1, "A")]);

        let report = compare(&local, &remote);
        let members = &report.collections["members"];
        assert_eq!(members.removed.len(), 1);
        assert_eq!(members.removed[0].id, EntityId::new(3));
    }

    #[test]
    fn differing_field_is_recorded_with_both_values() {
        let local = Snapshot::default().with_collection(
            "members",
            vec![member(1, "Asha").with_field("active", json!(true))],
        );
        let remote = Snapshot::default().with_collection(
            "members",
            vec![member(1, "Asha").with_field("active", json!(false))],
        );

        let report = compare(&local, &remote);
        let modified = &report.collections["members"].modified;
        assert_eq!(modified.len(), 1);
        assert_eq!(modified[0].changes.len(), 1);
        let change = &modified[0].changes[0];
        assert_eq!(change.field, "active");
        assert_eq!(change.old_value, json!(true));
        assert_eq!(change.new_value, json!(false));
        assert_eq!(change.display_old, "Yes");
        assert_eq!(change.display_new, "No");
    }

    #[test]
    fn audit_fields_are_ignored() {
        let local = Snapshot::default().with_collection(
            "members",
            vec![member(1, "Asha").with_field("updated_at", json!(1000))],
        );
        let remote = Snapshot::default().with_collection(
            "members",
            vec![member(1, "Asha").with_field("updated_at", json!(2000))],
        );

        let report = compare(&local, &remote);
        assert_eq!(report.summary.total_changed(), 0);
    }

    #[test]
    fn field_union_covers_one_sided_fields() {
        let local = Snapshot::default().with_collection("members", vec![member(1, "Asha")]);
        let remote = Snapshot::default().with_collection(
            "members",
            vec![member(1, "Asha").with_field("phone", json!("555-0100"))],
        );

        let report = compare(&local, &remote);
        let change = &report.collections["members"].modified[0].changes[0];
        assert_eq!(change.field, "phone");
        assert_eq!(change.old_value, Value::Null);
        assert_eq!(change.display_old, "");
    }

    #[test]
    fn nested_values_compare_key_order_independently() {
        // Same object spelled with different key order parses to the
        // same BTreeMap-backed map, so no change is reported.
        let a: Entity = serde_json::from_str(r#"{"id":1,"addr":{"city":"Dodoma","zip":"41101"}}"#)
            .unwrap();
        let b: Entity = serde_json::from_str(r#"{"id":1,"addr":{"zip":"41101","city":"Dodoma"}}"#)
            .unwrap();

        let local = Snapshot::default().with_collection("members", vec![a]);
        let remote = Snapshot::default().with_collection("members", vec![b]);
        assert_eq!(compare(&local, &remote).summary.total_changed(), 0);
    }

    #[test]
    fn collections_missing_on_one_side_are_diffed() {
        let local = Snapshot::default();
        let remote = Snapshot::default().with_collection("members", vec![member(1, "A")]);

        let report = compare(&local, &remote);
        assert_eq!(report.collections["members"].added.len(), 1);
        assert_eq!(report.summary.per_collection["members"].added, 1);
    }

    #[test]
    fn conflict_flag_reflects_counters() {
        let local = Snapshot::new(Metadata::new(5, 2));
        let remote = Snapshot::new(Metadata::new(3, 4));
        let report = compare(&local, &remote);
        assert!(report.conflict);
        assert_eq!(report.local_meta, Metadata::new(5, 2));
        assert_eq!(report.remote_meta, Metadata::new(3, 4));
    }

    #[test]
    fn diff_report_serializes_for_host_ui() {
        let local = Snapshot::new(Metadata::new(1, 0));
        let remote = Snapshot::new(Metadata::new(1, 1))
            .with_collection("members", vec![member(2, "B")]);

        let value = serde_json::to_value(compare(&local, &remote)).unwrap();
        assert_eq!(value["conflict"], json!(false));
        assert_eq!(value["remote_meta"]["android_version"], json!(1));
        assert_eq!(
            value["collections"]["members"]["added"][0]["display_name"],
            json!("B")
        );
        assert_eq!(value["summary"]["added"], json!(1));
    }

    fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
        let entity = (0i64..30, "[a-z]{1,8}", any::<bool>()).prop_map(|(id, name, active)| {
            Entity::new(EntityId::new(id))
                .with_field("name", json!(name))
                .with_field("active", json!(active))
        });
        let entities = proptest::collection::vec(entity, 0..12).prop_map(|mut list| {
            // Ids must be unique within a collection.
            list.sort_by_key(|e| e.id);
            list.dedup_by_key(|e| e.id);
            list
        });
        (
            proptest::collection::btree_map("members|marriages|users", entities, 0..3),
            any::<u32>(),
            any::<u32>(),
        )
            .prop_map(|(collections, win, android)| Snapshot {
                metadata: Metadata::new(u64::from(win), u64::from(android)),
                collections,
            })
    }

    proptest! {
        #[test]
        fn diff_is_idempotent(snapshot in arb_snapshot()) {
            let report = compare(&snapshot, &snapshot);
            prop_assert_eq!(report.summary.total_changed(), 0);
            for diff in report.collections.values() {
                prop_assert!(diff.added.is_empty());
                prop_assert!(diff.removed.is_empty());
                prop_assert!(diff.modified.is_empty());
            }
        }

        #[test]
        fn added_and_removed_are_symmetric(a in arb_snapshot(), b in arb_snapshot()) {
            let forward = compare(&a, &b);
            let backward = compare(&b, &a);
            for (name, diff) in &forward.collections {
                let reverse = &backward.collections[name];
                prop_assert_eq!(diff.added.len(), reverse.removed.len());
                prop_assert_eq!(diff.removed.len(), reverse.added.len());
                prop_assert_eq!(diff.modified.len(), reverse.modified.len());
            }
        }
    }
}
