//! Two-counter conflict detection.

use regsync_model::Metadata;

/// Detects concurrent divergence between two snapshots' counters.
///
/// Each platform increments its own counter on every synchronizable
/// change, so the pair forms a coarse version vector over the whole
/// snapshot. A conflict means one side is ahead on one axis and the
/// other side ahead on the other; the strict-superset case (one side
/// ahead or equal on both axes) is not a conflict and needs no handling.
#[must_use]
pub fn is_conflict(local: &Metadata, remote: &Metadata) -> bool {
    (local.win_version > remote.win_version && remote.android_version > local.android_version)
        || (remote.win_version > local.win_version
            && local.android_version > remote.android_version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn divergent_counters_conflict() {
        let local = Metadata::new(5, 2);
        let remote = Metadata::new(3, 4);
        assert!(is_conflict(&local, &remote));
    }

    #[test]
    fn strict_superset_does_not_conflict() {
        let local = Metadata::new(5, 4);
        let remote = Metadata::new(3, 2);
        assert!(!is_conflict(&local, &remote));
        assert!(!is_conflict(&remote, &local));
    }

    #[test]
    fn equal_counters_do_not_conflict() {
        let meta = Metadata::new(7, 7);
        assert!(!is_conflict(&meta, &meta));
    }

    #[test]
    fn ahead_on_one_axis_only_does_not_conflict() {
        let local = Metadata::new(5, 3);
        let remote = Metadata::new(3, 3);
        assert!(!is_conflict(&local, &remote));
    }

    proptest! {
        #[test]
        fn conflict_is_symmetric(a in any::<u32>(), b in any::<u32>(), c in any::<u32>(), d in any::<u32>()) {
            let local = Metadata::new(u64::from(a), u64::from(b));
            let remote = Metadata::new(u64::from(c), u64::from(d));
            prop_assert_eq!(is_conflict(&local, &remote), is_conflict(&remote, &local));
        }

        #[test]
        fn self_comparison_never_conflicts(a in any::<u64>(), b in any::<u64>()) {
            let meta = Metadata::new(a, b);
            prop_assert!(!is_conflict(&meta, &meta));
        }
    }
}
