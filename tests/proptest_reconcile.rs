use flickr8k_prep::dataset::{reconcile, RequiredArtifact};
use proptest::prelude::*;

mod common;
use common::{place, Placement};

fn arb_placement() -> impl Strategy<Value = Placement> {
    prop_oneof![
        Just(Placement::Canonical),
        Just(Placement::ArchiveDir),
        Just(Placement::ArchiveDirFlat),
        Just(Placement::RootFlat),
        Just(Placement::Absent),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reconcile_places_every_available_artifact(
        placements in proptest::collection::vec(arb_placement(), RequiredArtifact::ALL.len())
    ) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path();
        for (artifact, placement) in RequiredArtifact::ALL.iter().zip(&placements) {
            place(root, *artifact, *placement);
        }

        let report = reconcile(root).expect("reconcile");

        for (artifact, placement) in RequiredArtifact::ALL.iter().zip(&placements) {
            if *placement == Placement::Absent {
                prop_assert!(report.missing().contains(artifact));
            } else {
                prop_assert!(artifact.canonical_path(root).exists(), "{:?}", artifact);
            }
        }
    }

    #[test]
    fn reconcile_is_idempotent(
        placements in proptest::collection::vec(arb_placement(), RequiredArtifact::ALL.len())
    ) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path();
        for (artifact, placement) in RequiredArtifact::ALL.iter().zip(&placements) {
            place(root, *artifact, *placement);
        }

        let first = reconcile(root).expect("first pass");
        let second = reconcile(root).expect("second pass");

        prop_assert_eq!(second.moved_count(), 0);
        prop_assert_eq!(second.missing(), first.missing());
        prop_assert_eq!(second.no_action_needed(), first.missing().is_empty());
    }
}
