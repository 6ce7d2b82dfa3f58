//! Tests for ThoughtBase functionality

use super::*;
use crate::{
    event::{EventOrigin, ThoughtEvent},
    paths::{Context, RankedThought},
    properties::{Membership, Thought, Timestamp},
    tests::helpers::{chain_base, clocked_base, keys, path, populate},
    ThoughtError,
};
use test_log::test;

#[test]
fn test_children_sorted_by_rank() {
    let (mut base, _) = clocked_base(1);
    base.create("a", ["root"], 0.0).unwrap();
    base.create("b", ["root"], 1.0).unwrap();
    assert_eq!(
        base.children_with_rank(["root"]),
        vec![RankedThought::new("a", 0.0), RankedThought::new("b", 1.0)]
    );

    base.create("c", ["root"], 0.5).unwrap();
    base.create("e", ["root"], -3.0).unwrap();
    let ranks: Vec<f64> = base.children_of(Context::root()).iter().map(|c| c.rank).collect();
    assert!(ranks.windows(2).all(|w| w[0] < w[1]), "{ranks:?}");
    assert_eq!(keys(&base.children_of(Context::default())), vec!["e", "a", "c", "b"]);
}

#[test]
fn test_value_in_two_contexts() {
    let (mut base, _) = clocked_base(1);
    base.create("x", ["root"], 0.0).unwrap();
    base.create("x", ["a"], 0.0).unwrap();

    let contexts = base.contexts_of("x");
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0], Membership::new(Context::root(), 0.0));
    assert_eq!(contexts[1], Membership::new(Context::from(["a"]), 0.0));
    // The missing ancestor was created at the end of the root context
    assert_eq!(base.children_of(Context::root()), vec![
        RankedThought::new("x", 0.0),
        RankedThought::new("a", 1.0),
    ]);
    assert!(base.built_in_test().is_empty());
}

#[test]
fn test_rename_moves_children_with_it() {
    let (mut base, _) = clocked_base(1);
    base.create("a", ["root"], 0.0).unwrap();
    base.create("b", ["a"], 0.0).unwrap();

    let events = base.rename(["root"], "a", "a2", 0.0).unwrap();
    assert_eq!(
        events,
        vec![
            ThoughtEvent::removed("a"),
            ThoughtEvent::updated("a2"),
            ThoughtEvent::updated("b"),
        ]
    );
    assert_eq!(base.children_with_rank(["a2"]), vec![RankedThought::new("b", 0.0)]);
    assert!(base.children_with_rank(["a"]).is_empty());
    assert!(base.get("a").is_none());
    assert_eq!(
        base.get("b").unwrap().member_of,
        vec![Membership::new(Context::from(["a2"]), 0.0)]
    );
}

#[test]
fn test_rename_round_trip() {
    let mut base = chain_base();
    let before = base.memberships();
    base.rename(["root"], "a", "renamed", 0.0).unwrap();
    assert_ne!(base.memberships(), before);
    assert_eq!(base.contexts_of("c")[0].context, Context::from(["renamed", "b"]));
    base.rename(["root"], "renamed", "a", 0.0).unwrap();
    assert_eq!(base.memberships(), before);
}

#[test]
fn test_rename_keeps_other_occurrences() {
    let (mut base, _) = clocked_base(1);
    populate(
        &mut base,
        &[
            (&["root"], "x", 0.0),
            (&["root"], "x", 1.0),
            (&["x"], "y", 0.0),
        ],
    );
    // Exact rank picks the second occurrence
    let events = base.rename(["root"], "x", "z", 1.0).unwrap();
    assert!(events.contains(&ThoughtEvent::updated("x")));
    assert_eq!(
        base.children_of(Context::root()),
        vec![RankedThought::new("x", 0.0), RankedThought::new("z", 1.0)]
    );
    assert_eq!(keys(&base.children_of(["x"])), vec!["y"]);
    assert!(base.children_of(["z"]).is_empty());
}

#[test]
fn test_rename_same_value_is_silent() {
    let mut base = chain_base();
    assert!(base.rename(["a"], "b", "b", 0.0).unwrap().is_empty());
}

#[test]
fn test_rename_rejections_leave_store_unchanged() {
    let mut base = chain_base();
    let before = base.memberships();

    let missing = base.rename(["root"], "nope", "x", 0.0).unwrap_err();
    assert!(matches!(missing, ThoughtError::InvariantViolation(_)));
    assert!(missing.is_fatal());

    // 'a' is an ancestor of 'b'
    assert!(matches!(
        base.rename(["a"], "b", "a", 0.0),
        Err(ThoughtError::InvariantViolation(_))
    ));
    // 'c' is a descendant of 'a'
    assert!(matches!(
        base.rename(["root"], "a", "c", 0.0),
        Err(ThoughtError::InvariantViolation(_))
    ));
    assert!(matches!(
        base.rename(["root"], "a", "root", 0.0),
        Err(ThoughtError::InvariantViolation(_))
    ));
    assert_eq!(base.memberships(), before);
}

#[test]
fn test_create_rejects_cycles_and_root() {
    let mut base = chain_base();
    let before = base.memberships();
    assert!(matches!(
        base.create("a", ["a", "b"], 3.0),
        Err(ThoughtError::InvariantViolation(_))
    ));
    assert!(matches!(
        base.create("root", ["a"], 3.0),
        Err(ThoughtError::InvariantViolation(_))
    ));
    assert!(matches!(
        base.create("q", ["a", "b", "a"], 3.0),
        Err(ThoughtError::InvariantViolation(_))
    ));
    assert_eq!(base.memberships(), before);
}

#[test]
fn test_create_then_delete_round_trip() {
    let mut base = chain_base();
    let before = base.memberships();

    base.create("n", ["a"], 5.0).unwrap();
    base.create("d", ["a", "b"], 1.0).unwrap();
    assert_eq!(base.contexts_of("d").len(), 2);

    let events = base.delete(["a", "b", "d"]);
    assert_eq!(events, vec![ThoughtEvent::updated("d")]);
    let events = base.delete(["a", "n"]);
    assert_eq!(events, vec![ThoughtEvent::removed("n")]);
    assert_eq!(base.memberships(), before);
}

#[test]
fn test_delete_cascades_to_descendants() {
    let mut base = chain_base();
    let events = base.delete(["a"]);
    assert_eq!(
        events,
        vec![
            ThoughtEvent::removed("a"),
            ThoughtEvent::removed("b"),
            ThoughtEvent::removed("c"),
        ]
    );
    assert_eq!(base.values(), vec!["d"]);
    assert!(base.children_of(["a"]).is_empty());
    assert!(base.children_of(["a", "b"]).is_empty());
    assert!(base.built_in_test().is_empty());
}

#[test]
fn test_delete_is_idempotent() {
    let mut base = chain_base();
    base.delete(["a", "b"]);
    let after_first = base.memberships();
    assert!(base.delete(["a", "b"]).is_empty());
    assert!(base.delete(["never", "existed"]).is_empty());
    assert_eq!(base.memberships(), after_first);

    // The root itself is never deleted
    assert!(base.delete(["root"]).is_empty());
    assert!(base.delete(Context::default()).is_empty());
    assert_eq!(base.memberships(), after_first);
}

#[test]
fn test_delete_at_targets_one_duplicate() {
    let (mut base, _) = clocked_base(1);
    base.create("x", ["root"], 0.0).unwrap();
    base.create("x", ["root"], 1.0).unwrap();
    let events = base.delete_at(&path(&[("x", 1.0)]));
    assert_eq!(events, vec![ThoughtEvent::updated("x")]);
    assert_eq!(base.children_of(["root"]), vec![RankedThought::new("x", 0.0)]);
    assert!(base.delete_at(&path(&[("x", 7.0)])).is_empty());
}

#[test]
fn test_move_carries_subtree() {
    let mut base = chain_base();
    let events = base
        .move_thought(&path(&[("a", 0.0), ("b", 0.0)]), &path(&[("d", 1.0), ("b", 3.0)]))
        .unwrap();
    assert_eq!(events, vec![ThoughtEvent::updated("b"), ThoughtEvent::updated("c")]);
    assert_eq!(base.children_of(["d"]), vec![RankedThought::new("b", 3.0)]);
    assert_eq!(keys(&base.children_of(["d", "b"])), vec!["c"]);
    assert!(base.children_of(["a"]).is_empty());
    assert_eq!(base.contexts_of("c")[0].context, Context::from(["d", "b"]));
    assert!(base.built_in_test().is_empty());
}

#[test]
fn test_move_to_root_and_reorder() {
    let mut base = chain_base();
    base.move_thought(&path(&[("a", 0.0), ("b", 0.0)]), &path(&[("b", 0.5)]))
        .unwrap();
    assert_eq!(keys(&base.children_of(["root"])), vec!["a", "b", "d"]);
    base.move_thought(&path(&[("d", 1.0)]), &path(&[("d", -1.0)]))
        .unwrap();
    assert_eq!(keys(&base.children_of(["root"])), vec!["d", "a", "b"]);
}

#[test]
fn test_move_rejections() {
    let mut base = chain_base();
    let before = base.memberships();

    let into_self = base.move_thought(
        &path(&[("a", 0.0)]),
        &path(&[("a", 0.0), ("b", 0.0), ("a", 1.0)]),
    );
    assert!(matches!(into_self, Err(ThoughtError::InvariantViolation(_))));

    let renamed = base.move_thought(&path(&[("d", 1.0)]), &path(&[("a", 0.0), ("e", 1.0)]));
    assert!(matches!(renamed, Err(ThoughtError::InvariantViolation(_))));

    // Missing endpoints are no-ops
    assert!(base
        .move_thought(&path(&[("zz", 0.0)]), &path(&[("a", 0.0), ("zz", 0.0)]))
        .unwrap()
        .is_empty());
    assert!(base
        .move_thought(&path(&[("d", 1.0)]), &path(&[("nowhere", 0.0), ("d", 0.0)]))
        .unwrap()
        .is_empty());
    assert_eq!(base.memberships(), before);
}

#[test]
fn test_move_rejects_repeated_value_on_path() {
    let mut base = chain_base();
    base.create("c", ["d"], 0.0).unwrap();
    // Moving 'd' (which holds a 'c') below 'c' would put 'c' twice on one path
    let result = base.move_thought(
        &path(&[("d", 1.0)]),
        &path(&[("a", 0.0), ("b", 0.0), ("c", 0.0), ("d", 0.0)]),
    );
    assert!(matches!(result, Err(ThoughtError::InvariantViolation(_))));
}

#[test]
fn test_rank_before_and_after() {
    let (mut base, _) = clocked_base(1);
    populate(
        &mut base,
        &[(&["root"], "a", 0.0), (&["root"], "b", 1.0), (&["root"], "c", 4.0)],
    );
    let b = RankedThought::new("b", 1.0);
    let before = base.rank_before(["root"], &b).unwrap();
    let after = base.rank_after(["root"], &b).unwrap();
    assert!(0.0 < before && before < 1.0);
    assert!(1.0 < after && after < 4.0);
    assert_eq!(base.rank_before(["root"], &RankedThought::new("a", 0.0)), Some(-1.0));
    assert_eq!(base.rank_after(["root"], &RankedThought::new("c", 4.0)), Some(5.0));
    assert_eq!(base.rank_at_start(["root"]), -1.0);
    assert_eq!(base.rank_at_end(["root"]), 5.0);
    assert_eq!(base.rank_after(["root"], &RankedThought::new("zz", 0.0)), None);

    // Repeatedly squeeze new siblings in directly before 'b'
    for n in 0..30 {
        let next = base.rank_before(["root"], &b).unwrap();
        assert!(base.children_of(["root"]).iter().all(|c| c.rank != next));
        assert!(next < 1.0);
        base.create(&format!("n{n}"), ["root"], next).unwrap();
    }
}

#[test]
fn test_renormalize_preserves_order() {
    let (mut base, _) = clocked_base(1);
    populate(
        &mut base,
        &[(&["root"], "a", 0.5), (&["root"], "b", 0.75), (&["root"], "c", 9.0)],
    );
    let events = base.renormalize(["root"]);
    assert_eq!(events.len(), 3);
    assert_eq!(
        base.children_of(["root"]),
        vec![
            RankedThought::new("a", 0.0),
            RankedThought::new("b", 1.0),
            RankedThought::new("c", 2.0),
        ]
    );
}

#[test]
fn test_timestamps_advance_on_write() {
    let (mut base, clock) = clocked_base(100);
    base.create("a", ["root"], 0.0).unwrap();
    assert_eq!(base.get("a").unwrap().last_updated, Timestamp(100));
    base.create("b", ["a"], 0.0).unwrap();
    base.rename(["root"], "a", "a2", 0.0).unwrap();
    assert_eq!(base.get("b").unwrap().last_updated, Timestamp(102));
    assert_eq!(clock.peek(), Timestamp(103));
}

#[test]
fn test_values_are_nfc_normalized() {
    let (mut base, _) = clocked_base(1);
    base.create("cafe\u{0301}", ["root"], 0.0).unwrap();
    assert!(base.contains("caf\u{00e9}"));
    assert_eq!(base.values(), vec!["caf\u{00e9}"]);
}

#[test]
fn test_rank_path_and_ids() {
    let base = chain_base();
    let ranked = base.rank_path(["a", "b"]).unwrap();
    assert_eq!(ranked, path(&[("a", 0.0), ("b", 0.0)]));
    assert!(base.rank_path(Context::root()).unwrap().is_root());
    assert!(base.rank_path(["x"]).is_none());

    let id = base.id_at(&path(&[("a", 0.0), ("b", 0.0), ("c", 0.0)])).unwrap();
    assert_eq!(
        base.path_for_thought(&id),
        Some(path(&[("a", 0.0), ("b", 0.0), ("c", 0.0)]))
    );
    assert_eq!(base.context_for_thought(&id), Some(Context::from(["a", "b", "c"])));
    assert_eq!(base.descendants_of(["a"]), vec!["b", "c"]);
}

#[test]
fn test_from_records_materializes_ancestors() {
    let records = vec![
        Thought::new("b", vec![Membership::new(["a"], 0.0)], Timestamp(5)),
        Thought::new("c", vec![Membership::new(["a", "b"], 1.0)], Timestamp(6)),
    ];
    let base = ThoughtBase::from_records(records).unwrap();
    assert!(base.contains("a"));
    assert_eq!(keys(&base.children_of(["a", "b"])), vec!["c"]);
    assert_eq!(base.get("c").unwrap().last_updated, Timestamp(6));
    assert!(base.built_in_test().is_empty());
}

#[test]
fn test_records_round_trip() {
    let base = chain_base();
    let rebuilt = ThoughtBase::from_records(base.records().into_values()).unwrap();
    assert_eq!(rebuilt.records(), base.records());
}

#[test]
fn test_merge_last_write_wins() {
    let (mut base, _) = clocked_base(100);
    base.create("a", ["root"], 0.0).unwrap();
    base.create("c", ["root"], 1.0).unwrap();
    base.create("k", ["root"], 2.0).unwrap();

    let snapshot = vec![
        // Newer: wins
        Thought::new("a", vec![Membership::new(Context::root(), 5.0)], Timestamp(200)),
        // Unknown locally: added
        Thought::new("b", vec![Membership::new(Context::root(), 3.0)], Timestamp(50)),
        // Older than the local 'k': local is kept and pushed back
        Thought::new("k", vec![Membership::new(Context::root(), 9.0)], Timestamp(1)),
    ];
    let events = base.merge(snapshot).unwrap();

    assert!(events.contains(&ThoughtEvent::updated("a").with_origin(EventOrigin::Remote)));
    assert!(events.contains(&ThoughtEvent::updated("b").with_origin(EventOrigin::Remote)));
    assert!(events.contains(&ThoughtEvent::removed("c").with_origin(EventOrigin::Remote)));
    assert!(events.contains(&ThoughtEvent::updated("k")));
    assert_eq!(
        base.children_of(["root"]),
        vec![
            RankedThought::new("k", 2.0),
            RankedThought::new("b", 3.0),
            RankedThought::new("a", 5.0),
        ]
    );
    assert_eq!(base.get("a").unwrap().last_updated, Timestamp(200));
    assert!(!base.contains("c"));
    assert!(base.built_in_test().is_empty());
}

#[test]
fn test_merge_rejects_cyclic_records() {
    let mut base = chain_base();
    let before = base.records();
    let snapshot = vec![Thought::new(
        "a",
        vec![Membership::new(["b", "a"], 0.0)],
        Timestamp(u64::MAX / 2),
    )];
    assert!(matches!(
        base.merge(snapshot),
        Err(ThoughtError::InvariantViolation(_))
    ));
    assert_eq!(base.records(), before);
}

#[test]
fn test_context_view_paths() {
    let (mut base, _) = clocked_base(1);
    populate(
        &mut base,
        &[
            (&["root"], "x", 0.0),
            (&["root"], "a", 1.0),
            (&["a"], "b", 0.0),
            (&["a", "b"], "x", 4.0),
            (&["a"], "x", 2.0),
        ],
    );
    assert_eq!(
        base.derived_children_for_context_view("x"),
        vec![
            path(&[("a", 0.0), ("b", 0.0), ("x", 4.0)]),
            path(&[("a", 0.0), ("x", 2.0)]),
        ]
    );
    assert!(base.derived_children_for_context_view("nothing").is_empty());
}

#[test]
fn test_sort_to_front() {
    let list = vec![
        path(&[("a", 0.0), ("x", 1.0)]),
        path(&[("b", 0.0), ("x", 2.0)]),
        path(&[("c", 0.0), ("d", 0.0), ("x", 3.0)]),
    ];
    let sorted = sort_to_front(&Context::from(["b", "x"]), list.clone(), MatchMode::Exact).unwrap();
    assert_eq!(sorted, vec![list[1].clone(), list[0].clone(), list[2].clone()]);

    // Exact matching does not accept a partial context
    let err = sort_to_front(&Context::from(["d", "x"]), list.clone(), MatchMode::Exact).unwrap_err();
    match err {
        ThoughtError::AmbiguousMatch { sought, candidates } => {
            assert_eq!(sought, "[d, x]");
            assert_eq!(candidates.len(), 3);
            assert_eq!(candidates[2], "[c, d, x]");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // Legacy matching accepts a suffix or a prefix
    let sorted = sort_to_front(&Context::from(["d", "x"]), list.clone(), MatchMode::Legacy).unwrap();
    assert_eq!(sorted[0], list[2]);
    let sorted = sort_to_front(&Context::from(["c"]), list.clone(), MatchMode::Legacy).unwrap();
    assert_eq!(sorted[0], list[2]);

    assert!(sort_to_front(&Context::root(), vec![], MatchMode::Exact).unwrap().is_empty());
}

#[test]
fn test_attributes() {
    let mut base = chain_base();
    base.set_attribute(["a"], "=readonly", None).unwrap();
    assert!(base.is_attribute_set(["a"], "=readonly"));
    assert_eq!(base.children_of(["a"])[0].key, "=readonly");

    base.set_attribute(["a"], "=view", Some("table")).unwrap();
    assert_eq!(base.attribute(["a"], "=view").as_deref(), Some("table"));
    base.set_attribute(["a"], "=view", Some("prose")).unwrap();
    assert_eq!(keys(&base.children_of(["a", "=view"])), vec!["prose"]);

    base.toggle_attribute(["a"], "=view", "prose").unwrap();
    assert!(!base.is_attribute_set(["a"], "=view"));
    base.toggle_attribute(["a"], "=view", "prose").unwrap();
    assert!(base.attribute_equals(["a"], "=view", "prose"));

    assert!(matches!(
        base.set_attribute(["a"], "view", None),
        Err(ThoughtError::Command(_))
    ));
    assert!(base.built_in_test().is_empty());
}

#[test]
fn test_depth_and_child_paths() {
    let base = chain_base();
    assert_eq!(base.depth(["root"]), 3);
    assert_eq!(base.depth(["a", "b"]), 1);
    assert_eq!(base.depth(["d"]), 0);
    assert_eq!(
        base.child_paths(["a"]),
        vec![path(&[("a", 0.0), ("b", 0.0)])]
    );
    assert!(base.child_paths(["missing"]).is_empty());
}

#[test]
fn test_merge_drops_memberships_under_removed_thoughts() {
    let (mut base, _) = clocked_base(100);
    populate(
        &mut base,
        &[(&["root"], "p", 0.0), (&["p"], "x", 0.0), (&["root"], "y", 1.0), (&["p"], "y", 1.0)],
    );

    // The snapshot no longer has 'p', but older copies of 'x' and 'y' still point into it
    let snapshot = vec![
        Thought::new("x", vec![Membership::new(["p"], 0.0)], Timestamp(1)),
        Thought::new(
            "y",
            vec![Membership::new(Context::root(), 1.0), Membership::new(["p"], 1.0)],
            Timestamp(1),
        ),
    ];
    let events = base.merge(snapshot).unwrap();

    assert!(!base.contains("p"));
    assert!(!base.contains("x"));
    assert_eq!(base.contexts_of("y"), vec![Membership::new(Context::root(), 1.0)]);
    assert!(base.get("y").unwrap().last_updated > Timestamp(100));
    assert!(events.contains(&ThoughtEvent::removed("p").with_origin(EventOrigin::Remote)));
    assert!(events.contains(&ThoughtEvent::removed("x")));
    assert!(events.contains(&ThoughtEvent::updated("y")));
    assert!(!events.contains(&ThoughtEvent::updated("p")));
    assert!(base.built_in_test().is_empty());
}

#[test]
fn test_failed_attribute_changes_nothing() {
    let mut base = chain_base();
    let before = base.records();
    assert!(matches!(
        base.set_attribute(["a"], "=x", Some("a")),
        Err(ThoughtError::InvariantViolation(_))
    ));
    assert!(matches!(
        base.set_attribute(["a"], "=x", Some("root")),
        Err(ThoughtError::InvariantViolation(_))
    ));
    assert_eq!(base.records(), before);
    assert!(!base.contains("=x"));

    // A stale value survives a rejected replacement
    base.set_attribute(["a"], "=view", Some("table")).unwrap();
    assert!(base.set_attribute(["a"], "=view", Some("a")).is_err());
    assert!(base.attribute_equals(["a"], "=view", "table"));
}

#[test]
fn test_path_from_context_chain() {
    let mut base = chain_base();
    base.create("c", ["d"], 2.0).unwrap();
    base.create("e", ["d", "c"], 0.0).unwrap();
    let focused = path(&[("a", 0.0), ("b", 0.0), ("c", 0.0)]);

    assert_eq!(base.path_from_context_chain(&[focused.clone()]), Some(focused.clone()));
    assert_eq!(
        base.path_from_context_chain(&[focused.clone(), path(&[("d", 1.0)])]),
        Some(path(&[("d", 1.0), ("c", 2.0)]))
    );
    assert_eq!(
        base.path_from_context_chain(&[focused.clone(), path(&[("d", 1.0), ("e", 0.0)])]),
        Some(path(&[("d", 1.0), ("c", 2.0), ("e", 0.0)]))
    );
    assert_eq!(
        base.path_from_context_chain(&[focused.clone(), path(&[("b", 0.0)])]),
        Some(focused.clone())
    );
    // 'a' holds 'b', not 'c'
    assert_eq!(base.path_from_context_chain(&[focused, path(&[("a", 0.0)])]), None);
    assert_eq!(base.path_from_context_chain(&[]), None);
}
