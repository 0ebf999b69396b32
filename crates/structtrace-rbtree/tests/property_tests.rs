//! Property tests for structtrace-rbtree
//!
//! Red-black invariants are checked from the public snapshot (ids, colors,
//! parent/child links), the same view a replay client sees.

use proptest::prelude::*;
use std::collections::HashMap;
use structtrace_rbtree::RbTree;
use structtrace_snapshot::{NodeColor, StepKind, TreeNodeSnapshot};

fn by_id(snapshot: &[TreeNodeSnapshot]) -> HashMap<u64, &TreeNodeSnapshot> {
    snapshot.iter().map(|n| (n.id, n)).collect()
}

fn root_of(snapshot: &[TreeNodeSnapshot]) -> Option<&TreeNodeSnapshot> {
    snapshot.iter().find(|n| n.parent_id.is_none())
}

/// Black count on every path from `node` down to an absent child; fails the
/// test on a red-red pair or unequal black heights.
fn check_black_height(
    nodes: &HashMap<u64, &TreeNodeSnapshot>,
    node: Option<u64>,
) -> Result<usize, TestCaseError> {
    let Some(id) = node else { return Ok(1) };
    let n = nodes[&id];
    if n.color == Some(NodeColor::Red) {
        for child in [n.left_id, n.right_id].into_iter().flatten() {
            prop_assert_eq!(
                nodes[&child].color,
                Some(NodeColor::Black),
                "red node {} has red child {}",
                n.key,
                nodes[&child].key
            );
        }
    }
    let lh = check_black_height(nodes, n.left_id)?;
    let rh = check_black_height(nodes, n.right_id)?;
    prop_assert_eq!(lh, rh, "unequal black heights under key {}", n.key);
    Ok(lh + usize::from(n.color == Some(NodeColor::Black)))
}

fn check_invariants(snapshot: &[TreeNodeSnapshot]) -> Result<(), TestCaseError> {
    if let Some(root) = root_of(snapshot) {
        prop_assert_eq!(root.color, Some(NodeColor::Black), "root must be black");
        check_black_height(&by_id(snapshot), Some(root.id))?;
    }
    Ok(())
}

proptest! {
    // After every insert the tree is a valid red-black tree.
    #[test]
    fn prop_invariants_hold_after_each_insert(keys in prop::collection::vec(-1000i64..1000, 1..64)) {
        let mut tree = RbTree::new();
        for key in keys {
            let result = tree.insert(key);
            prop_assert!(result.success);
            check_invariants(result.final_tree.as_deref().unwrap_or_default())?;
        }
    }

    // Search finds exactly the keys inserted and not subsequently deleted.
    #[test]
    fn prop_search_matches_insert_delete_history(
        inserts in prop::collection::vec(0i64..100, 1..40),
        deletes in prop::collection::vec(0i64..100, 0..20),
    ) {
        let mut tree = RbTree::new();
        let mut model = std::collections::BTreeSet::new();
        for &key in &inserts {
            tree.insert(key);
            model.insert(key);
        }
        for &key in &deletes {
            let result = tree.delete(key);
            prop_assert_eq!(result.success, model.remove(&key));
            check_invariants(result.final_tree.as_deref().unwrap_or_default())?;
        }
        for key in 0i64..100 {
            let result = tree.search(key);
            prop_assert_eq!(result.success, model.contains(&key), "key {}", key);
        }
    }

    // Deleting an absent key is a failure that does not mutate the tree.
    #[test]
    fn prop_delete_of_absent_key_is_pure(keys in prop::collection::vec(0i64..50, 1..20)) {
        let mut tree = RbTree::new();
        for &key in &keys {
            tree.insert(key);
        }
        let before = tree.snapshot();

        let result = tree.delete(1000);
        prop_assert!(!result.success);
        prop_assert_eq!(result.steps.last().map(|s| s.kind), Some(StepKind::NotFound));
        prop_assert_eq!(tree.snapshot(), before);
    }

    // Every step's embedded snapshot is itself link-consistent.
    #[test]
    fn prop_step_snapshots_are_link_consistent(keys in prop::collection::vec(0i64..200, 1..24)) {
        let mut tree = RbTree::new();
        for key in keys {
            let result = tree.insert(key);
            for step in &result.steps {
                let state = step.tree_state.as_deref().unwrap_or_default();
                let nodes = by_id(state);
                for n in state {
                    for child in [n.left_id, n.right_id].into_iter().flatten() {
                        prop_assert_eq!(nodes[&child].parent_id, Some(n.id));
                    }
                }
            }
        }
    }
}
