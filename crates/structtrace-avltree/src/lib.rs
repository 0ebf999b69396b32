//! Traced AVL tree for structtrace.
//!
//! Same arena layout as the red-black variant but without parent links:
//! recursion passes node indices down and returns the (possibly rotated)
//! subtree root back up, so structure is recomputed on the return path.
//!
//! Rotation-case selection is deliberately asymmetric between the two
//! mutation paths. Insert picks LL/RR/LR/RL by comparing the inserted key
//! against the unbalanced node's child key; delete has no single inserted
//! key and picks by the balance-factor sign of the child instead. The two
//! rules are not interchangeable for balance-factor-zero edge cases and
//! must both be kept as written.

use structtrace_snapshot::{layout, OperationResult, Step, StepKind, TreeNodeSnapshot};

type NodeRef = Option<usize>;

#[derive(Clone, Debug)]
struct AvlNode {
    id: u64,
    key: i64,
    height: u32,
    left: NodeRef,
    right: NodeRef,
}

/// An AVL tree that records a replayable trace for every operation.
#[derive(Clone, Debug, Default)]
pub struct AvlTree {
    nodes: Vec<AvlNode>,
    free: Vec<usize>,
    root: NodeRef,
    next_id: u64,
    steps: Vec<Step>,
}

impl AvlTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// True if the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `key`, rebalancing on the return path of the recursion.
    ///
    /// Duplicate keys are not stored; the trace stops at the comparison
    /// that discovers equality and no rebalancing happens below it.
    pub fn insert(&mut self, key: i64) -> OperationResult {
        self.steps.clear();
        self.push_step(
            StepKind::Insert,
            format!("start inserting {key}"),
            None,
            vec![],
        );
        let new_root = self.insert_node(self.root, key);
        self.root = Some(new_root);
        self.push_step(StepKind::Complete, "insert complete".to_string(), None, vec![]);

        let steps = std::mem::take(&mut self.steps);
        OperationResult::tree_ok(steps, self.snapshot()).with_message(format!("inserted {key}"))
    }

    /// Search for `key`, tracing each comparison on the descent.
    pub fn search(&mut self, key: i64) -> OperationResult {
        self.steps.clear();

        let mut cur = self.root;
        while let Some(i) = cur {
            let (node_key, node_id) = (self.nodes[i].key, self.nodes[i].id);
            self.push_step(
                StepKind::Compare,
                format!("compare {key} with node {node_key}"),
                Some(node_id),
                vec![node_id],
            );
            if key == node_key {
                self.push_step(
                    StepKind::Found,
                    format!("found node {key}"),
                    Some(node_id),
                    vec![node_id],
                );
                let steps = std::mem::take(&mut self.steps);
                return OperationResult::tree_ok(steps, self.snapshot())
                    .with_message(format!("found {key}"));
            }
            cur = if key < node_key {
                self.nodes[i].left
            } else {
                self.nodes[i].right
            };
        }

        self.push_step(
            StepKind::NotFound,
            format!("key {key} is not in the tree"),
            None,
            vec![],
        );
        let steps = std::mem::take(&mut self.steps);
        OperationResult::tree_failed(format!("key {key} not found"), steps, self.snapshot())
    }

    /// Delete `key`. An absent key is a failure result with a `NotFound`
    /// step; the tree is left untouched.
    pub fn delete(&mut self, key: i64) -> OperationResult {
        self.steps.clear();
        self.push_step(
            StepKind::Delete,
            format!("start deleting {key}"),
            None,
            vec![],
        );

        // Existence pre-check so a miss never walks the mutating recursion.
        let mut cur = self.root;
        let mut found = false;
        while let Some(i) = cur {
            let node_key = self.nodes[i].key;
            if key == node_key {
                found = true;
                break;
            }
            cur = if key < node_key {
                self.nodes[i].left
            } else {
                self.nodes[i].right
            };
        }
        if !found {
            self.push_step(
                StepKind::NotFound,
                format!("key {key} is not in the tree, nothing to delete"),
                None,
                vec![],
            );
            let steps = std::mem::take(&mut self.steps);
            return OperationResult::tree_failed(
                format!("key {key} not found"),
                steps,
                self.snapshot(),
            );
        }

        self.root = self.delete_node(self.root, key);
        self.push_step(
            StepKind::Complete,
            format!("deleted node {key}"),
            None,
            vec![],
        );

        let steps = std::mem::take(&mut self.steps);
        OperationResult::tree_ok(steps, self.snapshot()).with_message(format!("deleted {key}"))
    }

    /// Snapshot of the current tree with interval-halving layout.
    pub fn snapshot(&self) -> Vec<TreeNodeSnapshot> {
        let mut out = Vec::new();
        self.snapshot_node(self.root, &mut out, 0, 0.0, layout::CANVAS_WIDTH);
        out
    }

    fn snapshot_node(
        &self,
        node: NodeRef,
        out: &mut Vec<TreeNodeSnapshot>,
        depth: u32,
        x_min: f64,
        x_max: f64,
    ) {
        let Some(i) = node else { return };
        let n = &self.nodes[i];
        let (x, y) = layout::position(depth, x_min, x_max);
        out.push(TreeNodeSnapshot {
            id: n.id,
            key: n.key,
            color: None,
            height: Some(n.height),
            left_id: n.left.map(|l| self.nodes[l].id),
            right_id: n.right.map(|r| self.nodes[r].id),
            parent_id: None,
            x,
            y,
        });
        self.snapshot_node(n.left, out, depth + 1, x_min, x);
        self.snapshot_node(n.right, out, depth + 1, x, x_max);
    }

    fn push_step(&mut self, kind: StepKind, desc: String, node_id: Option<u64>, highlight: Vec<u64>) {
        let state = self.snapshot();
        self.steps.push(Step::tree(kind, desc, node_id, highlight, state));
    }

    fn alloc(&mut self, key: i64) -> usize {
        let node = AvlNode {
            id: self.next_id,
            key,
            height: 1,
            left: None,
            right: None,
        };
        self.next_id += 1;
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, i: usize) {
        self.free.push(i);
    }

    fn height_of(&self, node: NodeRef) -> u32 {
        node.map_or(0, |i| self.nodes[i].height)
    }

    fn balance_of(&self, node: NodeRef) -> i32 {
        node.map_or(0, |i| {
            self.height_of(self.nodes[i].left) as i32 - self.height_of(self.nodes[i].right) as i32
        })
    }

    fn update_height(&mut self, i: usize) {
        self.nodes[i].height =
            1 + self.height_of(self.nodes[i].left).max(self.height_of(self.nodes[i].right));
    }

    /// Right rotation; returns the new subtree root.
    fn rotate_right(&mut self, y: usize) -> usize {
        let Some(x) = self.nodes[y].left else { return y };
        let t2 = self.nodes[x].right;
        self.nodes[x].right = Some(y);
        self.nodes[y].left = t2;
        self.update_height(y);
        self.update_height(x);

        let (y_key, x_id, y_id) = (self.nodes[y].key, self.nodes[x].id, self.nodes[y].id);
        self.push_step(
            StepKind::RotateRight,
            format!("right rotate around node {y_key}"),
            Some(y_id),
            vec![x_id, y_id],
        );
        x
    }

    /// Left rotation; returns the new subtree root.
    fn rotate_left(&mut self, x: usize) -> usize {
        let Some(y) = self.nodes[x].right else { return x };
        let t2 = self.nodes[y].left;
        self.nodes[y].left = Some(x);
        self.nodes[x].right = t2;
        self.update_height(x);
        self.update_height(y);

        let (x_key, x_id, y_id) = (self.nodes[x].key, self.nodes[x].id, self.nodes[y].id);
        self.push_step(
            StepKind::RotateLeft,
            format!("left rotate around node {x_key}"),
            Some(x_id),
            vec![x_id, y_id],
        );
        y
    }

    fn insert_node(&mut self, node: NodeRef, key: i64) -> usize {
        let Some(i) = node else {
            let new = self.alloc(key);
            let new_id = self.nodes[new].id;
            self.push_step(
                StepKind::Insert,
                format!("insert node {key}"),
                Some(new_id),
                vec![new_id],
            );
            return new;
        };

        let (node_key, node_id) = (self.nodes[i].key, self.nodes[i].id);
        self.push_step(
            StepKind::Compare,
            format!("compare {key} with node {node_key}"),
            Some(node_id),
            vec![node_id],
        );

        if key < node_key {
            let new_left = self.insert_node(self.nodes[i].left, key);
            self.nodes[i].left = Some(new_left);
        } else if key > node_key {
            let new_right = self.insert_node(self.nodes[i].right, key);
            self.nodes[i].right = Some(new_right);
        } else {
            // Duplicate; nothing changed below, nothing to rebalance.
            return i;
        }

        self.update_height(i);
        let balance = self.balance_of(Some(i));
        let i_id = self.nodes[i].id;

        // Insert-path case selection compares the inserted key against the
        // child's key, not grandchild balance signs.
        if balance > 1 {
            if let Some(l) = self.nodes[i].left {
                if key < self.nodes[l].key {
                    self.push_step(
                        StepKind::Rebalance,
                        "LL case: right rotation needed".to_string(),
                        Some(i_id),
                        vec![i_id],
                    );
                    return self.rotate_right(i);
                }
                if key > self.nodes[l].key {
                    self.push_step(
                        StepKind::Rebalance,
                        "LR case: left rotation then right rotation".to_string(),
                        Some(i_id),
                        vec![i_id],
                    );
                    let new_left = self.rotate_left(l);
                    self.nodes[i].left = Some(new_left);
                    return self.rotate_right(i);
                }
            }
        }
        if balance < -1 {
            if let Some(r) = self.nodes[i].right {
                if key > self.nodes[r].key {
                    self.push_step(
                        StepKind::Rebalance,
                        "RR case: left rotation needed".to_string(),
                        Some(i_id),
                        vec![i_id],
                    );
                    return self.rotate_left(i);
                }
                if key < self.nodes[r].key {
                    self.push_step(
                        StepKind::Rebalance,
                        "RL case: right rotation then left rotation".to_string(),
                        Some(i_id),
                        vec![i_id],
                    );
                    let new_right = self.rotate_right(r);
                    self.nodes[i].right = Some(new_right);
                    return self.rotate_left(i);
                }
            }
        }

        i
    }

    fn min_index(&self, mut i: usize) -> usize {
        while let Some(l) = self.nodes[i].left {
            i = l;
        }
        i
    }

    fn delete_node(&mut self, node: NodeRef, key: i64) -> NodeRef {
        let Some(i) = node else { return None };

        let (node_key, node_id) = (self.nodes[i].key, self.nodes[i].id);
        self.push_step(
            StepKind::Compare,
            format!("compare {key} with node {node_key}"),
            Some(node_id),
            vec![node_id],
        );

        if key < node_key {
            let new_left = self.delete_node(self.nodes[i].left, key);
            self.nodes[i].left = new_left;
        } else if key > node_key {
            let new_right = self.delete_node(self.nodes[i].right, key);
            self.nodes[i].right = new_right;
        } else {
            self.push_step(
                StepKind::Delete,
                format!("found node {key} to delete"),
                Some(node_id),
                vec![node_id],
            );

            if self.nodes[i].left.is_none() {
                self.push_step(
                    StepKind::Delete,
                    format!("node {node_key} has no left child, replaced by its right child"),
                    Some(node_id),
                    vec![node_id],
                );
                let right = self.nodes[i].right;
                self.release(i);
                return right;
            }
            if self.nodes[i].right.is_none() {
                self.push_step(
                    StepKind::Delete,
                    format!("node {node_key} has no right child, replaced by its left child"),
                    Some(node_id),
                    vec![node_id],
                );
                let left = self.nodes[i].left;
                self.release(i);
                return left;
            }

            // Two children: copy the in-order successor's key and id into
            // this slot, then delete the successor from the right subtree.
            let right = self.nodes[i].right;
            let s = self.min_index(right.unwrap_or(i));
            let (s_key, s_id) = (self.nodes[s].key, self.nodes[s].id);
            self.push_step(
                StepKind::Delete,
                format!("node {node_key} has two children, in-order successor is {s_key}"),
                Some(s_id),
                vec![node_id, s_id],
            );

            self.nodes[i].key = s_key;
            self.nodes[i].id = s_id;
            self.push_step(
                StepKind::Delete,
                format!("successor {s_key} replaces the deleted node"),
                Some(s_id),
                vec![s_id],
            );

            let new_right = self.delete_node(self.nodes[i].right, s_key);
            self.nodes[i].right = new_right;
        }

        self.update_height(i);
        let balance = self.balance_of(Some(i));
        let i_id = self.nodes[i].id;

        // Delete-path case selection goes by the child's balance-factor
        // sign; there is no single inserted key to compare against.
        if balance > 1 && self.balance_of(self.nodes[i].left) >= 0 {
            self.push_step(
                StepKind::Rebalance,
                "LL case: right rotation needed".to_string(),
                Some(i_id),
                vec![i_id],
            );
            return Some(self.rotate_right(i));
        }
        if balance > 1 && self.balance_of(self.nodes[i].left) < 0 {
            self.push_step(
                StepKind::Rebalance,
                "LR case: left rotation then right rotation".to_string(),
                Some(i_id),
                vec![i_id],
            );
            if let Some(l) = self.nodes[i].left {
                let new_left = self.rotate_left(l);
                self.nodes[i].left = Some(new_left);
            }
            return Some(self.rotate_right(i));
        }
        if balance < -1 && self.balance_of(self.nodes[i].right) <= 0 {
            self.push_step(
                StepKind::Rebalance,
                "RR case: left rotation needed".to_string(),
                Some(i_id),
                vec![i_id],
            );
            return Some(self.rotate_left(i));
        }
        if balance < -1 && self.balance_of(self.nodes[i].right) > 0 {
            self.push_step(
                StepKind::Rebalance,
                "RL case: right rotation then left rotation".to_string(),
                Some(i_id),
                vec![i_id],
            );
            if let Some(r) = self.nodes[i].right {
                let new_right = self.rotate_right(r);
                self.nodes[i].right = Some(new_right);
            }
            return Some(self.rotate_left(i));
        }

        Some(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_in_order(tree: &AvlTree) -> Vec<i64> {
        fn walk(tree: &AvlTree, node: NodeRef, out: &mut Vec<i64>) {
            let Some(i) = node else { return };
            walk(tree, tree.nodes[i].left, out);
            out.push(tree.nodes[i].key);
            walk(tree, tree.nodes[i].right, out);
        }
        let mut out = Vec::new();
        walk(tree, tree.root, &mut out);
        out
    }

    /// Recomputed height; panics if a stored height or balance factor is
    /// out of contract.
    fn check_node(tree: &AvlTree, node: NodeRef) -> u32 {
        let Some(i) = node else { return 0 };
        let n = &tree.nodes[i];
        let lh = check_node(tree, n.left);
        let rh = check_node(tree, n.right);
        assert_eq!(n.height, 1 + lh.max(rh), "stale height at key {}", n.key);
        let balance = lh as i32 - rh as i32;
        assert!(
            (-1..=1).contains(&balance),
            "balance factor {balance} at key {}",
            n.key
        );
        n.height
    }

    fn assert_invariants(tree: &AvlTree) {
        check_node(tree, tree.root);
        let keys = keys_in_order(tree);
        assert!(keys.windows(2).all(|w| w[0] < w[1]), "in-order must be sorted");
    }

    #[test]
    fn ascending_inserts_trigger_rr_rotation() {
        let mut tree = AvlTree::new();
        tree.insert(10);
        tree.insert(20);
        let result = tree.insert(30);

        assert!(result
            .steps
            .iter()
            .any(|s| s.kind == StepKind::Rebalance && s.description.starts_with("RR")));
        assert!(result.steps.iter().any(|s| s.kind == StepKind::RotateLeft));

        let snap = tree.snapshot();
        assert_eq!(snap[0].key, 20, "20 must rotate up to the root");
        assert_eq!(snap[0].height, Some(2));
        assert_invariants(&tree);
    }

    #[test]
    fn descending_inserts_trigger_ll_rotation() {
        let mut tree = AvlTree::new();
        tree.insert(30);
        tree.insert(20);
        let result = tree.insert(10);

        assert!(result
            .steps
            .iter()
            .any(|s| s.kind == StepKind::Rebalance && s.description.starts_with("LL")));
        assert_eq!(tree.snapshot()[0].key, 20);
        assert_invariants(&tree);
    }

    #[test]
    fn zigzag_inserts_trigger_double_rotations() {
        let mut tree = AvlTree::new();
        tree.insert(10);
        tree.insert(30);
        let lr = tree.insert(20); // right-left shape
        assert!(lr
            .steps
            .iter()
            .any(|s| s.kind == StepKind::Rebalance && s.description.starts_with("RL")));
        assert_invariants(&tree);

        let mut tree = AvlTree::new();
        tree.insert(30);
        tree.insert(10);
        let rl = tree.insert(20); // left-right shape
        assert!(rl
            .steps
            .iter()
            .any(|s| s.kind == StepKind::Rebalance && s.description.starts_with("LR")));
        assert_invariants(&tree);
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut tree = AvlTree::new();
        tree.insert(10);
        tree.insert(20);
        let before = tree.snapshot();

        let result = tree.insert(10);
        assert!(result.success);
        assert_eq!(tree.snapshot(), before);
        assert_eq!(keys_in_order(&tree), vec![10, 20]);
    }

    #[test]
    fn delete_missing_key_is_pure_failure() {
        let mut tree = AvlTree::new();
        for k in [10, 5, 15] {
            tree.insert(k);
        }
        let before = serde_json::to_string(&tree.snapshot()).unwrap();

        let result = tree.delete(42);
        assert!(!result.success);
        assert_eq!(result.steps.last().unwrap().kind, StepKind::NotFound);
        assert_eq!(serde_json::to_string(&tree.snapshot()).unwrap(), before);
    }

    #[test]
    fn delete_successor_case_keeps_balance() {
        let mut tree = AvlTree::new();
        for k in [50, 25, 75, 10, 30, 60, 90, 27] {
            tree.insert(k);
            assert_invariants(&tree);
        }

        // 25 has two children; its successor 27 takes over.
        let result = tree.delete(25);
        assert!(result.success);
        assert_invariants(&tree);
        assert_eq!(keys_in_order(&tree), vec![10, 27, 30, 50, 60, 75, 90]);

        let search = tree.search(27);
        assert!(search.success);
    }

    #[test]
    fn delete_then_search_reports_not_found() {
        let mut tree = AvlTree::new();
        for k in [8, 3, 12, 1, 6] {
            tree.insert(k);
        }
        assert!(tree.delete(3).success);
        assert!(!tree.search(3).success);
        assert_invariants(&tree);
    }

    #[test]
    fn heights_recorded_in_snapshots() {
        let mut tree = AvlTree::new();
        for k in [4, 2, 6, 1, 3, 5, 7] {
            tree.insert(k);
        }
        let snap = tree.snapshot();
        let root = &snap[0];
        assert_eq!(root.key, 4);
        assert_eq!(root.height, Some(3));
        assert!(snap.iter().all(|n| n.color.is_none()));
    }
}
