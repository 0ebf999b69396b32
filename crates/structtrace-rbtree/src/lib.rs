//! Traced red-black tree for structtrace.
//!
//! Nodes live in an index-based arena; links (including the parent
//! back-reference) are arena indices, with `None` standing in for the
//! classic NIL sentinel. Color reads through [`RbTree::color_of`] treat the
//! empty reference as black, so the rebalancing code follows the textbook
//! case analysis without null checks.
//!
//! Every primitive action (compare, insert, recolor, rotate, rebalance
//! case transition) appends a [`Step`] carrying a full snapshot of the
//! tree *after* that action. Step ordering is the instrumentation
//! contract: within a fixup case, recolors precede rotations.

use structtrace_snapshot::{
    layout, NodeColor, OperationResult, Step, StepKind, TreeNodeSnapshot,
};

/// Arena reference to a node; `None` is the NIL sentinel.
type NodeRef = Option<usize>;

#[derive(Clone, Debug)]
struct RbNode {
    id: u64,
    key: i64,
    color: NodeColor,
    left: NodeRef,
    right: NodeRef,
    parent: NodeRef,
}

/// A red-black tree that records a replayable trace for every operation.
#[derive(Clone, Debug, Default)]
pub struct RbTree {
    nodes: Vec<RbNode>,
    free: Vec<usize>,
    root: NodeRef,
    next_id: u64,
    steps: Vec<Step>,
}

impl RbTree {
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

    /// Insert `key`, tracing the descent, the attachment, and the fixup.
    ///
    /// Duplicate keys are not stored: the trace stops at the comparison
    /// that discovers equality and the tree is left unchanged.
    pub fn insert(&mut self, key: i64) -> OperationResult {
        self.steps.clear();

        let mut parent: NodeRef = None;
        let mut cur = self.root;
        let mut went_left = false;
        while let Some(i) = cur {
            parent = Some(i);
            let (node_key, node_id) = (self.nodes[i].key, self.nodes[i].id);
            self.push_step(
                StepKind::Compare,
                format!("compare {key} with node {node_key}"),
                Some(node_id),
                vec![node_id],
            );
            if key < node_key {
                cur = self.nodes[i].left;
                went_left = true;
            } else if key > node_key {
                cur = self.nodes[i].right;
                went_left = false;
            } else {
                let steps = std::mem::take(&mut self.steps);
                return OperationResult::tree_ok(steps, self.snapshot())
                    .with_message(format!("key {key} is already present"));
            }
        }

        let z = self.alloc(key, parent);
        let z_id = self.nodes[z].id;
        match parent {
            None => {
                self.root = Some(z);
                self.push_step(
                    StepKind::Insert,
                    format!("node {key} becomes the root (red)"),
                    Some(z_id),
                    vec![z_id],
                );
            }
            Some(p) => {
                let (p_key, p_id) = (self.nodes[p].key, self.nodes[p].id);
                if went_left {
                    self.nodes[p].left = Some(z);
                    self.push_step(
                        StepKind::Insert,
                        format!("node {key} attached as left child of {p_key} (red)"),
                        Some(z_id),
                        vec![p_id, z_id],
                    );
                } else {
                    self.nodes[p].right = Some(z);
                    self.push_step(
                        StepKind::Insert,
                        format!("node {key} attached as right child of {p_key} (red)"),
                        Some(z_id),
                        vec![p_id, z_id],
                    );
                }
            }
        }

        self.insert_fixup(z);
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

    /// Delete `key`, tracing the three structural cases and the fixup.
    ///
    /// An absent key is a failure result, not an error; the tree is left
    /// untouched and the trace ends in a `NotFound` step.
    pub fn delete(&mut self, key: i64) -> OperationResult {
        self.steps.clear();

        let mut cur = self.root;
        let z = loop {
            let Some(i) = cur else {
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
            };
            let (node_key, node_id) = (self.nodes[i].key, self.nodes[i].id);
            self.push_step(
                StepKind::Compare,
                format!("compare {key} with node {node_key}"),
                Some(node_id),
                vec![node_id],
            );
            if key == node_key {
                break i;
            }
            cur = if key < node_key {
                self.nodes[i].left
            } else {
                self.nodes[i].right
            };
        };

        let z_id = self.nodes[z].id;
        self.push_step(
            StepKind::Delete,
            format!("found node {key} to delete"),
            Some(z_id),
            vec![z_id],
        );

        let mut removed_color = self.nodes[z].color;
        let x: NodeRef;
        let x_parent: NodeRef;

        if self.nodes[z].left.is_none() {
            x = self.nodes[z].right;
            x_parent = self.nodes[z].parent;
            self.transplant(z, x);
            self.release(z);
            self.push_step(
                StepKind::Delete,
                format!("node {key} has no left child, spliced in its right subtree"),
                Some(z_id),
                vec![z_id],
            );
        } else if self.nodes[z].right.is_none() {
            x = self.nodes[z].left;
            x_parent = self.nodes[z].parent;
            self.transplant(z, x);
            self.release(z);
            self.push_step(
                StepKind::Delete,
                format!("node {key} has no right child, spliced in its left subtree"),
                Some(z_id),
                vec![z_id],
            );
        } else {
            // Two children: replace with the in-order successor, the
            // minimum of the right subtree.
            let right = self.nodes[z].right;
            let s = self.minimum(right);
            let (s_key, s_id) = (self.nodes[s].key, self.nodes[s].id);
            self.push_step(
                StepKind::Delete,
                format!("node {key} has two children, in-order successor is {s_key}"),
                Some(s_id),
                vec![z_id, s_id],
            );

            removed_color = self.nodes[s].color;
            x = self.nodes[s].right;
            if self.nodes[s].parent == Some(z) {
                x_parent = Some(s);
            } else {
                x_parent = self.nodes[s].parent;
                self.transplant(s, self.nodes[s].right);
                let z_right = self.nodes[z].right;
                self.nodes[s].right = z_right;
                if let Some(r) = z_right {
                    self.nodes[r].parent = Some(s);
                }
            }
            self.transplant(z, Some(s));
            let z_left = self.nodes[z].left;
            self.nodes[s].left = z_left;
            if let Some(l) = z_left {
                self.nodes[l].parent = Some(s);
            }
            self.nodes[s].color = self.nodes[z].color;
            // z is detached before this snapshot is taken.
            self.release(z);
            self.push_step(
                StepKind::Delete,
                format!("successor {s_key} takes the place of node {key}"),
                Some(s_id),
                vec![s_id],
            );
            if removed_color == NodeColor::Black {
                self.delete_fixup(x, x_parent);
            }
            self.push_step(StepKind::Complete, "delete complete".to_string(), None, vec![]);
            let steps = std::mem::take(&mut self.steps);
            return OperationResult::tree_ok(steps, self.snapshot())
                .with_message(format!("deleted {key}"));
        }

        if removed_color == NodeColor::Black {
            self.delete_fixup(x, x_parent);
        }
        self.push_step(StepKind::Complete, "delete complete".to_string(), None, vec![]);

        let steps = std::mem::take(&mut self.steps);
        OperationResult::tree_ok(steps, self.snapshot()).with_message(format!("deleted {key}"))
    }

    /// Snapshot of the current tree, depth-first from the root, with
    /// display coordinates assigned by interval halving.
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
            color: Some(n.color),
            height: None,
            left_id: n.left.map(|l| self.nodes[l].id),
            right_id: n.right.map(|r| self.nodes[r].id),
            parent_id: n.parent.map(|p| self.nodes[p].id),
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

    fn alloc(&mut self, key: i64, parent: NodeRef) -> usize {
        let node = RbNode {
            id: self.next_id,
            key,
            color: NodeColor::Red,
            left: None,
            right: None,
            parent,
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
        // Slots are recycled; ids are not.
        self.free.push(i);
    }

    fn color_of(&self, node: NodeRef) -> NodeColor {
        node.map_or(NodeColor::Black, |i| self.nodes[i].color)
    }

    fn minimum(&self, node: NodeRef) -> usize {
        let mut i = node.unwrap_or(0);
        while let Some(l) = self.nodes[i].left {
            i = l;
        }
        i
    }

    /// Replace the subtree rooted at `u` with the subtree rooted at `v`.
    fn transplant(&mut self, u: usize, v: NodeRef) {
        let up = self.nodes[u].parent;
        match up {
            None => self.root = v,
            Some(p) if self.nodes[p].left == Some(u) => self.nodes[p].left = v,
            Some(p) => self.nodes[p].right = v,
        }
        if let Some(vi) = v {
            self.nodes[vi].parent = up;
        }
    }

    fn left_rotate(&mut self, x: usize) {
        let Some(y) = self.nodes[x].right else { return };
        let y_left = self.nodes[y].left;
        self.nodes[x].right = y_left;
        if let Some(yl) = y_left {
            self.nodes[yl].parent = Some(x);
        }
        let x_parent = self.nodes[x].parent;
        self.nodes[y].parent = x_parent;
        match x_parent {
            None => self.root = Some(y),
            Some(p) if self.nodes[p].left == Some(x) => self.nodes[p].left = Some(y),
            Some(p) => self.nodes[p].right = Some(y),
        }
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);

        let (x_key, x_id, y_id) = (self.nodes[x].key, self.nodes[x].id, self.nodes[y].id);
        self.push_step(
            StepKind::RotateLeft,
            format!("left rotate around node {x_key}"),
            Some(x_id),
            vec![x_id, y_id],
        );
    }

    fn right_rotate(&mut self, y: usize) {
        let Some(x) = self.nodes[y].left else { return };
        let x_right = self.nodes[x].right;
        self.nodes[y].left = x_right;
        if let Some(xr) = x_right {
            self.nodes[xr].parent = Some(y);
        }
        let y_parent = self.nodes[y].parent;
        self.nodes[x].parent = y_parent;
        match y_parent {
            None => self.root = Some(x),
            Some(p) if self.nodes[p].left == Some(y) => self.nodes[p].left = Some(x),
            Some(p) => self.nodes[p].right = Some(x),
        }
        self.nodes[x].right = Some(y);
        self.nodes[y].parent = Some(x);

        let (y_key, x_id, y_id) = (self.nodes[y].key, self.nodes[x].id, self.nodes[y].id);
        self.push_step(
            StepKind::RotateRight,
            format!("right rotate around node {y_key}"),
            Some(y_id),
            vec![x_id, y_id],
        );
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while self.color_of(self.nodes[z].parent) == NodeColor::Red {
            let Some(p) = self.nodes[z].parent else { break };
            let Some(g) = self.nodes[p].parent else { break };
            let z_id = self.nodes[z].id;
            let p_id = self.nodes[p].id;

            if self.nodes[g].left == Some(p) {
                let uncle = self.nodes[g].right;
                if self.color_of(uncle) == NodeColor::Red {
                    // Case 1: uncle is red; recolor and continue from the
                    // grandparent.
                    let u = uncle.unwrap_or(g);
                    let u_id = self.nodes[u].id;
                    self.push_step(
                        StepKind::Rebalance,
                        "case 1: uncle is red, recolor".to_string(),
                        Some(z_id),
                        vec![z_id, p_id, u_id],
                    );
                    self.nodes[p].color = NodeColor::Black;
                    self.nodes[u].color = NodeColor::Black;
                    self.nodes[g].color = NodeColor::Red;
                    let (p_key, u_key, g_key, g_id) = (
                        self.nodes[p].key,
                        self.nodes[u].key,
                        self.nodes[g].key,
                        self.nodes[g].id,
                    );
                    self.push_step(
                        StepKind::Recolor,
                        format!("nodes {p_key} and {u_key} turn black, {g_key} turns red"),
                        Some(g_id),
                        vec![p_id, u_id, g_id],
                    );
                    z = g;
                } else {
                    if self.nodes[p].right == Some(z) {
                        // Case 2: uncle black, z is an inner (right) child.
                        z = p;
                        let z_id = self.nodes[z].id;
                        self.push_step(
                            StepKind::Rebalance,
                            "case 2: uncle is black, node is a right child".to_string(),
                            Some(z_id),
                            vec![z_id],
                        );
                        self.left_rotate(z);
                    }
                    // Case 3: uncle black, z is an outer (left) child.
                    let Some(p) = self.nodes[z].parent else { break };
                    let Some(g) = self.nodes[p].parent else { break };
                    let z_id = self.nodes[z].id;
                    self.push_step(
                        StepKind::Rebalance,
                        "case 3: uncle is black, node is a left child".to_string(),
                        Some(z_id),
                        vec![z_id],
                    );
                    self.nodes[p].color = NodeColor::Black;
                    self.nodes[g].color = NodeColor::Red;
                    let (p_key, g_key, p_id) =
                        (self.nodes[p].key, self.nodes[g].key, self.nodes[p].id);
                    self.push_step(
                        StepKind::Recolor,
                        format!("node {p_key} turns black, {g_key} turns red"),
                        Some(p_id),
                        vec![p_id],
                    );
                    self.right_rotate(g);
                }
            } else {
                // Mirror cases: parent is a right child.
                let uncle = self.nodes[g].left;
                if self.color_of(uncle) == NodeColor::Red {
                    let u = uncle.unwrap_or(g);
                    let u_id = self.nodes[u].id;
                    self.push_step(
                        StepKind::Rebalance,
                        "case 1 (mirror): uncle is red, recolor".to_string(),
                        Some(z_id),
                        vec![z_id, p_id, u_id],
                    );
                    self.nodes[p].color = NodeColor::Black;
                    self.nodes[u].color = NodeColor::Black;
                    self.nodes[g].color = NodeColor::Red;
                    let (p_key, u_key, g_key, g_id) = (
                        self.nodes[p].key,
                        self.nodes[u].key,
                        self.nodes[g].key,
                        self.nodes[g].id,
                    );
                    self.push_step(
                        StepKind::Recolor,
                        format!("nodes {p_key} and {u_key} turn black, {g_key} turns red"),
                        Some(g_id),
                        vec![p_id, u_id, g_id],
                    );
                    z = g;
                } else {
                    if self.nodes[p].left == Some(z) {
                        z = p;
                        let z_id = self.nodes[z].id;
                        self.push_step(
                            StepKind::Rebalance,
                            "case 2 (mirror): uncle is black, node is a left child".to_string(),
                            Some(z_id),
                            vec![z_id],
                        );
                        self.right_rotate(z);
                    }
                    let Some(p) = self.nodes[z].parent else { break };
                    let Some(g) = self.nodes[p].parent else { break };
                    let z_id = self.nodes[z].id;
                    self.push_step(
                        StepKind::Rebalance,
                        "case 3 (mirror): uncle is black, node is a right child".to_string(),
                        Some(z_id),
                        vec![z_id],
                    );
                    self.nodes[p].color = NodeColor::Black;
                    self.nodes[g].color = NodeColor::Red;
                    let (p_key, g_key, p_id) =
                        (self.nodes[p].key, self.nodes[g].key, self.nodes[p].id);
                    self.push_step(
                        StepKind::Recolor,
                        format!("node {p_key} turns black, {g_key} turns red"),
                        Some(p_id),
                        vec![p_id],
                    );
                    self.left_rotate(g);
                }
            }
        }

        if let Some(r) = self.root {
            if self.nodes[r].color == NodeColor::Red {
                self.nodes[r].color = NodeColor::Black;
                let r_id = self.nodes[r].id;
                self.push_step(
                    StepKind::Recolor,
                    "root turns black".to_string(),
                    Some(r_id),
                    vec![r_id],
                );
            }
        }
    }

    /// Restore the black-height invariant after removing a black node.
    ///
    /// `x` is the node that moved into the removed position (possibly the
    /// empty reference), `x_parent` its parent; the pair replaces the
    /// sentinel's always-valid parent pointer.
    fn delete_fixup(&mut self, mut x: NodeRef, mut x_parent: NodeRef) {
        while x != self.root && self.color_of(x) == NodeColor::Black {
            let Some(p) = x_parent else { break };
            let p_id = self.nodes[p].id;

            if self.nodes[p].left == x {
                let Some(mut w) = self.nodes[p].right else { break };
                if self.nodes[w].color == NodeColor::Red {
                    // Case 1: sibling is red; rotate it up to expose a
                    // black sibling.
                    let w_id = self.nodes[w].id;
                    self.push_step(
                        StepKind::Rebalance,
                        "case 1: sibling is red, rotate at parent".to_string(),
                        Some(w_id),
                        vec![p_id, w_id],
                    );
                    self.nodes[w].color = NodeColor::Black;
                    self.nodes[p].color = NodeColor::Red;
                    let (w_key, p_key) = (self.nodes[w].key, self.nodes[p].key);
                    self.push_step(
                        StepKind::Recolor,
                        format!("sibling {w_key} turns black, parent {p_key} turns red"),
                        Some(w_id),
                        vec![w_id, p_id],
                    );
                    self.left_rotate(p);
                    let Some(nw) = self.nodes[p].right else { break };
                    w = nw;
                }

                if self.color_of(self.nodes[w].left) == NodeColor::Black
                    && self.color_of(self.nodes[w].right) == NodeColor::Black
                {
                    // Case 2: sibling and both its children are black;
                    // recolor and move the deficit up.
                    let (w_key, w_id) = (self.nodes[w].key, self.nodes[w].id);
                    self.push_step(
                        StepKind::Rebalance,
                        "case 2: sibling's children are both black, recolor and move up".to_string(),
                        Some(w_id),
                        vec![w_id],
                    );
                    self.nodes[w].color = NodeColor::Red;
                    self.push_step(
                        StepKind::Recolor,
                        format!("sibling {w_key} turns red"),
                        Some(w_id),
                        vec![w_id],
                    );
                    x = Some(p);
                    x_parent = self.nodes[p].parent;
                } else {
                    if self.color_of(self.nodes[w].right) == NodeColor::Black {
                        // Case 3: far child black; rotate the sibling.
                        let w_id = self.nodes[w].id;
                        self.push_step(
                            StepKind::Rebalance,
                            "case 3: sibling's far child is black, rotate sibling".to_string(),
                            Some(w_id),
                            vec![w_id],
                        );
                        if let Some(wl) = self.nodes[w].left {
                            self.nodes[wl].color = NodeColor::Black;
                        }
                        self.nodes[w].color = NodeColor::Red;
                        let w_key = self.nodes[w].key;
                        self.push_step(
                            StepKind::Recolor,
                            format!("sibling {w_key} turns red, its left child turns black"),
                            Some(w_id),
                            vec![w_id],
                        );
                        self.right_rotate(w);
                        let Some(nw) = self.nodes[p].right else { break };
                        w = nw;
                    }
                    // Case 4: far child red; rotate at the parent and
                    // terminate.
                    let w_id = self.nodes[w].id;
                    self.push_step(
                        StepKind::Rebalance,
                        "case 4: sibling's far child is red, rotate at parent".to_string(),
                        Some(w_id),
                        vec![w_id, p_id],
                    );
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = NodeColor::Black;
                    if let Some(wr) = self.nodes[w].right {
                        self.nodes[wr].color = NodeColor::Black;
                    }
                    let (w_key, p_key) = (self.nodes[w].key, self.nodes[p].key);
                    self.push_step(
                        StepKind::Recolor,
                        format!("sibling {w_key} takes parent {p_key}'s color, parent turns black"),
                        Some(w_id),
                        vec![w_id, p_id],
                    );
                    self.left_rotate(p);
                    x = self.root;
                    x_parent = None;
                }
            } else {
                // Mirror cases: x is a right child.
                let Some(mut w) = self.nodes[p].left else { break };
                if self.nodes[w].color == NodeColor::Red {
                    let w_id = self.nodes[w].id;
                    self.push_step(
                        StepKind::Rebalance,
                        "case 1 (mirror): sibling is red, rotate at parent".to_string(),
                        Some(w_id),
                        vec![p_id, w_id],
                    );
                    self.nodes[w].color = NodeColor::Black;
                    self.nodes[p].color = NodeColor::Red;
                    let (w_key, p_key) = (self.nodes[w].key, self.nodes[p].key);
                    self.push_step(
                        StepKind::Recolor,
                        format!("sibling {w_key} turns black, parent {p_key} turns red"),
                        Some(w_id),
                        vec![w_id, p_id],
                    );
                    self.right_rotate(p);
                    let Some(nw) = self.nodes[p].left else { break };
                    w = nw;
                }

                if self.color_of(self.nodes[w].left) == NodeColor::Black
                    && self.color_of(self.nodes[w].right) == NodeColor::Black
                {
                    let (w_key, w_id) = (self.nodes[w].key, self.nodes[w].id);
                    self.push_step(
                        StepKind::Rebalance,
                        "case 2 (mirror): sibling's children are both black, recolor and move up"
                            .to_string(),
                        Some(w_id),
                        vec![w_id],
                    );
                    self.nodes[w].color = NodeColor::Red;
                    self.push_step(
                        StepKind::Recolor,
                        format!("sibling {w_key} turns red"),
                        Some(w_id),
                        vec![w_id],
                    );
                    x = Some(p);
                    x_parent = self.nodes[p].parent;
                } else {
                    if self.color_of(self.nodes[w].left) == NodeColor::Black {
                        let w_id = self.nodes[w].id;
                        self.push_step(
                            StepKind::Rebalance,
                            "case 3 (mirror): sibling's far child is black, rotate sibling"
                                .to_string(),
                            Some(w_id),
                            vec![w_id],
                        );
                        if let Some(wr) = self.nodes[w].right {
                            self.nodes[wr].color = NodeColor::Black;
                        }
                        self.nodes[w].color = NodeColor::Red;
                        let w_key = self.nodes[w].key;
                        self.push_step(
                            StepKind::Recolor,
                            format!("sibling {w_key} turns red, its right child turns black"),
                            Some(w_id),
                            vec![w_id],
                        );
                        self.left_rotate(w);
                        let Some(nw) = self.nodes[p].left else { break };
                        w = nw;
                    }
                    let w_id = self.nodes[w].id;
                    self.push_step(
                        StepKind::Rebalance,
                        "case 4 (mirror): sibling's far child is red, rotate at parent".to_string(),
                        Some(w_id),
                        vec![w_id, p_id],
                    );
                    self.nodes[w].color = self.nodes[p].color;
                    self.nodes[p].color = NodeColor::Black;
                    if let Some(wl) = self.nodes[w].left {
                        self.nodes[wl].color = NodeColor::Black;
                    }
                    let (w_key, p_key) = (self.nodes[w].key, self.nodes[p].key);
                    self.push_step(
                        StepKind::Recolor,
                        format!("sibling {w_key} takes parent {p_key}'s color, parent turns black"),
                        Some(w_id),
                        vec![w_id, p_id],
                    );
                    self.right_rotate(p);
                    x = self.root;
                    x_parent = None;
                }
            }
        }

        if let Some(xi) = x {
            if self.nodes[xi].color == NodeColor::Red {
                self.nodes[xi].color = NodeColor::Black;
                let (x_key, x_id) = (self.nodes[xi].key, self.nodes[xi].id);
                self.push_step(
                    StepKind::Recolor,
                    format!("node {x_key} turns black"),
                    Some(x_id),
                    vec![x_id],
                );
            }
        }
    }
}
