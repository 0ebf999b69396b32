//! Step and snapshot model for structtrace.
//!
//! A traced operation (tree insert, graph search, ...) emits an ordered
//! list of [`Step`]s. Each step records one observable micro-action and
//! embeds a full snapshot of the structure *after* that action, so a
//! client can replay the operation frame by frame.

use serde::{Deserialize, Serialize};

/// Color of a red-black tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeColor {
    Red,
    Black,
}

/// Kind of a traced micro-action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Insert,
    Delete,
    RotateLeft,
    RotateRight,
    Recolor,
    Compare,
    Visit,
    Found,
    NotFound,
    UpdateDistance,
    SelectNode,
    MarkVisited,
    Rebalance,
    Complete,
}

/// Point-in-time view of one tree node.
///
/// Links carry node *ids* (not arena indices), so a snapshot is stable
/// across the lifetime of a tree even as storage is recycled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNodeSnapshot {
    pub id: u64,
    pub key: i64,
    /// Red-black trees only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<NodeColor>,
    /// AVL trees only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub left_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub right_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<u64>,
    pub x: f64,
    pub y: f64,
}

/// Point-in-time view of one graph node during a search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNodeSnapshot {
    pub id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    /// Tentative distance from the start node; absent until first relaxed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub distance: Option<i64>,
    pub visited: bool,
    pub in_path: bool,
}

/// Point-in-time view of one graph edge during a search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdgeSnapshot {
    pub from: String,
    pub to: String,
    pub weight: i64,
    pub in_path: bool,
    /// True for the edge currently under relaxation.
    pub selected: bool,
}

/// Full node + edge view of a graph at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNodeSnapshot>,
    pub edges: Vec<GraphEdgeSnapshot>,
}

/// One observable micro-action in a traced operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub description: String,
    /// Primary node acted upon, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub node_id: Option<u64>,
    /// Nodes a renderer should emphasize for this frame.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub highlight: Vec<u64>,
    /// Tree state after this step (tree operations only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tree_state: Option<Vec<TreeNodeSnapshot>>,
    /// Graph state after this step (graph operations only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub graph_state: Option<GraphSnapshot>,
}

impl Step {
    /// Step over a tree, embedding the post-action tree snapshot.
    pub fn tree(
        kind: StepKind,
        description: impl Into<String>,
        node_id: Option<u64>,
        highlight: Vec<u64>,
        tree_state: Vec<TreeNodeSnapshot>,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            node_id,
            highlight,
            tree_state: Some(tree_state),
            graph_state: None,
        }
    }

    /// Step over a graph, embedding the post-action graph snapshot.
    pub fn graph(kind: StepKind, description: impl Into<String>, graph_state: GraphSnapshot) -> Self {
        Self {
            kind,
            description: description.into(),
            node_id: None,
            highlight: Vec::new(),
            tree_state: None,
            graph_state: Some(graph_state),
        }
    }
}

/// Result of one traced operation: the full trace plus the final state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub final_tree: Option<Vec<TreeNodeSnapshot>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub final_graph: Option<GraphSnapshot>,
}

impl OperationResult {
    /// Successful tree operation.
    pub fn tree_ok(steps: Vec<Step>, final_tree: Vec<TreeNodeSnapshot>) -> Self {
        Self {
            success: true,
            message: None,
            steps,
            final_tree: Some(final_tree),
            final_graph: None,
        }
    }

    /// Failed tree operation (key absent and similar; state unmutated).
    pub fn tree_failed(
        message: impl Into<String>,
        steps: Vec<Step>,
        final_tree: Vec<TreeNodeSnapshot>,
    ) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            steps,
            final_tree: Some(final_tree),
            final_graph: None,
        }
    }

    /// Attach a message to a successful result.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Deterministic tree layout: recursive halving of a horizontal interval
/// per depth level. Purely cosmetic; recomputed for every snapshot.
pub mod layout {
    /// Horizontal extent of the drawing canvas.
    pub const CANVAS_WIDTH: f64 = 800.0;
    /// Vertical distance between tree levels.
    pub const LEVEL_HEIGHT: f64 = 80.0;
    /// Vertical offset of the root row.
    pub const TOP_MARGIN: f64 = 50.0;

    /// Position of a node occupying `[x_min, x_max)` at `depth`.
    pub fn position(depth: u32, x_min: f64, x_max: f64) -> (f64, f64) {
        let x = (x_min + x_max) / 2.0;
        let y = f64::from(depth) * LEVEL_HEIGHT + TOP_MARGIN;
        (x, y)
    }
}
