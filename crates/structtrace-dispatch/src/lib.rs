//! Routes operation requests to the traced structures.
//!
//! A [`Dispatcher`] owns one instance of each instrumented structure and
//! maps an [`OperationRequest`] onto it. Invalid structure/operation
//! pairings (e.g. `shortestPath` on a tree) are request errors, not
//! failed traces.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use structtrace_avltree::AvlTree;
use structtrace_graph::{sample_graph, Graph};
use structtrace_rbtree::RbTree;
use structtrace_snapshot::OperationResult;

/// Which traced structure a request addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracedStructure {
    RbTree,
    AvlTree,
    Graph,
}

impl fmt::Display for TracedStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RbTree => write!(f, "rbtree"),
            Self::AvlTree => write!(f, "avltree"),
            Self::Graph => write!(f, "graph"),
        }
    }
}

impl FromStr for TracedStructure {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rbtree" => Ok(Self::RbTree),
            "avltree" => Ok(Self::AvlTree),
            "graph" => Ok(Self::Graph),
            other => bail!("unknown structure: {other}"),
        }
    }
}

/// Operation to perform on a traced structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TracedOperation {
    Insert,
    Search,
    Delete,
    ShortestPath,
    Reset,
}

impl fmt::Display for TracedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Search => write!(f, "search"),
            Self::Delete => write!(f, "delete"),
            Self::ShortestPath => write!(f, "shortestPath"),
            Self::Reset => write!(f, "reset"),
        }
    }
}

impl FromStr for TracedOperation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert" => Ok(Self::Insert),
            "search" => Ok(Self::Search),
            "delete" => Ok(Self::Delete),
            "shortestPath" | "shortest_path" | "shortest-path" => Ok(Self::ShortestPath),
            "reset" => Ok(Self::Reset),
            other => bail!("unknown operation: {other}"),
        }
    }
}

/// Operation parameters; tree operations read `value`, shortest-path
/// reads `start`/`end`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end: Option<String>,
}

/// One request against the dispatcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub structure: TracedStructure,
    pub operation: TracedOperation,
    #[serde(default)]
    pub params: Params,
}

/// Owns the live traced structures and applies requests to them.
///
/// The graph starts out as the built-in sample graph so shortest-path
/// requests work out of the box; `reset` restores that state.
pub struct Dispatcher {
    rbtree: RbTree,
    avltree: AvlTree,
    graph: Graph,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            rbtree: RbTree::new(),
            avltree: AvlTree::new(),
            graph: sample_graph(),
        }
    }

    /// Apply one request. `Err` means the request itself was invalid;
    /// an unsuccessful trace (e.g. deleting an absent key) comes back as
    /// `Ok` with `success == false`.
    pub fn handle(&mut self, request: &OperationRequest) -> Result<OperationResult> {
        if request.operation == TracedOperation::Reset {
            self.reset(request.structure);
            return Ok(OperationResult {
                success: true,
                message: Some(format!("{} reset", request.structure)),
                steps: Vec::new(),
                final_tree: None,
                final_graph: None,
            });
        }

        match request.structure {
            TracedStructure::RbTree => {
                let value = request.params.value.unwrap_or(0);
                match request.operation {
                    TracedOperation::Insert => Ok(self.rbtree.insert(value)),
                    TracedOperation::Search => Ok(self.rbtree.search(value)),
                    TracedOperation::Delete => Ok(self.rbtree.delete(value)),
                    other => bail!("operation {other} is not valid for rbtree"),
                }
            }
            TracedStructure::AvlTree => {
                let value = request.params.value.unwrap_or(0);
                match request.operation {
                    TracedOperation::Insert => Ok(self.avltree.insert(value)),
                    TracedOperation::Search => Ok(self.avltree.search(value)),
                    TracedOperation::Delete => Ok(self.avltree.delete(value)),
                    other => bail!("operation {other} is not valid for avltree"),
                }
            }
            TracedStructure::Graph => match request.operation {
                TracedOperation::ShortestPath => {
                    let start = request.params.start.as_deref().unwrap_or("A");
                    let end = request.params.end.as_deref().unwrap_or("F");
                    Ok(self.graph.dijkstra(start, end))
                }
                other => bail!("operation {other} is not valid for graph"),
            },
        }
    }

    /// Restore one structure to its initial state.
    pub fn reset(&mut self, structure: TracedStructure) {
        match structure {
            TracedStructure::RbTree => self.rbtree = RbTree::new(),
            TracedStructure::AvlTree => self.avltree = AvlTree::new(),
            TracedStructure::Graph => self.graph = sample_graph(),
        }
    }

    /// Restore every structure to its initial state.
    pub fn reset_all(&mut self) {
        self.reset(TracedStructure::RbTree);
        self.reset(TracedStructure::AvlTree);
        self.reset(TracedStructure::Graph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_request(
        structure: TracedStructure,
        operation: TracedOperation,
        value: i64,
    ) -> OperationRequest {
        OperationRequest {
            structure,
            operation,
            params: Params {
                value: Some(value),
                ..Params::default()
            },
        }
    }

    #[test]
    fn routes_tree_operations_to_the_right_tree() {
        let mut dispatcher = Dispatcher::new();
        let inserted = dispatcher
            .handle(&tree_request(
                TracedStructure::RbTree,
                TracedOperation::Insert,
                7,
            ))
            .unwrap();
        assert!(inserted.success);

        let found = dispatcher
            .handle(&tree_request(
                TracedStructure::RbTree,
                TracedOperation::Search,
                7,
            ))
            .unwrap();
        assert!(found.success);

        // The AVL tree is an independent instance.
        let missing = dispatcher
            .handle(&tree_request(
                TracedStructure::AvlTree,
                TracedOperation::Search,
                7,
            ))
            .unwrap();
        assert!(!missing.success);
    }

    #[test]
    fn shortest_path_uses_the_sample_graph_by_default() {
        let mut dispatcher = Dispatcher::new();
        let request = OperationRequest {
            structure: TracedStructure::Graph,
            operation: TracedOperation::ShortestPath,
            params: Params::default(),
        };
        let result = dispatcher.handle(&request).unwrap();
        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("shortest path distance: 13"));
    }

    #[test]
    fn invalid_pairings_are_request_errors() {
        let mut dispatcher = Dispatcher::new();
        let bad_tree = OperationRequest {
            structure: TracedStructure::RbTree,
            operation: TracedOperation::ShortestPath,
            params: Params::default(),
        };
        assert!(dispatcher.handle(&bad_tree).is_err());

        let bad_graph = tree_request(TracedStructure::Graph, TracedOperation::Insert, 1);
        assert!(dispatcher.handle(&bad_graph).is_err());
    }

    #[test]
    fn reset_clears_only_the_named_structure() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .handle(&tree_request(
                TracedStructure::RbTree,
                TracedOperation::Insert,
                1,
            ))
            .unwrap();
        dispatcher
            .handle(&tree_request(
                TracedStructure::AvlTree,
                TracedOperation::Insert,
                2,
            ))
            .unwrap();

        let reset = OperationRequest {
            structure: TracedStructure::RbTree,
            operation: TracedOperation::Reset,
            params: Params::default(),
        };
        assert!(dispatcher.handle(&reset).unwrap().success);

        let rb = dispatcher
            .handle(&tree_request(
                TracedStructure::RbTree,
                TracedOperation::Search,
                1,
            ))
            .unwrap();
        assert!(!rb.success);
        let avl = dispatcher
            .handle(&tree_request(
                TracedStructure::AvlTree,
                TracedOperation::Search,
                2,
            ))
            .unwrap();
        assert!(avl.success);
    }

    #[test]
    fn shortest_path_parses_under_every_accepted_spelling() {
        for spelling in ["shortestPath", "shortest_path", "shortest-path"] {
            let parsed: TracedOperation = spelling.parse().unwrap();
            assert_eq!(parsed, TracedOperation::ShortestPath, "{spelling}");
        }
        assert!("shortestpath".parse::<TracedOperation>().is_err());
    }

    #[test]
    fn request_json_round_trips_with_wire_names() {
        let json = r#"{
            "structure": "graph",
            "operation": "shortestPath",
            "params": { "start": "A", "end": "D" }
        }"#;
        let request: OperationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.structure, TracedStructure::Graph);
        assert_eq!(request.operation, TracedOperation::ShortestPath);
        assert_eq!(request.params.start.as_deref(), Some("A"));

        let default_params: OperationRequest = serde_json::from_str(
            r#"{ "structure": "rbtree", "operation": "insert" }"#,
        )
        .unwrap();
        assert!(default_params.params.value.is_none());
    }
}
