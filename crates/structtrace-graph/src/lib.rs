//! Traced weighted undirected graph with Dijkstra shortest-path search.
//!
//! Node and adjacency storage is ordered (`BTreeMap`) and the frontier
//! breaks priority ties by insertion sequence, so a search over the same
//! graph always emits the same step list. Every observable action during
//! the search (initialization, node selection, every relaxation whether it
//! improves or not, completion or failure) appends a [`Step`] embedding a
//! snapshot of the *entire* node and edge set.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use anyhow::{bail, Result};
use structtrace_snapshot::{
    GraphEdgeSnapshot, GraphNodeSnapshot, GraphSnapshot, OperationResult, Step, StepKind,
};

/// One directed half of an undirected edge.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Edge {
    to: String,
    weight: i64,
}

/// A weighted undirected graph that records a replayable trace for every
/// shortest-path search.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    adjacency: BTreeMap<String, Vec<Edge>>,
    coords: BTreeMap<String, (f64, f64)>,
    steps: Vec<Step>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Add a node. Idempotent on id: re-adding only updates the stored
    /// display coordinates, never duplicates the adjacency entry.
    pub fn add_node(&mut self, id: impl Into<String>, x: f64, y: f64) {
        let id = id.into();
        self.adjacency.entry(id.clone()).or_default();
        self.coords.insert(id, (x, y));
    }

    /// Add an undirected edge; both directions become traversable at
    /// `weight`. Parallel edges are permitted and not deduplicated.
    ///
    /// Negative weights are rejected: the search does not support them.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>, weight: i64) -> Result<()> {
        if weight < 0 {
            bail!("edge weight must be non-negative, got {weight}");
        }
        let (from, to) = (from.into(), to.into());
        self.adjacency
            .entry(from.clone())
            .or_default()
            .push(Edge { to: to.clone(), weight });
        self.adjacency.entry(to).or_default().push(Edge { to: from, weight });
        Ok(())
    }

    /// Shortest path from `start` to `end`, tracing every selection and
    /// relaxation.
    ///
    /// An unreachable (or unknown) `end` produces a failure result whose
    /// trace finishes with a `NotFound` step; no partial path is reported.
    pub fn dijkstra(&mut self, start: &str, end: &str) -> OperationResult {
        self.steps.clear();

        let mut distances: HashMap<String, i64> = HashMap::new();
        let mut previous: HashMap<String, String> = HashMap::new();
        let mut visited: HashSet<String> = HashSet::new();
        distances.insert(start.to_string(), 0);

        self.push_step(
            StepKind::Visit,
            format!("initialize: start {start} distance set to 0"),
            &distances,
            &visited,
            &[],
            None,
        );

        // Lazy-deletion frontier: a node may be queued several times with
        // different priorities; stale entries are skipped when popped.
        // The sequence number makes equal-priority pops FIFO.
        let mut frontier: BinaryHeap<Reverse<(i64, u64, String)>> = BinaryHeap::new();
        let mut seq: u64 = 0;
        frontier.push(Reverse((0, seq, start.to_string())));

        while let Some(Reverse((dist, _, current))) = frontier.pop() {
            if visited.contains(&current) {
                continue;
            }
            visited.insert(current.clone());

            self.push_step(
                StepKind::SelectNode,
                format!("select unvisited node with smallest distance: {current} (distance {dist})"),
                &distances,
                &visited,
                &[],
                None,
            );

            if current == end {
                let mut path = vec![end.to_string()];
                let mut at = end;
                while let Some(prev) = previous.get(at) {
                    path.insert(0, prev.clone());
                    at = prev;
                }
                self.push_step(
                    StepKind::Complete,
                    format!("shortest path found: {}, total distance {dist}", path.join(" -> ")),
                    &distances,
                    &visited,
                    &path,
                    None,
                );
                let final_graph = self
                    .steps
                    .last()
                    .and_then(|s| s.graph_state.clone());
                let steps = std::mem::take(&mut self.steps);
                return OperationResult {
                    success: true,
                    message: Some(format!("shortest path distance: {dist}")),
                    steps,
                    final_tree: None,
                    final_graph,
                };
            }

            let edges = self.adjacency.get(&current).cloned().unwrap_or_default();
            for edge in edges {
                if visited.contains(&edge.to) {
                    continue;
                }
                let candidate = dist + edge.weight;
                let known = distances.get(&edge.to).copied();
                match known {
                    Some(best) if candidate >= best => {
                        self.push_step(
                            StepKind::Compare,
                            format!(
                                "edge {current} -> {}: new distance {candidate} >= current {best}, no update",
                                edge.to
                            ),
                            &distances,
                            &visited,
                            &[],
                            Some((&current, &edge.to)),
                        );
                    }
                    _ => {
                        let old = known.map_or_else(|| "inf".to_string(), |d| d.to_string());
                        distances.insert(edge.to.clone(), candidate);
                        previous.insert(edge.to.clone(), current.clone());
                        seq += 1;
                        frontier.push(Reverse((candidate, seq, edge.to.clone())));
                        self.push_step(
                            StepKind::UpdateDistance,
                            format!(
                                "update node {} distance: {old} -> {candidate} (via {current})",
                                edge.to
                            ),
                            &distances,
                            &visited,
                            &[],
                            Some((&current, &edge.to)),
                        );
                    }
                }
            }
        }

        self.push_step(
            StepKind::NotFound,
            format!("no path from {start} to {end}"),
            &distances,
            &visited,
            &[],
            None,
        );
        let final_graph = self.steps.last().and_then(|s| s.graph_state.clone());
        let steps = std::mem::take(&mut self.steps);
        OperationResult {
            success: false,
            message: Some(format!("no path from {start} to {end}")),
            steps,
            final_tree: None,
            final_graph,
        }
    }

    /// Snapshot of the entire node and edge set.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.build_snapshot(&HashMap::new(), &HashSet::new(), &[], None)
    }

    fn push_step(
        &mut self,
        kind: StepKind,
        desc: String,
        distances: &HashMap<String, i64>,
        visited: &HashSet<String>,
        path: &[String],
        current_edge: Option<(&str, &str)>,
    ) {
        let state = self.build_snapshot(distances, visited, path, current_edge);
        self.steps.push(Step::graph(kind, desc, state));
    }

    fn build_snapshot(
        &self,
        distances: &HashMap<String, i64>,
        visited: &HashSet<String>,
        path: &[String],
        current_edge: Option<(&str, &str)>,
    ) -> GraphSnapshot {
        let nodes = self
            .adjacency
            .keys()
            .map(|id| {
                let (x, y) = self.coords.get(id).copied().unwrap_or_default();
                GraphNodeSnapshot {
                    id: id.clone(),
                    label: id.clone(),
                    x,
                    y,
                    distance: distances.get(id).copied(),
                    visited: visited.contains(id),
                    in_path: path.iter().any(|p| p == id),
                }
            })
            .collect();

        let on_path = |a: &str, b: &str| {
            path.windows(2)
                .any(|w| (w[0] == a && w[1] == b) || (w[0] == b && w[1] == a))
        };
        let edges = self
            .adjacency
            .iter()
            .flat_map(|(from, neighbors)| {
                neighbors.iter().map(move |e| GraphEdgeSnapshot {
                    from: from.clone(),
                    to: e.to.clone(),
                    weight: e.weight,
                    in_path: on_path(from, &e.to),
                    selected: current_edge.is_some_and(|(a, b)| {
                        (a == from.as_str() && b == e.to) || (a == e.to.as_str() && b == from.as_str())
                    }),
                })
            })
            .collect();

        GraphSnapshot { nodes, edges }
    }
}

/// The six-node demo graph used as the default process-wide instance.
pub fn sample_graph() -> Graph {
    let mut g = Graph::new();

    g.add_node("A", 100.0, 150.0);
    g.add_node("B", 250.0, 50.0);
    g.add_node("C", 250.0, 250.0);
    g.add_node("D", 400.0, 100.0);
    g.add_node("E", 400.0, 200.0);
    g.add_node("F", 550.0, 150.0);

    // Weights are non-negative by construction.
    let edges = [
        ("A", "B", 4),
        ("A", "C", 2),
        ("B", "C", 1),
        ("B", "D", 5),
        ("C", "D", 8),
        ("C", "E", 10),
        ("D", "E", 2),
        ("D", "F", 6),
        ("E", "F", 3),
    ];
    for (from, to, weight) in edges {
        let _ = g.add_edge(from, to, weight);
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_graph() -> Graph {
        let mut g = Graph::new();
        g.add_node("A", 0.0, 0.0);
        g.add_node("B", 1.0, 0.0);
        g.add_node("C", 0.0, 1.0);
        g.add_node("D", 1.0, 1.0);
        g.add_edge("A", "B", 4).unwrap();
        g.add_edge("A", "C", 2).unwrap();
        g.add_edge("C", "B", 1).unwrap();
        g.add_edge("B", "D", 5).unwrap();
        g.add_edge("C", "D", 8).unwrap();
        g
    }

    #[test]
    fn shortest_path_goes_through_intermediate_nodes() {
        let mut g = small_graph();
        let result = g.dijkstra("A", "D");

        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("shortest path distance: 8"));

        let last = result.steps.last().unwrap();
        assert_eq!(last.kind, StepKind::Complete);

        let state = last.graph_state.as_ref().unwrap();
        let path: Vec<&str> = state
            .nodes
            .iter()
            .filter(|n| n.in_path)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(path, vec!["A", "B", "C", "D"]); // sorted node order
        assert!(last.description.contains("A -> C -> B -> D"));
    }

    #[test]
    fn unreachable_end_emits_not_found_and_no_complete() {
        let mut g = Graph::new();
        g.add_node("A", 0.0, 0.0);
        g.add_node("B", 1.0, 0.0);

        let result = g.dijkstra("A", "B");
        assert!(!result.success);
        assert_eq!(result.steps.last().unwrap().kind, StepKind::NotFound);
        assert!(result.steps.iter().all(|s| s.kind != StepKind::Complete));
        // No partial path.
        let state = result.final_graph.unwrap();
        assert!(state.nodes.iter().all(|n| !n.in_path));
    }

    #[test]
    fn non_improving_relaxation_emits_compare_step() {
        let mut g = small_graph();
        // Parallel edge: the second C-D relaxation cannot improve.
        g.add_edge("C", "D", 20).unwrap();

        let result = g.dijkstra("A", "D");
        assert!(result.success);
        assert!(
            result.steps.iter().any(|s| s.kind == StepKind::Compare),
            "failed relaxations must appear in the trace"
        );
    }

    #[test]
    fn update_distance_marks_the_relaxed_edge_selected() {
        let mut g = small_graph();
        let result = g.dijkstra("A", "D");

        let update = result
            .steps
            .iter()
            .find(|s| s.kind == StepKind::UpdateDistance)
            .unwrap();
        let state = update.graph_state.as_ref().unwrap();
        assert!(state.edges.iter().any(|e| e.selected));
    }

    #[test]
    fn traces_are_deterministic() {
        let mut g = small_graph();
        let first = g.dijkstra("A", "D");
        let second = g.dijkstra("A", "D");
        assert_eq!(
            serde_json::to_string(&first.steps).unwrap(),
            serde_json::to_string(&second.steps).unwrap()
        );
    }

    #[test]
    fn add_node_is_idempotent_on_id() {
        let mut g = Graph::new();
        g.add_node("A", 1.0, 2.0);
        g.add_edge("A", "B", 3).unwrap();
        g.add_node("A", 9.0, 9.0);

        assert_eq!(g.node_count(), 2);
        let snap = g.snapshot();
        let a = snap.nodes.iter().find(|n| n.id == "A").unwrap();
        assert_eq!((a.x, a.y), (9.0, 9.0));
        // The adjacency entry survived the re-add.
        assert_eq!(snap.edges.iter().filter(|e| e.from == "A").count(), 1);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut g = Graph::new();
        g.add_node("A", 0.0, 0.0);
        g.add_node("B", 1.0, 0.0);
        assert!(g.add_edge("A", "B", -1).is_err());
    }

    #[test]
    fn sample_graph_shortest_path() {
        let mut g = sample_graph();
        let result = g.dijkstra("A", "F");
        assert!(result.success);
        // A -> C -> B -> D -> E -> F: 2 + 1 + 5 + 2 + 3.
        assert_eq!(result.message.as_deref(), Some("shortest path distance: 13"));
    }

    #[test]
    fn distances_absent_until_first_relaxed() {
        let mut g = small_graph();
        let result = g.dijkstra("A", "D");
        let init = &result.steps[0];
        assert_eq!(init.kind, StepKind::Visit);
        let state = init.graph_state.as_ref().unwrap();
        let a = state.nodes.iter().find(|n| n.id == "A").unwrap();
        let d = state.nodes.iter().find(|n| n.id == "D").unwrap();
        assert_eq!(a.distance, Some(0));
        assert_eq!(d.distance, None);
    }
}
