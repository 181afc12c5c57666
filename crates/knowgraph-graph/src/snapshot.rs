//! Read-only diagnostic export of the graph.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::graph::KnowledgeGraph;

/// How a snapshot node relates to the query it was taken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    /// The node is a query entity.
    Matched,
    /// The node reaches a query entity within the snapshot.
    Connected,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotNode {
    pub name: String,
    pub degree: usize,
    pub sources: Vec<String>,
    pub chunk_count: usize,
    pub highlight: Highlight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
    /// Display width, `1 + weight / 2`.
    pub width: f64,
}

/// A bounded view of the graph, optionally centered on a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub nodes: Vec<SnapshotNode>,
    pub edges: Vec<SnapshotEdge>,
}

impl GraphSnapshot {
    /// Select up to `max_nodes` nodes of `graph` and the edges among them.
    ///
    /// With matched nodes the selection starts from them and their
    /// neighbors; remaining room goes to the highest-degree nodes.
    pub fn build(
        graph: &KnowledgeGraph,
        query: Option<&str>,
        matched: &[String],
        max_nodes: usize,
    ) -> Self {
        let mut snapshot = GraphSnapshot {
            query: query.map(str::to_string),
            ..Default::default()
        };
        if graph.is_empty() || max_nodes == 0 {
            return snapshot;
        }

        let selected = select_nodes(graph, query.is_some(), matched, max_nodes);
        let in_view: HashSet<&str> = selected.iter().copied().collect();
        let matched_set: HashSet<&str> = matched.iter().map(String::as_str).collect();
        let connected = if query.is_some() {
            reachable(graph, &in_view, &matched_set)
        } else {
            HashSet::new()
        };

        snapshot.nodes = selected
            .iter()
            .map(|&name| SnapshotNode {
                name: name.to_string(),
                degree: graph.degree(name),
                sources: graph
                    .sources(name)
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default(),
                chunk_count: graph.chunks(name).len(),
                highlight: if matched_set.contains(name) {
                    Highlight::Matched
                } else if connected.contains(name) {
                    Highlight::Connected
                } else {
                    Highlight::None
                },
            })
            .collect();

        snapshot.edges = graph
            .edges()
            .into_iter()
            .filter(|(a, b, _)| in_view.contains(a) && in_view.contains(b))
            .map(|(a, b, weight)| SnapshotEdge {
                source: a.to_string(),
                target: b.to_string(),
                weight,
                width: 1.0 + weight / 2.0,
            })
            .collect();
        snapshot
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn select_nodes<'g>(
    graph: &'g KnowledgeGraph,
    has_query: bool,
    matched: &[String],
    max_nodes: usize,
) -> Vec<&'g str> {
    if graph.node_count() <= max_nodes {
        return graph.node_names().collect();
    }

    let mut selected: Vec<&'g str> = Vec::new();
    let mut seen: HashSet<&'g str> = HashSet::new();
    if has_query {
        for name in graph.node_names().filter(|n| matched.iter().any(|m| m.as_str() == *n)) {
            if seen.insert(name) {
                selected.push(name);
            }
        }
        let roots = selected.clone();
        for name in roots {
            for neighbor in graph.neighbors(name) {
                if seen.insert(neighbor) {
                    selected.push(neighbor);
                }
            }
        }
    }

    if selected.len() < max_nodes {
        for name in by_degree(graph) {
            if selected.len() >= max_nodes {
                break;
            }
            if seen.insert(name) {
                selected.push(name);
            }
        }
    }
    selected.truncate(max_nodes);
    selected
}

/// Node names by descending degree; ties keep insertion order.
fn by_degree(graph: &KnowledgeGraph) -> Vec<&str> {
    let mut names: Vec<&str> = graph.node_names().collect();
    names.sort_by(|a, b| graph.degree(b).cmp(&graph.degree(a)));
    names
}

/// Nodes in `view` that reach a matched node through edges inside `view`.
fn reachable<'g>(
    graph: &'g KnowledgeGraph,
    view: &HashSet<&'g str>,
    matched: &HashSet<&str>,
) -> HashSet<&'g str> {
    let mut visited: HashSet<&'g str> = view
        .iter()
        .copied()
        .filter(|name| matched.contains(name))
        .collect();
    let mut queue: VecDeque<&'g str> = visited.iter().copied().collect();
    while let Some(name) = queue.pop_front() {
        for neighbor in graph.neighbors(name) {
            if view.contains(neighbor) && visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::Relationship;
    use knowgraph_core::Document;

    fn rel(a: &str, b: &str, weight: f64) -> Relationship {
        Relationship {
            source: a.to_string(),
            target: b.to_string(),
            weight,
        }
    }

    /// Hub "Bob" with spokes, plus a detached "Dave"-"Erin" pair.
    fn sample() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        let doc = Document::new("sample").with_source("S");
        graph.apply(
            &doc,
            &[
                rel("Alice", "Bob", 1.0),
                rel("Bob", "Carol", 0.5),
                rel("Bob", "Paris", 2.0),
                rel("Dave", "Erin", 1.0),
            ],
        );
        graph
    }

    fn names(snapshot: &GraphSnapshot) -> Vec<&str> {
        snapshot.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    fn highlight(snapshot: &GraphSnapshot, name: &str) -> Highlight {
        snapshot
            .nodes
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.highlight)
            .unwrap()
    }

    #[test]
    fn test_empty_graph() {
        let snapshot = GraphSnapshot::build(&KnowledgeGraph::new(), None, &[], 10);
        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.edges.is_empty());
    }

    #[test]
    fn test_small_graph_shows_everything() {
        let graph = sample();
        let snapshot = GraphSnapshot::build(&graph, None, &[], 50);
        assert_eq!(snapshot.nodes.len(), 6);
        assert_eq!(snapshot.edges.len(), 4);
        assert!(snapshot.nodes.iter().all(|n| n.highlight == Highlight::None));
        let paris = snapshot.edges.iter().find(|e| e.target == "Paris").unwrap();
        assert_eq!(paris.weight, 2.0);
        assert_eq!(paris.width, 2.0);
    }

    #[test]
    fn test_highlights_follow_paths() {
        let graph = sample();
        let matched = vec!["Alice".to_string()];
        let snapshot = GraphSnapshot::build(&graph, Some("Alice"), &matched, 50);
        assert_eq!(highlight(&snapshot, "Alice"), Highlight::Matched);
        assert_eq!(highlight(&snapshot, "Carol"), Highlight::Connected);
        assert_eq!(highlight(&snapshot, "Dave"), Highlight::None);
    }

    #[test]
    fn test_large_graph_without_query_keeps_high_degree() {
        let graph = sample();
        let snapshot = GraphSnapshot::build(&graph, None, &[], 2);
        // Bob (degree 3) first, then the earliest degree-1 node.
        assert_eq!(names(&snapshot), vec!["Bob", "Alice"]);
        assert_eq!(snapshot.edges.len(), 1);
    }

    #[test]
    fn test_large_graph_with_query_centers_on_matches() {
        let graph = sample();
        let matched = vec!["Dave".to_string()];
        let snapshot = GraphSnapshot::build(&graph, Some("Dave"), &matched, 3);
        assert_eq!(names(&snapshot), vec!["Dave", "Erin", "Bob"]);
        assert_eq!(highlight(&snapshot, "Erin"), Highlight::Connected);
        assert_eq!(highlight(&snapshot, "Bob"), Highlight::None);
    }

    #[test]
    fn test_snapshot_json() {
        let graph = sample();
        let json = GraphSnapshot::build(&graph, Some("Alice"), &["Alice".to_string()], 50)
            .to_json()
            .unwrap();
        assert!(json.contains("\"highlight\": \"matched\""));
        assert!(json.contains("\"query\": \"Alice\""));
    }
}
