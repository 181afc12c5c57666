//! In-memory entity graph with provenance and chunk indices.

use std::collections::{BTreeSet, HashMap};

use knowgraph_core::{Document, DocumentId};

use crate::relationship::Relationship;

type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    sources: BTreeSet<String>,
    /// Document slots, one entry per contributing relationship.
    chunks: Vec<usize>,
    /// Adjacent nodes in edge-creation order.
    neighbors: Vec<NodeId>,
}

impl Node {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sources: BTreeSet::new(),
            chunks: Vec::new(),
            neighbors: Vec::new(),
        }
    }
}

/// Undirected weighted graph of canonical entities.
///
/// Nodes are kept in insertion order and are never removed; entity
/// resolution depends on that order. Edge weights accumulate across
/// documents. Every node records the sources and the documents of the
/// relationships it took part in.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<Node>,
    node_ids: HashMap<String, NodeId>,
    edges: HashMap<(NodeId, NodeId), f64>,
    documents: Vec<Document>,
    document_slots: HashMap<DocumentId, usize>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of distinct documents referenced by some node.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_ids.contains_key(name)
    }

    /// Node names in insertion order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// Sources of the documents that contributed to `name`.
    pub fn sources(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.node(name).map(|n| &n.sources)
    }

    /// Documents indexed under `name`, one entry per contributing
    /// relationship. The same document can appear several times.
    pub fn chunks(&self, name: &str) -> Vec<&Document> {
        self.node(name)
            .map(|n| n.chunks.iter().map(|&slot| &self.documents[slot]).collect())
            .unwrap_or_default()
    }

    /// Accumulated weight of the edge between `a` and `b`.
    pub fn edge_weight(&self, a: &str, b: &str) -> Option<f64> {
        let a = *self.node_ids.get(a)?;
        let b = *self.node_ids.get(b)?;
        self.edges.get(&edge_key(a, b)).copied()
    }

    /// Neighbors of `name` in edge-creation order.
    pub fn neighbors(&self, name: &str) -> Vec<&str> {
        self.node(name)
            .map(|n| {
                n.neighbors
                    .iter()
                    .map(|&id| self.nodes[id].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn degree(&self, name: &str) -> usize {
        self.node(name).map_or(0, |n| n.neighbors.len())
    }

    /// All edges as `(a, b, weight)`, ordered by node insertion.
    pub fn edges(&self) -> Vec<(&str, &str, f64)> {
        let mut keys: Vec<&(NodeId, NodeId)> = self.edges.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                (
                    self.nodes[key.0].name.as_str(),
                    self.nodes[key.1].name.as_str(),
                    self.edges[key],
                )
            })
            .collect()
    }

    /// Record the relationships extracted from `document`.
    ///
    /// Creates missing nodes, adds the document source to both endpoints,
    /// indexes the document under both endpoints, and adds the relationship
    /// weight to the edge. Self-loops are ignored. Returns the number of
    /// nodes created.
    pub fn apply(&mut self, document: &Document, relationships: &[Relationship]) -> usize {
        let before = self.nodes.len();
        if relationships.is_empty() {
            return 0;
        }
        let slot = self.document_slot(document);
        let source = document.source().to_string();

        for relationship in relationships {
            if relationship.source == relationship.target {
                continue;
            }
            let a = self.ensure_node(&relationship.source);
            let b = self.ensure_node(&relationship.target);

            for id in [a, b] {
                let node = &mut self.nodes[id];
                node.sources.insert(source.clone());
                node.chunks.push(slot);
            }

            let key = edge_key(a, b);
            if !self.edges.contains_key(&key) {
                self.nodes[a].neighbors.push(b);
                self.nodes[b].neighbors.push(a);
            }
            *self.edges.entry(key).or_insert(0.0) += relationship.weight;
        }
        self.nodes.len() - before
    }

    fn node(&self, name: &str) -> Option<&Node> {
        self.node_ids.get(name).map(|&id| &self.nodes[id])
    }

    fn ensure_node(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.node_ids.get(name) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node::new(name));
        self.node_ids.insert(name.to_string(), id);
        id
    }

    fn document_slot(&mut self, document: &Document) -> usize {
        if let Some(&slot) = self.document_slots.get(&document.id) {
            return slot;
        }
        let slot = self.documents.len();
        self.documents.push(document.clone());
        self.document_slots.insert(document.id, slot);
        slot
    }
}

fn edge_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
