//! knowgraph graph crate - knowledge-graph construction and graph-guided
//! retrieval.
//!
//! Documents are turned into an undirected entity co-occurrence graph:
//! - `EntityResolver` maps mentions onto existing nodes (first match above
//!   the similarity threshold wins)
//! - `RelationshipExtractor` weights nearby mentions by `1 / distance`
//! - `KnowledgeGraph` stores nodes, accumulated edge weights, provenance and
//!   the documents indexed under each node
//! - `QueryEngine` expands query entities through the graph and scores the
//!   documents it reaches
//!
//! `GraphIndex` ties these together; `Retriever` selects between it, pure
//! vector retrieval and a hybrid of both.

pub mod graph;
pub mod index;
pub mod query;
pub mod relationship;
pub mod rerank;
pub mod resolver;
pub mod retriever;
pub mod snapshot;

pub use graph::KnowledgeGraph;
pub use index::{GraphIndex, GraphStats, IngestFailure, IngestReport};
pub use query::QueryEngine;
pub use relationship::{Relationship, RelationshipExtractor};
pub use rerank::{CosineReranker, Reranker};
pub use resolver::EntityResolver;
pub use retriever::{HybridRetriever, Retriever, RetrieverKind, VectorRetriever};
pub use snapshot::{GraphSnapshot, Highlight, SnapshotEdge, SnapshotNode};
