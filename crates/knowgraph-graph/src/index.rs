//! The graph retriever: ingestion, query, rerank and export over one
//! [`KnowledgeGraph`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use knowgraph_core::{Document, KnowgraphConfig, KnowgraphError, MetadataFilter, Result};
use knowgraph_extract::{EntityExtractor, ExtractionStrategy};
use knowgraph_vector::EmbeddingProvider;

use crate::graph::KnowledgeGraph;
use crate::query::QueryEngine;
use crate::relationship::RelationshipExtractor;
use crate::rerank::Reranker;
use crate::resolver::EntityResolver;
use crate::snapshot::GraphSnapshot;

/// A document skipped during ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestFailure {
    /// Position of the document in the submitted batch.
    pub index: usize,
    pub source: String,
    pub error: String,
}

/// Outcome of one `ingest` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Documents applied to the index.
    pub ingested: usize,
    /// Relationships added by this call.
    pub relationships: usize,
    pub failed: Vec<IngestFailure>,
    /// Node count after the call.
    pub nodes: usize,
    /// Edge count after the call.
    pub edges: usize,
}

/// Size summary of a graph index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub documents: usize,
    pub cached_embeddings: usize,
    pub strategy: ExtractionStrategy,
    pub similarity_threshold: f64,
    pub window_size: usize,
}

/// Knowledge-graph retriever.
///
/// Owns the graph together with the components that build and read it.
/// All operations are synchronous; a `GraphIndex` is used from one thread
/// at a time and needs `&mut self` even to query, since queries fill the
/// embedding cache.
pub struct GraphIndex {
    graph: KnowledgeGraph,
    extractor: EntityExtractor,
    resolver: EntityResolver,
    relationships: RelationshipExtractor,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Box<dyn Reranker>>,
    progress_interval: usize,
    min_term_length: usize,
}

impl GraphIndex {
    pub fn new(
        extractor: EntityExtractor,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &KnowgraphConfig,
    ) -> Self {
        Self {
            graph: KnowledgeGraph::new(),
            extractor,
            resolver: EntityResolver::new(config.graph.similarity_threshold),
            relationships: RelationshipExtractor::new(config.graph.window_size),
            embedder,
            reranker: None,
            progress_interval: config.graph.progress_interval,
            min_term_length: config.query.min_term_length,
        }
    }

    /// Build an index whose extractor follows `config.extraction`.
    pub fn from_config(config: &KnowgraphConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(EntityExtractor::from_config(&config.extraction), embedder, config)
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn extraction_strategy(&self) -> ExtractionStrategy {
        self.extractor.strategy()
    }

    /// Replace the built-in rerank scoring.
    pub fn set_reranker(&mut self, reranker: Box<dyn Reranker>) {
        self.reranker = Some(reranker);
    }

    /// Add `documents` to the graph.
    ///
    /// The batch is validated up front; an invalid document rejects the whole
    /// call. Each document is then applied atomically: its relationships are
    /// computed against the graph as it stood before the document and
    /// applied together. A document whose entity tagging fails is skipped
    /// and reported in [`IngestReport::failed`]. An embedding failure aborts
    /// the call, keeping documents already applied.
    pub fn ingest(&mut self, documents: Vec<Document>) -> Result<IngestReport> {
        for (index, document) in documents.iter().enumerate() {
            document.validate(index)?;
        }

        let total = documents.len();
        let mut report = IngestReport::default();
        for (index, document) in documents.into_iter().enumerate() {
            let staged = match self.relationships.extract(
                &document.text,
                &self.extractor,
                &mut self.resolver,
                &self.graph,
                self.embedder.as_ref(),
            ) {
                Ok(staged) => staged,
                Err(KnowgraphError::Extraction(error)) => {
                    warn!(index, source = document.source(), error = %error, "Skipping document");
                    report.failed.push(IngestFailure {
                        index,
                        source: document.source().to_string(),
                        error,
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let created = self.graph.apply(&document, &staged);
            report.ingested += 1;
            report.relationships += staged.len();
            debug!(
                index,
                source = document.source(),
                relationships = staged.len(),
                new_nodes = created,
                "Ingested document"
            );

            if self.progress_interval > 0 && (index + 1) % self.progress_interval == 0 {
                info!("Processed {}/{} documents", index + 1, total);
            }
        }

        report.nodes = self.graph.node_count();
        report.edges = self.graph.edge_count();
        info!(
            nodes = report.nodes,
            edges = report.edges,
            failed = report.failed.len(),
            "Knowledge graph built with {} entities and {} relationships",
            report.nodes,
            report.edges
        );
        Ok(report)
    }

    /// Return up to `k` documents for `query`. See [`QueryEngine::query`].
    pub fn query(
        &mut self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>> {
        self.engine().query(query, k, filter)
    }

    /// Rerank `documents` with the attached reranker, or by structural
    /// overlap plus embedding similarity when none is attached.
    pub fn rerank(
        &mut self,
        query: &str,
        documents: Vec<Document>,
        top_k: usize,
    ) -> Result<Vec<Document>> {
        if let Some(reranker) = &self.reranker {
            return reranker.rerank(query, documents, top_k);
        }
        self.engine().rerank(query, documents, top_k)
    }

    /// Export up to `max_nodes` nodes, highlighted against `query` when
    /// given. Only the embedding cache is touched.
    pub fn snapshot(&mut self, query: Option<&str>, max_nodes: usize) -> Result<GraphSnapshot> {
        let matched = match query {
            Some(text) if !self.graph.is_empty() => self.engine().matched_nodes(text)?,
            _ => Vec::new(),
        };
        Ok(GraphSnapshot::build(&self.graph, query, &matched, max_nodes))
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
            documents: self.graph.document_count(),
            cached_embeddings: self.resolver.cached(),
            strategy: self.extractor.strategy(),
            similarity_threshold: self.resolver.similarity_threshold(),
            window_size: self.relationships.window_size(),
        }
    }

    fn engine(&mut self) -> QueryEngine<'_> {
        QueryEngine::new(
            &self.graph,
            &self.extractor,
            &mut self.resolver,
            self.embedder.as_ref(),
        )
        .with_min_term_length(self.min_term_length)
    }
}

impl std::fmt::Debug for GraphIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphIndex")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("extractor", &self.extractor)
            .field("reranker", &self.reranker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowgraph_vector::MockEmbedding;

    fn index() -> GraphIndex {
        let mut config = KnowgraphConfig::default();
        config.graph.similarity_threshold = 0.99;
        config.extraction.tagger_enabled = false;
        GraphIndex::from_config(&config, Arc::new(MockEmbedding::with_dimensions(64)))
    }

    struct Reverse;

    impl Reranker for Reverse {
        fn rerank(&self, _query: &str, mut documents: Vec<Document>, top_k: usize) -> Result<Vec<Document>> {
            documents.reverse();
            documents.truncate(top_k);
            Ok(documents)
        }
    }

    #[test]
    fn test_ingest_report() {
        let mut index = index();
        let report = index
            .ingest(vec![
                Document::new("Alice met Bob in Paris.").with_source("A"),
                Document::new("Nothing capitalized here.").with_source("B"),
            ])
            .unwrap();
        // The second document has one entity ("Nothing") and no relationships.
        assert_eq!(report.ingested, 2);
        assert_eq!(report.relationships, 3);
        assert_eq!(report.nodes, 3);
        assert_eq!(report.edges, 3);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_invalid_batch_is_rejected_before_mutation() {
        let mut index = index();
        let result = index.ingest(vec![
            Document::new("Alice met Bob.").with_source("A"),
            Document::new("   ").with_source("B"),
        ]);
        assert!(matches!(result, Err(KnowgraphError::Validation { index: 1, .. })));
        assert!(index.graph().is_empty());
    }

    #[test]
    fn test_stats() {
        let mut index = index();
        index
            .ingest(vec![Document::new("Alice met Bob.").with_source("A")])
            .unwrap();
        let stats = index.stats();
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.edges, 1);
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.strategy, ExtractionStrategy::Heuristic);
        assert_eq!(stats.window_size, 5);
        assert_eq!(stats.similarity_threshold, 0.99);
    }

    #[test]
    fn test_custom_reranker_replaces_default() {
        let mut index = index();
        index.set_reranker(Box::new(Reverse));
        let docs = vec![
            Document::new("one").with_source("1"),
            Document::new("two").with_source("2"),
        ];
        let reranked = index.rerank("q", docs, 5).unwrap();
        assert_eq!(reranked[0].source(), "2");
    }

    #[test]
    fn test_snapshot_with_query() {
        let mut index = index();
        index
            .ingest(vec![Document::new("Alice met Bob in Paris.").with_source("A")])
            .unwrap();
        let snapshot = index.snapshot(Some("Where is Paris?"), 10).unwrap();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(index.graph().node_count(), 3);
    }
}
