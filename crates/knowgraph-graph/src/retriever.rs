//! Retriever variants behind one interface.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use knowgraph_core::{Document, KnowgraphConfig, KnowgraphError, MetadataFilter, Result};
use knowgraph_vector::{EmbeddingProvider, VectorIndex};

use crate::index::{GraphIndex, IngestReport};
use crate::rerank::{CosineReranker, Reranker};

/// Pure embedding retrieval over a brute-force [`VectorIndex`].
pub struct VectorRetriever {
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Box<dyn Reranker>>,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index: VectorIndex::new(),
            embedder,
            reranker: None,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn set_reranker(&mut self, reranker: Box<dyn Reranker>) {
        self.reranker = Some(reranker);
    }

    /// Embed and store `documents`.
    ///
    /// The batch is validated and fully embedded before anything is stored,
    /// so an embedding failure leaves the index unchanged.
    pub fn ingest(&mut self, documents: Vec<Document>) -> Result<IngestReport> {
        for (index, document) in documents.iter().enumerate() {
            document.validate(index)?;
        }
        let embeddings = self.embed_all(&documents)?;
        Ok(self.store(documents, embeddings))
    }

    fn embed_all(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>> {
        documents
            .iter()
            .map(|document| self.embedder.embed(&document.text).map_err(KnowgraphError::from))
            .collect()
    }

    fn store(&mut self, documents: Vec<Document>, embeddings: Vec<Vec<f32>>) -> IngestReport {
        let mut report = IngestReport::default();
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            self.index.insert(document, embedding);
            report.ingested += 1;
        }
        info!(documents = self.index.len(), "Vector index updated");
        report
    }

    /// Top `k` documents by cosine similarity among those matching `filter`.
    pub fn query(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query)?;
        let hits = self.index.search(&embedding, k, filter);
        debug!(hits = hits.len(), "Vector query");
        Ok(hits.into_iter().map(|hit| hit.document).collect())
    }

    /// Rerank by cosine similarity, unless a reranker is attached.
    pub fn rerank(&self, query: &str, documents: Vec<Document>, top_k: usize) -> Result<Vec<Document>> {
        match &self.reranker {
            Some(reranker) => reranker.rerank(query, documents, top_k),
            None => CosineReranker::new(self.embedder.clone()).rerank(query, documents, top_k),
        }
    }
}

/// Graph retrieval first, embedding retrieval to fill the gaps.
pub struct HybridRetriever {
    graph: GraphIndex,
    vector: VectorRetriever,
    reranker: Option<Box<dyn Reranker>>,
}

impl HybridRetriever {
    pub fn new(graph: GraphIndex, vector: VectorRetriever) -> Self {
        Self {
            graph,
            vector,
            reranker: None,
        }
    }

    pub fn graph(&self) -> &GraphIndex {
        &self.graph
    }

    pub fn vector(&self) -> &VectorRetriever {
        &self.vector
    }

    pub fn set_reranker(&mut self, reranker: Box<dyn Reranker>) {
        self.reranker = Some(reranker);
    }

    /// Ingest into both retrievers. Graph extraction failures are reported;
    /// the vector side stores every document.
    ///
    /// Document texts are embedded before the graph is touched, so a failure
    /// there leaves both halves unchanged. An error from the graph half has
    /// the partial-failure semantics of [`GraphIndex::ingest`] and leaves the
    /// vector half unchanged.
    pub fn ingest(&mut self, documents: Vec<Document>) -> Result<IngestReport> {
        for (index, document) in documents.iter().enumerate() {
            document.validate(index)?;
        }
        let embeddings = self.vector.embed_all(&documents)?;
        let report = self.graph.ingest(documents.clone())?;
        self.vector.store(documents, embeddings);
        Ok(report)
    }

    /// Graph results followed by vector results, one document per source,
    /// truncated to `k`.
    pub fn query(
        &mut self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let graph_results = self.graph.query(query, k, filter)?;
        let vector_results = self.vector.query(query, k, filter)?;

        let mut seen = HashSet::new();
        let mut merged: Vec<Document> = graph_results
            .into_iter()
            .chain(vector_results)
            .filter(|document| seen.insert(document.source().to_string()))
            .collect();
        merged.truncate(k);
        Ok(merged)
    }

    /// Rerank with the attached reranker, or the graph's structural scorer.
    pub fn rerank(
        &mut self,
        query: &str,
        documents: Vec<Document>,
        top_k: usize,
    ) -> Result<Vec<Document>> {
        if let Some(reranker) = &self.reranker {
            return reranker.rerank(query, documents, top_k);
        }
        self.graph.rerank(query, documents, top_k)
    }
}

/// Which retrieval strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrieverKind {
    #[default]
    Graph,
    Vector,
    Hybrid,
}

impl RetrieverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Vector => "vector",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::str::FromStr for RetrieverKind {
    type Err = KnowgraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "graph" => Ok(Self::Graph),
            "vector" => Ok(Self::Vector),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(KnowgraphError::Config(format!(
                "unknown retriever '{}', expected graph, vector or hybrid",
                other
            ))),
        }
    }
}

/// One of the retrieval strategies, chosen at construction.
pub enum Retriever {
    Graph(GraphIndex),
    Vector(VectorRetriever),
    Hybrid(HybridRetriever),
}

impl Retriever {
    /// Build a retriever of `kind` from configuration. Hybrid retrievers
    /// share the embedding provider between their two halves.
    pub fn from_config(
        kind: RetrieverKind,
        config: &KnowgraphConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        match kind {
            RetrieverKind::Graph => Self::Graph(GraphIndex::from_config(config, embedder)),
            RetrieverKind::Vector => Self::Vector(VectorRetriever::new(embedder)),
            RetrieverKind::Hybrid => Self::Hybrid(HybridRetriever::new(
                GraphIndex::from_config(config, embedder.clone()),
                VectorRetriever::new(embedder),
            )),
        }
    }

    pub fn kind(&self) -> RetrieverKind {
        match self {
            Self::Graph(_) => RetrieverKind::Graph,
            Self::Vector(_) => RetrieverKind::Vector,
            Self::Hybrid(_) => RetrieverKind::Hybrid,
        }
    }

    pub fn ingest(&mut self, documents: Vec<Document>) -> Result<IngestReport> {
        match self {
            Self::Graph(r) => r.ingest(documents),
            Self::Vector(r) => r.ingest(documents),
            Self::Hybrid(r) => r.ingest(documents),
        }
    }

    pub fn query(
        &mut self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>> {
        match self {
            Self::Graph(r) => r.query(query, k, filter),
            Self::Vector(r) => r.query(query, k, filter),
            Self::Hybrid(r) => r.query(query, k, filter),
        }
    }

    pub fn rerank(
        &mut self,
        query: &str,
        documents: Vec<Document>,
        top_k: usize,
    ) -> Result<Vec<Document>> {
        match self {
            Self::Graph(r) => r.rerank(query, documents, top_k),
            Self::Vector(r) => r.rerank(query, documents, top_k),
            Self::Hybrid(r) => r.rerank(query, documents, top_k),
        }
    }

    pub fn set_reranker(&mut self, reranker: Box<dyn Reranker>) {
        match self {
            Self::Graph(r) => r.set_reranker(reranker),
            Self::Vector(r) => r.set_reranker(reranker),
            Self::Hybrid(r) => r.set_reranker(reranker),
        }
    }
}
