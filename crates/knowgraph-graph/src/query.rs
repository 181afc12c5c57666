//! Graph-guided retrieval and structural reranking.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use knowgraph_core::{Document, DocumentId, MetadataFilter, Result};
use knowgraph_extract::EntityExtractor;
use knowgraph_vector::{dot, normalize, EmbeddingProvider};

use crate::graph::KnowledgeGraph;
use crate::rerank::rank_by_score;
use crate::resolver::EntityResolver;

/// Score given to an interesting node that has no similarity score of its
/// own (a neighbor that was not matched by the query).
pub const NEIGHBOR_SCORE: f64 = 0.5;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("Invalid word regex"));

/// Answers queries against a [`KnowledgeGraph`].
///
/// Borrows the graph and its components for the duration of one query; the
/// resolver is borrowed mutably only to fill its embedding cache.
pub struct QueryEngine<'a> {
    graph: &'a KnowledgeGraph,
    extractor: &'a EntityExtractor,
    resolver: &'a mut EntityResolver,
    embedder: &'a dyn EmbeddingProvider,
    min_term_length: usize,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        graph: &'a KnowledgeGraph,
        extractor: &'a EntityExtractor,
        resolver: &'a mut EntityResolver,
        embedder: &'a dyn EmbeddingProvider,
    ) -> Self {
        Self {
            graph,
            extractor,
            resolver,
            embedder,
            min_term_length: 3,
        }
    }

    /// Minimum character length of fallback query terms.
    pub fn with_min_term_length(mut self, min_term_length: usize) -> Self {
        self.min_term_length = min_term_length;
        self
    }

    /// Graph nodes the query refers to, in first-mention order.
    ///
    /// Query entities are extracted and canonicalized against the graph.
    /// When the query yields no entities at all, every node whose lowercase
    /// name contains a query word (of at least `min_term_length` characters)
    /// is used instead, as is, without canonicalization.
    pub fn matched_nodes(&mut self, query: &str) -> Result<Vec<String>> {
        let graph = self.graph;
        let entities = self.extractor.extract(query)?;
        if entities.is_empty() {
            let nodes = self.fallback_terms(query);
            debug!(nodes = nodes.len(), "No query entities, matching words against node names");
            return Ok(nodes);
        }

        let mut matched = Vec::new();
        let mut seen = HashSet::new();
        for entity in &entities {
            let canonical = self
                .resolver
                .canonical(entity, graph.node_names(), self.embedder)?;
            if graph.contains(&canonical) && seen.insert(canonical.clone()) {
                matched.push(canonical);
            }
        }
        Ok(matched)
    }

    fn fallback_terms(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let terms: Vec<&str> = WORD_RE
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|term| term.chars().count() >= self.min_term_length)
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }
        self.graph
            .node_names()
            .filter(|name| {
                let name = name.to_lowercase();
                terms.iter().any(|term| name.contains(term))
            })
            .map(str::to_string)
            .collect()
    }

    /// Return up to `k` documents for `query`, most relevant first.
    ///
    /// Matched nodes are scored by cosine similarity to the query; the
    /// neighbors of the best `k` of them widen the candidate set. Candidates
    /// are every document indexed under a matched or neighbor node, kept
    /// once each, restricted by `filter`. A candidate scores the sum of the
    /// node scores of the interesting nodes it mentions (neighbors count
    /// [`NEIGHBOR_SCORE`]) plus its cosine similarity to the query. Ties
    /// keep candidate order.
    pub fn query(
        &mut self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>> {
        if k == 0 || self.graph.is_empty() {
            return Ok(Vec::new());
        }
        let graph = self.graph;

        let matched = self.matched_nodes(query)?;
        if matched.is_empty() {
            debug!(query, "No graph nodes matched query");
            return Ok(Vec::new());
        }

        let query_embedding = normalize(self.embedder.embed(query)?);

        let mut node_scores: Vec<(&str, f64)> = Vec::with_capacity(matched.len());
        for node in &matched {
            let embedding = self.resolver.embedding(node, self.embedder)?;
            node_scores.push((node.as_str(), dot(&query_embedding, embedding)));
        }
        let node_scores = rank_by_score(node_scores, usize::MAX);

        let mut related: Vec<&str> = Vec::new();
        let mut related_seen: HashSet<&str> = HashSet::new();
        for (node, _) in node_scores.iter().take(k) {
            for neighbor in graph.neighbors(node) {
                if related_seen.insert(neighbor) {
                    related.push(neighbor);
                }
            }
        }

        let scores: HashMap<&str, f64> = node_scores.iter().copied().collect();
        let interesting: HashSet<&str> = matched
            .iter()
            .map(String::as_str)
            .chain(related.iter().copied())
            .collect();

        let mut candidates: Vec<&Document> = Vec::new();
        let mut candidate_ids: HashSet<DocumentId> = HashSet::new();
        for node in matched.iter().map(String::as_str).chain(related.iter().copied()) {
            for document in graph.chunks(node) {
                if filter.map_or(true, |f| f.matches(&document.metadata))
                    && candidate_ids.insert(document.id)
                {
                    candidates.push(document);
                }
            }
        }

        debug!(
            matched = matched.len(),
            related = related.len(),
            candidates = candidates.len(),
            "Scoring query candidates"
        );

        let mut scored = Vec::with_capacity(candidates.len());
        for document in candidates {
            let mut score = 0.0;
            for entity in self.extractor.extract(&document.text)? {
                let canonical = self
                    .resolver
                    .canonical(&entity, graph.node_names(), self.embedder)?;
                if interesting.contains(canonical.as_str()) {
                    score += scores.get(canonical.as_str()).copied().unwrap_or(NEIGHBOR_SCORE);
                }
            }
            let embedding = normalize(self.embedder.embed(&document.text)?);
            score += dot(&query_embedding, &embedding);
            scored.push((document, score));
        }

        Ok(rank_by_score(scored, k)
            .into_iter()
            .map(|(document, _)| document.clone())
            .collect())
    }

    /// Re-order `documents` by structural overlap with `query`, keeping
    /// `top_k`.
    ///
    /// A document scores one point for every (query mention, document
    /// mention) pair that resolves to the same node, plus its cosine
    /// similarity to the query.
    pub fn rerank(
        &mut self,
        query: &str,
        documents: Vec<Document>,
        top_k: usize,
    ) -> Result<Vec<Document>> {
        if top_k == 0 || documents.is_empty() {
            return Ok(Vec::new());
        }
        let graph = self.graph;

        let mut query_nodes = Vec::new();
        for entity in self.extractor.extract(query)? {
            query_nodes.push(
                self.resolver
                    .canonical(&entity, graph.node_names(), self.embedder)?,
            );
        }
        let query_embedding = normalize(self.embedder.embed(query)?);

        let mut scored = Vec::with_capacity(documents.len());
        for document in documents {
            let mut overlap = 0usize;
            for entity in self.extractor.extract(&document.text)? {
                let canonical = self
                    .resolver
                    .canonical(&entity, graph.node_names(), self.embedder)?;
                overlap += query_nodes.iter().filter(|q| **q == canonical).count();
            }
            let embedding = normalize(self.embedder.embed(&document.text)?);
            let score = overlap as f64 + dot(&query_embedding, &embedding);
            scored.push((document, score));
        }

        Ok(rank_by_score(scored, top_k)
            .into_iter()
            .map(|(document, _)| document)
            .collect())
    }
}
