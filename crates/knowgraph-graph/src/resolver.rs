//! Canonicalization of entity mentions onto graph nodes.

use std::collections::HashMap;

use knowgraph_vector::{dot, normalize, EmbeddingError, EmbeddingProvider};

/// Maps surface mentions to existing nodes by embedding similarity.
///
/// Resolution is first-match-wins: candidates are compared against nodes in
/// insertion order and the first one above the threshold is returned, even
/// if a later node would be closer. Each call is O(node count), so ingest
/// cost grows with document length times graph size.
///
/// Normalized embeddings are memoized per surface string for the lifetime of
/// the resolver. The cache assumes a deterministic provider.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    similarity_threshold: f64,
    embeddings: HashMap<String, Vec<f32>>,
}

impl EntityResolver {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
            embeddings: HashMap::new(),
        }
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Number of memoized embeddings.
    pub fn cached(&self) -> usize {
        self.embeddings.len()
    }

    /// Normalized embedding for `text`, computed once and then served from
    /// the cache.
    pub fn embedding(
        &mut self,
        text: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<&[f32], EmbeddingError> {
        if !self.embeddings.contains_key(text) {
            let vector = normalize(embedder.embed(text)?);
            self.embeddings.insert(text.to_string(), vector);
        }
        Ok(self.embeddings[text].as_slice())
    }

    /// Cosine similarity of two surface strings' normalized embeddings.
    pub fn similarity(
        &mut self,
        a: &str,
        b: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<f64, EmbeddingError> {
        self.embedding(a, embedder)?;
        self.embedding(b, embedder)?;
        Ok(dot(&self.embeddings[a], &self.embeddings[b]))
    }

    /// True when the similarity is strictly above the threshold.
    pub fn are_similar(
        &mut self,
        a: &str,
        b: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<bool, EmbeddingError> {
        Ok(self.similarity(a, b, embedder)? > self.similarity_threshold)
    }

    /// Resolve `entity` against `nodes` (in insertion order).
    ///
    /// Returns the first similar node, or `entity` itself when none matches.
    /// The returned name only becomes a node once it takes part in an edge.
    pub fn canonical<'n, I>(
        &mut self,
        entity: &str,
        nodes: I,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<String, EmbeddingError>
    where
        I: IntoIterator<Item = &'n str>,
    {
        for node in nodes {
            if self.are_similar(entity, node, embedder)? {
                return Ok(node.to_string());
            }
        }
        Ok(entity.to_string())
    }
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::new(0.75)
    }
}
