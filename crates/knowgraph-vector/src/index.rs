//! In-memory document index with brute-force cosine similarity search.
//!
//! All searches are O(n) in the number of stored documents, which is fine
//! for the corpus sizes the graph retriever targets.

use std::collections::HashMap;

use knowgraph_core::{Document, DocumentId, MetadataFilter};

use crate::similarity::cosine_similarity;

/// A single hit returned from a vector search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matching document.
    pub document: Document,
    /// Cosine similarity to the query vector.
    pub score: f64,
}

#[derive(Debug, Clone)]
struct VectorEntry {
    document: Document,
    embedding: Vec<f32>,
}

/// Document store keyed by [`DocumentId`], searched by cosine similarity.
///
/// Owned by a single retriever; there is no interior locking.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
    slots: HashMap<DocumentId, usize>,
}

impl VectorIndex {
    /// Create a new empty vector index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document with its embedding.
    ///
    /// Overwrites any existing entry with the same id, keeping its position.
    pub fn insert(&mut self, document: Document, embedding: Vec<f32>) {
        match self.slots.get(&document.id) {
            Some(&slot) => {
                self.entries[slot] = VectorEntry {
                    document,
                    embedding,
                };
            }
            None => {
                self.slots.insert(document.id, self.entries.len());
                self.entries.push(VectorEntry {
                    document,
                    embedding,
                });
            }
        }
    }

    /// Return the `k` documents most similar to `query`, optionally
    /// restricted to those whose metadata matches `filter`.
    ///
    /// Results are sorted by descending score; ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize, filter: Option<&MetadataFilter>) -> Vec<SearchHit> {
        let mut scored: Vec<SearchHit> = self
            .entries
            .iter()
            .filter(|entry| filter.map_or(true, |f| f.matches(&entry.document.metadata)))
            .map(|entry| SearchHit {
                document: entry.document.clone(),
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| rank_key(b.score).total_cmp(&rank_key(a.score)));
        scored.truncate(k);
        scored
    }

    /// Return the number of documents currently stored in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if the index contains no documents.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// NaN scores sort below every real score.
fn rank_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}
