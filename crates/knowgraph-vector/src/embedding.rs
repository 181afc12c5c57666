//! Embedding provider trait and implementations.
//!
//! - `OnnxEmbeddingProvider` (feature `onnx`, see [`crate::onnx`]) runs a
//!   sentence-transformer ONNX model. This is the production backend.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing
//!   and for running the CLI without a model.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::EmbeddingError;
use crate::similarity::normalize;

/// Capability for turning text into fixed-dimensional vectors.
///
/// Implementations must be deterministic for a given model and input: the
/// graph caches node embeddings and never recomputes them. Calls are
/// blocking; retry and backoff belong to the implementation.
pub trait EmbeddingProvider {
    /// Generate an embedding vector for the given text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed several texts. The default loops over [`EmbeddingProvider::embed`];
    /// providers with a batch endpoint may override it.
    fn embed_many(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Return the dimensionality of vectors produced by this provider.
    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<T> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text)
    }

    fn embed_many(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_many(texts)
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text)
    }

    fn embed_many(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_many(texts)
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors
// ---------------------------------------------------------------------------

/// Mock embedding provider that returns deterministic unit vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs while distinct inputs are close to
/// orthogonal. No two different strings will look like near-duplicates.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(384)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }
        normalize(result)
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for MockEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
