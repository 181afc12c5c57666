//! knowgraph vector crate - embedding providers, vector math, and a
//! brute-force document index.
//!
//! Provides the `EmbeddingProvider` capability trait with a deterministic
//! mock implementation for testing, an optional ONNX sentence-transformer
//! backend, and the in-memory index used by pure-embedding retrieval.

pub mod embedding;
pub mod error;
pub mod index;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod similarity;

pub use embedding::{EmbeddingProvider, MockEmbedding};
pub use error::EmbeddingError;
pub use index::{SearchHit, VectorIndex};
#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbeddingProvider;
pub use similarity::{cosine_similarity, dot, normalize};
