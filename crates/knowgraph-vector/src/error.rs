use knowgraph_core::KnowgraphError;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<EmbeddingError> for KnowgraphError {
    fn from(err: EmbeddingError) -> Self {
        KnowgraphError::RetrievalUnavailable(err.to_string())
    }
}
