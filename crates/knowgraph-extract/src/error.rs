use knowgraph_core::KnowgraphError;
use thiserror::Error;

/// Errors that can occur while tagging or extracting entities.
#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("tagger initialization failed: {0}")]
    Init(String),
    #[error("tagging failed: {0}")]
    Call(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Init failures never reach callers: the extractor degrades to heuristic
// extraction instead.
impl From<TaggerError> for KnowgraphError {
    fn from(err: TaggerError) -> Self {
        KnowgraphError::Extraction(err.to_string())
    }
}
