use thiserror::Error;

/// Top-level error type for the knowgraph system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for KnowgraphError` so that the `?` operator works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KnowgraphError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid document at index {index}: {reason}")]
    Validation { index: usize, reason: String },

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for KnowgraphError {
    fn from(err: toml::de::Error) -> Self {
        KnowgraphError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for KnowgraphError {
    fn from(err: toml::ser::Error) -> Self {
        KnowgraphError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for KnowgraphError {
    fn from(err: serde_json::Error) -> Self {
        KnowgraphError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for knowgraph operations.
pub type Result<T> = std::result::Result<T, KnowgraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KnowgraphError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_validation_display() {
        let err = KnowgraphError::Validation {
            index: 3,
            reason: "text is empty".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid document at index 3: text is empty");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(KnowgraphError, &str)> = vec![
            (
                KnowgraphError::RetrievalUnavailable("model offline".to_string()),
                "Retrieval unavailable: model offline",
            ),
            (
                KnowgraphError::Extraction("span out of range".to_string()),
                "Extraction error: span out of range",
            ),
            (
                KnowgraphError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: KnowgraphError = io_err.into();
        assert!(matches!(err, KnowgraphError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: KnowgraphError = err.unwrap_err().into();
        assert!(matches!(err, KnowgraphError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: KnowgraphError = err.unwrap_err().into();
        assert!(matches!(err, KnowgraphError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(format!("value {}", value))
        }

        assert_eq!(inner().unwrap(), "value 42");
    }
}
