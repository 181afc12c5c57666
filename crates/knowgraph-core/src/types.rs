use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{KnowgraphError, Result};

/// Metadata key carrying the provenance / citation identifier of a document.
pub const SOURCE_KEY: &str = "source";

/// Source reported for documents whose metadata has no `source` entry.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Free-form document metadata. Ordered so serialized output is stable.
pub type Metadata = BTreeMap<String, String>;

// =============================================================================
// Newtype Wrappers - Identity
// =============================================================================

/// Unique identifier for an ingested document.
///
/// Two documents are the same document exactly when their ids are equal,
/// regardless of text or metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A unit of ingestible text plus its metadata. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with a fresh id and no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder: attach a `source` identifier.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.insert(SOURCE_KEY.to_string(), source.into());
        self
    }

    /// Builder: attach an arbitrary metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: pin the document id.
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = id;
        self
    }

    /// The provenance identifier, or `"unknown"` when absent.
    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SOURCE)
    }

    /// Reject documents that would produce degenerate graph entries.
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(KnowgraphError::Validation {
                index,
                reason: "document text is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Wire form of a document as read from JSON / JSONL input.
///
/// `text` is optional here so that a missing field surfaces as a validation
/// error with the record index instead of a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInput {
    #[serde(default)]
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DocumentInput {
    /// Convert into a validated [`Document`].
    pub fn into_document(self, index: usize) -> Result<Document> {
        let text = self.text.ok_or_else(|| KnowgraphError::Validation {
            index,
            reason: "document text is missing".to_string(),
        })?;
        let document = Document {
            id: self.id.unwrap_or_default(),
            text,
            metadata: self.metadata,
        };
        document.validate(index)?;
        Ok(document)
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Conjunction of exact `key == value` conditions over document metadata.
///
/// An empty filter matches every document. A condition on a key the
/// document does not carry never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub conditions: BTreeMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: require `key == value`.
    pub fn require(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    /// Parse a `key=value` expression (as given on the command line).
    pub fn parse_condition(expr: &str) -> Result<(String, String)> {
        match expr.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(KnowgraphError::Config(format!(
                "filter must look like key=value, got '{}'",
                expr
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.conditions
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    }
}
