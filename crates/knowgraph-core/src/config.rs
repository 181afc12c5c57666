use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{KnowgraphError, Result};

/// Top-level configuration for knowgraph.
///
/// Loaded from `~/.knowgraph/config.toml` by default. Each section maps to one
/// stage of the ingest / query path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowgraphConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl KnowgraphConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: KnowgraphConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the graph engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.graph.window_size < 2 {
            return Err(KnowgraphError::Config(format!(
                "graph.window_size must be at least 2, got {}",
                self.graph.window_size
            )));
        }
        if !(-1.0..=1.0).contains(&self.graph.similarity_threshold) {
            return Err(KnowgraphError::Config(format!(
                "graph.similarity_threshold must lie in [-1, 1], got {}",
                self.graph.similarity_threshold
            )));
        }
        if self.extraction.min_entity_length == 0 {
            return Err(KnowgraphError::Config(
                "extraction.min_entity_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Entity extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Spans shorter than this many characters are dropped.
    pub min_entity_length: usize,
    /// Try to load the tagging provider. When false, or when loading fails,
    /// the heuristic extractor is used.
    pub tagger_enabled: bool,
    /// Gazetteer file for the lexicon tagger. Empty means none.
    pub lexicon_path: String,
    /// Capitalized words the heuristic extractor never reports.
    pub stopwords: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_entity_length: 2,
            tagger_enabled: true,
            lexicon_path: String::new(),
            stopwords: ["I", "The", "A", "An", "This", "That", "These", "Those"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Knowledge graph construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Cosine similarity above which a mention resolves to an existing node.
    pub similarity_threshold: f64,
    /// Co-occurrence window, in entity positions.
    pub window_size: usize,
    /// Log ingest progress every N documents.
    pub progress_interval: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            window_size: 5,
            progress_interval: 10,
        }
    }
}

/// Query and rerank settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Default number of documents returned by a query.
    pub default_k: usize,
    /// Default number of documents kept by rerank.
    pub rerank_top_k: usize,
    /// Minimum length of fallback query terms when no entity is found.
    pub min_term_length: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            rerank_top_k: 3,
            min_term_length: 3,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider: "mock" or "onnx".
    pub provider: String,
    /// Directory holding `model.onnx` and `tokenizer.json`.
    pub model_dir: String,
    /// Vector dimensionality.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model_dir: String::new(),
            dimensions: 384,
        }
    }
}
