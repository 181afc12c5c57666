//! Entity extraction from text content.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use knowgraph_core::config::ExtractionConfig;

use crate::error::TaggerError;
use crate::tagger::{EntityTagger, LexiconTagger};
use crate::types::ExtractionStrategy;

/// Runs of capitalized words, e.g. "New York" or "Alice".
static CAPITALIZED_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?: [A-Z][a-z]+)*\b").expect("Invalid capitalized-run regex")
});

/// Extracts ordered entity mentions from text.
///
/// Runs the tagged strategy when a tagger is attached and the heuristic
/// strategy otherwise. A tagger that fails to initialize switches the
/// extractor to the heuristic strategy for its whole lifetime.
pub struct EntityExtractor {
    tagger: Option<Box<dyn EntityTagger>>,
    stopwords: HashSet<String>,
    min_entity_length: usize,
}

impl EntityExtractor {
    /// Create a heuristic-only extractor.
    pub fn heuristic(config: &ExtractionConfig) -> Self {
        Self {
            tagger: None,
            stopwords: config.stopwords.iter().cloned().collect(),
            min_entity_length: config.min_entity_length,
        }
    }

    /// Create an extractor that delegates to `tagger`.
    pub fn with_tagger(tagger: Box<dyn EntityTagger>, config: &ExtractionConfig) -> Self {
        let mut extractor = Self::heuristic(config);
        extractor.tagger = Some(tagger);
        extractor
    }

    /// Create an extractor from a tagger constructor.
    ///
    /// If `load` fails, the failure is logged once and the extractor uses the
    /// heuristic strategy from then on. Loading is never retried.
    pub fn with_tagger_loader<F>(load: F, config: &ExtractionConfig) -> Self
    where
        F: FnOnce() -> Result<Box<dyn EntityTagger>, TaggerError>,
    {
        match load() {
            Ok(tagger) => Self::with_tagger(tagger, config),
            Err(e) => {
                warn!(error = %e, "Entity tagger unavailable, using heuristic extraction");
                Self::heuristic(config)
            }
        }
    }

    /// Create an extractor from configuration.
    ///
    /// Uses a [`LexiconTagger`] when tagging is enabled and a lexicon path is
    /// configured; otherwise falls back to heuristic extraction.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        if !config.tagger_enabled {
            info!("Entity tagger disabled, using heuristic extraction");
            return Self::heuristic(config);
        }
        if config.lexicon_path.is_empty() {
            info!("No entity lexicon configured, using heuristic extraction");
            return Self::heuristic(config);
        }
        let path = Path::new(&config.lexicon_path);
        Self::with_tagger_loader(
            || LexiconTagger::from_file(path).map(|t| Box::new(t) as Box<dyn EntityTagger>),
            config,
        )
    }

    /// The strategy this extractor is running.
    pub fn strategy(&self) -> ExtractionStrategy {
        if self.tagger.is_some() {
            ExtractionStrategy::Tagged
        } else {
            ExtractionStrategy::Heuristic
        }
    }

    /// Extract entity mentions in the order they appear.
    ///
    /// Duplicates are kept: position matters to co-occurrence weighting.
    pub fn extract(&self, text: &str) -> Result<Vec<String>, TaggerError> {
        match &self.tagger {
            Some(tagger) => self.extract_tagged(tagger.as_ref(), text),
            None => Ok(self.extract_heuristic(text)),
        }
    }

    fn extract_tagged(
        &self,
        tagger: &dyn EntityTagger,
        text: &str,
    ) -> Result<Vec<String>, TaggerError> {
        Ok(tagger
            .tag(text)?
            .into_iter()
            .map(|span| span.text)
            .filter(|entity| self.long_enough(entity))
            .collect())
    }

    fn extract_heuristic(&self, text: &str) -> Vec<String> {
        CAPITALIZED_RUN_RE
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|entity| !self.stopwords.contains(*entity) && self.long_enough(entity))
            .map(str::to_string)
            .collect()
    }

    fn long_enough(&self, entity: &str) -> bool {
        entity.chars().count() >= self.min_entity_length
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::heuristic(&ExtractionConfig::default())
    }
}

impl std::fmt::Debug for EntityExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityExtractor")
            .field("strategy", &self.strategy())
            .field("min_entity_length", &self.min_entity_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaggedSpan;
    use std::cell::Cell;

    struct FixedTagger(Vec<TaggedSpan>);

    impl EntityTagger for FixedTagger {
        fn tag(&self, _text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenTagger;

    impl EntityTagger for BrokenTagger {
        fn tag(&self, _text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
            Err(TaggerError::Call("model crashed".to_string()))
        }
    }

    fn config() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    #[test]
    fn test_heuristic_capitalized_runs() {
        let extractor = EntityExtractor::heuristic(&config());
        let entities = extractor
            .extract("Alice Smith met Bob in New York. The meeting went well.")
            .unwrap();
        assert_eq!(entities, vec!["Alice Smith", "Bob", "New York"]);
    }

    #[test]
    fn test_heuristic_filters_stopwords() {
        let extractor = EntityExtractor::heuristic(&config());
        let entities = extractor
            .extract("The cat sat. This is it. These are those. That is an apple.")
            .unwrap();
        assert!(entities.is_empty(), "got {:?}", entities);
    }

    #[test]
    fn test_heuristic_stopword_only_matches_whole_run() {
        // "The Hague" is a single run, not the stopword "The".
        let extractor = EntityExtractor::heuristic(&config());
        assert_eq!(extractor.extract("we flew to The Hague.").unwrap(), vec!["The Hague"]);
    }

    #[test]
    fn test_heuristic_min_length() {
        let mut cfg = config();
        cfg.min_entity_length = 4;
        let extractor = EntityExtractor::heuristic(&cfg);
        assert_eq!(extractor.extract("Bob met Alice.").unwrap(), vec!["Alice"]);
    }

    #[test]
    fn test_heuristic_keeps_duplicates_in_order() {
        let extractor = EntityExtractor::heuristic(&config());
        assert_eq!(
            extractor.extract("Bob called Carol, then Bob left.").unwrap(),
            vec!["Bob", "Carol", "Bob"]
        );
    }

    #[test]
    fn test_empty_text_returns_empty() {
        let extractor = EntityExtractor::heuristic(&config());
        assert!(extractor.extract("").unwrap().is_empty());
        assert!(extractor.extract("no capitals here").unwrap().is_empty());
    }

    #[test]
    fn test_tagged_filters_short_spans() {
        let tagger = FixedTagger(vec![
            TaggedSpan::new("Paris", "LOC", 0.99),
            TaggedSpan::new("X", "MISC", 0.4),
            TaggedSpan::new("Bob", "PER", 0.9),
        ]);
        let extractor = EntityExtractor::with_tagger(Box::new(tagger), &config());
        assert_eq!(extractor.strategy(), ExtractionStrategy::Tagged);
        assert_eq!(extractor.extract("ignored").unwrap(), vec!["Paris", "Bob"]);
    }

    #[test]
    fn test_tagged_spans_are_measured_as_returned() {
        // " X" passes the length filter on its raw text.
        let tagger = FixedTagger(vec![
            TaggedSpan::new(" X", "MISC", 0.4),
            TaggedSpan::new("Y", "MISC", 0.4),
        ]);
        let extractor = EntityExtractor::with_tagger(Box::new(tagger), &config());
        assert_eq!(extractor.extract("ignored").unwrap(), vec![" X"]);
    }

    #[test]
    fn test_tagged_call_failure_is_reported() {
        let extractor = EntityExtractor::with_tagger(Box::new(BrokenTagger), &config());
        assert!(matches!(extractor.extract("Alice"), Err(TaggerError::Call(_))));
    }

    #[test]
    fn test_loader_failure_degrades_permanently() {
        let attempts = Cell::new(0);
        let extractor = EntityExtractor::with_tagger_loader(
            || {
                attempts.set(attempts.get() + 1);
                Err(TaggerError::Init("no model".to_string()))
            },
            &config(),
        );
        assert_eq!(extractor.strategy(), ExtractionStrategy::Heuristic);
        assert_eq!(extractor.extract("Alice met Bob.").unwrap(), vec!["Alice", "Bob"]);
        assert_eq!(extractor.extract("Carol left.").unwrap(), vec!["Carol"]);
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_from_config_without_lexicon_is_heuristic() {
        let extractor = EntityExtractor::from_config(&config());
        assert_eq!(extractor.strategy(), ExtractionStrategy::Heuristic);

        let mut disabled = config();
        disabled.tagger_enabled = false;
        disabled.lexicon_path = "/some/lexicon.tsv".to_string();
        let extractor = EntityExtractor::from_config(&disabled);
        assert_eq!(extractor.strategy(), ExtractionStrategy::Heuristic);
    }

    #[test]
    fn test_from_config_missing_lexicon_degrades() {
        let mut cfg = config();
        cfg.lexicon_path = "/does/not/exist.tsv".to_string();
        let extractor = EntityExtractor::from_config(&cfg);
        assert_eq!(extractor.strategy(), ExtractionStrategy::Heuristic);
    }

    #[test]
    fn test_from_config_with_lexicon_is_tagged() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Paris").unwrap();

        let mut cfg = config();
        cfg.lexicon_path = file.path().to_string_lossy().to_string();
        let extractor = EntityExtractor::from_config(&cfg);
        assert_eq!(extractor.strategy(), ExtractionStrategy::Tagged);
        assert_eq!(extractor.extract("Who visited Paris?").unwrap(), vec!["Paris"]);
    }
}
