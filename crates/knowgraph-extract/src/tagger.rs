//! Entity tagging providers.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use tracing::info;

use crate::error::TaggerError;
use crate::types::TaggedSpan;

/// Label given to lexicon entries that do not declare one.
const DEFAULT_LABEL: &str = "MISC";

/// Capability for recognizing named-entity spans in text.
///
/// Spans must be returned in text order. A failing call is reported per call;
/// the extractor isolates it to the document being processed.
pub trait EntityTagger {
    fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError>;
}

impl<T: EntityTagger + ?Sized> EntityTagger for Box<T> {
    fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
        (**self).tag(text)
    }
}

/// Gazetteer tagger: recognizes a fixed list of entity names.
///
/// Matching is case-sensitive and whole-word. When entries overlap, the
/// longest one wins ("New York City" before "New York").
#[derive(Debug, Clone)]
pub struct LexiconTagger {
    pattern: Regex,
    labels: HashMap<String, String>,
}

impl LexiconTagger {
    /// Build a tagger from `(entity, label)` pairs.
    pub fn new<I, E, L>(entries: I) -> Result<Self, TaggerError>
    where
        I: IntoIterator<Item = (E, L)>,
        E: Into<String>,
        L: Into<String>,
    {
        let mut labels = HashMap::new();
        for (entity, label) in entries {
            let entity = entity.into().trim().to_string();
            if !entity.is_empty() {
                labels.entry(entity).or_insert_with(|| label.into());
            }
        }
        if labels.is_empty() {
            return Err(TaggerError::Init("lexicon has no entries".to_string()));
        }

        let mut names: Vec<&String> = labels.keys().collect();
        // Leftmost-first alternation: longer names must come first.
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\b(?:{})\b", alternation))
            .map_err(|e| TaggerError::Init(format!("lexicon pattern: {}", e)))?;

        Ok(Self { pattern, labels })
    }

    /// Build a tagger from bare entity names, all labelled `MISC`.
    pub fn from_names<I, S>(names: I) -> Result<Self, TaggerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|name| (name, DEFAULT_LABEL)))
    }

    /// Load a gazetteer file.
    ///
    /// One entry per line, either `LABEL<TAB>Entity Name` or a bare
    /// `Entity Name`. Blank lines and lines starting with `#` are skipped.
    pub fn from_file(path: &Path) -> Result<Self, TaggerError> {
        let content = std::fs::read_to_string(path)?;
        let entries = parse_lexicon(&content);
        let tagger = Self::new(entries)?;
        info!(
            path = %path.display(),
            entries = tagger.len(),
            "Loaded entity lexicon"
        );
        Ok(tagger)
    }

    /// Number of distinct entity names.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl EntityTagger for LexiconTagger {
    fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
        Ok(self
            .pattern
            .find_iter(text)
            .map(|m| {
                let label = self
                    .labels
                    .get(m.as_str())
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_LABEL);
                TaggedSpan::new(m.as_str(), label, 1.0)
            })
            .collect())
    }
}

fn parse_lexicon(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once('\t') {
            Some((label, entity)) => (entity.trim().to_string(), label.trim().to_string()),
            None => (line.to_string(), DEFAULT_LABEL.to_string()),
        })
        .collect()
}
