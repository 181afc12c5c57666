use serde::{Deserialize, Serialize};

/// One entity mention reported by a tagging provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedSpan {
    pub text: String,
    pub label: String,
    pub confidence: f32,
}

impl TaggedSpan {
    pub fn new(text: impl Into<String>, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            confidence,
        }
    }
}

/// Which strategy an extractor is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Spans come from an `EntityTagger`.
    Tagged,
    /// Runs of capitalized words matched by pattern.
    Heuristic,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tagged => "tagged",
            Self::Heuristic => "heuristic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_as_str() {
        assert_eq!(ExtractionStrategy::Tagged.as_str(), "tagged");
        assert_eq!(ExtractionStrategy::Heuristic.as_str(), "heuristic");
    }

    #[test]
    fn test_tagged_span_new() {
        let span = TaggedSpan::new("Paris", "LOC", 0.98);
        assert_eq!(span.text, "Paris");
        assert_eq!(span.label, "LOC");
        assert!((span.confidence - 0.98).abs() < f32::EPSILON);
    }
}
