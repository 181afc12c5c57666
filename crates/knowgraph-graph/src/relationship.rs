//! Co-occurrence relationships between entities.

use serde::Serialize;

use knowgraph_core::Result;
use knowgraph_extract::EntityExtractor;
use knowgraph_vector::EmbeddingProvider;

use crate::graph::KnowledgeGraph;
use crate::resolver::EntityResolver;

/// A weighted co-occurrence between two canonical entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Builds relationships from entities that appear close to each other.
///
/// Two mentions at positions `i < j` are related when `j - i` is smaller than
/// the window size; the pair weight is `1 / (j - i)`. Pairs that resolve to
/// the same node are skipped.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipExtractor {
    window_size: usize,
}

impl RelationshipExtractor {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Pair up already-canonicalized mentions.
    pub fn pairs(&self, canonical: &[String]) -> Vec<Relationship> {
        let mut relationships = Vec::new();
        for (i, source) in canonical.iter().enumerate() {
            let end = canonical.len().min(i + self.window_size);
            for j in (i + 1)..end {
                let target = &canonical[j];
                if source == target {
                    continue;
                }
                relationships.push(Relationship {
                    source: source.clone(),
                    target: target.clone(),
                    weight: 1.0 / (j - i) as f64,
                });
            }
        }
        relationships
    }

    /// Extract the relationships of `text` against the current graph.
    ///
    /// Each mention is canonicalized once against the nodes present before
    /// this call; the graph itself is not touched. Tagger call failures come
    /// back as [`KnowgraphError::Extraction`](knowgraph_core::KnowgraphError::Extraction),
    /// embedding failures as `RetrievalUnavailable`.
    pub fn extract(
        &self,
        text: &str,
        extractor: &EntityExtractor,
        resolver: &mut EntityResolver,
        graph: &KnowledgeGraph,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<Relationship>> {
        let entities = extractor.extract(text)?;
        if entities.len() < 2 {
            return Ok(Vec::new());
        }

        let mut canonical = Vec::with_capacity(entities.len());
        for entity in &entities {
            canonical.push(resolver.canonical(entity, graph.node_names(), embedder)?);
        }
        Ok(self.pairs(&canonical))
    }
}

impl Default for RelationshipExtractor {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowgraph_core::config::ExtractionConfig;
    use knowgraph_core::KnowgraphError;
    use knowgraph_extract::{EntityTagger, TaggedSpan, TaggerError};
    use knowgraph_vector::{EmbeddingError, MockEmbedding};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn weight_of(relationships: &[Relationship], a: &str, b: &str) -> f64 {
        relationships
            .iter()
            .filter(|r| (r.source == a && r.target == b) || (r.source == b && r.target == a))
            .map(|r| r.weight)
            .sum()
    }

    #[test]
    fn test_pairs_within_window() {
        let extractor = RelationshipExtractor::new(5);
        let rels = extractor.pairs(&names(&["Alice", "Bob", "Paris"]));
        assert_eq!(rels.len(), 3);
        assert_eq!(weight_of(&rels, "Alice", "Bob"), 1.0);
        assert_eq!(weight_of(&rels, "Bob", "Paris"), 1.0);
        assert_eq!(weight_of(&rels, "Alice", "Paris"), 0.5);
    }

    #[test]
    fn test_window_excludes_distance_equal_to_size() {
        let extractor = RelationshipExtractor::new(5);
        let rels = extractor.pairs(&names(&["A1", "B1", "C1", "D1", "E1", "F1"]));
        // Distances 1..=4 from A1, distance 5 is out.
        assert!((weight_of(&rels, "A1", "E1") - 0.25).abs() < 1e-12);
        assert_eq!(weight_of(&rels, "A1", "F1"), 0.0);
        assert!((weight_of(&rels, "B1", "F1") - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_same_node_pairs_skipped() {
        let extractor = RelationshipExtractor::new(5);
        let rels = extractor.pairs(&names(&["Bob", "Bob", "Carol"]));
        assert_eq!(rels.len(), 2);
        assert!(rels.iter().all(|r| r.source != r.target));
        // Both "Bob" mentions relate to Carol: 1/2 + 1/1.
        assert_eq!(weight_of(&rels, "Bob", "Carol"), 1.5);
    }

    #[test]
    fn test_fewer_than_two_entities() {
        let extractor = RelationshipExtractor::default();
        assert!(extractor.pairs(&[]).is_empty());
        assert!(extractor.pairs(&names(&["Alice"])).is_empty());
    }

    #[test]
    fn test_window_of_one_yields_nothing() {
        let extractor = RelationshipExtractor::new(1);
        assert!(extractor.pairs(&names(&["Alice", "Bob"])).is_empty());
    }

    #[test]
    fn test_extract_against_empty_graph() {
        let extractor = EntityExtractor::heuristic(&ExtractionConfig::default());
        let mut resolver = EntityResolver::default();
        let graph = KnowledgeGraph::new();
        let rels = RelationshipExtractor::default()
            .extract(
                "Alice met Bob in Paris.",
                &extractor,
                &mut resolver,
                &graph,
                &MockEmbedding::new(),
            )
            .unwrap();
        assert_eq!(rels.len(), 3);
        assert_eq!(rels[0].source, "Alice");
        assert_eq!(rels[0].target, "Bob");
        // Empty graph: nothing to compare against.
        assert_eq!(resolver.cached(), 0);
    }

    #[test]
    fn test_extract_tagger_failure_is_extraction_error() {
        struct Broken;
        impl EntityTagger for Broken {
            fn tag(&self, _text: &str) -> std::result::Result<Vec<TaggedSpan>, TaggerError> {
                Err(TaggerError::Call("boom".to_string()))
            }
        }
        let extractor = EntityExtractor::with_tagger(Box::new(Broken), &ExtractionConfig::default());
        let mut resolver = EntityResolver::default();
        let result = RelationshipExtractor::default().extract(
            "Alice met Bob.",
            &extractor,
            &mut resolver,
            &KnowledgeGraph::new(),
            &MockEmbedding::new(),
        );
        assert!(matches!(result, Err(KnowgraphError::Extraction(_))));
    }

    #[test]
    fn test_extract_embedding_failure_is_retrieval_unavailable() {
        struct Offline;
        impl EmbeddingProvider for Offline {
            fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
                Err(EmbeddingError::ModelUnavailable("offline".to_string()))
            }
            fn dimensions(&self) -> usize {
                4
            }
        }

        let extractor = EntityExtractor::heuristic(&ExtractionConfig::default());
        let mut graph = KnowledgeGraph::new();
        let seed = knowgraph_core::Document::new("Alice met Bob.");
        graph.apply(
            &seed,
            &[Relationship {
                source: "Alice".to_string(),
                target: "Bob".to_string(),
                weight: 1.0,
            }],
        );

        let mut resolver = EntityResolver::default();
        let result = RelationshipExtractor::default().extract(
            "Carol met Dave.",
            &extractor,
            &mut resolver,
            &graph,
            &Offline,
        );
        assert!(matches!(result, Err(KnowgraphError::RetrievalUnavailable(_))));
    }
}
