//! Reranking of retrieved documents.

use knowgraph_core::{Document, Result};
use knowgraph_vector::{cosine_similarity, EmbeddingProvider};

/// Re-orders a retrieved document list for a query.
///
/// Implementations return at most `top_k` documents drawn from `documents`.
/// A retriever with a reranker attached uses it in place of its built-in
/// scoring.
pub trait Reranker {
    fn rerank(&self, query: &str, documents: Vec<Document>, top_k: usize) -> Result<Vec<Document>>;
}

impl<T: Reranker + ?Sized> Reranker for Box<T> {
    fn rerank(&self, query: &str, documents: Vec<Document>, top_k: usize) -> Result<Vec<Document>> {
        (**self).rerank(query, documents, top_k)
    }
}

/// Sort scored items by descending score and keep the first `k`.
///
/// The sort is stable: equal scores keep their input order. NaN scores
/// rank below every real score.
pub fn rank_by_score<T>(mut items: Vec<(T, f64)>, k: usize) -> Vec<(T, f64)> {
    items.sort_by(|a, b| rank_key(b.1).total_cmp(&rank_key(a.1)));
    items.truncate(k);
    items
}

fn rank_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

/// Orders documents by cosine similarity between query and document
/// embeddings alone.
#[derive(Debug, Clone)]
pub struct CosineReranker<E> {
    embedder: E,
}

impl<E: EmbeddingProvider> CosineReranker<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }
}

impl<E: EmbeddingProvider> Reranker for CosineReranker<E> {
    fn rerank(&self, query: &str, documents: Vec<Document>, top_k: usize) -> Result<Vec<Document>> {
        if top_k == 0 || documents.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed(query)?;
        let mut scored = Vec::with_capacity(documents.len());
        for document in documents {
            let embedding = self.embedder.embed(&document.text)?;
            let score = cosine_similarity(&query_embedding, &embedding);
            scored.push((document, score));
        }
        Ok(rank_by_score(scored, top_k)
            .into_iter()
            .map(|(document, _)| document)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowgraph_vector::MockEmbedding;

    #[test]
    fn test_rank_by_score_is_stable() {
        let ranked = rank_by_score(vec![("a", 0.5), ("b", 0.9), ("c", 0.5), ("d", 0.1)], 3);
        assert_eq!(ranked, vec![("b", 0.9), ("a", 0.5), ("c", 0.5)]);
    }

    #[test]
    fn test_rank_by_score_puts_nan_last() {
        let ranked = rank_by_score(vec![("a", f64::NAN), ("b", 1.0), ("c", -2.0)], 5);
        let order: Vec<&str> = ranked.iter().map(|(name, _)| *name).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_rank_by_score_many_nans() {
        let items: Vec<(usize, f64)> = (0..100)
            .map(|i| (i, if i % 2 == 0 { f64::NAN } else { i as f64 }))
            .collect();
        let ranked = rank_by_score(items, 100);
        assert_eq!(ranked.len(), 100);
        assert_eq!(ranked[0].0, 99);
        assert!(ranked[50..].iter().all(|(_, score)| score.is_nan()));
    }

    #[test]
    fn test_cosine_reranker_puts_exact_text_first() {
        let reranker = CosineReranker::new(MockEmbedding::with_dimensions(64));
        let docs = vec![
            Document::new("unrelated words"),
            Document::new("graph retrieval"),
            Document::new("more noise"),
        ];
        let reranked = reranker.rerank("graph retrieval", docs, 2).unwrap();
        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].text, "graph retrieval");
    }

    #[test]
    fn test_boxed_reranker() {
        let reranker: Box<dyn Reranker> = Box::new(CosineReranker::new(MockEmbedding::new()));
        assert!(reranker.rerank("q", Vec::new(), 3).unwrap().is_empty());
    }
}
