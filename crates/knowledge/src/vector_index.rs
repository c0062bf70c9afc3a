//! Vector index abstraction for review documents.
//!
//! Defines a trait for backend-agnostic vector storage and top-k retrieval.

use crate::types::{Document, ScoredDocument};
use async_trait::async_trait;
use reviewqa_core::AppResult;

/// Trait for vector index backends.
///
/// One instance addresses one collection. Failures are reported as
/// `AppError::Index`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the collection this handle reads and writes.
    fn collection(&self) -> &str;

    /// Insert documents with their embeddings. `embeddings[i]` belongs to
    /// `documents[i]`. Returns the number of documents written.
    async fn upsert(&self, documents: &[Document], embeddings: &[Vec<f32>]) -> AppResult<usize>;

    /// Search for the top-k most similar documents to the query embedding.
    ///
    /// Returns at most `top_k` documents ordered by descending similarity;
    /// an empty collection yields an empty list.
    async fn search(&self, query_embedding: &[f32], top_k: usize)
        -> AppResult<Vec<ScoredDocument>>;

    /// Number of documents in the collection.
    async fn count(&self) -> AppResult<u64>;

    /// Remove every document from the collection.
    async fn reset(&self) -> AppResult<()>;
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score every candidate against the query and keep the best `top_k`.
///
/// Ties keep insertion order.
pub(crate) fn rank_top_k<I>(query_embedding: &[f32], candidates: I, top_k: usize) -> Vec<ScoredDocument>
where
    I: IntoIterator<Item = (Document, Vec<f32>)>,
{
    let mut results: Vec<ScoredDocument> = candidates
        .into_iter()
        .map(|(document, embedding)| ScoredDocument {
            score: cosine_similarity(query_embedding, &embedding),
            document,
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(top_k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![1.0, 0.0, 0.0];
        let d = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&c, &d).abs() < 0.001);

        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_top_k_orders_and_truncates() {
        let candidates = vec![
            (Document::new("far", "P"), vec![0.0, 1.0]),
            (Document::new("near", "P"), vec![1.0, 0.1]),
            (Document::new("middle", "P"), vec![1.0, 1.0]),
        ];

        let ranked = rank_top_k(&[1.0, 0.0], candidates, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].document.content, "near");
        assert_eq!(ranked[1].document.content, "middle");
        assert!(ranked[0].score >= ranked[1].score);
    }
}
