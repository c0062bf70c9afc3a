//! Semantic retrieval over the review index.

use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievalResult;
use crate::vector_index::VectorIndex;
use async_trait::async_trait;
use reviewqa_core::{AppError, AppResult};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of documents returned per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Top-k semantic search for a standalone query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most k documents, most similar first.
    ///
    /// An empty index yields an empty result. Embedding failures surface as
    /// `AppError::Embedding`, index failures as `AppError::Index`.
    async fn retrieve(&self, query: &str) -> AppResult<RetrievalResult>;
}

/// Retriever that embeds the query and searches a [`VectorIndex`].
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    #[instrument(skip(self, query), fields(collection = self.index.collection(), top_k = self.top_k))]
    async fn retrieve(&self, query: &str) -> AppResult<RetrievalResult> {
        let embedding = self.embedder.embed(query).await.map_err(|e| match e {
            AppError::Embedding(_) => e,
            other => AppError::Embedding(other.to_string()),
        })?;

        let documents = self.index.search(&embedding, self.top_k).await.map_err(|e| match e {
            AppError::Index(_) => e,
            other => AppError::Index(other.to_string()),
        })?;

        let result = RetrievalResult::new(documents);
        debug!(
            "Retrieved {} documents (max score {:.3})",
            result.len(),
            result.max_score()
        );
        Ok(result)
    }
}
