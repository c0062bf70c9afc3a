//! In-memory vector index, used for tests and one-off sessions.

use crate::types::{Document, ScoredDocument};
use crate::vector_index::{rank_top_k, VectorIndex};
use async_trait::async_trait;
use reviewqa_core::{AppError, AppResult};
use std::sync::RwLock;

/// Vector index that keeps every document in process memory.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    collection: String,
    entries: RwLock<Vec<(Document, Vec<f32>)>>,
}

impl InMemoryIndex {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn upsert(&self, documents: &[Document], embeddings: &[Vec<f32>]) -> AppResult<usize> {
        if documents.len() != embeddings.len() {
            return Err(AppError::Index(format!(
                "Got {} documents but {} embeddings",
                documents.len(),
                embeddings.len()
            )));
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Index("In-memory index lock poisoned".to_string()))?;
        entries.extend(documents.iter().cloned().zip(embeddings.iter().cloned()));
        Ok(documents.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<ScoredDocument>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Index("In-memory index lock poisoned".to_string()))?;
        Ok(rank_top_k(query_embedding, entries.iter().cloned(), top_k))
    }

    async fn count(&self) -> AppResult<u64> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Index("In-memory index lock poisoned".to_string()))?;
        Ok(entries.len() as u64)
    }

    async fn reset(&self) -> AppResult<()> {
        self.entries
            .write()
            .map_err(|_| AppError::Index("In-memory index lock poisoned".to_string()))?
            .clear();
        Ok(())
    }
}
