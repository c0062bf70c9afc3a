//! Review knowledge base: embeddings, vector index, retrieval, ingestion.
//!
//! The conversation pipeline only reads from the index through a
//! [`Retriever`]; writes happen exclusively through [`ingest_file`].

pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod memory_index;
pub mod retriever;
pub mod types;
pub mod vector_index;


pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::SqliteIndex;
pub use ingest::{IngestStats, ReviewFormat, DEFAULT_BATCH_SIZE};
pub use memory_index::InMemoryIndex;
pub use retriever::{Retriever, VectorRetriever, DEFAULT_TOP_K};
pub use types::{Document, DocumentMetadata, RetrievalResult, ReviewRecord, ScoredDocument};
pub use vector_index::VectorIndex;

use reviewqa_core::{AppConfig, AppResult};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Document count and location of the configured collection.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub collection: String,
    pub documents: u64,
    pub dimensions: usize,
    pub index_path: String,
    pub db_size_bytes: u64,
}

/// Build the configured embedding provider.
pub fn embedder_from_config(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(
        &config.embedding,
        config.embedding_api_key().as_deref(),
        Some(Duration::from_secs(config.pipeline.stage_timeout_secs)),
    )
}

/// Open the configured collection for reading.
pub fn open_index(config: &AppConfig) -> AppResult<Arc<SqliteIndex>> {
    let index = SqliteIndex::open_existing(&config.index_path(), &config.retrieval.collection)?;
    if index.dimensions() != config.embedding.dimensions {
        tracing::warn!(
            "Collection '{}' holds {}-dim embeddings but the embedding model is configured for {}",
            config.retrieval.collection,
            index.dimensions(),
            config.embedding.dimensions
        );
    }
    Ok(Arc::new(index))
}

/// Build a retriever over the configured collection.
pub fn retriever_from_config(config: &AppConfig) -> AppResult<VectorRetriever> {
    let embedder = embedder_from_config(config)?;
    let index = open_index(config)?;
    Ok(VectorRetriever::new(embedder, index).with_top_k(config.retrieval.top_k))
}

/// Ingest a CSV or JSON Lines review file into the configured collection.
///
/// The embedding and retrieval settings are validated before the index is
/// created or touched.
pub async fn ingest_file(config: &AppConfig, path: &Path, reset: bool) -> AppResult<IngestStats> {
    config.validate_knowledge()?;

    tracing::info!(
        "Ingesting {:?} into collection '{}'",
        path,
        config.retrieval.collection
    );

    config.ensure_state_dir()?;
    let embedder = embedder_from_config(config)?;
    let index = SqliteIndex::create(
        &config.index_path(),
        &config.retrieval.collection,
        embedder.dimensions(),
    )?;

    if reset {
        index.reset().await?;
    }

    let stats =
        ingest::ingest_records(embedder.as_ref(), &index, path, DEFAULT_BATCH_SIZE).await?;

    tracing::info!(
        "Ingestion completed: {} records read, {} indexed, {} skipped in {:.2}s",
        stats.records_read,
        stats.documents_indexed,
        stats.skipped,
        stats.duration_secs
    );

    Ok(stats)
}

/// Statistics for the configured collection.
pub async fn stats(config: &AppConfig) -> AppResult<IndexStats> {
    let index_path = config.index_path();
    let index = SqliteIndex::open_existing(&index_path, &config.retrieval.collection)?;
    let documents = index.count().await?;
    let db_size_bytes = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

    Ok(IndexStats {
        collection: config.retrieval.collection.clone(),
        documents,
        dimensions: index.dimensions(),
        index_path: index_path.display().to_string(),
        db_size_bytes,
    })
}
