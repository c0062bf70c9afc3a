//! SQLite-backed vector index for review documents.
//!
//! Embeddings are stored as little-endian `f32` blobs and scored by brute
//! force cosine similarity. Several collections can share one database file.

use crate::types::{Document, ScoredDocument};
use crate::vector_index::{rank_top_k, VectorIndex};
use async_trait::async_trait;
use reviewqa_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite vector index bound to one collection.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    collection: String,
    dimensions: usize,
}

impl SqliteIndex {
    /// Open the database at `db_path`, creating it and the collection if
    /// needed. Used by ingestion.
    pub fn create(db_path: &Path, collection: &str, dimensions: usize) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;
        init_schema(&conn)?;

        match collection_dimensions(&conn, collection)? {
            Some(existing) if existing != dimensions => {
                return Err(AppError::Index(format!(
                    "Collection '{}' stores {}-dimensional embeddings, configured model produces {}",
                    collection, existing, dimensions
                )));
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT INTO collections (name, dimensions, created_at) VALUES (?1, ?2, datetime('now'))",
                    params![collection, dimensions as i64],
                )
                .map_err(|e| AppError::Index(format!("Failed to create collection: {}", e)))?;
                tracing::info!("Created collection '{}' ({} dims)", collection, dimensions);
            }
        }

        tracing::debug!("Opened SQLite index at {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
            dimensions,
        })
    }

    /// Open an existing collection for reading.
    ///
    /// Fails with `AppError::Index` when the database or the collection does
    /// not exist; the conversation pipeline never creates collections.
    pub fn open_existing(db_path: &Path, collection: &str) -> AppResult<Self> {
        if !db_path.exists() {
            return Err(AppError::Index(format!(
                "No vector index at {:?}. Run 'reviewqa ingest' first.",
                db_path
            )));
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;
        init_schema(&conn)?;

        let dimensions = collection_dimensions(&conn, collection)?.ok_or_else(|| {
            AppError::Index(format!("Collection '{}' does not exist", collection))
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
            dimensions,
        })
    }

    /// Embedding dimensions of the collection.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Index("SQLite connection lock poisoned".to_string()))
    }

    fn check_dimensions(&self, embedding: &[f32]) -> AppResult<()> {
        if embedding.len() != self.dimensions {
            return Err(AppError::Index(format!(
                "Embedding has {} dimensions, collection '{}' expects {}",
                embedding.len(),
                self.collection,
                self.dimensions
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
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
        for embedding in embeddings {
            self.check_dimensions(embedding)?;
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;

        for (document, embedding) in documents.iter().zip(embeddings) {
            tx.execute(
                "INSERT INTO documents (id, collection, content, product_name, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    self.collection,
                    document.content,
                    document.metadata.product_name,
                    embedding_to_bytes(embedding),
                ],
            )
            .map_err(|e| AppError::Index(format!("Failed to insert document: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit documents: {}", e)))?;

        Ok(documents.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<ScoredDocument>> {
        self.check_dimensions(query_embedding)?;

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT content, product_name, embedding FROM documents
                 WHERE collection = ?1 ORDER BY rowid",
            )
            .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![self.collection], |row| {
                let content: String = row.get(0)?;
                let product_name: String = row.get(1)?;
                let embedding_bytes: Vec<u8> = row.get(2)?;
                Ok((Document::new(content, product_name), embedding_bytes))
            })
            .map_err(|e| AppError::Index(format!("Failed to query documents: {}", e)))?;

        let mut candidates = Vec::new();
        for row in rows {
            let (document, bytes) =
                row.map_err(|e| AppError::Index(format!("Failed to read document row: {}", e)))?;
            candidates.push((document, bytes_to_embedding(&bytes)?));
        }

        let results = rank_top_k(query_embedding, candidates, top_k);

        tracing::debug!(
            "Retrieved {} documents from '{}' (requested top-{})",
            results.len(),
            self.collection,
            top_k
        );

        Ok(results)
    }

    async fn count(&self) -> AppResult<u64> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![self.collection],
            |row| row.get::<_, i64>(0).map(|v| v as u64),
        )
        .map_err(|e| AppError::Index(format!("Failed to count documents: {}", e)))
    }

    async fn reset(&self) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM documents WHERE collection = ?1",
            params![self.collection],
        )
        .map_err(|e| AppError::Index(format!("Failed to delete documents: {}", e)))?;

        tracing::info!("Reset collection '{}'", self.collection);
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            dimensions INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            content TEXT NOT NULL,
            product_name TEXT NOT NULL,
            embedding BLOB NOT NULL,
            FOREIGN KEY (collection) REFERENCES collections(name)
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
        "#,
    )
    .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))
}

fn collection_dimensions(conn: &Connection, collection: &str) -> AppResult<Option<usize>> {
    conn.query_row(
        "SELECT dimensions FROM collections WHERE name = ?1",
        params![collection],
        |row| row.get::<_, i64>(0).map(|v| v as usize),
    )
    .optional()
    .map_err(|e| AppError::Index(format!("Failed to read collection '{}': {}", collection, e)))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
