//! Embedding providers for queries and ingestion.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
