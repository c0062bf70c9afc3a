//! Embedding provider trait and factory.

use super::providers::{huggingface::HuggingFaceProvider, mock::MockProvider, ollama::OllamaProvider};
use async_trait::async_trait;
use reviewqa_core::config::EmbeddingModelConfig;
use reviewqa_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
///
/// Failures are reported as `AppError::Embedding`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "huggingface", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from the configured model settings.
pub fn create_provider(
    config: &EmbeddingModelConfig,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let timeout = timeout.unwrap_or(Duration::from_secs(30));

    match config.provider.to_lowercase().as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(config.dimensions))),

        "huggingface" => {
            let token = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config(format!(
                    "huggingface embedding provider requires {}",
                    config.api_key_env
                ))
            })?;
            let provider = HuggingFaceProvider::new(
                config.endpoint.as_deref(),
                &config.model,
                token.trim(),
                config.dimensions,
                timeout,
            )?;
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let provider = OllamaProvider::new(
                config.endpoint.as_deref(),
                &config.model,
                config.dimensions,
                timeout,
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: huggingface, ollama, mock",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_config() -> EmbeddingModelConfig {
        EmbeddingModelConfig {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&mock_config(), None, None).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_unknown_provider() {
        let mut config = mock_config();
        config.provider = "unknown".to_string();

        let result = create_provider(&config, None, None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[test]
    fn test_huggingface_requires_token() {
        let config = EmbeddingModelConfig::default();
        assert!(matches!(
            create_provider(&config, None, None),
            Err(AppError::Config(_))
        ));

        let provider = create_provider(&config, Some("hf_test"), None).unwrap();
        assert_eq!(provider.provider_name(), "huggingface");
        assert_eq!(provider.dimensions(), 384);
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&mock_config(), None, None).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
