//! Hugging Face Inference embedding provider.
//!
//! Posts `{"inputs": [...]}` to the feature-extraction pipeline of a
//! sentence-transformers model and expects one pooled vector per input.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::Client;
use reviewqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_HF_BASE_URL: &str = "https://router.huggingface.co/hf-inference/models";

#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    base_url: String,
    model: String,
    token: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl HuggingFaceProvider {
    pub fn new(
        endpoint: Option<&str>,
        model: &str,
        token: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: endpoint
                .unwrap_or(DEFAULT_HF_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            token: token.to_string(),
            dimensions,
        })
    }

    /// Full feature-extraction URL for the configured model.
    pub fn url(&self) -> String {
        format!("{}/{}/pipeline/feature-extraction", self.base_url, self.model)
    }

    fn check_dimensions(&self, embeddings: &[Vec<f32>]) -> AppResult<()> {
        match embeddings.iter().find(|e| e.len() != self.dimensions) {
            Some(bad) => Err(AppError::Embedding(format!(
                "Model '{}' returned {} dimensions, expected {}",
                self.model,
                bad.len(),
                self.dimensions
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    fn provider_name(&self) -> &str {
        "huggingface"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url();
        debug!("Sending feature-extraction request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&FeatureExtractionRequest { inputs: texts })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Hugging Face request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(AppError::Embedding(format!(
                "Hugging Face API error ({}): {}",
                status, message
            )));
        }

        let embeddings: Vec<Vec<f32>> = response.json().await.map_err(|e| {
            AppError::Embedding(format!("Failed to parse Hugging Face response: {}", e))
        })?;

        if embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Hugging Face returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }
        self.check_dimensions(&embeddings)?;

        Ok(embeddings)
    }
}
