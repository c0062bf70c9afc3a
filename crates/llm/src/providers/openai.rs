//! OpenAI-compatible chat provider.
//!
//! Speaks the `/chat/completions` protocol, which covers OpenAI itself and
//! gateways such as OpenRouter.

use crate::client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use async_trait::async_trait;
use reviewqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenRouter's OpenAI-compatible base URL.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenAI's base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Error body returned by OpenAI-compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Client for OpenAI-compatible chat-completion endpoints.
pub struct OpenAiCompatibleClient {
    provider: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    /// Create a client for `provider` rooted at `base_url`.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Bound every HTTP call made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    fn to_completion_request(&self, request: &LlmRequest) -> CompletionRequest {
        CompletionRequest {
            model: request.model.clone(),
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn convert_response(&self, response: CompletionResponse) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::Generation(format!("{} returned no completion choices", self.provider))
            })?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model,
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            provider = %self.provider,
            model = %request.model,
            history = request.history.len(),
            "Sending chat completion request"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_completion_request(request))
            .send()
            .await
            .map_err(|e| {
                AppError::Generation(format!("Failed to send request to {}: {}", self.provider, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.error.message)
                .unwrap_or(error_text);
            return Err(AppError::Generation(format!(
                "{} API error ({}): {}",
                self.provider, status, detail
            )));
        }

        let body: CompletionResponse = response.json().await.map_err(|e| {
            AppError::Generation(format!("Failed to parse {} response: {}", self.provider, e))
        })?;

        self.convert_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new("openrouter", "https://openrouter.ai/api/v1/", "sk-test")
    }

    #[test]
    fn test_base_url_trimmed() {
        assert_eq!(client().base_url, OPENROUTER_BASE_URL);
        assert_eq!(client().provider_name(), "openrouter");
    }

    #[test]
    fn test_request_serialization() {
        let request = LlmRequest::new("How is the battery?", "openrouter/free")
            .with_system("Stick to the context")
            .with_temperature(0.4);

        let body = serde_json::to_value(client().to_completion_request(&request)).unwrap();
        assert_eq!(body["model"], "openrouter/free");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "How is the battery?");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_response_conversion() {
        let raw = r#"{
            "model": "openrouter/free",
            "choices": [{"message": {"role": "assistant", "content": "Battery lasts two days."}}],
            "usage": {"prompt_tokens": 50, "completion_tokens": 6}
        }"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        let response = client().convert_response(parsed).unwrap();

        assert_eq!(response.content, "Battery lasts two days.");
        assert_eq!(response.usage.total_tokens, 56);
    }

    #[test]
    fn test_empty_choices_is_generation_error() {
        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        let result = client().convert_response(parsed);
        assert!(matches!(result, Err(AppError::Generation(_))));
    }
}
