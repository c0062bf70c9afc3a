//! Chat-completion client factory.
//!
//! Builds the long-lived client shared by the rewrite and answer stages from
//! the resolved provider settings.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiCompatibleClient};
use crate::types::ProviderType;
use reviewqa_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a chat-completion client.
///
/// # Arguments
/// * `provider` - Provider identifier ("openrouter", "openai", "ollama")
/// * `endpoint` - Optional base URL; the provider default is used otherwise
/// * `api_key` - API key for hosted providers
/// * `timeout` - Optional per-request HTTP timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key is
/// missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown chat provider: {}", provider)))?;
    let base_url = endpoint.unwrap_or(provider_type.default_base_url());

    tracing::debug!(
        provider = provider_type.as_str(),
        base_url,
        "Creating chat-completion client"
    );

    match provider_type {
        ProviderType::Ollama => {
            let mut client = OllamaClient::with_base_url(base_url);
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout)?;
            }
            Ok(Arc::new(client))
        }
        ProviderType::OpenRouter | ProviderType::OpenAI => {
            let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config(format!(
                    "{} provider requires an API key",
                    provider_type.as_str()
                ))
            })?;
            let mut client =
                OpenAiCompatibleClient::new(provider_type.as_str(), base_url, api_key.trim());
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout)?;
            }
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_openrouter_client() {
        let client = create_client(
            "openrouter",
            None,
            Some("sk-test"),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.provider_name(), "openrouter");
    }

    #[test]
    fn test_openrouter_requires_api_key() {
        match create_client("openrouter", None, Some("  "), None) {
            Err(err) => assert!(err.to_string().contains("requires an API key")),
            Ok(_) => panic!("Expected error for OpenRouter without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None, None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("Unknown chat provider")),
            _ => panic!("Expected configuration error for unknown provider"),
        }
    }
}
