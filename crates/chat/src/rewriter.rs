//! Follow-up rewriting into a standalone search query.

use crate::types::{GenerationSettings, Transcript};
use async_trait::async_trait;
use reviewqa_core::{AppError, AppResult};
use reviewqa_llm::{LlmClient, LlmRequest};
use reviewqa_prompt::{build_prompt, defaults, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Turns an utterance into a query answerable without the transcript.
#[async_trait]
pub trait QueryRewriter: Send + Sync {
    /// With an empty transcript the utterance is returned unchanged.
    async fn rewrite(&self, history: &Transcript, user_text: &str) -> AppResult<String>;
}

/// Rewriter backed by one chat-completion call per turn.
pub struct LlmQueryRewriter {
    client: Arc<dyn LlmClient>,
    instruction: String,
    settings: GenerationSettings,
}

impl LlmQueryRewriter {
    /// Create a rewriter with the built-in `chat.rewrite` instruction.
    pub fn new(client: Arc<dyn LlmClient>, settings: GenerationSettings) -> AppResult<Self> {
        let prompt = defaults::builtin(defaults::REWRITE_PROMPT_ID).ok_or_else(|| {
            AppError::Prompt(format!("Missing prompt '{}'", defaults::REWRITE_PROMPT_ID))
        })?;
        Self::with_prompt(client, settings, &prompt)
    }

    /// Create a rewriter from an explicit prompt definition.
    pub fn with_prompt(
        client: Arc<dyn LlmClient>,
        settings: GenerationSettings,
        prompt: &PromptDefinition,
    ) -> AppResult<Self> {
        let instruction = build_prompt(prompt, HashMap::new())?.system;
        Ok(Self {
            client,
            instruction,
            settings,
        })
    }

    fn request(&self, history: &Transcript, user_text: &str) -> LlmRequest {
        let mut request = LlmRequest::new(user_text, &self.settings.model)
            .with_system(&self.instruction)
            .with_history(history.to_messages())
            .with_temperature(self.settings.temperature);
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }
}

#[async_trait]
impl QueryRewriter for LlmQueryRewriter {
    #[instrument(skip_all, fields(history_len = history.len()))]
    async fn rewrite(&self, history: &Transcript, user_text: &str) -> AppResult<String> {
        if history.is_empty() {
            return Ok(user_text.to_string());
        }

        let response = self
            .client
            .complete(&self.request(history, user_text))
            .await
            .map_err(|e| match e {
                AppError::Generation(_) => e,
                other => AppError::Generation(other.to_string()),
            })?;

        let query = response.content.trim();
        if query.is_empty() {
            return Err(AppError::Generation(
                "Rewriter returned an empty query".to_string(),
            ));
        }

        debug!("Rewrote follow-up into standalone query: {}", query);
        Ok(query.to_string())
    }
}
