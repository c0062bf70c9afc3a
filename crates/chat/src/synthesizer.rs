//! Answer synthesis grounded in retrieved reviews.

use crate::types::{GenerationSettings, Transcript};
use async_trait::async_trait;
use reviewqa_core::{AppError, AppResult};
use reviewqa_knowledge::RetrievalResult;
use reviewqa_llm::{LlmClient, LlmRequest};
use reviewqa_prompt::{build_prompt, defaults, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Context text used when retrieval found nothing.
pub const NO_REVIEWS_CONTEXT: &str = "No relevant customer reviews were found for this question.";

/// Produces the final answer from retrieved documents.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        documents: &RetrievalResult,
        query: &str,
        history: &Transcript,
    ) -> AppResult<String>;
}

/// Render retrieved reviews as the `{{context}}` block, labelled by product.
pub fn format_context(documents: &RetrievalResult) -> String {
    if documents.is_empty() {
        return NO_REVIEWS_CONTEXT.to_string();
    }

    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "[{}] Product: {}\nReview: {}",
                i + 1,
                doc.metadata.product_name,
                doc.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Synthesizer backed by one chat-completion call per turn.
pub struct LlmAnswerSynthesizer {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    settings: GenerationSettings,
}

impl LlmAnswerSynthesizer {
    /// Create a synthesizer with the built-in `chat.answer` instruction.
    pub fn new(client: Arc<dyn LlmClient>, settings: GenerationSettings) -> AppResult<Self> {
        let prompt = defaults::builtin(defaults::ANSWER_PROMPT_ID).ok_or_else(|| {
            AppError::Prompt(format!("Missing prompt '{}'", defaults::ANSWER_PROMPT_ID))
        })?;
        Ok(Self::with_prompt(client, settings, prompt))
    }

    pub fn with_prompt(
        client: Arc<dyn LlmClient>,
        settings: GenerationSettings,
        prompt: PromptDefinition,
    ) -> Self {
        Self {
            client,
            prompt,
            settings,
        }
    }

    fn instruction(&self, documents: &RetrievalResult, query: &str) -> AppResult<String> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), format_context(documents));
        vars.insert("input".to_string(), query.to_string());
        Ok(build_prompt(&self.prompt, vars)?.system)
    }
}

#[async_trait]
impl AnswerSynthesizer for LlmAnswerSynthesizer {
    #[instrument(skip_all, fields(documents = documents.len(), history_len = history.len()))]
    async fn synthesize(
        &self,
        documents: &RetrievalResult,
        query: &str,
        history: &Transcript,
    ) -> AppResult<String> {
        let mut request = LlmRequest::new(query, &self.settings.model)
            .with_system(self.instruction(documents, query)?)
            .with_history(history.to_messages())
            .with_temperature(self.settings.temperature);
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.client.complete(&request).await.map_err(|e| match e {
            AppError::Generation(_) => e,
            other => AppError::Generation(other.to_string()),
        })?;

        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(AppError::Generation(
                "Answer model returned an empty reply".to_string(),
            ));
        }
        Ok(answer.to_string())
    }
}
