//! Wire a [`ConversationOrchestrator`] from the application config.

use crate::history::{HistoryBackend, InMemoryHistory, SessionHistoryStore, SqliteHistory};
use crate::orchestrator::ConversationOrchestrator;
use crate::rewriter::LlmQueryRewriter;
use crate::synthesizer::LlmAnswerSynthesizer;
use crate::types::GenerationSettings;
use reviewqa_core::config::HistoryBackendKind;
use reviewqa_core::{AppConfig, AppResult};
use reviewqa_llm::create_client;
use reviewqa_prompt::{defaults, load_prompt};
use std::sync::Arc;
use std::time::Duration;

/// Open the configured history backing.
pub fn history_from_config(config: &AppConfig) -> AppResult<SessionHistoryStore> {
    let backend: Arc<dyn HistoryBackend> = match config.history.backend {
        HistoryBackendKind::Memory => Arc::new(InMemoryHistory::new()),
        HistoryBackendKind::Sqlite => {
            config.ensure_state_dir()?;
            Arc::new(SqliteHistory::open(&config.history_path())?)
        }
    };
    Ok(SessionHistoryStore::new(backend))
}

/// Build the full pipeline.
///
/// Validates the config first; a `Config` error here means the process must
/// not serve turns.
pub fn build_orchestrator(config: &AppConfig) -> AppResult<ConversationOrchestrator> {
    config.validate()?;

    let stage_timeout = Duration::from_secs(config.pipeline.stage_timeout_secs);
    let api_key = config.chat_api_key();
    let client = create_client(
        &config.chat.provider,
        config.chat.endpoint.as_deref(),
        api_key.as_deref(),
        Some(stage_timeout),
    )?;

    let settings = GenerationSettings::from(&config.chat);
    let rewrite_prompt = load_prompt(&config.workspace, defaults::REWRITE_PROMPT_ID)?;
    let answer_prompt = load_prompt(&config.workspace, defaults::ANSWER_PROMPT_ID)?;

    let rewriter = LlmQueryRewriter::with_prompt(client.clone(), settings.clone(), &rewrite_prompt)?;
    let synthesizer = LlmAnswerSynthesizer::with_prompt(client, settings, answer_prompt);
    let retriever = reviewqa_knowledge::retriever_from_config(config)?;
    let history = history_from_config(config)?;

    tracing::info!(
        provider = %config.chat.provider,
        model = %config.chat.model,
        embedding = %config.embedding.provider,
        history = history.backend_name(),
        top_k = config.retrieval.top_k,
        "Conversation pipeline ready"
    );

    Ok(ConversationOrchestrator::new(
        Arc::new(history),
        Arc::new(rewriter),
        Arc::new(retriever),
        Arc::new(synthesizer),
    )
    .with_stage_timeout(stage_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewqa_core::AppError;
    use tempfile::TempDir;

    fn offline_config(workspace: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.workspace = workspace.to_path_buf();
        config.chat.provider = "ollama".to_string();
        config.chat.model = "llama3.2".to_string();
        config.embedding.provider = "mock".to_string();
        config
    }

    #[test]
    fn test_invalid_config_is_rejected_before_building() {
        let dir = TempDir::new().unwrap();
        let mut config = offline_config(dir.path());
        config.retrieval.top_k = 0;

        assert!(matches!(build_orchestrator(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_index_is_index_error() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(dir.path());

        assert!(matches!(build_orchestrator(&config), Err(AppError::Index(_))));
    }

    #[tokio::test]
    async fn test_sqlite_history_from_config() {
        let dir = TempDir::new().unwrap();
        let mut config = offline_config(dir.path());
        config.history.backend = HistoryBackendKind::Sqlite;

        let store = history_from_config(&config).unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        assert!(config.history_path().exists());
    }
}
