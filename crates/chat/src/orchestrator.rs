//! Conversation orchestrator: one history-aware retrieval-and-answer turn.
//!
//! A turn moves through [`TurnStage`]s:
//!
//! ```text
//! LoadingHistory -> Rewriting -> Retrieving -> Synthesizing -> Persisting -> Done
//!        \______________\____________\_____________\______________\-> Failed
//! ```
//!
//! The session gate is taken before loading history and released after
//! persisting. History is written only in `Persisting`, as one user/assistant
//! exchange, so a failed turn leaves the transcript exactly as it was.

use crate::history::SessionHistoryStore;
use crate::rewriter::QueryRewriter;
use crate::synthesizer::AnswerSynthesizer;
use crate::types::Turn;
use reviewqa_core::{AppError, AppResult};
use reviewqa_knowledge::{RetrievalResult, Retriever};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on each remote stage.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Position of a turn in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    LoadingHistory,
    Rewriting,
    Retrieving,
    Synthesizing,
    Persisting,
    Done,
    Failed,
}

impl TurnStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStage::LoadingHistory => "loading_history",
            TurnStage::Rewriting => "rewriting",
            TurnStage::Retrieving => "retrieving",
            TurnStage::Synthesizing => "synthesizing",
            TurnStage::Persisting => "persisting",
            TurnStage::Done => "done",
            TurnStage::Failed => "failed",
        }
    }

    /// Error reported when this stage exceeds its time bound.
    fn timeout_error(&self, limit: Duration) -> AppError {
        let message = format!("{} timed out after {:?}", self.as_str(), limit);
        match self {
            TurnStage::Retrieving => AppError::Embedding(message),
            _ => AppError::Generation(message),
        }
    }
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a turn produced, for callers that show sources.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub answer: String,
    pub standalone_query: String,
    pub context: RetrievalResult,
}

/// Runs turns against shared, stateless stage implementations.
pub struct ConversationOrchestrator {
    history: Arc<SessionHistoryStore>,
    rewriter: Arc<dyn QueryRewriter>,
    retriever: Arc<dyn Retriever>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    stage_timeout: Duration,
}

impl ConversationOrchestrator {
    pub fn new(
        history: Arc<SessionHistoryStore>,
        rewriter: Arc<dyn QueryRewriter>,
        retriever: Arc<dyn Retriever>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
    ) -> Self {
        Self {
            history,
            rewriter,
            retriever,
            synthesizer,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    pub fn history(&self) -> &SessionHistoryStore {
        &self.history
    }

    /// Answer one utterance in the context of its session.
    pub async fn handle_turn(&self, session_id: &str, user_text: &str) -> AppResult<String> {
        self.handle_turn_detailed(session_id, user_text)
            .await
            .map(|outcome| outcome.answer)
    }

    /// Like [`handle_turn`](Self::handle_turn), also returning the standalone
    /// query and the retrieved documents.
    pub async fn handle_turn_detailed(
        &self,
        session_id: &str,
        user_text: &str,
    ) -> AppResult<TurnOutcome> {
        if user_text.trim().is_empty() {
            return Err(AppError::Input("Message cannot be empty".to_string()));
        }

        let mut stage = TurnStage::LoadingHistory;
        let result = self.run_stages(session_id, user_text, &mut stage).await;

        match result {
            Ok(outcome) => {
                info!(session_id, stage = %TurnStage::Done, "Turn completed");
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    session_id,
                    stage = %TurnStage::Failed,
                    failed_in = %stage,
                    kind = err.kind(),
                    "Turn failed: {}",
                    err
                );
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        session_id: &str,
        user_text: &str,
        stage: &mut TurnStage,
    ) -> AppResult<TurnOutcome> {
        enter(session_id, stage, TurnStage::LoadingHistory);
        let _guard = self.history.lock_session(session_id).await?;
        let transcript = self.history.get_or_create(session_id).await?;

        enter(session_id, stage, TurnStage::Rewriting);
        let standalone_query = self
            .bounded(*stage, self.rewriter.rewrite(&transcript, user_text))
            .await?;

        enter(session_id, stage, TurnStage::Retrieving);
        let context = self
            .bounded(*stage, self.retriever.retrieve(&standalone_query))
            .await?;

        enter(session_id, stage, TurnStage::Synthesizing);
        let answer = self
            .bounded(
                *stage,
                self.synthesizer
                    .synthesize(&context, &standalone_query, &transcript),
            )
            .await?;

        enter(session_id, stage, TurnStage::Persisting);
        self.history
            .append_exchange(session_id, Turn::user(user_text), Turn::assistant(&answer))
            .await?;

        *stage = TurnStage::Done;
        Ok(TurnOutcome {
            answer,
            standalone_query,
            context,
        })
    }

    async fn bounded<T>(
        &self,
        stage: TurnStage,
        call: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.stage_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(stage.timeout_error(self.stage_timeout)),
        }
    }
}

fn enter(session_id: &str, current: &mut TurnStage, next: TurnStage) {
    debug!(session_id, from = %current, stage = %next, "Stage transition");
    *current = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(TurnStage::LoadingHistory.to_string(), "loading_history");
        assert_eq!(TurnStage::Failed.as_str(), "failed");
    }

    #[test]
    fn test_timeout_error_kinds() {
        let limit = Duration::from_secs(1);
        assert!(matches!(
            TurnStage::Rewriting.timeout_error(limit),
            AppError::Generation(_)
        ));
        assert!(matches!(
            TurnStage::Retrieving.timeout_error(limit),
            AppError::Embedding(_)
        ));
        assert!(matches!(
            TurnStage::Synthesizing.timeout_error(limit),
            AppError::Generation(_)
        ));
    }
}
