//! History-aware review question answering.
//!
//! Each turn rewrites the user's message into a standalone query, retrieves
//! matching reviews, synthesizes a grounded answer and records the exchange
//! in the session's transcript.

pub mod bootstrap;
pub mod history;
pub mod orchestrator;
pub mod rewriter;
pub mod synthesizer;
pub mod types;

#[cfg(test)]
mod tests;

pub use bootstrap::{build_orchestrator, history_from_config};
pub use history::{
    HistoryBackend, HistoryStats, InMemoryHistory, SessionGuard, SessionHistoryStore,
    SqliteHistory,
};
pub use orchestrator::{ConversationOrchestrator, TurnOutcome, TurnStage};
pub use rewriter::{LlmQueryRewriter, QueryRewriter};
pub use synthesizer::{AnswerSynthesizer, LlmAnswerSynthesizer};
pub use types::{GenerationSettings, Role, Transcript, Turn};
