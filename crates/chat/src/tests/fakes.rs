//! Scripted stage and model doubles for pipeline tests.

use crate::orchestrator::ConversationOrchestrator;
use crate::history::SessionHistoryStore;
use crate::rewriter::QueryRewriter;
use crate::synthesizer::AnswerSynthesizer;
use crate::types::Transcript;
use async_trait::async_trait;
use reviewqa_core::{AppError, AppResult};
use reviewqa_knowledge::{Document, RetrievalResult, Retriever, ScoredDocument};
use reviewqa_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

/// How a fake stage responds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Succeed,
    Fail,
    /// Sleep far longer than any test stage timeout.
    Hang,
    /// Succeed after a short pause, to widen race windows.
    Slow(Duration),
}

impl Behavior {
    async fn apply(self, error: AppError) -> AppResult<()> {
        match self {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(error),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
            Behavior::Slow(pause) => {
                tokio::time::sleep(pause).await;
                Ok(())
            }
        }
    }
}

/// Returns the raw text prefixed with the history length it saw.
pub struct FakeRewriter {
    pub behavior: Behavior,
    pub seen_history_lens: Mutex<Vec<usize>>,
}

impl FakeRewriter {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            seen_history_lens: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl QueryRewriter for FakeRewriter {
    async fn rewrite(&self, history: &Transcript, user_text: &str) -> AppResult<String> {
        self.seen_history_lens.lock().unwrap().push(history.len());
        self.behavior
            .apply(AppError::Generation("rewrite model down".to_string()))
            .await?;
        Ok(format!("[{}] {}", history.len(), user_text))
    }
}

/// Returns a fixed list of documents.
pub struct FakeRetriever {
    pub behavior: Behavior,
    pub documents: Vec<Document>,
}

impl FakeRetriever {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            documents: vec![Document::new("Great battery life, lasts two days", "PhoneX")],
        }
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, _query: &str) -> AppResult<RetrievalResult> {
        self.behavior
            .apply(AppError::Index("collection 'vector_one' missing".to_string()))
            .await?;
        Ok(RetrievalResult::new(
            self.documents
                .iter()
                .cloned()
                .map(|document| ScoredDocument {
                    document,
                    score: 0.9,
                })
                .collect(),
        ))
    }
}

/// Answers "answer: <query>".
pub struct FakeSynthesizer {
    pub behavior: Behavior,
}

#[async_trait]
impl AnswerSynthesizer for FakeSynthesizer {
    async fn synthesize(
        &self,
        _documents: &RetrievalResult,
        query: &str,
        _history: &Transcript,
    ) -> AppResult<String> {
        self.behavior
            .apply(AppError::Generation("answer model down".to_string()))
            .await?;
        Ok(format!("answer: {}", query))
    }
}

/// Answers only once `parties` calls are inside `synthesize` at the same time.
pub struct RendezvousSynthesizer {
    barrier: Barrier,
}

impl RendezvousSynthesizer {
    pub fn new(parties: usize) -> Self {
        Self {
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl AnswerSynthesizer for RendezvousSynthesizer {
    async fn synthesize(
        &self,
        _documents: &RetrievalResult,
        query: &str,
        _history: &Transcript,
    ) -> AppResult<String> {
        self.barrier.wait().await;
        Ok(format!("answer: {}", query))
    }
}

/// Stage behaviors for one orchestrator under test.
pub struct Stages {
    pub rewrite: Behavior,
    pub retrieve: Behavior,
    pub synthesize: Behavior,
}

impl Default for Stages {
    fn default() -> Self {
        Self {
            rewrite: Behavior::Succeed,
            retrieve: Behavior::Succeed,
            synthesize: Behavior::Succeed,
        }
    }
}

pub struct Harness {
    pub orchestrator: ConversationOrchestrator,
    pub rewriter: Arc<FakeRewriter>,
    pub history: Arc<SessionHistoryStore>,
}

pub fn harness(stages: Stages) -> Harness {
    harness_with_history(stages, Arc::new(SessionHistoryStore::in_memory()))
}

pub fn harness_with_history(stages: Stages, history: Arc<SessionHistoryStore>) -> Harness {
    let rewriter = Arc::new(FakeRewriter::new(stages.rewrite));
    let orchestrator = ConversationOrchestrator::new(
        Arc::clone(&history),
        rewriter.clone(),
        Arc::new(FakeRetriever::new(stages.retrieve)),
        Arc::new(FakeSynthesizer {
            behavior: stages.synthesize,
        }),
    )
    .with_stage_timeout(Duration::from_millis(100));

    Harness {
        orchestrator,
        rewriter,
        history,
    }
}

/// Chat model that pops scripted replies in order and records requests.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Generation("script exhausted".to_string()))?;
        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}
