//! Chat-completion client abstraction and request/response types.
//!
//! Every provider receives the same shape of request: a system instruction,
//! the prior conversation as role-tagged messages, and the new user message.

use async_trait::async_trait;
use reviewqa_core::AppResult;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Model identifier (e.g., "openrouter/free", "llama3.2")
    pub model: String,

    /// System instruction placed before the history
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Prior conversation, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,

    /// The message the model must respond to
    pub user: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Create a new request for `model` answering `user`.
    pub fn new(user: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            history: Vec::new(),
            user: user.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the prior conversation.
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Flatten into the message list sent to chat-style APIs:
    /// system instruction, then history, then the user message.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(ref system) = self.system {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(self.user.clone()));
        messages
    }
}

/// Chat-completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: LlmUsage,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for chat-completion providers.
///
/// Implementations are long-lived and shared across requests; they must not
/// keep per-request mutable state. Failures are reported as
/// `AppError::Generation`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama", "openrouter").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_order() {
        let request = LlmRequest::new("And the camera?", "test-model")
            .with_system("Rewrite as a standalone question")
            .with_history(vec![
                ChatMessage::user("How is the battery on PhoneX?"),
                ChatMessage::assistant("It lasts two days."),
            ]);

        let messages = request.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].content, "How is the battery on PhoneX?");
        assert_eq!(messages[2].role, ChatRole::Assistant);
        assert_eq!(messages[3], ChatMessage::user("And the camera?"));
    }

    #[test]
    fn test_messages_without_system() {
        let messages = LlmRequest::new("hi", "m").messages();
        assert_eq!(messages, vec![ChatMessage::user("hi")]);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }

    #[test]
    fn test_usage_totals() {
        let usage = LlmUsage::new(12, 30);
        assert_eq!(usage.total_tokens, 42);
    }
}
