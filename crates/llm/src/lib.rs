//! Chat-completion integration crate for reviewqa.
//!
//! Provider-agnostic access to chat models behind the [`LlmClient`] trait.
//!
//! # Providers
//! - **OpenRouter** / **OpenAI**: OpenAI-compatible `/chat/completions`
//! - **Ollama**: local runtime via `/api/chat`
//!
//! # Example
//! ```no_run
//! use reviewqa_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("And the camera?", "llama3.2")
//!     .with_system("Rewrite the question so it stands alone")
//!     .with_history(vec![ChatMessage::user("How is the battery on PhoneX?")]);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiCompatibleClient};
pub use types::ProviderType;
