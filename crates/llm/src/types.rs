//! Provider identification.

use crate::providers::ollama::DEFAULT_OLLAMA_URL;
use crate::providers::openai::{OPENAI_BASE_URL, OPENROUTER_BASE_URL};

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenRouter,
    OpenAI,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openrouter" => Some(Self::OpenRouter),
            "openai" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }

    /// Base URL used when the configuration does not name one.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenRouter => OPENROUTER_BASE_URL,
            Self::OpenAI => OPENAI_BASE_URL,
            Self::Ollama => DEFAULT_OLLAMA_URL,
        }
    }
}
