//! Configuration management for reviewqa.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - `.env` in the workspace (never overrides variables already set)
//! - Config file (`.reviewqa/config.yaml` or `REVIEWQA_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Credentials are never stored in the config file; sections name the
//! environment variable that holds them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".reviewqa";

/// Chat-completion providers the factory knows how to build.
pub const CHAT_PROVIDERS: [&str; 3] = ["openrouter", "openai", "ollama"];

/// Embedding providers the factory knows how to build.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["huggingface", "ollama", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .reviewqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit JSON log lines
    pub json_logs: bool,

    /// Chat-completion model used by the rewrite and answer stages
    pub chat: ChatModelConfig,

    /// Embedding model used for queries (and by ingestion)
    pub embedding: EmbeddingModelConfig,

    /// Retrieval settings
    pub retrieval: RetrievalConfig,

    /// Conversation pipeline settings
    pub pipeline: PipelineConfig,

    /// Conversation history backing
    pub history: HistoryConfig,
}

/// Chat-completion model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatModelConfig {
    /// Provider id ("openrouter", "openai", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Base URL override; the provider default (OpenRouter for "openrouter") otherwise
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Optional completion length cap
    pub max_tokens: Option<u32>,
}

impl Default for ChatModelConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: "openrouter/free".to_string(),
            endpoint: None,
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            temperature: 0.4,
            max_tokens: None,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingModelConfig {
    /// Provider id ("huggingface", "ollama", "mock")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Base URL override
    pub endpoint: Option<String>,

    /// Environment variable holding the API token
    pub api_key_env: String,

    /// Expected vector dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingModelConfig {
    fn default() -> Self {
        Self {
            provider: "huggingface".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            endpoint: None,
            api_key_env: "HF_TOKEN".to_string(),
            dimensions: 384,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Number of documents returned per query
    pub top_k: usize,

    /// Collection (namespace) in the vector index
    pub collection: String,

    /// Index database path, relative to the workspace when not absolute
    pub index_path: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            collection: "vector_one".to_string(),
            index_path: None,
        }
    }
}

/// Conversation pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Upper bound for each remote stage (rewrite, retrieve, answer)
    pub stage_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 60,
        }
    }
}

/// Which store keeps conversation transcripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackendKind {
    /// Process memory; lost at exit
    #[default]
    Memory,
    /// SQLite file under the state directory
    Sqlite,
}

/// Conversation history settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    pub backend: HistoryBackendKind,

    /// SQLite path, relative to the workspace when not absolute
    pub path: Option<PathBuf>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    chat: Option<ChatModelConfig>,
    embedding: Option<EmbeddingModelConfig>,
    retrieval: Option<RetrievalConfig>,
    pipeline: Option<PipelineConfig>,
    history: Option<HistoryConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

/// Command-line values that take precedence over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub top_k: Option<usize>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
            chat: ChatModelConfig::default(),
            embedding: EmbeddingModelConfig::default(),
            retrieval: RetrievalConfig::default(),
            pipeline: PipelineConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the current directory and environment.
    ///
    /// Environment variables:
    /// - `REVIEWQA_WORKSPACE`: Override workspace path
    /// - `REVIEWQA_CONFIG`: Path to config file
    /// - `REVIEWQA_PROVIDER`: Chat provider
    /// - `REVIEWQA_MODEL`: Chat model identifier
    /// - `REVIEWQA_TOP_K`: Retrieval depth
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration for an explicit workspace and/or config file.
    ///
    /// `None` falls back to `REVIEWQA_WORKSPACE` / `REVIEWQA_CONFIG`, then to
    /// the current directory and `.reviewqa/config.yaml`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace
            .or_else(|| std::env::var("REVIEWQA_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("REVIEWQA_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        config.load_dotenv()?;

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.state_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override the config file
        if let Ok(provider) = std::env::var("REVIEWQA_PROVIDER") {
            config.chat.provider = provider;
        }

        if let Ok(model) = std::env::var("REVIEWQA_MODEL") {
            config.chat.model = model;
        }

        if let Ok(top_k) = std::env::var("REVIEWQA_TOP_K") {
            config.retrieval.top_k = top_k.trim().parse().map_err(|_| {
                AppError::Config(format!("REVIEWQA_TOP_K is not a number: {}", top_k))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Load `<workspace>/.env` into the process environment if present.
    fn load_dotenv(&self) -> AppResult<()> {
        let env_path = self.workspace.join(".env");
        if !env_path.exists() {
            return Ok(());
        }

        dotenvy::from_path(&env_path)
            .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", env_path, e)))?;

        tracing::debug!("Loaded environment from {:?}", env_path);
        Ok(())
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(chat) = config_file.chat {
            result.chat = chat;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(pipeline) = config_file.pipeline {
            result.pipeline = pipeline;
        }
        if let Some(history) = config_file.history {
            result.history = history;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.json_logs = json;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(provider) = overrides.provider {
            self.chat.provider = provider;
        }

        if let Some(model) = overrides.model {
            self.chat.model = model;
        }

        if let Some(top_k) = overrides.top_k {
            self.retrieval.top_k = top_k;
        }

        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        if overrides.json_logs {
            self.json_logs = true;
        }

        self
    }

    /// Get the path to the .reviewqa directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .reviewqa directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Path of the SQLite vector index.
    pub fn index_path(&self) -> PathBuf {
        match self.retrieval.index_path {
            Some(ref path) => self.resolve_path(path),
            None => self.state_dir().join("index.sqlite"),
        }
    }

    /// Path of the SQLite history store.
    pub fn history_path(&self) -> PathBuf {
        match self.history.path {
            Some(ref path) => self.resolve_path(path),
            None => self.state_dir().join("history.sqlite"),
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// API key for the chat provider, if its environment variable is set.
    pub fn chat_api_key(&self) -> Option<String> {
        resolve_secret(&self.chat.api_key_env)
    }

    /// API token for the embedding provider, if its environment variable is set.
    pub fn embedding_api_key(&self) -> Option<String> {
        resolve_secret(&self.embedding.api_key_env)
    }

    /// Validate the configuration before any client is built.
    ///
    /// A failure here must stop the process from serving traffic.
    pub fn validate(&self) -> AppResult<()> {
        self.validate_chat()?;
        self.validate_knowledge()?;

        if self.pipeline.stage_timeout_secs == 0 {
            return Err(AppError::Config(
                "Pipeline stageTimeoutSecs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_chat(&self) -> AppResult<()> {
        let chat_provider = self.chat.provider.to_lowercase();
        if !CHAT_PROVIDERS.contains(&chat_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown chat provider: {}. Supported: {}",
                self.chat.provider,
                CHAT_PROVIDERS.join(", ")
            )));
        }

        if chat_provider != "ollama" && self.chat_api_key().is_none() {
            return Err(AppError::Config(format!(
                "{} is not set. Add {}=<key> to the environment or the workspace .env file",
                self.chat.api_key_env, self.chat.api_key_env
            )));
        }

        if self.chat.model.trim().is_empty() {
            return Err(AppError::Config("Chat model cannot be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(AppError::Config(format!(
                "Chat temperature must be between 0.0 and 2.0, got {}",
                self.chat.temperature
            )));
        }

        Ok(())
    }

    /// Validate the embedding and retrieval sections.
    ///
    /// Ingestion only needs these; it never talks to the chat provider.
    pub fn validate_knowledge(&self) -> AppResult<()> {
        let embedding_provider = self.embedding.provider.to_lowercase();
        if !EMBEDDING_PROVIDERS.contains(&embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if embedding_provider == "huggingface" && self.embedding_api_key().is_none() {
            return Err(AppError::Config(format!(
                "{} is not set. The huggingface embedding provider requires an API token",
                self.embedding.api_key_env
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "Retrieval topK must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.collection.trim().is_empty() {
            return Err(AppError::Config(
                "Retrieval collection cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Read a secret from the named environment variable, ignoring blank values.
fn resolve_secret(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
