//! Error types for reviewqa.
//!
//! A single error enum covers every failure surface of the workspace. The
//! per-request kinds (`Embedding`, `Generation`, `Index`) are what a failed
//! conversation turn reports; `Config` is fatal at startup.

use thiserror::Error;

/// Unified error type for reviewqa.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid settings; raised before any traffic is served
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding service unreachable, rate-limited, or returned malformed output
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Chat-completion service failure (rewrite or answer stage)
    #[error("Generation error: {0}")]
    Generation(String),

    /// Vector index unreachable or collection missing
    #[error("Index error: {0}")]
    Index(String),

    /// Conversation history backing failure
    #[error("History error: {0}")]
    History(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Rejected caller input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Stable short label for the error kind, used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration",
            AppError::Io(_) => "io",
            AppError::Embedding(_) => "embedding",
            AppError::Generation(_) => "generation",
            AppError::Index(_) => "index",
            AppError::History(_) => "history",
            AppError::Prompt(_) => "prompt",
            AppError::Input(_) => "input",
            AppError::Serialization(_) => "serialization",
            AppError::Other(_) => "other",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::Generation("quota exceeded".to_string());
        assert_eq!(err.to_string(), "Generation error: quota exceeded");

        let err = AppError::Index("collection 'vector_one' not found".to_string());
        assert_eq!(
            err.to_string(),
            "Index error: collection 'vector_one' not found"
        );
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(AppError::Embedding(String::new()).kind(), "embedding");
        assert_eq!(AppError::Generation(String::new()).kind(), "generation");
        assert_eq!(AppError::Index(String::new()).kind(), "index");
        assert_eq!(AppError::Config(String::new()).kind(), "configuration");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AppError = parse_err.into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
