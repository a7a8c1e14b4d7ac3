//! Error types for ragline.
//!
//! One enum covers every failure category. The retrieval and generation
//! variants are kept apart so that a boundary layer can always tell a
//! model failure from a retrieval failure and from a genuine answer.

use thiserror::Error;

/// Message shown to end users when the language model cannot produce an answer.
pub const AI_UNAVAILABLE_MESSAGE: &str = "I'm sorry, but the AI service is currently unavailable. \
Please try again in a few moments. If the problem persists, please contact the IT support team.";

/// Unified error type for ragline.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The embedding provider could not produce a vector
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The vector index was unreachable or answered with garbage
    #[error("Retrieval failed: {0}")]
    RetrievalFailed(String),

    /// No language model is configured, or the provider is down
    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    /// The language model was reached but produced no usable answer
    #[error("LLM generation failed: {0}")]
    LlmGenerationFailed(String),

    /// Ingestion and index write-path errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Caller supplied input the pipeline refuses to process
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// True when the failure means no model-generated answer exists.
    ///
    /// Callers must present [`AI_UNAVAILABLE_MESSAGE`] for these rather than
    /// any substitute content.
    pub fn is_ai_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::LlmUnavailable(_) | AppError::LlmGenerationFailed(_)
        )
    }

    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::EmbeddingUnavailable(_) => "embedding_unavailable",
            AppError::RetrievalFailed(_) => "retrieval_failed",
            AppError::LlmUnavailable(_) => "llm_unavailable",
            AppError::LlmGenerationFailed(_) => "llm_generation_failed",
            AppError::Knowledge(_) => "knowledge",
            AppError::Prompt(_) => "prompt",
            AppError::InvalidRequest(_) => "invalid_request",
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
    fn test_ai_unavailable_classification() {
        assert!(AppError::LlmUnavailable("no key".into()).is_ai_unavailable());
        assert!(AppError::LlmGenerationFailed("timeout".into()).is_ai_unavailable());
        assert!(!AppError::RetrievalFailed("down".into()).is_ai_unavailable());
        assert!(!AppError::EmbeddingUnavailable("down".into()).is_ai_unavailable());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(AppError::RetrievalFailed("x".into()).kind(), "retrieval_failed");
        assert_eq!(AppError::InvalidRequest("x".into()).kind(), "invalid_request");
    }

    #[test]
    fn test_from_serde_json() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Serialization(_)));
    }
}
