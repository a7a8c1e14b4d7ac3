//! Ragline Core Library
//!
//! Foundational pieces shared by every ragline crate:
//! - Error taxonomy (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration loading (`.ragline/config.yaml` + environment)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{
    AppConfig, ChunkingSettings, ConversationSettings, EmbeddingSettings, IndexSettings,
    RagSettings, MAX_TOP_K,
};
pub use error::{AppError, AppResult, AI_UNAVAILABLE_MESSAGE};
