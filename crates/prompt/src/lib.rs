//! Prompt system for ragline.
//!
//! Grounded-answer prompts are YAML definitions rendered with Handlebars:
//! - A built-in default (`rag.answer`)
//! - Optional workspace overrides in `.ragline/prompts/<id>.yml`
//! - `query` / `context` / behavior variables injected at render time

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, build_rag_prompt};
pub use defaults::{default_rag_prompt, DEFAULT_RAG_PROMPT_ID};
pub use loader::{list_prompts, load_prompt, load_prompt_or_default};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec};
