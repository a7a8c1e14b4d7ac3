//! Concrete embedding bindings.

pub mod ollama;
pub mod trigram;

pub use ollama::OllamaProvider;
pub use trigram::TrigramProvider;
