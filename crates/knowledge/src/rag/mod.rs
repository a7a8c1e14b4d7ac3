//! Retrieval-augmented answering.
//!
//! Embeds a query, searches the vector index, filters and ranks what comes
//! back, and asks the language model for an answer grounded only in that
//! context. Model failures always surface as errors; the single non-model
//! answer is the "nothing relevant found" response.

pub mod context;
pub mod engine;
pub mod sources;
pub mod types;

pub use context::build_context;
pub use engine::RagEngine;
pub use sources::extract_sources;
pub use types::{QueryOptions, RagResponse, RetrievedChunk, Source, NO_INFORMATION_ANSWER};
