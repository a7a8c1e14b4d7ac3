//! Retrieval-augmented question answering over a vector index.
//!
//! The serving path lives in [`rag`]: a query is embedded, matched against
//! the [`VectorIndex`], filtered, assembled into context and answered by a
//! language model, with per-conversation history from
//! [`ConversationManager`]. [`ingest`] is the offline write path that fills
//! the index.

pub mod chunker;
pub mod conversation;
pub mod embeddings;
pub mod health;
pub mod index;
pub mod ingest;
pub mod parser;
pub mod pinecone;
pub mod progress;
pub mod rag;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use chunker::TextChunker;
pub use conversation::{
    ConversationManager, ConversationMessage, ConversationSummary, Role, TrimOutcome, TurnGuard,
};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use health::{check_health, HealthReport, HealthStatus};
pub use index::SqliteIndex;
pub use ingest::Ingestor;
pub use pinecone::PineconeIndex;
pub use progress::{Phase, ProgressEvent, ProgressReporter};
pub use rag::{QueryOptions, RagEngine, RagResponse, RetrievedChunk, Source};
pub use types::{
    Chunk, IndexStats, IndexedVector, IngestOptions, IngestStats, Metadata, QueryMatch,
    SourceDocument,
};
pub use vector_index::{create_index, VectorIndex};
