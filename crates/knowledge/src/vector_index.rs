//! Vector index abstraction.
//!
//! Stores `(id, vector, metadata)` triples and answers similarity queries
//! with ranked `(id, score, metadata)` results.

use crate::index::SqliteIndex;
use crate::pinecone::PineconeIndex;
use crate::types::{IndexStats, IndexedVector, QueryMatch};
use ragline_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Trait for vector index backends.
///
/// Query-path failures are [`AppError::RetrievalFailed`]; write-path
/// failures are [`AppError::Knowledge`].
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name ("sqlite", "pinecone")
    fn backend_name(&self) -> &str;

    /// The `top_k` nearest vectors, ordered by descending similarity.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> AppResult<Vec<QueryMatch>>;

    /// Insert or replace vectors by id. Returns the number written.
    async fn upsert(&self, vectors: &[IndexedVector]) -> AppResult<usize>;

    async fn delete(&self, ids: &[String]) -> AppResult<()>;

    /// Remove every vector.
    async fn reset(&self) -> AppResult<()>;

    async fn stats(&self) -> AppResult<IndexStats>;
}

/// Open the index backend named in configuration.
pub fn create_index(config: &AppConfig) -> AppResult<Arc<dyn VectorIndex>> {
    match config.index.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteIndex::open(&config.index_path())?)),
        "pinecone" => {
            let host = config.index.host.as_deref().ok_or_else(|| {
                AppError::Config("Pinecone backend requires index.host".to_string())
            })?;
            let api_key = config.resolve_index_api_key().ok_or_else(|| {
                AppError::Config(format!(
                    "Pinecone API key not found. Set {}",
                    config.index.api_key_env
                ))
            })?;
            Ok(Arc::new(PineconeIndex::new(
                host,
                api_key,
                config.index.namespace.clone(),
            )?))
        }
        other => Err(AppError::Config(format!(
            "Unknown index backend: '{}'. Supported backends: sqlite, pinecone",
            other
        ))),
    }
}
