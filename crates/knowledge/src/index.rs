//! SQLite-backed vector index with brute-force cosine search.

use crate::types::{IndexStats, IndexedVector, Metadata, QueryMatch};
use crate::vector_index::VectorIndex;
use ragline_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Local vector index in a single SQLite file.
///
/// Embeddings are little-endian f32 BLOBs; metadata is JSON text.
#[derive(Debug)]
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open (or create) the index at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        let index = Self::init(conn)?;
        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Ok(index)
    }

    /// Index held entirely in memory.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vectors (
                id TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> AppResult<Vec<QueryMatch>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, embedding, metadata FROM vectors")
            .map_err(|e| AppError::RetrievalFailed(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| AppError::RetrievalFailed(format!("Failed to query vectors: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, blob, metadata_json) = row
                .map_err(|e| AppError::RetrievalFailed(format!("Failed to read row: {}", e)))?;
            let embedding = bytes_to_embedding(&blob).map_err(|e| {
                AppError::RetrievalFailed(format!("Corrupt embedding for '{}': {}", id, e))
            })?;
            if embedding.len() != query.len() {
                return Err(AppError::RetrievalFailed(format!(
                    "Dimension mismatch for '{}': index has {}, query has {}",
                    id,
                    embedding.len(),
                    query.len()
                )));
            }

            let metadata = if include_metadata {
                serde_json::from_str::<Metadata>(&metadata_json).map_err(|e| {
                    AppError::RetrievalFailed(format!("Corrupt metadata for '{}': {}", id, e))
                })?
            } else {
                Metadata::new()
            };

            results.push(QueryMatch {
                score: cosine_similarity(query, &embedding),
                id,
                metadata,
            });
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        tracing::debug!("Retrieved {} vectors (requested top-{})", results.len(), top_k);
        Ok(results)
    }

    fn write(&self, vectors: &[IndexedVector]) -> AppResult<usize> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO vectors (id, embedding, metadata) VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| AppError::Knowledge(format!("Failed to prepare upsert: {}", e)))?;

            for vector in vectors {
                let metadata_json = serde_json::to_string(&vector.metadata)?;
                stmt.execute(params![
                    vector.id,
                    embedding_to_bytes(&vector.values),
                    metadata_json
                ])
                .map_err(|e| {
                    AppError::Knowledge(format!("Failed to upsert vector '{}': {}", vector.id, e))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit upsert: {}", e)))?;
        Ok(vectors.len())
    }

    fn count_and_dimension(&self) -> AppResult<(u64, Option<usize>)> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))
            .map_err(|e| AppError::RetrievalFailed(format!("Failed to count vectors: {}", e)))?;

        let dimension = if count > 0 {
            let len: i64 = conn
                .query_row("SELECT length(embedding) FROM vectors LIMIT 1", [], |row| {
                    row.get(0)
                })
                .map_err(|e| {
                    AppError::RetrievalFailed(format!("Failed to read dimension: {}", e))
                })?;
            Some(len as usize / 4)
        } else {
            None
        };

        Ok((count as u64, dimension))
    }
}

#[async_trait::async_trait]
impl VectorIndex for SqliteIndex {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> AppResult<Vec<QueryMatch>> {
        self.search(vector, top_k, include_metadata)
    }

    async fn upsert(&self, vectors: &[IndexedVector]) -> AppResult<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }
        self.write(vectors)
    }

    async fn delete(&self, ids: &[String]) -> AppResult<()> {
        let conn = self.conn();
        for id in ids {
            conn.execute("DELETE FROM vectors WHERE id = ?1", params![id])
                .map_err(|e| AppError::Knowledge(format!("Failed to delete '{}': {}", id, e)))?;
        }
        Ok(())
    }

    async fn reset(&self) -> AppResult<()> {
        self.conn()
            .execute("DELETE FROM vectors", [])
            .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;
        tracing::info!("Reset SQLite index");
        Ok(())
    }

    async fn stats(&self) -> AppResult<IndexStats> {
        let (total_vector_count, dimension) = self.count_and_dimension()?;
        Ok(IndexStats {
            backend: "sqlite".to_string(),
            total_vector_count,
            dimension,
            ..IndexStats::default()
        })
    }
}

/// Convert an embedding to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert stored bytes back to an embedding.
fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>, String> {
    if bytes.len() % 4 != 0 {
        return Err(format!("length {} is not a multiple of 4", bytes.len()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
