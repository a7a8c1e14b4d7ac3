//! Shared data model: chunks, indexed vectors, index query results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Free-form metadata attached to chunks and vectors.
pub type Metadata = Map<String, Value>;

/// A bounded segment of one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Segment text, including any overlap padding
    pub text: String,

    /// `chunk_index`, `total_chunks` plus caller-supplied fields
    pub metadata: Metadata,
}

impl Chunk {
    /// Position of this chunk within its document.
    pub fn index(&self) -> Option<u64> {
        self.metadata.get("chunk_index").and_then(Value::as_u64)
    }
}

/// A stored embedding with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedVector {
    /// Stable, content-derived identifier
    pub id: String,

    pub values: Vec<f32>,

    /// Carries at least `url` and `text`
    pub metadata: Metadata,
}

/// One ranked result from a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

impl QueryMatch {
    /// String-valued metadata field, empty when absent.
    pub fn metadata_str(&self, key: &str) -> &str {
        self.metadata.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

/// Index statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Backend that produced the stats ("sqlite", "pinecone")
    pub backend: String,

    pub total_vector_count: u64,

    /// Vector dimension; unknown for an empty local index
    pub dimension: Option<usize>,

    /// Fraction of capacity used, where the backend reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_fullness: Option<f32>,

    /// Vector count per namespace
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespaces: BTreeMap<String, u64>,
}

/// A document ready to be chunked and indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub url: String,
    pub text: String,
    #[serde(default)]
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Options for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Files or directories to ingest
    pub paths: Vec<std::path::PathBuf>,

    /// Clear the index first
    pub reset: bool,

    /// Vectors per upsert request
    pub batch_size: usize,

    /// Path substrings a file must contain (any); empty means all
    pub include: Vec<String>,

    /// Path substrings that exclude a file
    pub exclude: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            reset: false,
            batch_size: 100,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    pub documents_count: u32,
    pub skipped_documents: u32,
    pub chunks_count: u32,
    pub vectors_upserted: u64,
    pub batches: u32,
    pub bytes_processed: u64,
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_match_metadata_str() {
        let mut metadata = Metadata::new();
        metadata.insert("url".to_string(), Value::from("https://it.example.edu/vpn"));
        metadata.insert("depth".to_string(), Value::from(2));
        let m = QueryMatch {
            id: "a".to_string(),
            score: 0.8,
            metadata,
        };

        assert_eq!(m.metadata_str("url"), "https://it.example.edu/vpn");
        assert_eq!(m.metadata_str("depth"), "");
        assert_eq!(m.metadata_str("missing"), "");
    }

    #[test]
    fn test_source_document_defaults() {
        let doc: SourceDocument =
            serde_json::from_str(r#"{"url": "https://x.edu", "text": "hello"}"#).unwrap();
        assert_eq!(doc.depth, 0);
        assert!(doc.title.is_none());
    }
}
