//! RAG request and response types.

use crate::types::{Metadata, QueryMatch};
use ragline_core::RagSettings;
use serde::{Deserialize, Serialize};

/// The one sanctioned answer that does not come from the model.
pub const NO_INFORMATION_ANSWER: &str = "I couldn't find relevant information to answer your question. Please try rephrasing your query.";

/// A chunk accepted by retrieval for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub url: String,

    /// Cosine similarity reported by the index
    pub score: f32,

    pub metadata: Metadata,
}

impl RetrievedChunk {
    pub fn from_match(m: QueryMatch) -> Self {
        Self {
            text: m.metadata_str("text").to_string(),
            url: m.metadata_str("url").to_string(),
            score: m.score,
            metadata: m.metadata,
        }
    }

    /// Document title, when the indexed metadata carries a non-empty one.
    pub fn title(&self) -> Option<&str> {
        self.metadata
            .get("title")
            .and_then(|v| v.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

/// A citation attached to an answer.
///
/// Unique by `url` within one response and ordered by descending score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// At most `snippetLength` characters, ending in "..." when cut
    pub snippet: String,

    /// Internal: ranking score, not part of the response contract
    #[serde(skip_serializing, default)]
    pub score: f32,
}

/// Answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Source>,

    /// Number of chunks the answer was grounded on
    pub context_chunks: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl RagResponse {
    /// The zero-context answer. Never used when the model fails.
    pub fn no_information(conversation_id: Option<String>) -> Self {
        Self {
            answer: NO_INFORMATION_ANSWER.to_string(),
            sources: Vec::new(),
            context_chunks: 0,
            conversation_id,
        }
    }

    pub fn is_no_information(&self) -> bool {
        self.context_chunks == 0 && self.answer == NO_INFORMATION_ANSWER
    }
}

/// Per-query retrieval options.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub top_k: usize,
    pub min_score: f32,
    pub conversation_id: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from_settings(&RagSettings::default())
    }
}

impl QueryOptions {
    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            top_k: settings.top_k,
            min_score: settings.min_score,
            conversation_id: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retrieved_chunk_from_match() {
        let mut metadata = Metadata::new();
        metadata.insert("url".to_string(), json!("https://it.x.edu/wifi"));
        metadata.insert("text".to_string(), json!("Connect to eduroam."));
        metadata.insert("title".to_string(), json!("  "));

        let chunk = RetrievedChunk::from_match(QueryMatch {
            id: "a".to_string(),
            score: 0.8,
            metadata,
        });

        assert_eq!(chunk.url, "https://it.x.edu/wifi");
        assert_eq!(chunk.text, "Connect to eduroam.");
        assert_eq!(chunk.title(), None);
    }

    #[test]
    fn test_source_score_not_serialized() {
        let source = Source {
            url: "https://x.edu".to_string(),
            title: None,
            snippet: "snippet".to_string(),
            score: 0.9,
        };
        let json = serde_json::to_value(&source).unwrap();
        assert!(json.get("score").is_none());
        assert!(json.get("title").is_none());
        assert_eq!(json["url"], "https://x.edu");
    }

    #[test]
    fn test_no_information_response() {
        let response = RagResponse::no_information(Some("c1".to_string()));
        assert!(response.is_no_information());
        assert!(response.sources.is_empty());
        assert_eq!(response.context_chunks, 0);
    }

    #[test]
    fn test_query_options_builder() {
        let options = QueryOptions::default()
            .with_top_k(3)
            .with_min_score(0.5)
            .with_conversation("abc");
        assert_eq!(options.top_k, 3);
        assert_eq!(options.min_score, 0.5);
        assert_eq!(options.conversation_id.as_deref(), Some("abc"));
        assert_eq!(QueryOptions::default().top_k, 5);
    }
}
