//! Pinecone vector index over its data-plane REST API.

use crate::types::{IndexStats, IndexedVector, Metadata, QueryMatch};
use crate::vector_index::VectorIndex;
use ragline_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::instrument;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for one Pinecone index host.
pub struct PineconeIndex {
    host: String,
    api_key: String,
    namespace: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexedVector],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResponse {
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    index_fullness: Option<f32>,
    #[serde(default)]
    namespaces: HashMap<String, NamespaceSummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}

impl PineconeIndex {
    /// Create a client. `host` is the index's data-plane URL.
    pub fn new(
        host: &str,
        api_key: impl Into<String>,
        namespace: Option<String>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let host = host.trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            host,
            api_key: api_key.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// POST a JSON body and decode the JSON reply. `fail` picks the error variant.
    async fn post<B, R>(&self, path: &str, body: &B, fail: fn(String) -> AppError) -> AppResult<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| fail(format!("Pinecone request to {} failed: {}", path, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| fail(format!("Failed to read Pinecone response: {}", e)))?;

        if !status.is_success() {
            return Err(fail(format!("Pinecone {} returned {}: {}", path, status, text)));
        }

        parse_body(&text, fail)
    }
}

fn parse_body<R: DeserializeOwned>(text: &str, fail: fn(String) -> AppError) -> AppResult<R> {
    // Some endpoints answer with an empty body on success
    let text = if text.trim().is_empty() { "{}" } else { text };
    serde_json::from_str(text).map_err(|e| fail(format!("Malformed Pinecone response: {}", e)))
}

fn into_stats(response: DescribeStatsResponse) -> IndexStats {
    IndexStats {
        backend: "pinecone".to_string(),
        total_vector_count: response.total_vector_count,
        dimension: response.dimension,
        index_fullness: response.index_fullness,
        namespaces: response
            .namespaces
            .into_iter()
            .map(|(name, summary)| (name, summary.vector_count))
            .collect::<BTreeMap<_, _>>(),
    }
}

#[async_trait::async_trait]
impl VectorIndex for PineconeIndex {
    fn backend_name(&self) -> &str {
        "pinecone"
    }

    #[instrument(skip(self, vector))]
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> AppResult<Vec<QueryMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            namespace: self.namespace.as_deref(),
        };
        let response: QueryResponse = self
            .post("/query", &request, AppError::RetrievalFailed)
            .await?;
        Ok(response.matches)
    }

    #[instrument(skip(self, vectors), fields(count = vectors.len()))]
    async fn upsert(&self, vectors: &[IndexedVector]) -> AppResult<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors,
            namespace: self.namespace.as_deref(),
        };
        let response: UpsertResponse = self
            .post("/vectors/upsert", &request, AppError::Knowledge)
            .await?;
        Ok(response.upserted_count)
    }

    async fn delete(&self, ids: &[String]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let body = json!({ "ids": ids, "namespace": self.namespace.as_deref().unwrap_or("") });
        let _: Metadata = self
            .post("/vectors/delete", &body, AppError::Knowledge)
            .await?;
        Ok(())
    }

    async fn reset(&self) -> AppResult<()> {
        let body = json!({ "deleteAll": true, "namespace": self.namespace.as_deref().unwrap_or("") });
        let _: Metadata = self
            .post("/vectors/delete", &body, AppError::Knowledge)
            .await?;
        tracing::info!("Reset Pinecone namespace");
        Ok(())
    }

    async fn stats(&self) -> AppResult<IndexStats> {
        let response: DescribeStatsResponse = self
            .post("/describe_index_stats", &json!({}), AppError::RetrievalFailed)
            .await?;
        Ok(into_stats(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_normalization() {
        let index = PineconeIndex::new("my-index-abc.svc.pinecone.io/", "k", None).unwrap();
        assert_eq!(index.url("/query"), "https://my-index-abc.svc.pinecone.io/query");

        let local = PineconeIndex::new("http://localhost:5080", "k", Some(String::new())).unwrap();
        assert_eq!(local.url("/query"), "http://localhost:5080/query");
        assert!(local.namespace.is_none());
    }

    #[test]
    fn test_query_request_shape() {
        let json = serde_json::to_value(QueryRequest {
            vector: &[0.1, 0.2],
            top_k: 10,
            include_metadata: true,
            namespace: Some("helpdesk"),
        })
        .unwrap();

        assert_eq!(json["topK"], 10);
        assert_eq!(json["includeMetadata"], true);
        assert_eq!(json["namespace"], "helpdesk");
    }

    #[test]
    fn test_parse_query_response() {
        let body = r#"{
            "matches": [
                {"id": "a_0_x", "score": 0.91, "metadata": {"url": "https://it.x.edu/vpn", "text": "VPN setup"}},
                {"id": "b_0_y", "score": 0.42}
            ],
            "namespace": ""
        }"#;

        let response: QueryResponse = parse_body(body, AppError::RetrievalFailed).unwrap();
        assert_eq!(response.matches.len(), 2);
        assert_eq!(response.matches[0].metadata_str("url"), "https://it.x.edu/vpn");
        assert!(response.matches[1].metadata.is_empty());
    }

    #[test]
    fn test_malformed_response_is_retrieval_failure() {
        let result: AppResult<QueryResponse> =
            parse_body(r#"{"matches": "nope"}"#, AppError::RetrievalFailed);
        assert!(matches!(result, Err(AppError::RetrievalFailed(_))));
    }

    #[test]
    fn test_empty_body_is_accepted() {
        let parsed: Metadata = parse_body("", AppError::Knowledge).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_stats_conversion() {
        let body = r#"{
            "dimension": 384,
            "indexFullness": 0.1,
            "totalVectorCount": 1200,
            "namespaces": {"": {"vectorCount": 1000}, "staff": {"vectorCount": 200}}
        }"#;

        let response: DescribeStatsResponse = parse_body(body, AppError::RetrievalFailed).unwrap();
        let stats = into_stats(response);
        assert_eq!(stats.backend, "pinecone");
        assert_eq!(stats.total_vector_count, 1200);
        assert_eq!(stats.dimension, Some(384));
        assert_eq!(stats.namespaces["staff"], 200);
    }

    #[test]
    fn test_upsert_request_shape() {
        let mut metadata = Metadata::new();
        metadata.insert("url".to_string(), json!("https://x.edu"));
        let vectors = vec![IndexedVector {
            id: "abc_0_def".to_string(),
            values: vec![0.5],
            metadata,
        }];

        let json = serde_json::to_value(UpsertRequest {
            vectors: &vectors,
            namespace: None,
        })
        .unwrap();
        assert_eq!(json["vectors"][0]["id"], "abc_0_def");
        assert_eq!(json["vectors"][0]["values"][0], 0.5);
        assert!(json.get("namespace").is_none());
    }
}
