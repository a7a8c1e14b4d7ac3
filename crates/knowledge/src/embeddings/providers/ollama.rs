//! Ollama embedding provider.
//!
//! Calls the local Ollama runtime's batch embedding endpoint
//! (`POST /api/embed`) with a model such as `nomic-embed-text`.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use ragline_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBED_ENDPOINT: &str = "/api/embed";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider. No request is made until the first embedding.
    pub fn new(endpoint: Option<&str>, model: String, dimensions: usize) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::EmbeddingUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = endpoint
            .unwrap_or(DEFAULT_OLLAMA_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            model,
            dimensions,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe the runtime with a one-word embedding and check its dimension.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn verify_connection(&self) -> AppResult<()> {
        debug!("Verifying Ollama connection at {}", self.base_url);
        self.embed("ping").await.map(|_| ()).map_err(|e| {
            AppError::EmbeddingUnavailable(format!(
                "Ollama not available at {} ({}). Ensure Ollama is running and run: ollama pull {}",
                self.base_url, e, self.model
            ))
        })
    }

    fn parse_response(&self, body: &str, expected: usize) -> AppResult<Vec<Vec<f32>>> {
        let parsed: EmbedResponse = serde_json::from_str(body).map_err(|e| {
            AppError::EmbeddingUnavailable(format!("Failed to parse Ollama response: {}", e))
        })?;

        if parsed.embeddings.len() != expected {
            return Err(AppError::EmbeddingUnavailable(format!(
                "Ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                expected
            )));
        }

        if let Some(bad) = parsed
            .embeddings
            .iter()
            .find(|e| e.len() != self.dimensions)
        {
            return Err(AppError::EmbeddingUnavailable(format!(
                "Unexpected embedding dimensions: got {}, expected {}",
                bad.len(),
                self.dimensions
            )));
        }

        Ok(parsed.embeddings)
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::EmbeddingUnavailable(format!("Failed to send request to Ollama: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::EmbeddingUnavailable(format!("Failed to read Ollama response: {}", e))
        })?;

        if !status.is_success() {
            return Err(AppError::EmbeddingUnavailable(format!(
                "Ollama API error ({}): {}",
                status,
                error_message(&body)
            )));
        }

        let embeddings = self.parse_response(&body, texts.len())?;
        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}
