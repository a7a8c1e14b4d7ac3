//! In-crate fake capabilities: fixed embedder, scripted index, recording LLM.

use crate::conversation::ConversationManager;
use crate::embeddings::EmbeddingProvider;
use crate::rag::RagEngine;
use crate::types::{IndexStats, IndexedVector, Metadata, QueryMatch};
use crate::vector_index::VectorIndex;
use ragline_core::{AppError, AppResult, ConversationSettings, RagSettings};
use ragline_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns the same vector for every text, or a scripted failure.
#[derive(Debug)]
pub struct FixedEmbedder {
    pub failure: Option<fn(String) -> AppError>,
}

impl FixedEmbedder {
    pub fn ok() -> Self {
        Self { failure: None }
    }

    pub fn failing(failure: fn(String) -> AppError) -> Self {
        Self {
            failure: Some(failure),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> usize {
        3
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if let Some(failure) = self.failure {
            return Err(failure("embedding backend down".to_string()));
        }
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

/// Returns scripted matches in the given order, truncated to `top_k`.
pub struct ScriptedIndex {
    matches: Vec<QueryMatch>,
    failure: Option<fn(String) -> AppError>,
    pub requested_top_k: Mutex<Vec<usize>>,
}

impl ScriptedIndex {
    pub fn new(matches: Vec<QueryMatch>) -> Self {
        Self {
            matches,
            failure: None,
            requested_top_k: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failure: fn(String) -> AppError) -> Self {
        Self {
            matches: Vec::new(),
            failure: Some(failure),
            requested_top_k: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl VectorIndex for ScriptedIndex {
    fn backend_name(&self) -> &str {
        "scripted"
    }

    async fn query(
        &self,
        _vector: &[f32],
        top_k: usize,
        _include_metadata: bool,
    ) -> AppResult<Vec<QueryMatch>> {
        self.requested_top_k.lock().unwrap().push(top_k);
        if let Some(failure) = self.failure {
            return Err(failure("index unreachable".to_string()));
        }
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn upsert(&self, vectors: &[IndexedVector]) -> AppResult<usize> {
        Ok(vectors.len())
    }

    async fn delete(&self, _ids: &[String]) -> AppResult<()> {
        Ok(())
    }

    async fn reset(&self) -> AppResult<()> {
        Ok(())
    }

    async fn stats(&self) -> AppResult<IndexStats> {
        Ok(IndexStats {
            backend: "scripted".to_string(),
            total_vector_count: self.matches.len() as u64,
            ..IndexStats::default()
        })
    }
}

/// How the recording LLM answers.
#[derive(Clone)]
pub enum Reply {
    /// "Answer for: <question>"
    Echo,
    Text(String),
    Fail(fn(String) -> AppError),
}

/// Records every request and answers according to its script.
pub struct RecordingLlm {
    pub available: bool,
    pub reply: Reply,
    pub delay: Duration,
    pub requests: Mutex<Vec<LlmRequest>>,
    pub calls: AtomicUsize,
}

impl RecordingLlm {
    pub fn new(reply: Reply) -> Self {
        Self {
            available: true,
            reply,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn echo() -> Self {
        Self::new(Reply::Echo)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::echo()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

/// The question line rendered into the user prompt.
pub fn question_of(request: &LlmRequest) -> String {
    request
        .prompt
        .lines()
        .find_map(|line| line.strip_prefix("Question: "))
        .unwrap_or_default()
        .to_string()
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let content = match &self.reply {
            Reply::Echo => format!("Answer for: {}", question_of(request)),
            Reply::Text(text) => text.clone(),
            Reply::Fail(failure) => return Err(failure("provider error".to_string())),
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }
}

/// An index match carrying `url` and `text` metadata.
pub fn hit(url: &str, score: f32, text: &str) -> QueryMatch {
    let mut metadata = Metadata::new();
    metadata.insert("url".to_string(), json!(url));
    metadata.insert("text".to_string(), json!(text));
    QueryMatch {
        id: format!("{}#{}", url, score),
        score,
        metadata,
    }
}

/// Matches for a password question, one of them below the default threshold.
pub fn password_hits() -> Vec<QueryMatch> {
    vec![
        hit(
            "https://it.example.edu/password",
            0.9,
            "Reset your password at the self-service portal using your campus ID.",
        ),
        hit(
            "https://it.example.edu/mfa",
            0.5,
            "Multi-factor authentication is required after every password change.",
        ),
        hit(
            "https://it.example.edu/password",
            0.6,
            "Passwords must be at least twelve characters and expire yearly.",
        ),
        hit(
            "https://it.example.edu/printing",
            0.25,
            "Printing costs ten cents per page on campus printers.",
        ),
    ]
}

pub struct Harness {
    pub engine: Arc<RagEngine>,
    pub index: Arc<ScriptedIndex>,
    pub llm: Arc<RecordingLlm>,
    pub conversations: Arc<ConversationManager>,
}

pub fn harness(matches: Vec<QueryMatch>, llm: RecordingLlm) -> Harness {
    harness_with(matches, llm, RagSettings::default())
}

pub fn harness_with(matches: Vec<QueryMatch>, llm: RecordingLlm, settings: RagSettings) -> Harness {
    let index = Arc::new(ScriptedIndex::new(matches));
    let llm = Arc::new(llm);
    let conversations = Arc::new(ConversationManager::new(&ConversationSettings::default()));
    let llm_capability: Arc<dyn LlmClient> = llm.clone();

    let engine = RagEngine::new(
        Arc::new(FixedEmbedder::ok()),
        index.clone(),
        Some(llm_capability),
        Arc::clone(&conversations),
        settings,
        "test-model",
    );

    Harness {
        engine: Arc::new(engine),
        index,
        llm,
        conversations,
    }
}
