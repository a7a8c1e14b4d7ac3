//! Retrieval and generation orchestration.

use super::context::build_context;
use super::sources::extract_sources;
use super::types::{QueryOptions, RagResponse, RetrievedChunk};
use crate::conversation::ConversationManager;
use crate::embeddings::EmbeddingProvider;
use crate::vector_index::VectorIndex;
use ragline_core::{AppError, AppResult, RagSettings, MAX_TOP_K};
use ragline_llm::{LlmClient, LlmMessage, LlmRequest, SamplingParams};
use ragline_prompt::{build_rag_prompt, default_rag_prompt, PromptDefinition};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Longest query accepted, in characters.
pub const MAX_QUERY_CHARS: usize = 2000;

/// Smallest candidate pool requested from the index.
const MIN_CANDIDATES: usize = 10;

/// Answers questions from the vector index through the language model.
///
/// Every capability is constructed once by the caller and shared by
/// reference. The only mutable state reached from here is the conversation
/// store, and it is only written after a successful generation.
pub struct RagEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Option<Arc<dyn LlmClient>>,
    conversations: Arc<ConversationManager>,
    prompt: PromptDefinition,
    settings: RagSettings,
    model: String,
}

impl RagEngine {
    /// Create an engine. `llm` is `None` when no model is configured.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Option<Arc<dyn LlmClient>>,
        conversations: Arc<ConversationManager>,
        settings: RagSettings,
        model: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            conversations,
            prompt: default_rag_prompt(),
            settings,
            model: model.into(),
        }
    }

    /// Use a workspace prompt instead of the built-in one.
    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub fn conversations(&self) -> &Arc<ConversationManager> {
        &self.conversations
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn llm(&self) -> Option<&Arc<dyn LlmClient>> {
        self.llm.as_ref()
    }

    /// Options for [`RagEngine::query`] seeded from configuration.
    pub fn default_options(&self) -> QueryOptions {
        QueryOptions::from_settings(&self.settings)
    }

    /// Embed `query` and return up to `top_k` relevant chunks.
    ///
    /// Over-fetches `max(top_k * 2, 10)` candidates and walks them in index
    /// rank order, skipping scores below `min_score` and texts shorter than
    /// `minChunkChars`. Accepted chunks keep their rank order.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve_context(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> AppResult<Vec<RetrievedChunk>> {
        let vector = self.embedder.embed(query).await.map_err(|e| match e {
            AppError::EmbeddingUnavailable(_) => e,
            other => AppError::EmbeddingUnavailable(other.to_string()),
        })?;

        let candidates = top_k.saturating_mul(2).max(MIN_CANDIDATES);
        let matches = self
            .index
            .query(&vector, candidates, true)
            .await
            .map_err(|e| match e {
                AppError::RetrievalFailed(_) => e,
                other => AppError::RetrievalFailed(other.to_string()),
            })?;

        let fetched = matches.len();
        let mut accepted = Vec::with_capacity(top_k.min(fetched));
        for m in matches {
            if accepted.len() >= top_k {
                break;
            }
            if m.score < min_score {
                continue;
            }

            let chunk = RetrievedChunk::from_match(m);
            if chunk.text.trim().chars().count() < self.settings.min_chunk_chars {
                continue;
            }
            accepted.push(chunk);
        }

        tracing::debug!(
            "Accepted {} of {} candidates (min_score {:.2})",
            accepted.len(),
            fetched,
            min_score
        );

        Ok(accepted)
    }

    /// Ask the model for an answer grounded in `chunks`.
    ///
    /// With a `conversation_id` the turn is serialized against other turns
    /// on the same conversation, and history is read from the conversation
    /// store unless `history` is given. The question and answer are recorded
    /// only after the model succeeds.
    pub async fn generate_answer(
        &self,
        query: &str,
        chunks: &[RetrievedChunk],
        max_context_length: usize,
        conversation_id: Option<&str>,
        history: Option<Vec<LlmMessage>>,
    ) -> AppResult<RagResponse> {
        let _turn = match conversation_id {
            Some(id) => Some(self.conversations.lock_turn(id).await),
            None => None,
        };
        self.generate(query, chunks, max_context_length, conversation_id, history)
            .await
    }

    /// Retrieve, then generate. Zero retrieved chunks yields the
    /// "no relevant information" response without calling the model.
    #[instrument(skip(self, query, options), fields(conversation_id = ?options.conversation_id))]
    pub async fn query(&self, query: &str, options: &QueryOptions) -> AppResult<RagResponse> {
        let query = validate_query(query)?;
        validate_options(options)?;

        let conversation_id = options.conversation_id.as_deref();
        let _turn = match conversation_id {
            Some(id) => Some(self.conversations.lock_turn(id).await),
            None => None,
        };

        let chunks = self
            .retrieve_context(query, options.top_k, options.min_score)
            .await?;

        if chunks.is_empty() {
            tracing::info!(
                "No chunks above min_score {:.2}; returning no-information answer",
                options.min_score
            );
            return Ok(RagResponse::no_information(
                options.conversation_id.clone(),
            ));
        }

        tracing::info!("Retrieved {} chunks", chunks.len());

        self.generate(
            query,
            &chunks,
            self.settings.max_context_length,
            conversation_id,
            None,
        )
        .await
    }

    fn available_llm(&self) -> AppResult<&Arc<dyn LlmClient>> {
        let llm = self.llm.as_ref().ok_or_else(|| {
            AppError::LlmUnavailable("No language model is configured".to_string())
        })?;

        if !llm.is_available() {
            return Err(AppError::LlmUnavailable(format!(
                "Language model provider '{}' is not available",
                llm.provider_name()
            )));
        }

        Ok(llm)
    }

    /// Generation without taking the turn lock; callers hold it.
    async fn generate(
        &self,
        query: &str,
        chunks: &[RetrievedChunk],
        max_context_length: usize,
        conversation_id: Option<&str>,
        history: Option<Vec<LlmMessage>>,
    ) -> AppResult<RagResponse> {
        let context = build_context(chunks, max_context_length);
        let sources = extract_sources(chunks, &self.settings);

        let llm = self.available_llm()?;

        let history = match (history, conversation_id) {
            (Some(history), _) => history,
            (None, Some(id)) => self
                .conversations
                .get_recent_history(id, self.settings.history_messages),
            (None, None) => Vec::new(),
        };

        let prompt = build_rag_prompt(&self.prompt, query, &context)?;
        let mut request = LlmRequest::new(prompt.user, self.model.clone())
            .with_history(history)
            .with_sampling(SamplingParams::grounded());
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }

        tracing::debug!(
            provider = llm.provider_name(),
            context_chars = context.chars().count(),
            history = request.history.len(),
            "Requesting grounded answer"
        );

        let timeout = Duration::from_secs(self.settings.llm_timeout_secs);
        let response = match tokio::time::timeout(timeout, llm.complete(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!("Generation failed: {}", e);
                return Err(match e {
                    AppError::LlmUnavailable(_) | AppError::LlmGenerationFailed(_) => e,
                    other => AppError::LlmGenerationFailed(other.to_string()),
                });
            }
            Err(_) => {
                tracing::error!(
                    "Generation timed out after {}s",
                    self.settings.llm_timeout_secs
                );
                return Err(AppError::LlmGenerationFailed(format!(
                    "Language model did not answer within {}s",
                    self.settings.llm_timeout_secs
                )));
            }
        };

        let answer = response.content.trim().to_string();
        if answer.is_empty() {
            return Err(AppError::LlmGenerationFailed(
                "Language model returned an empty answer".to_string(),
            ));
        }

        if let Some(id) = conversation_id {
            self.conversations.add_exchange(id, query, answer.as_str());
        }

        Ok(RagResponse {
            answer,
            sources,
            context_chunks: chunks.len(),
            conversation_id: conversation_id.map(str::to_string),
        })
    }
}

/// Trim and bound a user query.
pub fn validate_query(query: &str) -> AppResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidRequest("Query cannot be empty".to_string()));
    }

    let len = query.chars().count();
    if len > MAX_QUERY_CHARS {
        return Err(AppError::InvalidRequest(format!(
            "Query is {} characters; the limit is {}",
            len, MAX_QUERY_CHARS
        )));
    }

    Ok(query)
}

/// Reject a `top_k` outside `1..=MAX_TOP_K` or a `min_score` outside `[0, 1]`.
pub fn validate_options(options: &QueryOptions) -> AppResult<()> {
    if options.top_k == 0 || options.top_k > MAX_TOP_K {
        return Err(AppError::InvalidRequest(format!(
            "top_k must be between 1 and {}, got {}",
            MAX_TOP_K, options.top_k
        )));
    }

    // NaN fails the range check too
    if !(0.0..=1.0).contains(&options.min_score) {
        return Err(AppError::InvalidRequest(format!(
            "min_score must be between 0 and 1, got {}",
            options.min_score
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  How do I print?  ").unwrap(), "How do I print?");
        assert!(matches!(
            validate_query("   "),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(validate_query(&"q".repeat(MAX_QUERY_CHARS)).is_ok());
        assert!(matches!(
            validate_query(&"q".repeat(MAX_QUERY_CHARS + 1)),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_options() {
        assert!(validate_options(&QueryOptions::default()).is_ok());
        assert!(validate_options(&QueryOptions::default().with_top_k(MAX_TOP_K)).is_ok());
        assert!(validate_options(&QueryOptions::default().with_min_score(0.0)).is_ok());
        assert!(validate_options(&QueryOptions::default().with_min_score(1.0)).is_ok());

        for options in [
            QueryOptions::default().with_top_k(0),
            QueryOptions::default().with_top_k(MAX_TOP_K + 1),
            QueryOptions::default().with_top_k(usize::MAX / 4),
            QueryOptions::default().with_min_score(f32::NAN),
            QueryOptions::default().with_min_score(-0.1),
            QueryOptions::default().with_min_score(1.5),
        ] {
            assert!(
                matches!(validate_options(&options), Err(AppError::InvalidRequest(_))),
                "{:?}",
                options
            );
        }
    }
}
