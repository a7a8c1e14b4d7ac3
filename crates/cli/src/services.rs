//! Process-wide capabilities, constructed once per command.

use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::{
    create_index, create_provider, ConversationManager, EmbeddingProvider, RagEngine, VectorIndex,
};
use ragline_llm::{create_client, LlmClient};
use ragline_prompt::{load_prompt_or_default, DEFAULT_RAG_PROMPT_ID};
use std::sync::Arc;
use std::time::Duration;

/// Every capability the commands need, shared by reference.
pub struct Services {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub llm: Option<Arc<dyn LlmClient>>,
}

impl Services {
    /// Build the embedder, index and language model. A model that cannot
    /// be created is logged and left out; queries then fail as unavailable.
    pub fn build(config: &AppConfig) -> AppResult<Self> {
        let mut services = Self::storage(config)?;
        services.llm = build_llm(config);
        tracing::debug!(llm = services.llm.is_some(), "Language model resolved");
        Ok(services)
    }

    /// Embedder and index only, for commands that never generate.
    pub fn storage(config: &AppConfig) -> AppResult<Self> {
        let embedder = create_provider(&config.embedding)?;
        let index = create_index(config)?;

        tracing::debug!(
            embedder = embedder.provider_name(),
            index = index.backend_name(),
            "Capabilities ready"
        );

        Ok(Self {
            embedder,
            index,
            llm: None,
        })
    }

    /// Assemble the answering engine over these capabilities.
    pub fn engine(&self, config: &AppConfig) -> AppResult<RagEngine> {
        let conversations = Arc::new(ConversationManager::new(&config.conversation));
        let prompt = load_prompt_or_default(&config.workspace, DEFAULT_RAG_PROMPT_ID)?;
        tracing::debug!("Using prompt definition: {}", prompt.id);

        Ok(RagEngine::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.index),
            self.llm.clone(),
            conversations,
            config.rag.clone(),
            config.model.clone(),
        )
        .with_prompt(prompt))
    }
}

fn build_llm(config: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    let endpoint = config.provider_endpoint(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);
    let timeout = Duration::from_secs(config.provider_timeout_secs(&config.provider));

    match create_client(&config.provider, endpoint.as_deref(), api_key.as_deref(), timeout) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!("Language model '{}' not configured: {}", config.provider, e);
            None
        }
    }
}
