//! Ask command handler.
//!
//! Runs one grounded query and prints the answer with its sources.

use super::{print_json, print_response};
use crate::services::Services;
use clap::Args;
use ragline_core::{config::AppConfig, AppResult, AI_UNAVAILABLE_MESSAGE};
use ragline_knowledge::{QueryOptions, RagEngine, RagResponse};

/// Ask one question against the index
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Number of chunks to ground the answer on
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum similarity score for a chunk to count as relevant
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Continue an existing conversation
    #[arg(long)]
    pub conversation_id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let services = Services::build(config)?;
        let engine = services.engine(config)?;
        let options = self.options(&engine);

        let response = match engine.query(&self.query, &options).await {
            Ok(response) => response,
            Err(e) if e.is_ai_unavailable() => {
                tracing::warn!("Answer unavailable: {}", e);
                unavailable_response(options.conversation_id.clone())
            }
            Err(e) => return Err(e),
        };

        if self.json {
            print_json(&response)
        } else {
            print_response(&response);
            Ok(())
        }
    }

    fn options(&self, engine: &RagEngine) -> QueryOptions {
        let mut options = engine.default_options();
        if let Some(top_k) = self.top_k {
            options = options.with_top_k(top_k);
        }
        if let Some(min_score) = self.min_score {
            options = options.with_min_score(min_score);
        }
        if let Some(ref id) = self.conversation_id {
            options = options.with_conversation(id.clone());
        }
        options
    }
}

/// The transparency message in place of a model answer.
pub(crate) fn unavailable_response(conversation_id: Option<String>) -> RagResponse {
    RagResponse {
        answer: AI_UNAVAILABLE_MESSAGE.to_string(),
        sources: Vec::new(),
        context_chunks: 0,
        conversation_id,
    }
}
