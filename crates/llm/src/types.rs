//! Shared LLM types: provider identification and sampling parameters.

use serde::{Deserialize, Serialize};

/// Sampling parameters passed to every generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Upper bound on generated tokens
    pub max_new_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling cutoff
    pub top_p: f32,

    /// Penalty applied to already generated tokens
    pub repetition_penalty: f32,
}

impl SamplingParams {
    /// Low-variance settings for answers grounded in retrieved context.
    pub const fn grounded() -> Self {
        Self {
            max_new_tokens: 512,
            temperature: 0.3,
            top_p: 0.9,
            repetition_penalty: 1.1,
        }
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self::grounded()
    }
}

/// Supported provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    HuggingFace,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Some(Self::HuggingFace),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HuggingFace => "huggingface",
            Self::Ollama => "ollama",
        }
    }

    /// Whether the provider refuses to run without an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::HuggingFace)
    }
}
