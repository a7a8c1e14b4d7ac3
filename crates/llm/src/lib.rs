//! Language model integration for ragline.
//!
//! A provider-agnostic `LlmClient` trait with one error taxonomy. Transport
//! details (endpoints, payload shapes, prompt formats) stay inside each
//! provider.
//!
//! # Providers
//! - **HuggingFace**: hosted Inference API, Mistral-instruct prompt format (default)
//! - **Ollama**: local runtime, chat endpoint
//!
//! # Example
//! ```no_run
//! use ragline_llm::{LlmClient, LlmRequest, SamplingParams, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2")
//!     .with_sampling(SamplingParams::grounded());
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmMessage, LlmRequest, LlmResponse, LlmUsage, MessageRole};
pub use factory::create_client;
pub use providers::{HuggingFaceClient, OllamaClient};
pub use types::{ProviderType, SamplingParams};
