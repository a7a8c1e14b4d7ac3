//! LLM provider factory.
//!
//! Builds the configured client once at process start; callers share it
//! through the returned `Arc`.

use crate::client::LlmClient;
use crate::providers::{HuggingFaceClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("huggingface", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by HuggingFace
/// * `timeout` - Per-request HTTP timeout
///
/// # Errors
/// Returns error if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaClient::with_timeout(base_url, timeout)))
        }
        ProviderType::HuggingFace => {
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| "HuggingFace provider requires API key".to_string())?;
            let endpoint = endpoint.unwrap_or("https://api-inference.huggingface.co");
            Ok(Arc::new(HuggingFaceClient::with_endpoint(
                endpoint, key, timeout,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None, TIMEOUT);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_huggingface_client() {
        let client = create_client("huggingface", None, Some("hf_abc"), TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "huggingface");
        assert!(client.is_available());
    }

    #[test]
    fn test_huggingface_requires_api_key() {
        match create_client("huggingface", None, None, TIMEOUT) {
            Err(err) => assert!(err.contains("requires API key")),
            Ok(_) => panic!("Expected error for HuggingFace without API key"),
        }
        assert!(create_client("huggingface", None, Some(""), TIMEOUT).is_err());
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None, TIMEOUT) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
