//! HuggingFace Inference API provider.
//!
//! Text-generation models on the hosted Inference API take a single prompt
//! string, so the request's system prompt and history are rendered into the
//! Mistral-instruct turn format before sending.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, MessageRole};
use ragline_core::{AppError, AppResult};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::instrument;

const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    repetition_penalty: f32,
    return_full_text: bool,
    do_sample: bool,
}

/// Client for the HuggingFace hosted Inference API.
pub struct HuggingFaceClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HuggingFaceClient {
    /// Create a client against the public Inference API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(
            DEFAULT_ENDPOINT,
            api_key,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a client against a custom endpoint (e.g. a dedicated Inference Endpoint).
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.endpoint, model)
    }

    fn to_inference_request(&self, request: &LlmRequest) -> InferenceRequest {
        InferenceRequest {
            inputs: render_instruct_prompt(request),
            parameters: InferenceParameters {
                max_new_tokens: request.sampling.max_new_tokens,
                temperature: request.sampling.temperature,
                top_p: request.sampling.top_p,
                repetition_penalty: request.sampling.repetition_penalty,
                return_full_text: false,
                do_sample: true,
            },
        }
    }
}

/// Render system prompt, history and the final user turn as a Mistral-instruct prompt.
///
/// The system prompt is folded into the first user turn since the format has
/// no dedicated system slot.
pub fn render_instruct_prompt(request: &LlmRequest) -> String {
    let mut prompt = String::from("<s>");
    let mut pending_system = request
        .system
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    for message in request.messages() {
        match message.role {
            MessageRole::System => {}
            MessageRole::User => {
                prompt.push_str("[INST] ");
                if let Some(system) = pending_system.take() {
                    prompt.push_str(system);
                    prompt.push_str("\n\n");
                }
                prompt.push_str(message.content.trim());
                prompt.push_str(" [/INST]");
            }
            MessageRole::Assistant => {
                prompt.push(' ');
                prompt.push_str(message.content.trim());
                prompt.push_str("</s>");
            }
        }
    }

    prompt
}

/// Pull `generated_text` out of either response shape the API uses.
fn extract_generated_text(body: &serde_json::Value) -> AppResult<String> {
    let entry = match body {
        serde_json::Value::Array(items) => items.first(),
        serde_json::Value::Object(_) => Some(body),
        _ => None,
    };

    if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
        return Err(AppError::LlmGenerationFailed(format!(
            "HuggingFace returned an error: {}",
            error
        )));
    }

    entry
        .and_then(|e| e.get("generated_text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::LlmGenerationFailed(format!(
                "Unexpected HuggingFace response shape: {}",
                body
            ))
        })
}

/// Strip prompt artifacts some models echo back.
fn clean_generated_text(text: &str, prompt: &str) -> String {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix(prompt.trim()) {
        cleaned = rest.trim();
    }

    let after_inst = cleaned.rsplit("[/INST]").next().unwrap_or(cleaned);
    let before_next = after_inst.split("[INST]").next().unwrap_or(after_inst);

    before_next.replace("</s>", "").trim().to_string()
}

#[async_trait::async_trait]
impl LlmClient for HuggingFaceClient {
    fn provider_name(&self) -> &str {
        "huggingface"
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    #[instrument(skip(self, request), fields(model = %request.model, history = request.history.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if !self.is_available() {
            return Err(AppError::LlmUnavailable(
                "HuggingFace API key is not configured".to_string(),
            ));
        }

        tracing::info!("Sending generation request to HuggingFace");
        let payload = self.to_inference_request(request);
        tracing::debug!("Prompt length: {} chars", payload.inputs.chars().count());

        let response = self
            .client
            .post(self.model_url(&request.model))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AppError::LlmUnavailable(format!("Failed to reach HuggingFace: {}", e))
                } else {
                    AppError::LlmGenerationFailed(format!(
                        "HuggingFace request failed: {}",
                        e
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("HuggingFace API error ({}): {}", status, error_text);
            return Err(match status {
                StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::SERVICE_UNAVAILABLE => AppError::LlmUnavailable(message),
                _ => AppError::LlmGenerationFailed(message),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::LlmGenerationFailed(format!("Failed to parse HuggingFace response: {}", e))
        })?;

        let generated = extract_generated_text(&body)?;
        let content = clean_generated_text(&generated, &request.prompt);

        if content.is_empty() {
            return Err(AppError::LlmGenerationFailed(
                "HuggingFace returned an empty answer".to_string(),
            ));
        }

        tracing::info!("Received completion from HuggingFace");

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }
}
