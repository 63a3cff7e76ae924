//! Anthropic Messages API adapter
//!
//! Stateless wrapper over `POST /v1/messages`. One outbound call per
//! invocation; no retry and no client-side timeout, so callers own their
//! deadline.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::conversation::ChatMessage;

use super::{
    parse_intent, ChatBackend, Completion, CompletionRequest, GatewayError, IntentResult,
    ModelInfo,
};

const API_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

const INTENT_SYSTEM_PROMPT: &str = "You are an intent analyzer. \
Analyze the user's message and answer ONLY in this JSON format: \
{\"intent\": \"question|help|complaint|praise|other\", \"confidence\": 0.0-1.0}";
const INTENT_MAX_TOKENS: u32 = 200;
const INTENT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Gateway to the Anthropic Messages API.
pub struct AnthropicGateway {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl AnthropicGateway {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// Point the gateway at a different endpoint (local stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait::async_trait]
impl ChatBackend for AnthropicGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError> {
        request.validate()?;
        let api_key = self.api_key.as_deref().ok_or(GatewayError::NotConfigured)?;

        let body = MessagesRequest {
            model: request.model(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system_prompt(),
            messages: &request.messages,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("{e} - body: {body}")))?;

        let text = completion
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(GatewayError::InvalidResponse(
                "no text content in response".into(),
            ));
        }

        Ok(Completion {
            text,
            model: completion.model,
            input_tokens: completion.usage.input_tokens,
            output_tokens: completion.usage.output_tokens,
        })
    }

    async fn classify_intent(&self, text: &str) -> Result<IntentResult, GatewayError> {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user(text)],
            system_prompt: Some(INTENT_SYSTEM_PROMPT.to_string()),
            model: None,
            max_tokens: INTENT_MAX_TOKENS,
            temperature: INTENT_TEMPERATURE,
        };

        let completion = self.complete(request).await?;

        // Transport and API failures propagate above; only an off-shape
        // reply soft-fails.
        Ok(parse_intent(&completion.text).unwrap_or_else(|| {
            tracing::warn!("intent reply did not parse, returning unknown");
            IntentResult::unknown()
        }))
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "claude-3-5-sonnet-20241022",
                name: "Claude 3.5 Sonnet",
                description: "Most intelligent, best for complex tasks",
            },
            ModelInfo {
                id: "claude-3-5-haiku-20241022",
                name: "Claude 3.5 Haiku",
                description: "Fastest and most economical",
            },
            ModelInfo {
                id: "claude-3-opus-20240229",
                name: "Claude 3 Opus",
                description: "Previous high-performance model",
            },
        ]
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
