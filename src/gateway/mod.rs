//! AI provider gateway
//!
//! `ChatBackend` is the seam between the HTTP/service layers and the
//! provider. Handlers and the conversation service only see the trait, so
//! tests substitute a scripted double for the real Anthropic adapter.

mod anthropic;

pub use anthropic::AnthropicGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::ChatMessage;

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// System prompt used when a request does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, friendly assistant.";

pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const MAX_TOKENS_LIMIT: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("ANTHROPIC_API_KEY is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("provider error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// One completion call. Defaults fill in the optional fields; out-of-range
/// values are rejected, never clamped.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            system_prompt: None,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.messages.is_empty() {
            return Err(GatewayError::InvalidParameter(
                "message list must not be empty".into(),
            ));
        }
        if self.max_tokens == 0 || self.max_tokens > MAX_TOKENS_LIMIT {
            return Err(GatewayError::InvalidParameter(format!(
                "max_tokens must be between 1 and {MAX_TOKENS_LIMIT}"
            )));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(GatewayError::InvalidParameter(
                "temperature must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

/// A completion with exact token accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Completion {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Result of intent classification. Unparseable provider output soft-fails
/// to `unknown` with zero confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: String,
    pub confidence: f64,
}

impl IntentResult {
    pub fn unknown() -> Self {
        Self {
            intent: "unknown".into(),
            confidence: 0.0,
        }
    }
}

/// Parse the provider's classification reply. `None` means the reply did
/// not have the requested shape.
pub(crate) fn parse_intent(text: &str) -> Option<IntentResult> {
    serde_json::from_str::<IntentResult>(text.trim()).ok()
}

/// A selectable model, as reported by `/ai/models`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Issue one chat completion. No retry; provider failures surface once
    /// with the provider's message attached.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError>;

    /// Classify the intent of a message with a low-temperature call.
    async fn classify_intent(&self, text: &str) -> Result<IntentResult, GatewayError>;

    /// Static model catalogue.
    fn available_models(&self) -> Vec<ModelInfo>;

    /// Whether provider credentials are present.
    fn is_configured(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user("hello")])
    }

    #[test]
    fn defaults_are_applied() {
        let req = request();
        assert_eq!(req.model(), DEFAULT_MODEL);
        assert_eq!(req.system_prompt(), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(req.max_tokens, 1024);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn max_tokens_is_bounded_not_clamped() {
        let mut req = request();
        req.max_tokens = 5000;
        assert!(matches!(
            req.validate(),
            Err(GatewayError::InvalidParameter(_))
        ));

        req.max_tokens = MAX_TOKENS_LIMIT;
        assert!(req.validate().is_ok());

        req.max_tokens = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn temperature_is_bounded() {
        let mut req = request();
        req.temperature = 1.5;
        assert!(req.validate().is_err());
        req.temperature = 0.0;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_message_list_is_rejected() {
        let req = CompletionRequest::new(vec![]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn intent_parsing_accepts_the_requested_shape() {
        let parsed = parse_intent(r#"{"intent": "question", "confidence": 0.9}"#).unwrap();
        assert_eq!(parsed.intent, "question");
        assert!((parsed.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn intent_parsing_soft_fails_on_prose() {
        assert!(parse_intent("I think this is a question.").is_none());
        assert!(parse_intent("").is_none());
    }

    #[test]
    fn completion_totals_are_exact() {
        let completion = Completion {
            text: "hi".into(),
            model: DEFAULT_MODEL.into(),
            input_tokens: 12,
            output_tokens: 34,
        };
        assert_eq!(completion.total_tokens(), 46);
    }
}
