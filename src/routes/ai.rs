//! Stateless AI endpoints: direct chat, caller-supplied context, intent
//! analysis, model catalogue, provider health.

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::conversation::ChatMessage;
use crate::error::ApiError;
use crate::gateway::{CompletionRequest, ModelInfo, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub tokens_used: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub model: String,
}

#[derive(Debug, Deserialize)]
struct ContextChatRequest {
    message: String,
    #[serde(default)]
    conversation_history: Vec<ChatMessage>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Serialize)]
struct ContextChatResponse {
    success: bool,
    response: String,
    tokens_used: u32,
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    success: bool,
    intent: String,
    confidence: f64,
    message: String,
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    message: &'static str,
}

fn require_message(message: &str) -> Result<(), ApiError> {
    if message.trim().is_empty() {
        return Err(ApiError::Validation("message must not be empty".into()));
    }
    Ok(())
}

/// Single-turn completion with no persistence.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    require_message(&request.message)?;

    let completion = state
        .backend
        .complete(CompletionRequest {
            messages: vec![ChatMessage::user(&request.message)],
            system_prompt: request.system_prompt,
            model: request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        })
        .await?;

    Ok(Json(ChatResponse {
        success: true,
        tokens_used: completion.total_tokens(),
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
        response: completion.text,
        model: completion.model,
    }))
}

/// Multi-turn completion with caller-supplied history, no persistence.
async fn chat_with_context(
    State(state): State<AppState>,
    Json(request): Json<ContextChatRequest>,
) -> Result<Json<ContextChatResponse>, ApiError> {
    require_message(&request.message)?;

    let mut messages = request.conversation_history;
    messages.push(ChatMessage::user(&request.message));

    let mut completion_request = CompletionRequest::new(messages);
    completion_request.system_prompt = request.system_prompt;
    completion_request.model = request.model;

    let completion = state.backend.complete(completion_request).await?;

    Ok(Json(ContextChatResponse {
        success: true,
        tokens_used: completion.total_tokens(),
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
        response: completion.text,
    }))
}

/// Intent classification. Off-shape provider replies come back as
/// `unknown` with zero confidence rather than an error.
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    require_message(&request.message)?;

    let result = state.backend.classify_intent(&request.message).await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        intent: result.intent,
        confidence: result.confidence,
        message: request.message,
    }))
}

async fn models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.backend.available_models(),
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    if state.backend.is_configured() {
        Json(HealthResponse {
            status: "online",
            service: "Anthropic Claude",
            message: "provider credentials configured",
        })
    } else {
        Json(HealthResponse {
            status: "no_api_key",
            service: "Anthropic Claude",
            message: "set ANTHROPIC_API_KEY to enable completions",
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ai/chat", post(chat))
        .route("/ai/chat/context", post(chat_with_context))
        .route("/ai/analyze", post(analyze))
        .route("/ai/models", get(models))
        .route("/ai/health", get(health))
}
