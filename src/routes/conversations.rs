//! Conversation CRUD and the persisted chat turn.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::conversation::{Conversation, ConversationSummary, Message};
use crate::error::ApiError;
use crate::AppState;

use super::ai::ChatResponse;

#[derive(Debug, Deserialize)]
struct CreateRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    message: String,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

/// A conversation with its full message list.
#[derive(Debug, Serialize)]
struct ConversationDetail {
    #[serde(flatten)]
    conversation: Conversation,
    messages: Vec<Message>,
}

async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let conversation = state
        .store
        .create_conversation(request.title, request.user_id)
        .await?;

    // A fresh conversation has no messages, but the response shape always
    // carries the list.
    Ok(Json(ConversationDetail {
        conversation,
        messages: Vec::new(),
    }))
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let summaries = state
        .store
        .list_conversations(query.user_id, query.limit)
        .await?;
    Ok(Json(summaries))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let conversation = state
        .store
        .get_conversation(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Conversation {id} not found")))?;
    let messages = state.store.history(id).await?;

    Ok(Json(ConversationDetail {
        conversation,
        messages,
    }))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let conversation = state
        .store
        .update_title(id, request.title)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Conversation {id} not found")))?;
    let messages = state.store.history(id).await?;

    Ok(Json(ConversationDetail {
        conversation,
        messages,
    }))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_conversation(id).await? {
        return Err(ApiError::NotFound(format!("Conversation {id} not found")));
    }
    Ok(Json(json!({ "message": "Conversation deleted" })))
}

/// Persisted chat turn: the conversation service appends the user message,
/// replays history to the provider, and appends the reply.
async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::Validation("message must not be empty".into()));
    }

    let turn = state
        .service
        .send_message(id, &request.message, request.system_prompt, request.model)
        .await?;

    Ok(Json(ChatResponse {
        success: true,
        response: turn.text,
        tokens_used: turn.tokens_used,
        input_tokens: turn.input_tokens,
        output_tokens: turn.output_tokens,
        model: turn.model,
    }))
}

pub fn router() -> Router<AppState> {
    // The collection path is canonically `/conversations/`; accept both forms.
    Router::new()
        .route("/conversations", post(create).get(list))
        .route("/conversations/", post(create).get(list))
        .route(
            "/conversations/:id",
            get(get_one).patch(update).delete(remove),
        )
        .route("/conversations/:id/message", post(send_message))
}
