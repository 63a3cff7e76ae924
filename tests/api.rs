//! End-to-end tests over the full router, with an in-memory store and a
//! scripted provider backend.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use chatrelay::gateway::{
    ChatBackend, Completion, CompletionRequest, GatewayError, IntentResult, ModelInfo,
    DEFAULT_MODEL,
};
use chatrelay::store::Store;
use chatrelay::{app, AppState};

/// Backend double: validates like the real adapter, then replies with a
/// fixed completion (or a scripted failure).
struct ScriptedBackend {
    fail: bool,
    configured: bool,
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError> {
        request.validate()?;
        if self.fail {
            return Err(GatewayError::Api {
                status: 529,
                message: "overloaded".into(),
            });
        }
        Ok(Completion {
            text: format!("echo: {}", request.messages.last().unwrap().content),
            model: request.model().to_string(),
            input_tokens: 10,
            output_tokens: 20,
        })
    }

    async fn classify_intent(&self, _text: &str) -> Result<IntentResult, GatewayError> {
        Ok(IntentResult {
            intent: "question".into(),
            confidence: 0.9,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "claude-3-5-sonnet-20241022",
            name: "Claude 3.5 Sonnet",
            description: "test",
        }]
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

async fn test_app() -> Router {
    test_app_with(ScriptedBackend {
        fail: false,
        configured: true,
    })
    .await
}

async fn test_app_with(backend: ScriptedBackend) -> Router {
    let store = Arc::new(Store::new_in_memory().await.unwrap());
    app(AppState::new(store, Arc::new(backend)))
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn root_is_online() {
    let router = test_app().await;
    let (status, body) = send(&router, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "API online");
}

#[tokio::test]
async fn health_reports_credential_state() {
    let configured = test_app().await;
    let (_, body) = send(&configured, Method::GET, "/ai/health", None).await;
    assert_eq!(body["status"], "online");

    let unconfigured = test_app_with(ScriptedBackend {
        fail: false,
        configured: false,
    })
    .await;
    let (_, body) = send(&unconfigured, Method::GET, "/ai/health", None).await;
    assert_eq!(body["status"], "no_api_key");
}

#[tokio::test]
async fn direct_chat_round_trip() {
    let router = test_app().await;
    let (status, body) = send(
        &router,
        Method::POST,
        "/ai/chat",
        Some(json!({ "message": "hello" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "echo: hello");
    assert_eq!(body["tokens_used"], 30);
    assert_eq!(body["input_tokens"], 10);
    assert_eq!(body["output_tokens"], 20);
    assert_eq!(body["model"], DEFAULT_MODEL);
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let router = test_app().await;
    let (status, body) = send(
        &router,
        Method::POST,
        "/ai/chat",
        Some(json!({ "message": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn out_of_range_max_tokens_is_rejected() {
    let router = test_app().await;
    let (status, body) = send(
        &router,
        Method::POST,
        "/ai/chat",
        Some(json!({ "message": "hello", "max_tokens": 5000 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("max_tokens"));
}

#[tokio::test]
async fn chat_with_caller_supplied_context() {
    let router = test_app().await;
    let (status, body) = send(
        &router,
        Method::POST,
        "/ai/chat/context",
        Some(json!({
            "message": "and Rust?",
            "conversation_history": [
                { "role": "user", "content": "talk about programming" },
                { "role": "assistant", "content": "programming is..." }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "echo: and Rust?");
    assert!(body.get("model").is_none());
}

#[tokio::test]
async fn analyze_returns_intent() {
    let router = test_app().await;
    let (status, body) = send(
        &router,
        Method::POST,
        "/ai/analyze",
        Some(json!({ "message": "I have a problem" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "question");
    assert_eq!(body["message"], "I have a problem");
}

#[tokio::test]
async fn models_catalogue() {
    let router = test_app().await;
    let (status, body) = send(&router, Method::GET, "/ai/models", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models"][0]["id"], "claude-3-5-sonnet-20241022");
}

#[tokio::test]
async fn conversation_crud_flow() {
    let router = test_app().await;

    let (status, created) =
        send(&router, Method::POST, "/conversations/", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["title"], "New Conversation");
    assert!(created["messages"].as_array().unwrap().is_empty());
    let id = created["id"].as_i64().unwrap();

    let (status, listed) = send(&router, Method::GET, "/conversations/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["message_count"], 0);

    let (status, updated) = send(
        &router,
        Method::PATCH,
        &format!("/conversations/{id}"),
        Some(json!({ "title": "renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "renamed");
    assert!(updated["messages"].is_array());

    let (status, fetched) =
        send(&router, Method::GET, &format!("/conversations/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "renamed");
    assert_eq!(fetched["messages"].as_array().unwrap().len(), 0);

    let (status, deleted) = send(
        &router,
        Method::DELETE,
        &format!("/conversations/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Conversation deleted");

    let (status, _) =
        send(&router, Method::GET, &format!("/conversations/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn collection_paths_accept_both_slash_forms() {
    let router = test_app().await;

    let (status, _) = send(&router, Method::POST, "/conversations/", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, Method::POST, "/conversations", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = send(&router, Method::GET, "/conversations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let (status, _) = send(
        &router,
        Method::POST,
        "/users/",
        Some(json!({
            "username": "ana",
            "email": "ana@example.com",
            "password": "hunter2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, users) = send(&router, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn title_update_returns_the_message_list() {
    let router = test_app().await;

    let (_, created) = send(&router, Method::POST, "/conversations/", Some(json!({}))).await;
    let id = created["id"].as_i64().unwrap();

    send(
        &router,
        Method::POST,
        &format!("/conversations/{id}/message"),
        Some(json!({ "message": "hello" })),
    )
    .await;

    let (status, updated) = send(
        &router,
        Method::PATCH,
        &format!("/conversations/{id}"),
        Some(json!({ "title": "renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "renamed");
    assert_eq!(updated["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn persisted_turn_stores_both_messages() {
    let router = test_app().await;

    let (_, created) = send(&router, Method::POST, "/conversations/", Some(json!({}))).await;
    let id = created["id"].as_i64().unwrap();

    let (status, turn) = send(
        &router,
        Method::POST,
        &format!("/conversations/{id}/message"),
        Some(json!({ "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turn["response"], "echo: hello");

    let (_, fetched) = send(&router, Method::GET, &format!("/conversations/{id}"), None).await;
    let messages = fetched["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["tokens_used"], 30);
}

#[tokio::test]
async fn turn_on_missing_conversation_is_not_found() {
    let router = test_app().await;
    let (status, _) = send(
        &router,
        Method::POST,
        "/conversations/999/message",
        Some(json!({ "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_turn_keeps_the_user_message() {
    let router = test_app_with(ScriptedBackend {
        fail: true,
        configured: true,
    })
    .await;

    let (_, created) = send(&router, Method::POST, "/conversations/", Some(json!({}))).await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/conversations/{id}/message"),
        Some(json!({ "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("overloaded"));

    let (_, fetched) = send(&router, Method::GET, &format!("/conversations/{id}"), None).await;
    let messages = fetched["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
}

#[tokio::test]
async fn user_registration_and_listing() {
    let router = test_app().await;

    let (status, user) = send(
        &router,
        Method::POST,
        "/users/",
        Some(json!({
            "username": "ana",
            "email": "ana@example.com",
            "password": "hunter2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "ana");
    assert!(user.get("password_hash").is_none());

    let (status, _) = send(
        &router,
        Method::POST,
        "/users/",
        Some(json!({
            "username": "ana",
            "email": "other@example.com",
            "password": "hunter2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, users) = send(&router, Method::GET, "/users/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);
}
