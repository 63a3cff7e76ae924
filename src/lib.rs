//! Chatrelay - Conversation API backend
//!
//! A thin orchestration layer over three concerns: user registration,
//! a proxy to the Anthropic Messages API, and persisted multi-turn
//! conversations in SQLite.

use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod service;
pub mod store;

use gateway::ChatBackend;
use service::ConversationService;
use store::Store;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub backend: Arc<dyn ChatBackend>,
    pub service: Arc<ConversationService>,
}

impl AppState {
    pub fn new(store: Arc<Store>, backend: Arc<dyn ChatBackend>) -> Self {
        let service = Arc::new(ConversationService::new(store.clone(), backend.clone()));
        Self {
            store,
            backend,
            service,
        }
    }
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
