//! API routes

pub mod ai;
pub mod conversations;
pub mod users;

use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use crate::AppState;

async fn root() -> Json<Value> {
    Json(json!({ "message": "API online" }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .merge(ai::router())
        .merge(conversations::router())
        .merge(users::router())
}
