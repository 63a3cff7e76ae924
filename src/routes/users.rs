//! User registration and listing.

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::conversation::User;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<User>, ApiError> {
    if request.username.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(ApiError::Validation(
            "username, email and password are required".into(),
        ));
    }

    let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = state
        .store
        .create_user(&request.username, &request.email, &password_hash)
        .await?;

    Ok(Json(user))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(users))
}

pub fn router() -> Router<AppState> {
    // The collection path is canonically `/users/`; accept both forms.
    Router::new()
        .route("/users", post(register).get(list))
        .route("/users/", post(register).get(list))
}
