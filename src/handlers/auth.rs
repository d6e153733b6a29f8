// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{
    error::AppError,
    models::user::LoginRequest,
    state::AppState,
    utils::links::LOGIN_ROUTE,
};

/// Authenticates a user and returns a JWT token.
///
/// Unknown email and wrong password are reported the same way.
/// On success the user becomes the single active session.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let users = state.users();
    let response = state.auth.login(&users, &state.config, payload).await?;
    Ok(Json(response))
}

/// Ends the active session. Tokens issued for it stop working.
pub async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.auth.sign_out().await?;
    Ok(Json(json!({ "redirect": LOGIN_ROUTE })))
}

pub async fn session(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let session = state
        .auth
        .current()
        .await?
        .ok_or(AppError::NotFound("No active session".to_string()))?;
    Ok(Json(session))
}
