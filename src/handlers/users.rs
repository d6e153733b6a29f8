// src/handlers/users.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::user::{CreateUserRequest, PublicUser},
    state::AppState,
    utils::jwt::Claims,
};

/// Lists all users, newest first.
/// Admin only.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.users().list().await?;
    let users: Vec<PublicUser> = users.iter().map(PublicUser::from).collect();
    Ok(Json(users))
}

/// Creates a user with the given role.
/// Admin only.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users().create(payload, &state.ids).await?;
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

/// Deletes a user.
/// Admin only. Admins cannot delete themselves.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if claims.sub == id.to_string() {
        return Err(AppError::Forbidden("You cannot delete your own account".to_string()));
    }

    state.users().remove(id).await?;
    tracing::info!("User {} deleted by {}", id, claims.email);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.users().stats().await?))
}
