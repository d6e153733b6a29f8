// src/handlers/preferences.rs

use axum::{Json, extract::State, response::IntoResponse};

use crate::{
    error::AppError,
    models::session::{Preferences, UpdatePreferencesRequest},
    state::AppState,
};

async fn load(state: &AppState) -> Result<Preferences, AppError> {
    Ok(Preferences {
        panel_collapsed: state.panel_collapsed().get().await?.unwrap_or(false),
        remembered_email: state.auth.remembered_email().await?,
    })
}

pub async fn get_preferences(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load(&state).await?))
}

/// Updates the sidebar state. The remembered email is only changed by login.
pub async fn update_preferences(
    State(state): State<AppState>,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(collapsed) = payload.panel_collapsed {
        state.panel_collapsed().set(&collapsed).await?;
    }
    Ok(Json(load(&state).await?))
}
