// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    services::catalog::{self, CatalogQuery},
    state::AppState,
};

/// Lists one card per exam group, filtered and sorted by the query.
pub async fn list_cards(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let cards = catalog::list_cards(&state.exams(), &state.config.public_origin, &query).await?;
    Ok(Json(cards))
}

/// Deletes a card and every exam of its group.
pub async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let removed = catalog::delete_card(&state.exams(), id).await?;
    tracing::info!("Deleted exam card {} ({} exams)", id, removed.len());
    Ok(Json(json!({ "removed": removed })))
}

pub async fn clear_all(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    catalog::clear_all(&state.exams()).await?;
    tracing::warn!("Exam catalog cleared");
    Ok(StatusCode::NO_CONTENT)
}
