// src/handlers/results.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    error::AppError,
    services::{
        report,
        results::{self, ResultCard, ResultsFilter},
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintParams {
    /// Defaults to the most recent submission.
    pub submitted_at: Option<DateTime<Utc>>,
}

async fn load_cards(state: &AppState, filter: ResultsFilter) -> Result<Vec<ResultCard>, AppError> {
    let exams = state.exams().load().await?;
    let responses = state.responses().load().await?;
    Ok(results::aggregate(&exams, &responses, filter))
}

fn submission_missing() -> AppError {
    AppError::NotFound("Submission not found".to_string())
}

/// Result cards, most recently answered first.
pub async fn list_results(
    State(state): State<AppState>,
    Query(filter): Query<ResultsFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_cards(&state, filter).await?))
}

fn render(card: &ResultCard, at: Option<DateTime<Utc>>) -> Result<String, AppError> {
    match card {
        ResultCard::Simple(card) => {
            let sub = card
                .submissions
                .iter()
                .find(|s| at.is_none_or(|at| s.submitted_at == at))
                .ok_or_else(submission_missing)?;
            Ok(report::render_simple(&card.exam, sub))
        }
        ResultCard::Composite(card) => {
            let sub = card
                .submissions
                .iter()
                .find(|s| at.is_none_or(|at| s.submitted_at == at))
                .ok_or_else(submission_missing)?;
            Ok(report::render_composite(card, sub))
        }
    }
}

/// Printable report of one submission of a single exam.
pub async fn print_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    Query(params): Query<PrintParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ResultsFilter { exam_id: Some(exam_id), group_id: None };
    let cards = load_cards(&state, filter).await?;
    let card = cards.first().ok_or_else(submission_missing)?;
    Ok(Html(render(card, params.submitted_at)?))
}

/// Printable report of one combined submission of an exam group.
pub async fn print_group(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Query(params): Query<PrintParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ResultsFilter { exam_id: None, group_id: Some(group_id) };
    let cards = load_cards(&state, filter).await?;
    let card = cards.first().ok_or_else(submission_missing)?;
    Ok(Html(render(card, params.submitted_at)?))
}
