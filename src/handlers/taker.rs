// src/handlers/taker.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        exam::ExamDefinition,
        exam_record::{SubmitAnswersRequest, Submitter},
    },
    services::taker::{ExamSelector, SubmissionReceipt, TakerSession},
    state::AppState,
    utils::links::{self, BUILDER_ROUTE},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeParams {
    pub exam_id: Option<i64>,
    pub group_id: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TakeView<'a> {
    exams: &'a [ExamDefinition],
    total_points: f64,
}

#[derive(Serialize)]
struct SubmitResponse {
    redirect: String,
    #[serde(flatten)]
    receipt: SubmissionReceipt,
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Exam not found", "redirect": BUILDER_ROUTE })),
    )
        .into_response()
}

/// Resolves the exams to answer, by `groupId` or `examId`.
///
/// Responds 404 with a redirect to the builder when nothing matches.
pub async fn open_exam(
    State(state): State<AppState>,
    Query(params): Query<TakeParams>,
) -> Result<Response, AppError> {
    let Some(selector) = ExamSelector::from_query(params.exam_id, params.group_id) else {
        return Ok(not_found());
    };

    let all = state.exams().load().await?;
    let session = match TakerSession::open(&all, selector) {
        Ok(session) => session,
        Err(AppError::NotFound(_)) => return Ok(not_found()),
        Err(e) => return Err(e),
    };

    let view = TakeView {
        exams: session.exams(),
        total_points: session.exams().iter().map(|e| e.total_points).sum(),
    };
    Ok(Json(view).into_response())
}

/// Scores and stores the answers of every resolved exam.
///
/// Rejected as a whole when any question is unanswered.
pub async fn submit_answers(
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<Response, AppError> {
    let Some(selector) = ExamSelector::from_query(payload.exam_id, payload.group_id) else {
        return Err(AppError::BadRequest("examId or groupId is required".to_string()));
    };

    let all = state.exams().load().await?;
    let mut session = match TakerSession::open(&all, selector) {
        Ok(session) => session,
        Err(AppError::NotFound(_)) => return Ok(not_found()),
        Err(e) => return Err(e),
    };
    session.apply(&payload.selections)?;

    let submitter = state.auth.current().await?.as_ref().map(Submitter::from);
    let receipt = session
        .submit(&state.responses(), Utc::now().trunc_subsecs(3), submitter)
        .await?;

    let redirect = links::results_url(&state.config.public_origin, receipt.results_target);
    Ok((StatusCode::CREATED, Json(SubmitResponse { redirect, receipt })).into_response())
}
