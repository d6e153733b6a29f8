// src/handlers/exams.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    config::MAX_EXAMS_PER_BATCH,
    error::AppError,
    models::exam::{ExamCreateDto, ExamGroupCreateDto},
    services::builder::{ExamBuilder, ExamDraft, GenerationContext},
    state::AppState,
};

fn draft_from(index: usize, dto: &ExamCreateDto) -> Result<ExamDraft, AppError> {
    ExamDraft::from_dto(dto).map_err(|e| AppError::BadRequest(format!("Exam {}: {}", index + 1, e)))
}

/// Creates one standalone exam.
///
/// Goes through the remote exam API when one is configured.
/// Returns 201 Created and the stored exam.
pub async fn create_exam(
    State(state): State<AppState>,
    Json(payload): Json<ExamCreateDto>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder = ExamBuilder::from_drafts(vec![draft_from(0, &payload)?]);
    let exams = state.exams();

    let exam = match &state.remote {
        Some(client) => builder.generate_one_remote(0, client, &exams).await?,
        None => {
            let ctx = GenerationContext {
                exams: &exams,
                ids: &state.ids,
                origin: &state.config.public_origin,
            };
            builder.generate_one(0, &ctx).await?
        }
    };

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Creates every exam of the payload under one shared group id.
///
/// All-or-nothing: if any exam is invalid, nothing is stored.
pub async fn create_exam_group(
    State(state): State<AppState>,
    Json(payload): Json<ExamGroupCreateDto>,
) -> Result<impl IntoResponse, AppError> {
    if !(1..=MAX_EXAMS_PER_BATCH).contains(&payload.exams.len()) {
        return Err(AppError::BadRequest(format!(
            "A group must contain between 1 and {} exams",
            MAX_EXAMS_PER_BATCH
        )));
    }

    let drafts = payload
        .exams
        .iter()
        .enumerate()
        .map(|(i, dto)| draft_from(i, dto))
        .collect::<Result<Vec<_>, _>>()?;
    let mut builder = ExamBuilder::from_drafts(drafts);
    let exams = state.exams();

    let created = match &state.remote {
        Some(client) => {
            builder
                .generate_all_remote(payload.title.clone(), client, &exams)
                .await?
        }
        None => {
            let ctx = GenerationContext {
                exams: &exams,
                ids: &state.ids,
                origin: &state.config.public_origin,
            };
            builder.generate_all(&ctx).await?
        }
    };

    Ok((StatusCode::CREATED, Json(created)))
}
