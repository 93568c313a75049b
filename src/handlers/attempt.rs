// src/handlers/attempt.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    engine,
    error::AppError,
    models::attempt::{AttemptDetail, SubmitAttemptRequest, Submission},
    store::QuizStore,
    utils::jwt::Claims,
};

/// Submits the answers of an open attempt.
///
/// * Re-reads every question from storage; the client only sends ids and values.
/// * Grades each answer, computes the score and the overtime flag.
/// * Finishes the attempt; a second submission gets 409 Conflict.
pub async fn submit_attempt(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let submission = Submission {
        attempt_id,
        quiz_id: req.quiz_id,
        answers: req.answers,
        elapsed_sec: req.elapsed_sec,
    };

    let result = engine::submit_attempt(store.as_ref(), user_id, submission, Utc::now()).await?;

    Ok(Json(result))
}

/// Returns an attempt of the caller with its graded answers.
pub async fn get_attempt(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = store
        .get_attempt(attempt_id)
        .await?
        .filter(|a| a.user_id == user_id)
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    let answers = store.list_answers(attempt_id).await?;

    Ok(Json(AttemptDetail {
        status: attempt.status(),
        attempt,
        answers,
    }))
}
