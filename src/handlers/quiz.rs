// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    engine, error::AppError, models::attempt::StartAttemptRequest, store::QuizStore,
    utils::jwt::Claims,
};

/// Starts a new attempt at a quiz.
///
/// * Checks the quiz's attempt limit and retake cooldown for the caller.
/// * Samples questions from the course and opens the attempt.
/// * Returns the questions without their answer keys, numbered 1..N.
pub async fn start_attempt(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let started =
        engine::start_attempt(store.as_ref(), user_id, quiz_id, req.course_id, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(started)))
}
