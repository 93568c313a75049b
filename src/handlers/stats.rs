// src/handlers/stats.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::answer::{TopicAnswer, TopicStatResponse},
    store::QuizStore,
    utils::jwt::Claims,
};

/// Per-topic correctness of the caller's answers within a course.
pub async fn topic_stats(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let stats: Vec<TopicStatResponse> = store
        .topic_stats(user_id, course_id)
        .await?
        .into_iter()
        .map(TopicStatResponse::from)
        .collect();

    Ok(Json(stats))
}

/// The caller's answer history within one topic of a course, newest first.
pub async fn topic_detail(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path((course_id, topic)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let topic = topic.trim();
    if topic.is_empty() {
        return Err(AppError::BadRequest("Topic must not be empty".to_string()));
    }

    let rows: Vec<TopicAnswer> = store.topic_detail(user_id, course_id, topic).await?;

    Ok(Json(rows))
}
