// src/store/mod.rs

//! Persistence seam for the attempt engine.
//!
//! The engine only talks to storage through [`QuizStore`], so the same grading
//! path runs against PostgreSQL in production and against [`MemoryStore`] in
//! tests.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        answer::{Answer, TopicAnswer, TopicStat},
        attempt::{Attempt, FinishedAttempt, NewAttempt},
        question::Question,
        quiz::Quiz,
    },
};

pub use memory::MemoryStore;
pub use pg::PgStore;

#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Loads a quiz and its parsed rules.
    /// Fails with `NotFound` when the quiz is absent or its rules are malformed.
    async fn load_quiz(&self, quiz_id: i64) -> Result<Quiz, AppError>;

    /// Draws up to `count` random questions from every topic of a course.
    async fn sample_questions(&self, course_id: i64, count: i64) -> Result<Vec<Question>, AppError>;

    /// Returns the stored questions among `ids`; unknown ids are skipped.
    async fn fetch_questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError>;

    async fn count_attempts(&self, user_id: i64, quiz_id: i64) -> Result<i64, AppError>;

    /// Counts attempts with `started_at >= since`.
    async fn count_attempts_since(
        &self,
        user_id: i64,
        quiz_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError>;

    async fn create_attempt(&self, attempt: NewAttempt) -> Result<i64, AppError>;

    async fn get_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, AppError>;

    /// Writes the answers and the terminal fields in one operation.
    /// Fails with `Conflict` if the attempt is already finished, and leaves
    /// nothing behind on any failure.
    async fn finish_attempt(&self, finished: FinishedAttempt) -> Result<(), AppError>;

    async fn list_answers(&self, attempt_id: i64) -> Result<Vec<Answer>, AppError>;

    async fn topic_stats(&self, user_id: i64, course_id: i64) -> Result<Vec<TopicStat>, AppError>;

    /// The learner's answers to questions of one topic in a course, newest
    /// first, at most [`TOPIC_DETAIL_LIMIT`](crate::config::TOPIC_DETAIL_LIMIT) rows.
    async fn topic_detail(
        &self,
        user_id: i64,
        course_id: i64,
        topic: &str,
    ) -> Result<Vec<TopicAnswer>, AppError>;
}
