// src/store/pg.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    config::TOPIC_DETAIL_LIMIT,
    error::AppError,
    models::{
        answer::{Answer, AnswerRow, TopicAnswer, TopicStat},
        attempt::{Attempt, FinishedAttempt, NewAttempt},
        question::{Question, QuestionRow},
        quiz::Quiz,
    },
    store::QuizStore,
};

/// Helper struct for fetching a quiz row before its rules are parsed.
#[derive(sqlx::FromRow)]
struct QuizRow {
    id: i64,
    course_id: i64,
    title: String,
    rules: Option<serde_json::Value>,
}

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn load_quiz(&self, quiz_id: i64) -> Result<Quiz, AppError> {
        let row = sqlx::query_as::<_, QuizRow>(
            "SELECT id, course_id, title, rules FROM quizzes WHERE id = $1",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load quiz {}: {:?}", quiz_id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound(format!("Quiz {} not found", quiz_id)))?;

        let rules = row.rules.unwrap_or(serde_json::Value::Null);
        Quiz::from_stored(row.id, row.course_id, row.title, &rules)
    }

    async fn sample_questions(&self, course_id: i64, count: i64) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, course_id, topic, qtype, difficulty, payload_json
            FROM questions
            WHERE course_id = $1
            ORDER BY RANDOM()
            LIMIT $2
            "#,
        )
        .bind(course_id)
        .bind(count)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to sample questions for course {}: {:?}", course_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn fetch_questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Use QueryBuilder for dynamic IN clause
        let mut query_builder = QueryBuilder::<Postgres>::new(
            "SELECT id, course_id, topic, qtype, difficulty, payload_json FROM questions WHERE id IN (",
        );

        let mut separated = query_builder.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<QuestionRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn count_attempts(&self, user_id: i64, quiz_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attempts WHERE user_id = $1 AND quiz_id = $2",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_attempts_since(
        &self,
        user_id: i64,
        quiz_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM attempts
            WHERE user_id = $1 AND quiz_id = $2 AND started_at >= $3
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn create_attempt(&self, attempt: NewAttempt) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO attempts (quiz_id, user_id, started_at, question_ids)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(attempt.quiz_id)
        .bind(attempt.user_id)
        .bind(attempt.started_at)
        .bind(&attempt.question_ids)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create attempt: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(id)
    }

    async fn get_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, AppError> {
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT
                id, quiz_id, user_id, started_at, finished_at,
                total_score, duration_sec, overtime, question_ids
            FROM attempts
            WHERE id = $1
            "#,
        )
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn finish_attempt(&self, finished: FinishedAttempt) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        // The row lock taken here also serializes a concurrent double submit.
        let updated = sqlx::query(
            r#"
            UPDATE attempts
            SET finished_at = $2, total_score = $3, duration_sec = $4, overtime = $5
            WHERE id = $1 AND finished_at IS NULL
            "#,
        )
        .bind(finished.attempt_id)
        .bind(finished.finished_at)
        .bind(finished.total_score)
        .bind(finished.duration_sec)
        .bind(finished.overtime)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to finalize attempt {}: {:?}", finished.attempt_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Attempt {} is already finished",
                finished.attempt_id
            )));
        }

        for graded in &finished.answers {
            let answer = serde_json::to_value(&graded.answer)
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO answers (attempt_id, question_id, answered_at, is_correct, answer)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(finished.attempt_id)
            .bind(graded.question_id)
            .bind(finished.finished_at)
            .bind(graded.is_correct)
            .bind(answer)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to save answer for question {}: {:?}",
                    graded.question_id,
                    e
                );
                AppError::InternalServerError(e.to_string())
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(())
    }

    async fn list_answers(&self, attempt_id: i64) -> Result<Vec<Answer>, AppError> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT attempt_id, question_id, answered_at, is_correct, answer
            FROM answers
            WHERE attempt_id = $1
            ORDER BY id
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Answer::try_from(row).map_err(|e| AppError::InternalServerError(e.to_string())))
            .collect()
    }

    async fn topic_stats(&self, user_id: i64, course_id: i64) -> Result<Vec<TopicStat>, AppError> {
        let stats = sqlx::query_as::<_, TopicStat>(
            r#"
            SELECT
                q.topic,
                COUNT(*)::BIGINT AS total,
                SUM(CASE WHEN a.is_correct THEN 1 ELSE 0 END)::BIGINT AS correct
            FROM answers a
            JOIN attempts t ON t.id = a.attempt_id
            JOIN questions q ON q.id = a.question_id
            JOIN quizzes z ON z.id = t.quiz_id
            WHERE t.user_id = $1 AND z.course_id = $2
            GROUP BY q.topic
            ORDER BY q.topic
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch topic stats: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(stats)
    }

    async fn topic_detail(
        &self,
        user_id: i64,
        course_id: i64,
        topic: &str,
    ) -> Result<Vec<TopicAnswer>, AppError> {
        let rows = sqlx::query_as::<_, TopicAnswer>(
            r#"
            SELECT q.id AS question_id, a.answered_at, a.is_correct
            FROM answers a
            JOIN attempts t ON t.id = a.attempt_id
            JOIN questions q ON q.id = a.question_id
            JOIN quizzes z ON z.id = t.quiz_id
            WHERE t.user_id = $1 AND z.course_id = $2 AND q.topic = $3
            ORDER BY a.answered_at DESC, a.id DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(topic)
        .bind(TOPIC_DETAIL_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch topic detail for '{}': {:?}", topic, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(rows)
    }
}
