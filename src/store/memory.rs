// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    config::TOPIC_DETAIL_LIMIT,
    engine::sampler,
    error::AppError,
    models::{
        answer::{Answer, TopicAnswer, TopicStat},
        attempt::{Attempt, FinishedAttempt, NewAttempt},
        question::{Question, QuestionRow},
        quiz::Quiz,
    },
    store::QuizStore,
};

/// Stored quiz before its rules are parsed, so malformed rule JSON behaves
/// exactly as it does in PostgreSQL.
#[derive(Debug, Clone)]
struct QuizRecord {
    course_id: i64,
    title: String,
    rules: serde_json::Value,
}

#[derive(Default)]
struct Inner {
    quizzes: HashMap<i64, QuizRecord>,
    questions: BTreeMap<i64, Question>,
    attempts: BTreeMap<i64, Attempt>,
    answers: Vec<Answer>,
    next_quiz_id: i64,
    next_question_id: i64,
    next_attempt_id: i64,
}

/// Process-local store. All state sits behind one async mutex, which makes
/// every trait method atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quiz with raw rule JSON and returns its id.
    pub async fn insert_quiz(&self, course_id: i64, title: &str, rules: serde_json::Value) -> i64 {
        let mut inner = self.inner.lock().await;
        inner.next_quiz_id += 1;
        let id = inner.next_quiz_id;
        inner.quizzes.insert(
            id,
            QuizRecord {
                course_id,
                title: title.to_string(),
                rules,
            },
        );
        id
    }

    /// Adds a question from its stored parts and returns its id.
    pub async fn insert_question(
        &self,
        course_id: i64,
        topic: &str,
        qtype: &str,
        difficulty: i32,
        payload: serde_json::Value,
    ) -> i64 {
        let mut inner = self.inner.lock().await;
        inner.next_question_id += 1;
        let id = inner.next_question_id;
        let question = Question::from(QuestionRow {
            id,
            course_id,
            topic: topic.to_string(),
            qtype: qtype.to_string(),
            difficulty,
            payload_json: payload,
        });
        inner.questions.insert(id, question);
        id
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn load_quiz(&self, quiz_id: i64) -> Result<Quiz, AppError> {
        let record = self
            .inner
            .lock()
            .await
            .quizzes
            .get(&quiz_id)
            .cloned()
            .ok_or(AppError::NotFound(format!("Quiz {} not found", quiz_id)))?;

        Quiz::from_stored(quiz_id, record.course_id, record.title, &record.rules)
    }

    async fn sample_questions(&self, course_id: i64, count: i64) -> Result<Vec<Question>, AppError> {
        let inner = self.inner.lock().await;
        let pool: Vec<&Question> = inner
            .questions
            .values()
            .filter(|q| q.course_id == course_id)
            .collect();

        let count = usize::try_from(count).unwrap_or(0);
        Ok(sampler::sample(&pool, count).into_iter().cloned().collect())
    }

    async fn fetch_questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.questions.get(id).cloned())
            .collect())
    }

    async fn count_attempts(&self, user_id: i64, quiz_id: i64) -> Result<i64, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .count() as i64)
    }

    async fn count_attempts_since(
        &self,
        user_id: i64,
        quiz_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id && a.started_at >= since)
            .count() as i64)
    }

    async fn create_attempt(&self, attempt: NewAttempt) -> Result<i64, AppError> {
        let mut inner = self.inner.lock().await;
        inner.next_attempt_id += 1;
        let id = inner.next_attempt_id;
        inner.attempts.insert(
            id,
            Attempt {
                id,
                quiz_id: attempt.quiz_id,
                user_id: attempt.user_id,
                started_at: attempt.started_at,
                finished_at: None,
                total_score: None,
                duration_sec: None,
                overtime: false,
                question_ids: attempt.question_ids,
            },
        );
        Ok(id)
    }

    async fn get_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, AppError> {
        Ok(self.inner.lock().await.attempts.get(&attempt_id).cloned())
    }

    async fn finish_attempt(&self, finished: FinishedAttempt) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;

        let attempt = inner
            .attempts
            .get_mut(&finished.attempt_id)
            .ok_or(AppError::NotFound(format!(
                "Attempt {} not found",
                finished.attempt_id
            )))?;

        if attempt.finished_at.is_some() {
            return Err(AppError::Conflict(format!(
                "Attempt {} is already finished",
                finished.attempt_id
            )));
        }

        attempt.finished_at = Some(finished.finished_at);
        attempt.total_score = Some(finished.total_score);
        attempt.duration_sec = Some(finished.duration_sec);
        attempt.overtime = finished.overtime;

        let answers = finished.answers.into_iter().map(|graded| Answer {
            attempt_id: finished.attempt_id,
            question_id: graded.question_id,
            answered_at: finished.finished_at,
            is_correct: graded.is_correct,
            answer: graded.answer,
        });
        inner.answers.extend(answers);

        Ok(())
    }

    async fn list_answers(&self, attempt_id: i64) -> Result<Vec<Answer>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn topic_stats(&self, user_id: i64, course_id: i64) -> Result<Vec<TopicStat>, AppError> {
        let inner = self.inner.lock().await;
        let mut by_topic: BTreeMap<String, (i64, i64)> = BTreeMap::new();

        for answer in &inner.answers {
            let Some(attempt) = inner.attempts.get(&answer.attempt_id) else {
                continue;
            };
            if attempt.user_id != user_id {
                continue;
            }
            let in_course = inner
                .quizzes
                .get(&attempt.quiz_id)
                .is_some_and(|quiz| quiz.course_id == course_id);
            if !in_course {
                continue;
            }
            let Some(question) = inner.questions.get(&answer.question_id) else {
                continue;
            };

            let entry = by_topic.entry(question.topic.clone()).or_default();
            entry.0 += 1;
            if answer.is_correct == Some(true) {
                entry.1 += 1;
            }
        }

        Ok(by_topic
            .into_iter()
            .map(|(topic, (total, correct))| TopicStat {
                topic,
                total,
                correct,
            })
            .collect())
    }

    async fn topic_detail(
        &self,
        user_id: i64,
        course_id: i64,
        topic: &str,
    ) -> Result<Vec<TopicAnswer>, AppError> {
        let inner = self.inner.lock().await;

        // Walk newest-inserted first so the stable sort breaks ties the same way.
        let mut rows: Vec<TopicAnswer> = inner
            .answers
            .iter()
            .rev()
            .filter(|answer| {
                inner.attempts.get(&answer.attempt_id).is_some_and(|attempt| {
                    attempt.user_id == user_id
                        && inner
                            .quizzes
                            .get(&attempt.quiz_id)
                            .is_some_and(|quiz| quiz.course_id == course_id)
                })
            })
            .filter(|answer| {
                inner
                    .questions
                    .get(&answer.question_id)
                    .is_some_and(|question| question.topic == topic)
            })
            .map(|answer| TopicAnswer {
                question_id: answer.question_id,
                answered_at: answer.answered_at,
                is_correct: answer.is_correct,
            })
            .collect();

        rows.sort_by(|a, b| b.answered_at.cmp(&a.answered_at));
        rows.truncate(usize::try_from(TOPIC_DETAIL_LIMIT).unwrap_or(usize::MAX));
        Ok(rows)
    }
}
