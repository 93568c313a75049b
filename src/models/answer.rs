// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The stored form of a learner's answer, tagged by question type.
/// `raw` keeps exactly what was submitted so malformed input stays auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NormalizedAnswer {
    Single {
        chosen: Option<i64>,
        raw: Vec<String>,
    },
    Multiple {
        chosen: Vec<i64>,
        raw: Vec<String>,
    },
    Numeric {
        value: Option<f64>,
        raw: Vec<String>,
    },
    Text {
        value: String,
    },
    Unknown {
        raw: Vec<String>,
    },
}

/// A graded answer ready to be written; belongs to the attempt being finished.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub is_correct: Option<bool>,
    pub answer: NormalizedAnswer,
}

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerRow {
    pub attempt_id: i64,
    pub question_id: i64,
    pub answered_at: DateTime<Utc>,
    pub is_correct: Option<bool>,
    pub answer: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub attempt_id: i64,
    pub question_id: i64,
    pub answered_at: DateTime<Utc>,
    pub is_correct: Option<bool>,
    pub answer: NormalizedAnswer,
}

impl TryFrom<AnswerRow> for Answer {
    type Error = serde_json::Error;

    fn try_from(row: AnswerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            attempt_id: row.attempt_id,
            question_id: row.question_id,
            answered_at: row.answered_at,
            is_correct: row.is_correct,
            answer: serde_json::from_value(row.answer)?,
        })
    }
}

/// Aggregated correctness for one topic, for one learner in one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TopicStat {
    pub topic: String,
    pub total: i64,
    pub correct: i64,
}

/// One answer in a learner's history for a single topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TopicAnswer {
    pub question_id: i64,
    pub answered_at: DateTime<Utc>,
    pub is_correct: Option<bool>,
}

/// DTO for the topic statistics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicStatResponse {
    pub topic: String,
    pub total: i64,
    pub correct: i64,
    pub percent: i64,
}

impl From<TopicStat> for TopicStatResponse {
    fn from(stat: TopicStat) -> Self {
        // Rounded half-up to a whole percent.
        let percent = if stat.total > 0 {
            ((stat.correct as f64 / stat.total as f64) * 100.0 + 0.5) as i64
        } else {
            0
        };
        Self {
            topic: stat.topic,
            total: stat.total,
            correct: stat.correct,
            percent,
        }
    }
}
