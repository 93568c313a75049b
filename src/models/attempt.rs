// src/models/attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{answer::Answer, question::PublicQuestion};

/// Represents the 'attempts' table in the database.
///
/// An attempt is open while `finished_at` is null. `total_score`,
/// `finished_at`, `duration_sec` and `overtime` are written together, once.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_score: Option<f64>,
    pub duration_sec: Option<i64>,
    pub overtime: bool,
    /// Questions served at start, in presentation order.
    pub question_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Open,
    Finished,
}

impl Attempt {
    pub fn status(&self) -> AttemptStatus {
        if self.finished_at.is_some() {
            AttemptStatus::Finished
        } else {
            AttemptStatus::Open
        }
    }
}

/// Insert payload for a freshly opened attempt.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: i64,
    pub user_id: i64,
    pub started_at: DateTime<Utc>,
    pub question_ids: Vec<i64>,
}

/// Terminal state of an attempt together with its graded answers.
/// Stores apply this as a single all-or-nothing write.
#[derive(Debug, Clone)]
pub struct FinishedAttempt {
    pub attempt_id: i64,
    pub finished_at: DateTime<Utc>,
    pub total_score: f64,
    pub duration_sec: i64,
    pub overtime: bool,
    pub answers: Vec<crate::models::answer::GradedAnswer>,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(range(min = 1))]
    pub course_id: i64,
}

/// DTO returned when an attempt has been opened.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartedAttempt {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub title: String,
    pub questions: Vec<PublicQuestion>,
    /// Zero when the quiz has no time limit.
    pub time_limit_sec: i64,
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(range(min = 1))]
    pub quiz_id: i64,

    /// Key: question ID, value: the raw submitted values
    /// (one for single/numeric/text, any number for multiple).
    #[serde(default)]
    pub answers: HashMap<i64, Vec<String>>,

    /// Elapsed seconds as measured by the client.
    #[validate(range(min = 0))]
    pub elapsed_sec: i64,
}

/// A submission bound to the attempt it targets.
#[derive(Debug, Clone)]
pub struct Submission {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub answers: HashMap<i64, Vec<String>>,
    pub elapsed_sec: i64,
}

/// DTO returned after an attempt has been graded.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub attempt_id: i64,
    pub score: f64,
    pub overtime: bool,
    pub duration_sec: i64,
    pub graded: usize,
}

/// An attempt with its graded answers.
#[derive(Debug, Serialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub status: AttemptStatus,
    pub answers: Vec<Answer>,
}
