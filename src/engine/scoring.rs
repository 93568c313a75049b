// src/engine/scoring.rs

use crate::{engine::grading::GradeOutcome, models::quiz::QuizRules};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Finalized {
    pub score: f64,
    pub overtime: bool,
}

/// One point per correct answer. The elapsed time is the client's own report.
pub fn finalize(outcomes: &[GradeOutcome], rules: &QuizRules, client_elapsed_sec: i64) -> Finalized {
    let correct = outcomes
        .iter()
        .filter(|o| o.is_correct == Some(true))
        .count();

    Finalized {
        score: correct as f64,
        overtime: is_overtime(rules, client_elapsed_sec),
    }
}

pub fn is_overtime(rules: &QuizRules, client_elapsed_sec: i64) -> bool {
    rules
        .time_limit()
        .is_some_and(|limit| client_elapsed_sec > limit)
}
