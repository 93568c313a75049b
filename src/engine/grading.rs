// src/engine/grading.rs

//! Per-type answer grading.
//!
//! Grading never fails: values that cannot be parsed grade as incorrect and
//! are still recorded in the normalized answer.

use std::collections::HashSet;

use crate::{
    config::NUMERIC_TOLERANCE,
    models::{
        answer::NormalizedAnswer,
        question::{ChoicePayload, NumericPayload, Question, QuestionPayload, TextPayload},
    },
};

/// Result of grading one question.
/// `is_correct` is `None` only when the question type is unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub is_correct: Option<bool>,
    pub answer: NormalizedAnswer,
}

pub fn grade(question: &Question, submitted: &[String]) -> GradeOutcome {
    let raw = submitted.to_vec();

    match &question.payload {
        QuestionPayload::Single(payload) => grade_single(payload, raw),
        QuestionPayload::Multiple(payload) => grade_multiple(payload, raw),
        QuestionPayload::Numeric(payload) => grade_numeric(payload, raw),
        QuestionPayload::Text(payload) => grade_text(payload, &raw),
        QuestionPayload::Invalid { qtype, .. } => {
            tracing::warn!(
                "Question {} has an invalid {} payload; grading as incorrect",
                question.id,
                qtype.as_str()
            );
            GradeOutcome {
                is_correct: Some(false),
                answer: NormalizedAnswer::Unknown { raw },
            }
        }
        QuestionPayload::Unknown { qtype, .. } => {
            tracing::warn!("Question {} has unknown type '{}'", question.id, qtype);
            GradeOutcome {
                is_correct: None,
                answer: NormalizedAnswer::Unknown { raw },
            }
        }
    }
}

fn first(raw: &[String]) -> &str {
    raw.first().map(String::as_str).unwrap_or_default()
}

fn parse_index(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

fn grade_single(payload: &ChoicePayload, raw: Vec<String>) -> GradeOutcome {
    let chosen = parse_index(first(&raw));
    let is_correct = match (chosen, payload.correct.first()) {
        (Some(chosen), Some(correct)) => chosen == *correct,
        _ => false,
    };

    GradeOutcome {
        is_correct: Some(is_correct),
        answer: NormalizedAnswer::Single { chosen, raw },
    }
}

fn grade_multiple(payload: &ChoicePayload, raw: Vec<String>) -> GradeOutcome {
    // Entries that are not indices are dropped; `raw` still records them.
    let chosen: Vec<i64> = raw.iter().filter_map(|v| parse_index(v)).collect();

    let chosen_set: HashSet<i64> = chosen.iter().copied().collect();
    let correct_set: HashSet<i64> = payload.correct.iter().copied().collect();

    GradeOutcome {
        is_correct: Some(chosen_set == correct_set),
        answer: NormalizedAnswer::Multiple { chosen, raw },
    }
}

fn grade_numeric(payload: &NumericPayload, raw: Vec<String>) -> GradeOutcome {
    let value = first(&raw).trim().parse::<f64>().ok();
    let is_correct = value.is_some_and(|v| (v - payload.correct_value).abs() < NUMERIC_TOLERANCE);

    GradeOutcome {
        is_correct: Some(is_correct),
        answer: NormalizedAnswer::Numeric { value, raw },
    }
}

fn grade_text(payload: &TextPayload, raw: &[String]) -> GradeOutcome {
    let value = first(raw).trim().to_string();
    let needle = value.to_lowercase();
    let is_correct = payload
        .accept
        .iter()
        .any(|accepted| accepted.trim().to_lowercase() == needle);

    GradeOutcome {
        is_correct: Some(is_correct),
        answer: NormalizedAnswer::Text { value },
    }
}
