// src/engine/lifecycle.rs

//! Opening and finishing attempts.
//!
//! An attempt is `Open` from `start_attempt` until `submit_attempt` commits
//! its terminal state; after that it is `Finished` for good.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    engine::{
        grading::{self, GradeOutcome},
        rules::{self, RuleDecision},
        sampler, scoring,
    },
    error::AppError,
    models::{
        answer::GradedAnswer,
        attempt::{
            AttemptStatus, FinishedAttempt, NewAttempt, StartedAttempt, Submission,
            SubmissionResult,
        },
        question::Question,
    },
    store::QuizStore,
};

/// Checks the quiz rules, samples questions and opens a new attempt.
pub async fn start_attempt(
    store: &dyn QuizStore,
    user_id: i64,
    quiz_id: i64,
    course_id: i64,
    now: DateTime<Utc>,
) -> Result<StartedAttempt, AppError> {
    let quiz = store.load_quiz(quiz_id).await?;

    if quiz.course_id != course_id {
        return Err(AppError::BadRequest(format!(
            "Quiz {} does not belong to course {}",
            quiz_id, course_id
        )));
    }

    let history = rules::load_history(store, user_id, quiz_id, &quiz.rules, now).await?;
    if let RuleDecision::Deny(reason) = rules::can_start(&quiz.rules, &history) {
        tracing::warn!(
            "User {} denied a new attempt at quiz {}: {}",
            user_id,
            quiz_id,
            reason
        );
        return Err(reason.into());
    }

    let questions = sampler::sample_questions(store, course_id, &quiz.rules).await?;

    let attempt_id = store
        .create_attempt(NewAttempt {
            quiz_id,
            user_id,
            started_at: now,
            question_ids: questions.iter().map(|q| q.id).collect(),
        })
        .await?;

    tracing::info!(
        "User {} started attempt {} at quiz {} with {} questions",
        user_id,
        attempt_id,
        quiz_id,
        questions.len()
    );

    Ok(StartedAttempt {
        attempt_id,
        quiz_id,
        title: quiz.title,
        questions: questions
            .iter()
            .enumerate()
            .map(|(i, q)| q.present(i + 1))
            .collect(),
        time_limit_sec: quiz.rules.time_limit().unwrap_or(0),
    })
}

/// Grades a submission and moves the attempt to its terminal state.
///
/// Grading content always comes from the store. Only questions that were
/// presented in this attempt are graded; anything else in the submission is
/// ignored.
pub async fn submit_attempt(
    store: &dyn QuizStore,
    user_id: i64,
    submission: Submission,
    now: DateTime<Utc>,
) -> Result<SubmissionResult, AppError> {
    let attempt = store
        .get_attempt(submission.attempt_id)
        .await?
        .filter(|a| a.user_id == user_id)
        .ok_or(AppError::NotFound(format!(
            "Attempt {} not found",
            submission.attempt_id
        )))?;

    if attempt.quiz_id != submission.quiz_id {
        return Err(AppError::BadRequest(format!(
            "Attempt {} does not belong to quiz {}",
            attempt.id, submission.quiz_id
        )));
    }

    if attempt.status() == AttemptStatus::Finished {
        return Err(AppError::Conflict(format!(
            "Attempt {} is already finished",
            attempt.id
        )));
    }

    let quiz = store.load_quiz(attempt.quiz_id).await?;

    let ignored: Vec<i64> = submission
        .answers
        .keys()
        .filter(|id| !attempt.question_ids.contains(*id))
        .copied()
        .collect();
    if !ignored.is_empty() {
        tracing::warn!(
            "Attempt {}: ignoring answers to questions that were not presented: {:?}",
            attempt.id,
            ignored
        );
    }

    // Presentation order, restricted to what was answered.
    let answered: Vec<i64> = attempt
        .question_ids
        .iter()
        .filter(|id| submission.answers.contains_key(*id))
        .copied()
        .collect();

    let questions: HashMap<i64, Question> = store
        .fetch_questions_by_ids(&answered)
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();

    let graded: Vec<(i64, GradeOutcome)> = answered
        .iter()
        .filter_map(|id| questions.get(id))
        .map(|question| {
            let submitted = submission
                .answers
                .get(&question.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            (question.id, grading::grade(question, submitted))
        })
        .collect();

    let outcomes: Vec<GradeOutcome> = graded.iter().map(|(_, o)| o.clone()).collect();
    let finalized = scoring::finalize(&outcomes, &quiz.rules, submission.elapsed_sec);

    let graded_count = graded.len();
    store
        .finish_attempt(FinishedAttempt {
            attempt_id: attempt.id,
            finished_at: now,
            total_score: finalized.score,
            duration_sec: submission.elapsed_sec,
            overtime: finalized.overtime,
            answers: graded
                .into_iter()
                .map(|(question_id, outcome)| GradedAnswer {
                    question_id,
                    is_correct: outcome.is_correct,
                    answer: outcome.answer,
                })
                .collect(),
        })
        .await?;

    tracing::info!(
        "Attempt {} finished: score {}, {}s, overtime {}",
        attempt.id,
        finalized.score,
        submission.elapsed_sec,
        finalized.overtime
    );

    Ok(SubmissionResult {
        attempt_id: attempt.id,
        score: finalized.score,
        overtime: finalized.overtime,
        duration_sec: submission.elapsed_sec,
        graded: graded_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use serde_json::json;

    async fn seeded(rules: serde_json::Value) -> (MemoryStore, i64, Vec<i64>) {
        let store = MemoryStore::new();
        let quiz_id = store.insert_quiz(1, "Geography", rules).await;
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(
                store
                    .insert_question(
                        1,
                        "capitals",
                        "single",
                        2,
                        json!({"text": format!("Q{}", i), "choices": ["a", "b"], "correct": [0]}),
                    )
                    .await,
            );
        }
        (store, quiz_id, ids)
    }

    fn answers(pairs: &[(i64, &str)]) -> HashMap<i64, Vec<String>> {
        pairs
            .iter()
            .map(|(id, v)| (*id, vec![v.to_string()]))
            .collect()
    }

    #[tokio::test]
    async fn test_start_presents_questions_in_order() {
        let (store, quiz_id, _) = seeded(json!({"count": 2, "time_limit_sec": 90})).await;
        let started = start_attempt(&store, 7, quiz_id, 1, Utc::now()).await.unwrap();

        assert_eq!(started.questions.len(), 2);
        assert_eq!(started.questions[0].ord, 1);
        assert_eq!(started.questions[1].ord, 2);
        assert_eq!(started.time_limit_sec, 90);
        assert_eq!(started.title, "Geography");

        let attempt = store.get_attempt(started.attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.status(), AttemptStatus::Open);
        assert_eq!(
            attempt.question_ids,
            started.questions.iter().map(|q| q.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_start_rejects_foreign_course() {
        let (store, quiz_id, _) = seeded(json!({})).await;
        let err = start_attempt(&store, 7, quiz_id, 2, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_missing_quiz_is_not_found() {
        let store = MemoryStore::new();
        let err = start_attempt(&store, 7, 99, 1, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_attempt_limit_counts_every_attempt() {
        let (store, quiz_id, _) = seeded(json!({"max_attempts": 2})).await;
        let now = Utc::now();

        start_attempt(&store, 7, quiz_id, 1, now).await.unwrap();
        start_attempt(&store, 7, quiz_id, 1, now).await.unwrap();
        let err = start_attempt(&store, 7, quiz_id, 1, now).await.unwrap_err();
        assert_eq!(err, AppError::PolicyDenied("attempt limit exhausted".into()));

        // Another learner is unaffected.
        assert!(start_attempt(&store, 8, quiz_id, 1, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_cooldown_window() {
        let (store, quiz_id, _) = seeded(json!({"retake_cooldown_sec": 300})).await;
        let first = Utc::now();

        start_attempt(&store, 7, quiz_id, 1, first).await.unwrap();

        let err = start_attempt(&store, 7, quiz_id, 1, first + Duration::seconds(10))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::PolicyDenied("cooldown active".into()));

        let later = first + Duration::seconds(301);
        assert!(start_attempt(&store, 7, quiz_id, 1, later).await.is_ok());
    }

    #[tokio::test]
    async fn test_submit_grades_and_finishes() {
        let (store, quiz_id, _) = seeded(json!({"count": 2, "time_limit_sec": 60})).await;
        let started = start_attempt(&store, 7, quiz_id, 1, Utc::now()).await.unwrap();
        let q1 = started.questions[0].id;
        let q2 = started.questions[1].id;

        let result = submit_attempt(
            &store,
            7,
            Submission {
                attempt_id: started.attempt_id,
                quiz_id,
                answers: answers(&[(q1, "0"), (q2, "1")]),
                elapsed_sec: 61,
            },
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(result.score, 1.0);
        assert!(result.overtime);
        assert_eq!(result.graded, 2);

        let attempt = store.get_attempt(started.attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.status(), AttemptStatus::Finished);
        assert_eq!(attempt.total_score, Some(1.0));
        assert_eq!(attempt.duration_sec, Some(61));
        assert!(attempt.overtime);

        let stored = store.list_answers(started.attempt_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].question_id, q1);
        assert_eq!(stored[0].is_correct, Some(true));
        assert_eq!(stored[1].is_correct, Some(false));
    }

    #[tokio::test]
    async fn test_second_submit_conflicts() {
        let (store, quiz_id, _) = seeded(json!({"count": 1})).await;
        let started = start_attempt(&store, 7, quiz_id, 1, Utc::now()).await.unwrap();
        let q = started.questions[0].id;

        let submission = Submission {
            attempt_id: started.attempt_id,
            quiz_id,
            answers: answers(&[(q, "0")]),
            elapsed_sec: 5,
        };
        submit_attempt(&store, 7, submission.clone(), Utc::now()).await.unwrap();
        let err = submit_attempt(&store, 7, submission, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert_eq!(store.list_answers(started.attempt_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unpresented_questions_are_ignored() {
        let (store, quiz_id, ids) = seeded(json!({"count": 1})).await;
        let started = start_attempt(&store, 7, quiz_id, 1, Utc::now()).await.unwrap();
        let presented = started.questions[0].id;
        let other = *ids.iter().find(|id| **id != presented).unwrap();

        let result = submit_attempt(
            &store,
            7,
            Submission {
                attempt_id: started.attempt_id,
                quiz_id,
                answers: answers(&[(presented, "1"), (other, "0")]),
                elapsed_sec: 5,
            },
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(result.graded, 1);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_other_users_attempt_is_not_found() {
        let (store, quiz_id, _) = seeded(json!({})).await;
        let started = start_attempt(&store, 7, quiz_id, 1, Utc::now()).await.unwrap();

        let err = submit_attempt(
            &store,
            8,
            Submission {
                attempt_id: started.attempt_id,
                quiz_id,
                answers: HashMap::new(),
                elapsed_sec: 5,
            },
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let attempt = store.get_attempt(started.attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.status(), AttemptStatus::Open);
    }

    #[tokio::test]
    async fn test_wrong_quiz_is_rejected() {
        let (store, quiz_id, _) = seeded(json!({})).await;
        let started = start_attempt(&store, 7, quiz_id, 1, Utc::now()).await.unwrap();

        let err = submit_attempt(
            &store,
            7,
            Submission {
                attempt_id: started.attempt_id,
                quiz_id: quiz_id + 1,
                answers: HashMap::new(),
                elapsed_sec: 5,
            },
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
