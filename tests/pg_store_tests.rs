// tests/pg_store_tests.rs
//
// These run against a real PostgreSQL: DATABASE_URL=... cargo test -- --ignored

use std::collections::HashMap;

use chrono::Utc;
use quiz_engine::{
    engine,
    error::AppError,
    models::attempt::Submission,
    store::{PgStore, QuizStore},
};
use sqlx::postgres::PgPoolOptions;

async fn connect() -> PgStore {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    PgStore::new(pool)
}

/// Creates a course with one quiz and two single-choice questions (key: index 0).
async fn seed(store: &PgStore, rules: serde_json::Value) -> (i64, i64) {
    let course_id: i64 =
        sqlx::query_scalar("INSERT INTO courses (title) VALUES ('Geography') RETURNING id")
            .fetch_one(store.pool())
            .await
            .unwrap();

    let quiz_id: i64 = sqlx::query_scalar(
        "INSERT INTO quizzes (course_id, title, rules) VALUES ($1, 'Capitals', $2) RETURNING id",
    )
    .bind(course_id)
    .bind(rules)
    .fetch_one(store.pool())
    .await
    .unwrap();

    for i in 0..2 {
        sqlx::query(
            r#"
            INSERT INTO questions (course_id, topic, qtype, difficulty, payload_json)
            VALUES ($1, 'capitals', 'single', 2, $2)
            "#,
        )
        .bind(course_id)
        .bind(serde_json::json!({
            "text": format!("Question {}", i),
            "choices": ["right", "wrong"],
            "correct": [0]
        }))
        .execute(store.pool())
        .await
        .unwrap();
    }

    (course_id, quiz_id)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_attempt_lifecycle() {
    let store = connect().await;
    let (course_id, quiz_id) = seed(&store, serde_json::json!({"count": 2, "max_attempts": 1})).await;
    let user_id = 1_000_000 + quiz_id;

    let started = engine::start_attempt(&store, user_id, quiz_id, course_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(started.questions.len(), 2);

    let mut answers = HashMap::new();
    answers.insert(started.questions[0].id, vec!["0".to_string()]);
    answers.insert(started.questions[1].id, vec!["1".to_string()]);

    let submission = Submission {
        attempt_id: started.attempt_id,
        quiz_id,
        answers,
        elapsed_sec: 30,
    };

    let result = engine::submit_attempt(&store, user_id, submission.clone(), Utc::now())
        .await
        .unwrap();
    assert_eq!(result.score, 1.0);

    let again = engine::submit_attempt(&store, user_id, submission, Utc::now()).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
    assert_eq!(store.list_answers(started.attempt_id).await.unwrap().len(), 2);

    let denied = engine::start_attempt(&store, user_id, quiz_id, course_id, Utc::now()).await;
    assert_eq!(
        denied.unwrap_err(),
        AppError::PolicyDenied("attempt limit exhausted".to_string())
    );

    let stats = store.topic_stats(user_id, course_id).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].total, 2);
    assert_eq!(stats[0].correct, 1);

    let detail = store.topic_detail(user_id, course_id, "capitals").await.unwrap();
    assert_eq!(detail.len(), 2);
    assert_eq!(detail.iter().filter(|a| a.is_correct == Some(true)).count(), 1);
    assert!(store.topic_detail(user_id, course_id, "rivers").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_malformed_rules_are_not_found() {
    let store = connect().await;
    let (_, quiz_id) = seed(&store, serde_json::json!({"count": "ten"})).await;

    let err = store.load_quiz(quiz_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
