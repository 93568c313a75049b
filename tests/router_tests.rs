// tests/router_tests.rs

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use quiz_engine::{
    config::{Config, StoreKind},
    routes,
    state::AppState,
    store::{MemoryStore, QuizStore},
    utils::jwt::sign_jwt,
};
use tower::ServiceExt;

fn app() -> axum::Router {
    let config = Config {
        database_url: None,
        jwt_secret: "router_test_secret".to_string(),
        rust_log: "error".to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        store: StoreKind::Memory,
    };
    let store: Arc<dyn QuizStore> = Arc::new(MemoryStore::new());
    routes::create_router(AppState { store, config })
}

#[tokio::test]
async fn rejects_garbage_token() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/attempts/1")
                .header("Authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejects_token_signed_with_another_secret() {
    let token = sign_jwt(1, "student", "someone_elses_secret", 600).unwrap();
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/courses/1/topics")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_attempt_is_404() {
    let token = sign_jwt(1, "student", "router_test_secret", 600).unwrap();
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/attempts/99")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_topic_stats_for_new_learner() {
    let token = sign_jwt(1, "student", "router_test_secret", 600).unwrap();
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/courses/1/topics")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats, serde_json::json!([]));
}
