// src/config.rs

use std::env;

/// Number of questions drawn when a quiz's rules leave `count` unset or zero.
pub const DEFAULT_QUESTION_COUNT: i64 = 10;

/// Absolute tolerance used when grading numeric answers.
pub const NUMERIC_TOLERANCE: f64 = 1e-9;

/// Most rows returned by a topic detail query.
pub const TOPIC_DETAIL_LIMIT: i64 = 200;

/// Which `QuizStore` backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub rust_log: String,
    pub listen_addr: String,
    pub store: StoreKind,
}

impl Config {
    /// Reads the process environment only; `main` loads `.env` beforehand.
    pub fn from_env() -> Result<Self, env::VarError> {
        let store = match env::var("STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            _ => StoreKind::Postgres,
        };

        // Only the Postgres backend needs a connection string.
        let database_url = match store {
            StoreKind::Postgres => Some(env::var("DATABASE_URL")?),
            StoreKind::Memory => env::var("DATABASE_URL").ok(),
        };

        let jwt_secret = env::var("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            listen_addr,
            store,
        })
    }
}
