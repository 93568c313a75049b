// src/engine/rules.rs

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::{error::AppError, models::quiz::QuizRules, store::QuizStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AttemptLimitExhausted,
    CooldownActive,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::AttemptLimitExhausted => write!(f, "attempt limit exhausted"),
            DenyReason::CooldownActive => write!(f, "cooldown active"),
        }
    }
}

impl From<DenyReason> for AppError {
    fn from(reason: DenyReason) -> Self {
        AppError::PolicyDenied(reason.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleDecision {
    Allow,
    Deny(DenyReason),
}

/// Attempt counts for one (user, quiz) pair.
/// `recent_attempts` counts attempts started inside the cooldown window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptHistory {
    pub total_attempts: i64,
    pub recent_attempts: i64,
}

/// Decides whether a new attempt may start. Gates run in order and the first
/// failing one wins.
pub fn can_start(rules: &QuizRules, history: &AttemptHistory) -> RuleDecision {
    if rules.max_attempts > 0 && history.total_attempts >= rules.max_attempts {
        return RuleDecision::Deny(DenyReason::AttemptLimitExhausted);
    }

    if rules.retake_cooldown_sec > 0 && history.recent_attempts > 0 {
        return RuleDecision::Deny(DenyReason::CooldownActive);
    }

    RuleDecision::Allow
}

/// Gathers the counts the enabled gates need; disabled gates cost no query.
pub async fn load_history(
    store: &dyn QuizStore,
    user_id: i64,
    quiz_id: i64,
    rules: &QuizRules,
    now: DateTime<Utc>,
) -> Result<AttemptHistory, AppError> {
    let mut history = AttemptHistory::default();

    if rules.max_attempts > 0 {
        history.total_attempts = store.count_attempts(user_id, quiz_id).await?;
    }

    if rules.retake_cooldown_sec > 0 {
        let since = Duration::try_seconds(rules.retake_cooldown_sec)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        history.recent_attempts = store.count_attempts_since(user_id, quiz_id, since).await?;
    }

    Ok(history)
}
