// src/models/quiz.rs

use serde::{Deserialize, Serialize};

use crate::{config::DEFAULT_QUESTION_COUNT, error::AppError};

/// Per-quiz rule set, stored as JSON in the `quizzes.rules` column.
///
/// Every field is optional in the stored JSON. Zero (or a missing field) means
/// "unlimited" / "disabled", except for `count` which falls back to
/// [`DEFAULT_QUESTION_COUNT`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizRules {
    pub count: i64,
    pub by_topics: Vec<String>,
    pub time_limit_sec: i64,
    pub max_attempts: i64,
    pub retake_cooldown_sec: i64,
}

impl QuizRules {
    /// Parses the stored rule JSON and applies defaults.
    /// A null or empty document yields the default rule set.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut rules = if raw.is_null() {
            QuizRules::default()
        } else {
            serde_json::from_value::<QuizRules>(raw.clone())?
        };

        if rules.count <= 0 {
            rules.count = DEFAULT_QUESTION_COUNT;
        }
        Ok(rules)
    }

    pub fn time_limit(&self) -> Option<i64> {
        (self.time_limit_sec > 0).then_some(self.time_limit_sec)
    }
}

/// Represents the 'quizzes' table with its rules already parsed.
#[derive(Debug, Clone, Serialize)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub rules: QuizRules,
}

impl Quiz {
    /// Builds a quiz from its stored row; malformed rules surface as `NotFound`
    /// because the quiz cannot be served.
    pub fn from_stored(
        id: i64,
        course_id: i64,
        title: String,
        rules: &serde_json::Value,
    ) -> Result<Self, AppError> {
        let rules = QuizRules::from_json(rules).map_err(|e| {
            tracing::error!("Quiz {} has malformed rules: {:?}", id, e);
            AppError::NotFound(format!("Quiz {} has malformed rules", id))
        })?;

        Ok(Self {
            id,
            course_id,
            title,
            rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default_to_disabled() {
        let rules = QuizRules::from_json(&json!({})).unwrap();
        assert_eq!(rules.count, 10);
        assert!(rules.by_topics.is_empty());
        assert_eq!(rules.time_limit_sec, 0);
        assert_eq!(rules.max_attempts, 0);
        assert_eq!(rules.retake_cooldown_sec, 0);
        assert_eq!(rules.time_limit(), None);
    }

    #[test]
    fn test_zero_count_falls_back_to_default() {
        let rules = QuizRules::from_json(&json!({"count": 0, "time_limit_sec": 60})).unwrap();
        assert_eq!(rules.count, 10);
        assert_eq!(rules.time_limit(), Some(60));
    }

    #[test]
    fn test_null_rules_are_default() {
        let rules = QuizRules::from_json(&serde_json::Value::Null).unwrap();
        assert_eq!(rules.count, 10);
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let rules = QuizRules::from_json(&json!({
            "count": 3,
            "by_topics": ["algebra"],
            "max_attempts": 2,
            "retake_cooldown_sec": 600
        }))
        .unwrap();
        assert_eq!(rules.count, 3);
        assert_eq!(rules.by_topics, vec!["algebra".to_string()]);
        assert_eq!(rules.max_attempts, 2);
        assert_eq!(rules.retake_cooldown_sec, 600);
    }

    #[test]
    fn test_malformed_rules_are_not_found() {
        let err = Quiz::from_stored(7, 1, "Broken".into(), &json!({"count": "many"})).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
