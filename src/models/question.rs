// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// The four gradable question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multiple,
    Numeric,
    Text,
}

impl QuestionType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "single" => Some(Self::Single),
            "multiple" => Some(Self::Multiple),
            "numeric" => Some(Self::Numeric),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multiple => "multiple",
            Self::Numeric => "numeric",
            Self::Text => "text",
        }
    }
}

/// Payload of single- and multiple-choice questions.
/// `correct` holds zero-based indices into `choices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoicePayload {
    #[serde(default)]
    pub text: String,
    pub choices: Vec<String>,
    pub correct: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericPayload {
    #[serde(default)]
    pub text: String,
    pub correct_value: f64,
}

/// Free-text question. Any entry of `accept` is a right answer
/// (compared trimmed and case-insensitively).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    #[serde(default)]
    pub text: String,
    pub accept: Vec<String>,
}

/// Type-specific question content, parsed once from the stored
/// `(qtype, payload_json)` pair.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionPayload {
    Single(ChoicePayload),
    Multiple(ChoicePayload),
    Numeric(NumericPayload),
    Text(TextPayload),
    /// A known type whose stored payload does not have that type's shape.
    Invalid { qtype: QuestionType, text: String },
    /// A type tag nothing here knows how to grade.
    Unknown { qtype: String, text: String },
}

impl QuestionPayload {
    pub fn from_parts(qtype: &str, raw: &serde_json::Value) -> Self {
        let Some(kind) = QuestionType::parse(qtype) else {
            return Self::Unknown {
                qtype: qtype.to_string(),
                text: text_of(raw),
            };
        };

        let parsed = match kind {
            QuestionType::Single => serde_json::from_value(raw.clone()).map(Self::Single),
            QuestionType::Multiple => serde_json::from_value(raw.clone()).map(Self::Multiple),
            QuestionType::Numeric => serde_json::from_value(raw.clone()).map(Self::Numeric),
            QuestionType::Text => serde_json::from_value(raw.clone()).map(Self::Text),
        };

        parsed.unwrap_or_else(|e| {
            tracing::warn!("Stored {} payload does not match its type: {}", qtype, e);
            Self::Invalid {
                qtype: kind,
                text: text_of(raw),
            }
        })
    }

    pub fn type_tag(&self) -> &str {
        match self {
            Self::Single(_) => QuestionType::Single.as_str(),
            Self::Multiple(_) => QuestionType::Multiple.as_str(),
            Self::Numeric(_) => QuestionType::Numeric.as_str(),
            Self::Text(_) => QuestionType::Text.as_str(),
            Self::Invalid { qtype, .. } => qtype.as_str(),
            Self::Unknown { qtype, .. } => qtype,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Single(p) | Self::Multiple(p) => &p.text,
            Self::Numeric(p) => &p.text,
            Self::Text(p) => &p.text,
            Self::Invalid { text, .. } | Self::Unknown { text, .. } => text,
        }
    }
}

fn text_of(raw: &serde_json::Value) -> String {
    raw.get("text")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub course_id: i64,
    pub topic: String,
    pub qtype: String,
    pub difficulty: i32,
    pub payload_json: serde_json::Value,
}

/// A question with its payload resolved into a typed variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i64,
    pub course_id: i64,
    pub topic: String,
    pub difficulty: i32,
    pub payload: QuestionPayload,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        let payload = QuestionPayload::from_parts(&row.qtype, &row.payload_json);
        Self {
            id: row.id,
            course_id: row.course_id,
            topic: row.topic,
            difficulty: row.difficulty,
            payload,
        }
    }
}

impl Question {
    /// Strips answer keys; `ord` is the 1-based presentation position.
    pub fn present(&self, ord: usize) -> PublicQuestion {
        let choices = match &self.payload {
            QuestionPayload::Single(p) | QuestionPayload::Multiple(p) => Some(p.choices.clone()),
            _ => None,
        };

        PublicQuestion {
            ord,
            id: self.id,
            topic: self.topic.clone(),
            question_type: self.payload.type_tag().to_string(),
            difficulty: self.difficulty,
            text: self.payload.text().to_string(),
            choices,
        }
    }
}

/// DTO for sending question to client (excludes answer keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub ord: usize,
    pub id: i64,
    pub topic: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub difficulty: i32,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}
