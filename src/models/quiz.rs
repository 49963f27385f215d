// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Question categories supported by the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[serde(alias = "MCQ")]
    Mcq,
    #[serde(alias = "MSQ")]
    Msq,
    #[serde(alias = "NAT")]
    Nat,
    #[serde(alias = "TrueFalse", alias = "true_false")]
    TrueFalse,
}

impl QuestionType {
    /// Parses the loosely-typed 'type' column / client field.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mcq" => Some(Self::Mcq),
            "msq" => Some(Self::Msq),
            "nat" => Some(Self::Nat),
            "truefalse" | "true_false" => Some(Self::TrueFalse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::Msq => "msq",
            Self::Nat => "nat",
            Self::TrueFalse => "truefalse",
        }
    }
}

/// Difficulty bucket used throughout for partitioning counts and marks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Unknown or empty labels fall back to Easy.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "medium" => Self::Medium,
            "hard" => Self::Hard,
            _ => Self::Easy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub teacher_id: i64,
    pub name: String,
    /// Raw subject name as typed by the teacher; resolved to a Subject row
    /// (lowercase, trimmed) when attempts are scored.
    pub subject: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table in the database.
///
/// `type` and `difficulty` are stored as loose text, the way clients send
/// them; the scoring engine parses them into `QuestionType`/`Difficulty`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,

    pub text: String,

    /// Ordered option texts (MCQ/MSQ only; empty otherwise).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Raw correct-answer markers; semantics depend on the question type.
    pub correct: Json<Vec<serde_json::Value>>,

    pub marks: f64,
    pub negative_marks: f64,
    pub difficulty: String,
    pub chapter: String,
}

/// DTO for sending a question to students (excludes the correct markers).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub text: String,
    pub options: Json<Vec<String>>,
    pub marks: f64,
    pub negative_marks: f64,
    pub difficulty: String,
    pub chapter: String,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            text: q.text,
            options: q.options,
            marks: q.marks,
            negative_marks: q.negative_marks,
            difficulty: q.difficulty,
            chapter: q.chapter,
        }
    }
}

/// DTO for creating a new quiz with its question bank.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(min = 1, message = "A quiz needs at least one question."), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

/// DTO for one question inside a quiz creation request.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct: Vec<serde_json::Value>,
    #[serde(default)]
    pub marks: f64,
    #[serde(default)]
    pub negative_marks: f64,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub chapter: String,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
