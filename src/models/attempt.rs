// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::scoring::GradedAnswer;

/// One client-submitted answer, untrusted input to normalization.
///
/// `question_text` is echoed by the client, not re-derived from the question
/// bank. A `correct_option` echo, if sent, is ignored in favor of the
/// authoritative bank value.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub selected_option: serde_json::Value,
    /// Fallback only, used when the question id is not found in the quiz.
    #[serde(default, rename = "type")]
    pub question_type: Option<String>,
}

/// DTO for submitting a quiz attempt. The student is taken from the token.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    pub quiz_id: i64,
    pub teacher_id: i64,
    #[validate(length(min = 1, message = "At least one answer is required."))]
    pub answers: Vec<SubmittedAnswer>,
    /// Optional verbatim overrides for the stored ceilings; not re-validated.
    pub total_marks: Option<f64>,
    pub total_negative_marks: Option<f64>,
}

/// Represents the 'attempts' table: one student's full submission for one
/// quiz, append-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub answers: Json<Vec<GradedAnswer>>,
    pub easy_answers: Json<Vec<GradedAnswer>>,
    pub medium_answers: Json<Vec<GradedAnswer>>,
    pub hard_answers: Json<Vec<GradedAnswer>>,
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub total_negative_marks: f64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'attempt_summaries' table: denormalized per-attempt totals
/// for fast aggregate reads. One-to-one with an attempt, never mutated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub id: i64,
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub easy_total: i64,
    pub easy_correct: i64,
    pub easy_marks: f64,
    pub medium_total: i64,
    pub medium_correct: i64,
    pub medium_marks: f64,
    pub hard_total: i64,
    pub hard_correct: i64,
    pub hard_marks: f64,
    pub total_questions: i64,
    pub total_correct: i64,
    pub total_wrong: i64,
    pub obtained_marks: f64,
    pub obtained_negative: f64,
    pub total_possible_marks: f64,
    pub total_negative_possible: f64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-difficulty counts in responses.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DifficultyCounts {
    pub easy: i64,
    pub medium: i64,
    pub hard: i64,
}

/// Per-difficulty marks in responses.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DifficultyMarks {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
}

/// Summary block returned by the submission endpoint.
#[derive(Debug, Serialize)]
pub struct AttemptResultSummary {
    pub obtained_marks: f64,
    pub obtained_negative: f64,
    pub total_questions: i64,
    pub total_possible_marks: f64,
    pub total_negative_possible: f64,
    pub counts: DifficultyCounts,
    pub correct_counts: DifficultyCounts,
    pub marks_by_difficulty: DifficultyMarks,
}

/// Response of the submission endpoint.
#[derive(Debug, Serialize)]
pub struct SubmitQuizResponse {
    pub result_id: i64,
    pub summary: AttemptResultSummary,
}

/// Row for a student's attempt listing, joined with quiz metadata.
#[derive(Debug, Serialize, FromRow)]
pub struct StudentAttemptRow {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub quiz_name: String,
    pub subject: String,
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
