// src/scoring/mod.rs
//
// The scoring engine: pure functions only. Normalization turns heterogeneous
// client/question-bank answer shapes into canonical values, scoring compares
// them and assigns marks, aggregation folds one submission into the
// per-difficulty and per-chapter counts the persistence layer writes out.

pub mod aggregate;
pub mod normalize;
pub mod score;

pub use aggregate::{AttemptBreakdown, Bucket, ChapterSplit, DifficultyStats, aggregate_attempt, quiz_ceilings};
pub use normalize::CanonicalAnswer;
pub use score::{GradedAnswer, QuestionKey, grade_answer};
