// src/models/subject.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'subjects' table in the database.
///
/// `name` is the lowercase-trimmed lookup key; `display_name` preserves the
/// casing of the first quiz that referenced the subject. Rows are created
/// lazily the first time a submission under the subject name is scored.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Normalizes a raw subject name to its lookup key.
pub fn subject_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}
