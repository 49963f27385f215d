// src/models/tally.rs

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::prelude::FromRow;

use crate::scoring::{Bucket, ChapterSplit};

/// One chapter-level tally row as stored: the running accumulator is keyed
/// by (student, subject, chapter, difficulty) and only ever incremented.
#[derive(Debug, Clone, FromRow)]
pub struct ChapterTallyRow {
    pub subject_id: i64,
    pub display_name: String,
    pub chapter: String,
    pub difficulty: String,
    pub total: i64,
    pub correct: i64,
    pub wrong: i64,
}

/// One overall (non-chapter) tally row for a (student, subject) pair.
#[derive(Debug, Clone, FromRow)]
pub struct SubjectTallyRow {
    pub subject_id: i64,
    pub display_name: String,
    pub difficulty: String,
    pub total: i64,
    pub correct: i64,
    pub wrong: i64,
}

/// Reassembled tally for one subject, as served to clients: the overall
/// performance block plus the chapter map, both split by difficulty.
#[derive(Debug, Default, Serialize)]
pub struct SubjectTallyReport {
    pub subject: String,
    pub overall: ChapterSplit,
    pub chapters: BTreeMap<String, ChapterSplit>,
}

impl SubjectTallyReport {
    pub fn overall_totals(&self) -> Bucket {
        let mut out = Bucket::default();
        for bucket in [&self.overall.easy, &self.overall.medium, &self.overall.hard] {
            out.total += bucket.total;
            out.correct += bucket.correct;
            out.wrong += bucket.wrong;
        }
        out
    }
}
