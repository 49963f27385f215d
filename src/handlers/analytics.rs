// src/handlers/analytics.rs
//
// Teacher-facing aggregate readers. Storage hands back summary rows and the
// raw graded answers; the grouping itself is done here in pure functions so
// the formulas stay testable.

use std::collections::BTreeMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{PgPool, prelude::FromRow, types::Json as SqlJson};

use crate::{
    error::AppError,
    models::quiz::Difficulty,
    scoring::GradedAnswer,
    utils::jwt::Claims,
};

/// One attempt summary with the student denormalized in.
#[derive(Debug, Clone, FromRow)]
pub struct SummaryStatsRow {
    pub student_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub total_questions: i64,
    pub total_correct: i64,
    pub obtained_marks: f64,
    pub total_possible_marks: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Raw answers of one attempt with the quiz's subject.
#[derive(Debug, FromRow)]
pub struct SubjectAnswersRow {
    pub subject: String,
    pub answers: SqlJson<Vec<GradedAnswer>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAccuracy {
    pub subject: String,
    pub total_answers: i64,
    pub correct_answers: i64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectDifficultyAccuracy {
    pub subject: String,
    pub difficulty: String,
    pub total: i64,
    pub correct: i64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentComparison {
    pub student_id: i64,
    pub name: String,
    pub email: String,
    pub attempts: i64,
    pub avg_accuracy: f64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub attempts: i64,
    pub avg_accuracy: f64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeakArea {
    pub subject: String,
    pub accuracy: f64,
    pub easy_accuracy: f64,
    pub medium_accuracy: f64,
    pub hard_accuracy: f64,
}

/// Teacher analytics overview: every reader recomputed on demand from the
/// attempt summaries and stored answers.
pub async fn overview(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.user_id();

    let summaries = sqlx::query_as::<_, SummaryStatsRow>(
        r#"
        SELECT
            s.student_id,
            COALESCE(u.username, 'Unknown') AS student_name,
            COALESCE(u.email, '') AS student_email,
            s.total_questions, s.total_correct,
            s.obtained_marks, s.total_possible_marks,
            s.created_at
        FROM attempt_summaries s
        LEFT JOIN users u ON s.student_id = u.id
        WHERE s.teacher_id = $1
        ORDER BY s.created_at
        "#,
    )
    .bind(teacher_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch attempt summaries: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let answer_rows = sqlx::query_as::<_, SubjectAnswersRow>(
        r#"
        SELECT q.subject, a.answers
        FROM attempts a
        JOIN quizzes q ON a.quiz_id = q.id
        WHERE a.teacher_id = $1
        "#,
    )
    .bind(teacher_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch attempt answers: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let per_subject: Vec<(String, Vec<GradedAnswer>)> = answer_rows
        .into_iter()
        .map(|row| (row.subject, row.answers.0))
        .collect();

    let subjects = subject_accuracy(&per_subject);
    let subject_difficulty = subject_difficulty_accuracy(&per_subject);
    let weak = weak_areas(&subjects, &subject_difficulty);

    Ok(Json(serde_json::json!({
        "overall_accuracy": overall_accuracy(&summaries),
        "subjects": subjects,
        "subject_difficulty": subject_difficulty,
        "students": student_comparison(&summaries),
        "trend": daily_trend(&summaries),
        "weak_areas": weak,
    })))
}

/// Percentage with the shared division-by-zero guard: 0 when the
/// denominator is 0.
fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

fn overall_accuracy(summaries: &[SummaryStatsRow]) -> f64 {
    let correct: i64 = summaries.iter().map(|s| s.total_correct).sum();
    let total: i64 = summaries.iter().map(|s| s.total_questions).sum();
    percentage(correct as f64, total as f64)
}

/// Subject accuracy at answer grain: every stored answer counts once.
fn subject_accuracy(rows: &[(String, Vec<GradedAnswer>)]) -> Vec<SubjectAccuracy> {
    let mut grouped: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for (subject, answers) in rows {
        let entry = grouped.entry(subject.as_str()).or_default();
        for answer in answers {
            entry.0 += 1;
            if answer.is_correct {
                entry.1 += 1;
            }
        }
    }

    grouped
        .into_iter()
        .map(|(subject, (total, correct))| SubjectAccuracy {
            subject: subject.to_string(),
            total_answers: total,
            correct_answers: correct,
            accuracy: percentage(correct as f64, total as f64),
        })
        .collect()
}

/// Same grouping, additionally split by each answer's recorded difficulty.
fn subject_difficulty_accuracy(
    rows: &[(String, Vec<GradedAnswer>)],
) -> Vec<SubjectDifficultyAccuracy> {
    let mut grouped: BTreeMap<(&str, &'static str), (i64, i64)> = BTreeMap::new();
    for (subject, answers) in rows {
        for answer in answers {
            let entry = grouped
                .entry((subject.as_str(), answer.difficulty.as_str()))
                .or_default();
            entry.0 += 1;
            if answer.is_correct {
                entry.1 += 1;
            }
        }
    }

    grouped
        .into_iter()
        .map(|((subject, difficulty), (total, correct))| SubjectDifficultyAccuracy {
            subject: subject.to_string(),
            difficulty: difficulty.to_string(),
            total,
            correct,
            accuracy: percentage(correct as f64, total as f64),
        })
        .collect()
}

/// Per-student averages over their attempt summaries.
fn student_comparison(summaries: &[SummaryStatsRow]) -> Vec<StudentComparison> {
    let mut grouped: BTreeMap<i64, Vec<&SummaryStatsRow>> = BTreeMap::new();
    for summary in summaries {
        grouped.entry(summary.student_id).or_default().push(summary);
    }

    grouped
        .into_iter()
        .map(|(student_id, rows)| {
            let attempts = rows.len() as i64;
            let accuracy_sum: f64 = rows
                .iter()
                .map(|r| percentage(r.total_correct as f64, r.total_questions as f64))
                .sum();
            let score_sum: f64 = rows
                .iter()
                .map(|r| percentage(r.obtained_marks, r.total_possible_marks))
                .sum();
            StudentComparison {
                student_id,
                name: rows[0].student_name.clone(),
                email: rows[0].student_email.clone(),
                attempts,
                avg_accuracy: accuracy_sum / attempts as f64,
                avg_score: score_sum / attempts as f64,
            }
        })
        .collect()
}

/// Accuracy and score per calendar day of submission.
fn daily_trend(summaries: &[SummaryStatsRow]) -> Vec<TrendPoint> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&SummaryStatsRow>> = BTreeMap::new();
    for summary in summaries {
        grouped
            .entry(summary.created_at.date_naive())
            .or_default()
            .push(summary);
    }

    grouped
        .into_iter()
        .map(|(date, rows)| {
            let attempts = rows.len() as i64;
            let accuracy_sum: f64 = rows
                .iter()
                .map(|r| percentage(r.total_correct as f64, r.total_questions as f64))
                .sum();
            let score_sum: f64 = rows
                .iter()
                .map(|r| percentage(r.obtained_marks, r.total_possible_marks))
                .sum();
            TrendPoint {
                date,
                attempts,
                avg_accuracy: accuracy_sum / attempts as f64,
                avg_score: score_sum / attempts as f64,
            }
        })
        .collect()
}

/// The three lowest-accuracy subjects, ascending, with their per-difficulty
/// accuracy pulled from the subject x difficulty rows.
fn weak_areas(
    subjects: &[SubjectAccuracy],
    by_difficulty: &[SubjectDifficultyAccuracy],
) -> Vec<WeakArea> {
    let mut sorted: Vec<&SubjectAccuracy> = subjects.iter().collect();
    sorted.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));

    let accuracy_for = |subject: &str, difficulty: Difficulty| -> f64 {
        by_difficulty
            .iter()
            .find(|row| row.subject == subject && row.difficulty == difficulty.as_str())
            .map(|row| row.accuracy)
            .unwrap_or(0.0)
    };

    sorted
        .into_iter()
        .take(3)
        .map(|s| WeakArea {
            subject: s.subject.clone(),
            accuracy: s.accuracy,
            easy_accuracy: accuracy_for(&s.subject, Difficulty::Easy),
            medium_accuracy: accuracy_for(&s.subject, Difficulty::Medium),
            hard_accuracy: accuracy_for(&s.subject, Difficulty::Hard),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuestionType;
    use crate::scoring::CanonicalAnswer;
    use chrono::{TimeZone, Utc};

    fn answer(difficulty: Difficulty, is_correct: bool) -> GradedAnswer {
        GradedAnswer {
            question_id: 1,
            question_text: "q".into(),
            question_type: QuestionType::Mcq,
            selected: CanonicalAnswer::Choice(Some(0)),
            correct: CanonicalAnswer::Choice(Some(0)),
            is_correct,
            marks_awarded: if is_correct { 1.0 } else { 0.0 },
            difficulty,
            chapter: "Unspecified".into(),
        }
    }

    fn summary(
        student_id: i64,
        name: &str,
        correct: i64,
        questions: i64,
        obtained: f64,
        possible: f64,
        day: u32,
    ) -> SummaryStatsRow {
        SummaryStatsRow {
            student_id,
            student_name: name.into(),
            student_email: String::new(),
            total_questions: questions,
            total_correct: correct,
            obtained_marks: obtained,
            total_possible_marks: possible,
            created_at: Utc.with_ymd_and_hms(2025, 7, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn percentage_guards_zero_denominator() {
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(1.0, 4.0), 25.0);
    }

    #[test]
    fn overall_accuracy_sums_across_summaries() {
        let rows = vec![
            summary(1, "a", 3, 4, 3.0, 4.0, 1),
            summary(2, "b", 1, 4, 1.0, 4.0, 1),
        ];
        assert_eq!(overall_accuracy(&rows), 50.0);
        assert_eq!(overall_accuracy(&[]), 0.0);
    }

    #[test]
    fn subject_accuracy_counts_individual_answers() {
        let rows = vec![
            (
                "math".to_string(),
                vec![answer(Difficulty::Easy, true), answer(Difficulty::Hard, false)],
            ),
            ("math".to_string(), vec![answer(Difficulty::Easy, true)]),
            ("physics".to_string(), vec![answer(Difficulty::Medium, false)]),
        ];

        let result = subject_accuracy(&rows);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].subject, "math");
        assert_eq!(result[0].total_answers, 3);
        assert_eq!(result[0].correct_answers, 2);
        assert_eq!(result[1].accuracy, 0.0);
    }

    #[test]
    fn subject_difficulty_splits_by_answer_difficulty() {
        let rows = vec![(
            "math".to_string(),
            vec![
                answer(Difficulty::Easy, true),
                answer(Difficulty::Easy, false),
                answer(Difficulty::Hard, true),
            ],
        )];

        let result = subject_difficulty_accuracy(&rows);
        let easy = result
            .iter()
            .find(|r| r.difficulty == "easy")
            .expect("easy row");
        assert_eq!(easy.total, 2);
        assert_eq!(easy.accuracy, 50.0);
        let hard = result
            .iter()
            .find(|r| r.difficulty == "hard")
            .expect("hard row");
        assert_eq!(hard.accuracy, 100.0);
    }

    #[test]
    fn student_comparison_averages_attempts() {
        let rows = vec![
            summary(1, "ada", 4, 4, 8.0, 10.0, 1),
            summary(1, "ada", 2, 4, 4.0, 10.0, 2),
            summary(2, "bob", 0, 4, 0.0, 10.0, 2),
        ];

        let result = student_comparison(&rows);
        assert_eq!(result.len(), 2);
        let ada = &result[0];
        assert_eq!(ada.attempts, 2);
        assert_eq!(ada.avg_accuracy, 75.0);
        assert_eq!(ada.avg_score, 60.0);
        let bob = &result[1];
        assert_eq!(bob.avg_accuracy, 0.0);
    }

    #[test]
    fn trend_groups_by_calendar_day() {
        let rows = vec![
            summary(1, "a", 4, 4, 4.0, 4.0, 1),
            summary(2, "b", 0, 4, 0.0, 4.0, 1),
            summary(1, "a", 2, 4, 2.0, 4.0, 2),
        ];

        let result = daily_trend(&rows);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].attempts, 2);
        assert_eq!(result[0].avg_accuracy, 50.0);
        assert_eq!(result[1].attempts, 1);
        assert_eq!(result[1].avg_accuracy, 50.0);
    }

    #[test]
    fn weak_areas_are_three_lowest_ascending() {
        let subjects = vec![
            SubjectAccuracy { subject: "a".into(), total_answers: 4, correct_answers: 4, accuracy: 100.0 },
            SubjectAccuracy { subject: "b".into(), total_answers: 4, correct_answers: 1, accuracy: 25.0 },
            SubjectAccuracy { subject: "c".into(), total_answers: 4, correct_answers: 2, accuracy: 50.0 },
            SubjectAccuracy { subject: "d".into(), total_answers: 4, correct_answers: 3, accuracy: 75.0 },
        ];
        let by_difficulty = vec![SubjectDifficultyAccuracy {
            subject: "b".into(),
            difficulty: "easy".into(),
            total: 4,
            correct: 1,
            accuracy: 25.0,
        }];

        let result = weak_areas(&subjects, &by_difficulty);
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].subject, "b");
        assert_eq!(result[0].easy_accuracy, 25.0);
        // No rows for this difficulty: guarded to zero.
        assert_eq!(result[0].hard_accuracy, 0.0);
        assert_eq!(result[1].subject, "c");
        assert_eq!(result[2].subject, "d");
    }
}
