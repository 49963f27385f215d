// src/handlers/attempt.rs

use std::collections::{BTreeMap, HashMap};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{
            AttemptResultSummary, AttemptSummary, DifficultyCounts, DifficultyMarks,
            StudentAttemptRow, SubmitQuizRequest, SubmitQuizResponse,
        },
        quiz::{Difficulty, Question, QuestionType, Quiz},
        subject::{Subject, subject_key},
        tally::{ChapterTallyRow, SubjectTallyReport, SubjectTallyRow},
        user::User,
    },
    scoring::{
        AttemptBreakdown, GradedAnswer, QuestionKey, aggregate_attempt, grade_answer,
        quiz_ceilings,
    },
    utils::jwt::Claims,
};

const DIFFICULTIES: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

/// Submits a student's quiz attempt: normalizes and scores every answer,
/// folds the aggregates, then performs the denormalized writes.
///
/// * Resolves (upserts) the subject of the quiz.
/// * Applies additive increments to the running chapter/subject tallies.
/// * Persists the attempt, the teacher-facing snapshot and the summary.
///
/// The writes are sequential and not covered by one transaction; a failure
/// partway leaves earlier writes committed (matching the original contract).
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let student_id = claims.user_id();

    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT id, teacher_id, name, subject, created_at FROM quizzes WHERE id = $1",
    )
    .bind(payload.quiz_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, quiz_id, type, text, options, correct, marks, negative_marks, difficulty, chapter
        FROM questions
        WHERE quiz_id = $1
        ORDER BY id
        "#,
    )
    .bind(payload.quiz_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch question bank: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let bank: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();

    // Normalize and score everything in memory before touching storage.
    let graded: Vec<GradedAnswer> = payload
        .answers
        .iter()
        .map(|answer| {
            let key = match bank.get(&answer.question_id) {
                Some(q) => QuestionKey {
                    question_type: QuestionType::parse(&q.question_type)
                        .unwrap_or(QuestionType::Mcq),
                    options: q.options.0.clone(),
                    correct: q.correct.0.clone(),
                    marks: q.marks,
                    negative_marks: q.negative_marks,
                    difficulty: Difficulty::parse(&q.difficulty),
                    chapter: q.chapter.clone(),
                },
                None => {
                    // The answer references a question the quiz does not
                    // have; fall back to its self-reported type.
                    let fallback = answer
                        .question_type
                        .as_deref()
                        .and_then(QuestionType::parse)
                        .unwrap_or(QuestionType::Mcq);
                    QuestionKey::fallback(fallback)
                }
            };
            grade_answer(
                &key,
                answer.question_id,
                &answer.question_text,
                &answer.selected_option,
            )
        })
        .collect();

    let breakdown = aggregate_attempt(&graded);

    let bank_marks: Vec<(f64, f64)> = questions
        .iter()
        .map(|q| (q.marks, q.negative_marks))
        .collect();
    let (computed_possible, computed_negative) = quiz_ceilings(&bank_marks);
    // Client-supplied ceilings, when present, are stored verbatim.
    let total_possible = payload.total_marks.unwrap_or(computed_possible);
    let total_negative = payload.total_negative_marks.unwrap_or(computed_negative);

    // 1. Resolve the subject (lazily created on first use).
    let subject = sqlx::query_as::<_, Subject>(
        r#"
        INSERT INTO subjects (name, display_name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name, display_name, created_at
        "#,
    )
    .bind(subject_key(&quiz.subject))
    .bind(quiz.subject.trim())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to resolve subject: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // 2. Running tallies, incremented additively.
    apply_tally_increments(&pool, student_id, subject.id, &breakdown).await?;

    // 3. The attempt itself, with convenience buckets by difficulty.
    let bucket_of = |d: Difficulty| -> Vec<GradedAnswer> {
        graded.iter().filter(|a| a.difficulty == d).cloned().collect()
    };

    let attempt_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO attempts
        (quiz_id, student_id, teacher_id, answers, easy_answers, medium_answers, hard_answers,
         obtained_marks, total_marks, total_negative_marks)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(quiz.id)
    .bind(student_id)
    .bind(payload.teacher_id)
    .bind(SqlJson(&graded))
    .bind(SqlJson(bucket_of(Difficulty::Easy)))
    .bind(SqlJson(bucket_of(Difficulty::Medium)))
    .bind(SqlJson(bucket_of(Difficulty::Hard)))
    .bind(breakdown.obtained_marks)
    .bind(total_possible)
    .bind(total_negative)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // 4. Teacher-facing snapshot. A failed lookup skips the write instead
    // of failing the whole submission.
    write_teacher_response(&pool, &payload, &quiz, student_id, breakdown.obtained_marks).await;

    // 5. The summary record used by the aggregate readers.
    sqlx::query(
        r#"
        INSERT INTO attempt_summaries
        (attempt_id, quiz_id, student_id, teacher_id,
         easy_total, easy_correct, easy_marks,
         medium_total, medium_correct, medium_marks,
         hard_total, hard_correct, hard_marks,
         total_questions, total_correct, total_wrong,
         obtained_marks, obtained_negative, total_possible_marks, total_negative_possible)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
        "#,
    )
    .bind(attempt_id)
    .bind(quiz.id)
    .bind(student_id)
    .bind(payload.teacher_id)
    .bind(breakdown.easy.total)
    .bind(breakdown.easy.correct)
    .bind(breakdown.easy.marks)
    .bind(breakdown.medium.total)
    .bind(breakdown.medium.correct)
    .bind(breakdown.medium.marks)
    .bind(breakdown.hard.total)
    .bind(breakdown.hard.correct)
    .bind(breakdown.hard.marks)
    .bind(breakdown.total_questions)
    .bind(breakdown.total_correct)
    .bind(breakdown.total_wrong)
    .bind(breakdown.obtained_marks)
    .bind(breakdown.obtained_negative)
    .bind(total_possible)
    .bind(total_negative)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert attempt summary: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let response = SubmitQuizResponse {
        result_id: attempt_id,
        summary: AttemptResultSummary {
            obtained_marks: breakdown.obtained_marks,
            obtained_negative: breakdown.obtained_negative,
            total_questions: breakdown.total_questions,
            total_possible_marks: total_possible,
            total_negative_possible: total_negative,
            counts: DifficultyCounts {
                easy: breakdown.easy.total,
                medium: breakdown.medium.total,
                hard: breakdown.hard.total,
            },
            correct_counts: DifficultyCounts {
                easy: breakdown.easy.correct,
                medium: breakdown.medium.correct,
                hard: breakdown.hard.correct,
            },
            marks_by_difficulty: DifficultyMarks {
                easy: breakdown.easy.marks,
                medium: breakdown.medium.marks,
                hard: breakdown.hard.marks,
            },
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Applies one submission's deltas to the running tallies.
///
/// Every touched (chapter, difficulty) row and the overall per-subject rows
/// receive an atomic additive upsert; the whole batch runs in a single
/// transaction so concurrent submissions interleave without losing
/// increments.
async fn apply_tally_increments(
    pool: &PgPool,
    student_id: i64,
    subject_id: i64,
    breakdown: &AttemptBreakdown,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    for (chapter, split) in &breakdown.chapters {
        for difficulty in DIFFICULTIES {
            let bucket = split.bucket(difficulty);
            if bucket.total == 0 {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO chapter_tallies
                (student_id, subject_id, chapter, difficulty, total, correct, wrong)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (student_id, subject_id, chapter, difficulty) DO UPDATE SET
                    total = chapter_tallies.total + EXCLUDED.total,
                    correct = chapter_tallies.correct + EXCLUDED.correct,
                    wrong = chapter_tallies.wrong + EXCLUDED.wrong
                "#,
            )
            .bind(student_id)
            .bind(subject_id)
            .bind(chapter)
            .bind(difficulty.as_str())
            .bind(bucket.total)
            .bind(bucket.correct)
            .bind(bucket.wrong)
            .execute(&mut *tx)
            .await?;
        }
    }

    // Overall performance block: incremented the same way, never recomputed
    // from the chapter rows.
    for difficulty in DIFFICULTIES {
        let stats = match difficulty {
            Difficulty::Easy => &breakdown.easy,
            Difficulty::Medium => &breakdown.medium,
            Difficulty::Hard => &breakdown.hard,
        };
        if stats.total == 0 {
            continue;
        }
        sqlx::query(
            r#"
            INSERT INTO subject_tallies
            (student_id, subject_id, difficulty, total, correct, wrong)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (student_id, subject_id, difficulty) DO UPDATE SET
                total = subject_tallies.total + EXCLUDED.total,
                correct = subject_tallies.correct + EXCLUDED.correct,
                wrong = subject_tallies.wrong + EXCLUDED.wrong
            "#,
        )
        .bind(student_id)
        .bind(subject_id)
        .bind(difficulty.as_str())
        .bind(stats.total)
        .bind(stats.correct)
        .bind(stats.wrong)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Best-effort denormalized snapshot for teacher listings.
async fn write_teacher_response(
    pool: &PgPool,
    payload: &SubmitQuizRequest,
    quiz: &Quiz,
    student_id: i64,
    obtained_marks: f64,
) {
    let student = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, role, created_at FROM users WHERE id = $1",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await;

    let student = match student {
        Ok(Some(student)) => student,
        Ok(None) => {
            tracing::warn!("Skipping teacher response: student {} not found", student_id);
            return;
        }
        Err(e) => {
            tracing::warn!("Skipping teacher response: student lookup failed: {:?}", e);
            return;
        }
    };

    let result = sqlx::query(
        r#"
        INSERT INTO teacher_responses
        (teacher_id, quiz_id, student_id, student_name, student_email, quiz_name, obtained_marks)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(payload.teacher_id)
    .bind(quiz.id)
    .bind(student_id)
    .bind(&student.username)
    .bind(student.email.as_deref().unwrap_or(""))
    .bind(&quiz.name)
    .bind(obtained_marks)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("Skipping teacher response: insert failed: {:?}", e);
    }
}

/// Fetches the caller's latest summary for one quiz.
pub async fn get_my_summary(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let summary = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT *
        FROM attempt_summaries
        WHERE quiz_id = $1 AND student_id = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(quiz_id)
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("No attempt for this quiz".to_string()))?;

    Ok(Json(summary))
}

/// Lists all of the caller's attempts, joined with quiz metadata.
pub async fn list_my_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, StudentAttemptRow>(
        r#"
        SELECT
            a.id AS attempt_id, a.quiz_id, q.name AS quiz_name, q.subject,
            a.obtained_marks, a.total_marks, a.created_at
        FROM attempts a
        JOIN quizzes q ON a.quiz_id = q.id
        WHERE a.student_id = $1
        ORDER BY a.created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}

/// Chapter-wise running tallies for the caller, across all subjects.
pub async fn get_my_tallies(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();

    let overall_rows = sqlx::query_as::<_, SubjectTallyRow>(
        r#"
        SELECT t.subject_id, s.display_name, t.difficulty, t.total, t.correct, t.wrong
        FROM subject_tallies t
        JOIN subjects s ON t.subject_id = s.id
        WHERE t.student_id = $1
        ORDER BY s.display_name, t.difficulty
        "#,
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    let chapter_rows = sqlx::query_as::<_, ChapterTallyRow>(
        r#"
        SELECT t.subject_id, s.display_name, t.chapter, t.difficulty, t.total, t.correct, t.wrong
        FROM chapter_tallies t
        JOIN subjects s ON t.subject_id = s.id
        WHERE t.student_id = $1
        ORDER BY s.display_name, t.chapter, t.difficulty
        "#,
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(assemble_tally_reports(&overall_rows, &chapter_rows)))
}

/// Reassembles the flat tally rows into one report per subject.
fn assemble_tally_reports(
    overall_rows: &[SubjectTallyRow],
    chapter_rows: &[ChapterTallyRow],
) -> Vec<SubjectTallyReport> {
    let mut by_subject: BTreeMap<i64, SubjectTallyReport> = BTreeMap::new();

    for row in overall_rows {
        let report = by_subject.entry(row.subject_id).or_insert_with(|| {
            SubjectTallyReport {
                subject: row.display_name.clone(),
                ..Default::default()
            }
        });
        let bucket = report.overall.bucket_mut(Difficulty::parse(&row.difficulty));
        bucket.total += row.total;
        bucket.correct += row.correct;
        bucket.wrong += row.wrong;
    }

    for row in chapter_rows {
        let report = by_subject.entry(row.subject_id).or_insert_with(|| {
            SubjectTallyReport {
                subject: row.display_name.clone(),
                ..Default::default()
            }
        });
        let bucket = report
            .chapters
            .entry(row.chapter.clone())
            .or_default()
            .bucket_mut(Difficulty::parse(&row.difficulty));
        bucket.total += row.total;
        bucket.correct += row.correct;
        bucket.wrong += row.wrong;
    }

    by_subject.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Bucket;

    fn overall(subject_id: i64, difficulty: &str, total: i64, correct: i64) -> SubjectTallyRow {
        SubjectTallyRow {
            subject_id,
            display_name: "Math".into(),
            difficulty: difficulty.into(),
            total,
            correct,
            wrong: total - correct,
        }
    }

    fn chapter(
        subject_id: i64,
        chapter: &str,
        difficulty: &str,
        total: i64,
        correct: i64,
    ) -> ChapterTallyRow {
        ChapterTallyRow {
            subject_id,
            display_name: "Math".into(),
            chapter: chapter.into(),
            difficulty: difficulty.into(),
            total,
            correct,
            wrong: total - correct,
        }
    }

    #[test]
    fn reports_keep_overall_and_chapter_blocks_consistent() {
        // Two attempts worth of accumulated rows: Algebra easy 2/1,
        // Geometry medium 1/1.
        let overall_rows = vec![overall(1, "easy", 2, 1), overall(1, "medium", 1, 1)];
        let chapter_rows = vec![
            chapter(1, "Algebra", "easy", 2, 1),
            chapter(1, "Geometry", "medium", 1, 1),
        ];

        let reports = assemble_tally_reports(&overall_rows, &chapter_rows);
        assert_eq!(reports.len(), 1);

        let report = &reports[0];
        assert_eq!(report.subject, "Math");
        assert_eq!(report.overall.easy, Bucket { total: 2, correct: 1, wrong: 1 });
        assert_eq!(
            report.chapters["Algebra"].easy,
            Bucket { total: 2, correct: 1, wrong: 1 }
        );
        assert_eq!(
            report.chapters["Geometry"].medium,
            Bucket { total: 1, correct: 1, wrong: 0 }
        );

        // Additivity: the overall block equals the chapter sums.
        let totals = report.overall_totals();
        let chapter_total: i64 = report
            .chapters
            .values()
            .map(|c| c.easy.total + c.medium.total + c.hard.total)
            .sum();
        assert_eq!(totals.total, 3);
        assert_eq!(totals.total, chapter_total);
        assert_eq!(totals.correct, 2);
    }

    #[test]
    fn subjects_are_kept_separate() {
        let overall_rows = vec![overall(1, "easy", 1, 1), overall(2, "hard", 1, 0)];
        let reports = assemble_tally_reports(&overall_rows, &[]);
        assert_eq!(reports.len(), 2);
    }
}
