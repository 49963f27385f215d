// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{CreateQuizRequest, PublicQuestion, Question, Quiz},
    utils::{html::clean_html, jwt::Claims},
};

/// Creates a new quiz together with its question bank.
///
/// * Teacher only (enforced by middleware).
/// * Sanitizes authored text before storing it.
/// * Inserts the quiz and all questions in one transaction.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // Choice questions need options to resolve answer indices against.
    for q in &payload.questions {
        let needs_options = matches!(
            q.question_type,
            crate::models::quiz::QuestionType::Mcq | crate::models::quiz::QuestionType::Msq
        );
        if needs_options && q.options.is_empty() {
            return Err(AppError::BadRequest(
                "Choice questions require a non-empty options list".to_string(),
            ));
        }
    }

    let teacher_id = claims.user_id();

    let mut tx = pool.begin().await?;

    let quiz_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (teacher_id, name, subject)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(teacher_id)
    .bind(clean_html(&payload.name))
    .bind(payload.subject.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO questions (quiz_id, type, text, options, correct, marks, negative_marks, difficulty, chapter) ",
    );

    builder.push_values(&payload.questions, |mut row, q| {
        row.push_bind(quiz_id)
            .push_bind(q.question_type.as_str())
            .push_bind(clean_html(&q.text))
            .push_bind(SqlJson(q.options.clone()))
            .push_bind(SqlJson(q.correct.clone()))
            .push_bind(q.marks)
            .push_bind(q.negative_marks)
            .push_bind(q.difficulty.as_str())
            .push_bind(q.chapter.trim());
    });

    builder.build().execute(&mut *tx).await.map_err(|e| {
        tracing::error!("Failed to insert questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": quiz_id })),
    ))
}

/// Lists all quizzes with their question counts.
pub async fn list_quizzes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, teacher_id, name, subject, created_at
        FROM quizzes
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Fetches one quiz with its questions, correct answers hidden.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT id, teacher_id, name, subject, created_at FROM quizzes WHERE id = $1",
    )
    .bind(id)
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
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let public_questions: Vec<PublicQuestion> =
        questions.into_iter().map(PublicQuestion::from).collect();

    Ok(Json(serde_json::json!({
        "quiz": quiz,
        "questions": public_questions
    })))
}

/// Deletes a quiz by ID. Owner only; questions cascade.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1 AND teacher_id = $2")
        .bind(id)
        .bind(claims.user_id())
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
