// src/handlers/question.rs
//
// Read-only access to the question record store. The bank is authored through
// a separate system; this service only lists and fetches records so a teacher
// can assemble tests from them.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::question::{Question, QuestionView},
    utils::jwt::Claims,
};

/// Query parameters for listing the caller's question bank.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
}

/// Lists the caller's own questions, newest first, optionally filtered by a
/// content keyword. Teacher only.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.subject_id()?;
    let search_pattern = params.search.map(|k| format!("%{}%", k));

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, teacher_id, content, type, options, correct_answer,
               subject, topic, difficulty, created_at
        FROM questions
        WHERE teacher_id = ?1
          AND (?2 IS NULL OR content LIKE ?2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(teacher_id)
    .bind(search_pattern)
    .fetch_all(&pool)
    .await?;

    let views: Vec<QuestionView> = questions.into_iter().map(QuestionView::from).collect();

    Ok(Json(views))
}

/// Retrieves a single question by id, owner-scoped. Teacher only.
pub async fn get_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.subject_id()?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, teacher_id, content, type, options, correct_answer,
               subject, topic, difficulty, created_at
        FROM questions
        WHERE id = ?1 AND teacher_id = ?2
        "#,
    )
    .bind(id)
    .bind(teacher_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(QuestionView::from(question)))
}
