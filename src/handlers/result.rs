// src/handlers/result.rs
//
// The result ledger and its consumers. A submission is graded against the
// association set as it exists right now, and the full grading detail is
// frozen into the ledger row, so review never re-grades and later edits to
// the test cannot rewrite history.

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    grading::{self, Association},
    models::{
        question::{TestQuestionRow, parse_options},
        result::{
            GradingSnapshot, MyResultRow, ResultRecord, ReviewQuestion, SubmitRequest,
            SummaryStats,
        },
        test::Test,
    },
    utils::jwt::Claims,
};

/// Grades a submitted answer sheet and appends it to the ledger. Student only.
///
/// Every submission creates a new, independent entry, including a forced
/// submission at timeout. The server does not check the clock or the
/// visibility window here: a late submission is still accepted and graded.
pub async fn submit(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.subject_id()?;

    let associations = sqlx::query_as::<_, Association>(
        r#"
        SELECT tq.question_id, tq.points, q.type, q.correct_answer
        FROM test_questions tq
        JOIN questions q ON tq.question_id = q.id
        WHERE tq.test_id = ?1
        ORDER BY tq.id
        "#,
    )
    .bind(payload.test_id)
    .fetch_all(&pool)
    .await?;

    if associations.is_empty() {
        return Err(AppError::NotFound(
            "No questions for this test".to_string(),
        ));
    }

    let outcome = grading::grade(&associations, &payload.answers);
    let score = outcome.score;
    let max_score = outcome.max_score;

    let snapshot = outcome.into_snapshot(payload.test_id);
    let details_json =
        serde_json::to_string(&snapshot).map_err(|e| AppError::Storage(e.to_string()))?;

    let result_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO results (test_id, student_id, score, submitted_at, details_json)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id
        "#,
    )
    .bind(payload.test_id)
    .bind(student_id)
    .bind(score)
    .bind(Utc::now().to_rfc3339())
    .bind(details_json)
    .fetch_one(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "id": result_id,
        "score": score,
        "maxScore": max_score,
    })))
}

/// Lists the caller's own results joined with test title and total marks,
/// newest submission first. Student only.
pub async fn my_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.subject_id()?;

    let rows = sqlx::query_as::<_, MyResultRow>(
        r#"
        SELECT r.id, r.test_id, r.score, r.submitted_at, t.title, t.total_marks
        FROM results r
        JOIN tests t ON r.test_id = t.id
        WHERE r.student_id = ?1
        ORDER BY datetime(r.submitted_at) DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

/// Reconstructs a past answer sheet from one ledger entry. Student, own
/// results only.
///
/// Answer, correctness and points come from the frozen snapshot; question
/// content, type and options come from the live record store, in the live
/// test's association order. A malformed snapshot fails closed to an empty
/// detail set, and a question deleted since grading drops out of the review.
pub async fn review(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.subject_id()?;

    let record = sqlx::query_as::<_, ResultRecord>(
        r#"
        SELECT id, test_id, student_id, score, submitted_at, details_json
        FROM results
        WHERE id = ?1 AND student_id = ?2
        "#,
    )
    .bind(result_id)
    .bind(student_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "Result not found for this student".to_string(),
    ))?;

    // Fail closed on an unparseable snapshot: review with no detail rather
    // than a propagated parse fault.
    let snapshot: Option<GradingSnapshot> = record
        .details_json
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok());

    let test_id = snapshot.as_ref().map_or(record.test_id, |s| s.test_id);
    let max_score = snapshot.as_ref().map(|s| s.max_score);
    let details = snapshot.map(|s| s.answers).unwrap_or_default();

    let test = sqlx::query_as::<_, Test>(
        r#"
        SELECT id, teacher_id, title, description, duration_minutes,
               total_marks, start_time, end_time, created_at
        FROM tests
        WHERE id = ?1
        "#,
    )
    .bind(test_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "Test not found for this result".to_string(),
    ))?;

    let live_rows = sqlx::query_as::<_, TestQuestionRow>(
        r#"
        SELECT q.id, q.content, q.type, q.options, q.correct_answer,
               q.subject, q.topic, q.difficulty, tq.points
        FROM test_questions tq
        JOIN questions q ON tq.question_id = q.id
        WHERE tq.test_id = ?1
        ORDER BY tq.id
        "#,
    )
    .bind(test_id)
    .fetch_all(&pool)
    .await?;

    let questions: Vec<ReviewQuestion> = live_rows
        .into_iter()
        .map(|q| {
            let detail = details.iter().find(|d| d.question_id == q.id);
            let options = parse_options(q.options.as_deref());
            match detail {
                Some(d) => ReviewQuestion {
                    id: q.id,
                    content: q.content,
                    question_type: q.question_type,
                    options,
                    student_answer: d.student_answer.clone(),
                    correct_answer: d.correct_answer.clone(),
                    is_correct: d.is_correct,
                    points: d.points,
                    gained_points: d.gained_points,
                },
                None => ReviewQuestion {
                    id: q.id,
                    content: q.content,
                    question_type: q.question_type,
                    options,
                    student_answer: None,
                    correct_answer: None,
                    is_correct: false,
                    points: 0,
                    gained_points: 0,
                },
            }
        })
        .collect();

    Ok(Json(serde_json::json!({
        "test": test,
        "result": {
            "id": record.id,
            "test_id": test_id,
            "score": record.score,
            "maxScore": max_score,
            "submitted_at": record.submitted_at,
        },
        "questions": questions,
    })))
}

/// Aggregate statistics over one test's ledger. Teacher, owner only.
///
/// Per-student rows come back in submission order; all stats are zero when
/// nobody has submitted yet.
pub async fn summary(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teacher_id = claims.subject_id()?;

    let test = sqlx::query_as::<_, Test>(
        r#"
        SELECT id, teacher_id, title, description, duration_minutes,
               total_marks, start_time, end_time, created_at
        FROM tests
        WHERE id = ?1 AND teacher_id = ?2
        "#,
    )
    .bind(test_id)
    .bind(teacher_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "Test not found or not your test".to_string(),
    ))?;

    let rows = sqlx::query_as::<_, ResultRecord>(
        r#"
        SELECT id, test_id, student_id, score, submitted_at, details_json
        FROM results
        WHERE test_id = ?1
        ORDER BY datetime(submitted_at) ASC
        "#,
    )
    .bind(test_id)
    .fetch_all(&pool)
    .await?;

    let total_attempts = rows.len() as i64;
    let total_score: f64 = rows.iter().map(|r| r.score).sum();
    let avg_score = if total_attempts > 0 {
        total_score / total_attempts as f64
    } else {
        0.0
    };
    let best = rows.iter().map(|r| r.score).fold(0.0, f64::max);
    // Over an empty ledger the minimum is defined as 0.
    let worst = match rows.first() {
        Some(first) => rows.iter().map(|r| r.score).fold(first.score, f64::min),
        None => 0.0,
    };

    let stats = SummaryStats {
        total_attempts,
        avg_score,
        best,
        worst,
    };

    Ok(Json(serde_json::json!({
        "test": test,
        "stats": stats,
        "results": rows,
    })))
}
