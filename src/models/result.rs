// src/models/result.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::models::question::QuestionType;

/// Represents the 'results' table: the append-only ledger of scored
/// submissions. Rows are created exactly once per submission and never
/// updated; `details_json` holds the serialized [`GradingSnapshot`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ResultRecord {
    pub id: i64,
    pub test_id: i64,
    pub student_id: i64,
    pub score: f64,
    pub submitted_at: String,
    #[serde(skip_serializing)]
    pub details_json: Option<String>,
}

/// The frozen grading detail captured at submission time. Authoritative for
/// history: later edits to the test or its questions never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingSnapshot {
    pub test_id: i64,
    pub max_score: i64,
    pub answers: Vec<SnapshotRow>,
}

/// Per-question grading detail inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRow {
    pub question_id: i64,
    pub student_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
    pub points: i64,
    pub gained_points: i64,
}

/// DTO for submitting an answer sheet.
///
/// Keys of `answers` are question ids as JSON object keys (strings); a null
/// or absent value means the question was left unanswered.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub test_id: i64,
    pub answers: HashMap<String, Option<String>>,
}

/// A ledger row joined with its test's title and total marks, for the
/// student's own history listing.
#[derive(Debug, FromRow, Serialize)]
pub struct MyResultRow {
    pub id: i64,
    pub test_id: i64,
    pub score: f64,
    pub submitted_at: String,
    pub title: String,
    pub total_marks: i64,
}

/// One reconstructed review line: live question content joined with the
/// frozen answer/correctness/points from the snapshot.
#[derive(Debug, Serialize)]
pub struct ReviewQuestion {
    pub id: i64,
    pub content: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    #[serde(rename = "studentAnswer")]
    pub student_answer: Option<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: Option<String>,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    pub points: i64,
    #[serde(rename = "gainedPoints")]
    pub gained_points: i64,
}

/// Aggregate statistics over all ledger entries of one test. All fields are
/// zero when no one has submitted yet.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_attempts: i64,
    pub avg_score: f64,
    pub best: f64,
    pub worst: f64,
}
