// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Question type stored in the `type` column.
///
/// Only `mcq` and `true_false` are auto-gradable; `short` and `essay` carry a
/// canonical answer at most for display, never for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    Short,
    Essay,
}

impl QuestionType {
    pub fn auto_gradable(self) -> bool {
        matches!(self, QuestionType::Mcq | QuestionType::TrueFalse)
    }
}

/// Represents the 'questions' table in the database.
///
/// This service only reads it: the question bank is maintained elsewhere and
/// consumed here as a record store.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub teacher_id: i64,
    pub content: String,

    /// Mapped from the database column 'type' since `type` is a reserved
    /// keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// Option list for MCQ questions, stored as a JSON array in a TEXT column.
    #[serde(skip_serializing)]
    pub options: Option<String>,

    pub correct_answer: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub created_at: String,
}

/// Parses the raw `options` column. Absent or malformed JSON degrades to an
/// empty list rather than failing the read.
pub fn parse_options(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

/// DTO for returning a question from the bank (teacher view, answer included).
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: i64,
    pub content: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub created_at: String,
}

impl From<Question> for QuestionView {
    fn from(q: Question) -> Self {
        let options = parse_options(q.options.as_deref());
        QuestionView {
            id: q.id,
            content: q.content,
            question_type: q.question_type,
            options,
            correct_answer: q.correct_answer,
            subject: q.subject,
            topic: q.topic,
            difficulty: q.difficulty,
            created_at: q.created_at,
        }
    }
}

/// A question joined with its point value within one test.
#[derive(Debug, Clone, FromRow)]
pub struct TestQuestionRow {
    pub id: i64,
    pub content: String,
    #[sqlx(rename = "type")]
    pub question_type: QuestionType,
    pub options: Option<String>,
    pub correct_answer: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub points: i64,
}

/// Teacher-facing view of a test question (canonical answer included).
#[derive(Debug, Serialize)]
pub struct TestQuestionView {
    pub id: i64,
    pub content: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub points: i64,
}

/// Student-facing view of a test question (canonical answer stripped).
#[derive(Debug, Serialize)]
pub struct PublicTestQuestionView {
    pub id: i64,
    pub content: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub points: i64,
}

impl From<TestQuestionRow> for TestQuestionView {
    fn from(q: TestQuestionRow) -> Self {
        let options = parse_options(q.options.as_deref());
        TestQuestionView {
            id: q.id,
            content: q.content,
            question_type: q.question_type,
            options,
            correct_answer: q.correct_answer,
            subject: q.subject,
            topic: q.topic,
            difficulty: q.difficulty,
            points: q.points,
        }
    }
}

impl From<TestQuestionRow> for PublicTestQuestionView {
    fn from(q: TestQuestionRow) -> Self {
        let options = parse_options(q.options.as_deref());
        PublicTestQuestionView {
            id: q.id,
            content: q.content,
            question_type: q.question_type,
            options,
            subject: q.subject,
            topic: q.topic,
            difficulty: q.difficulty,
            points: q.points,
        }
    }
}
