// src/grading.rs

use std::collections::HashMap;

use sqlx::prelude::FromRow;

use crate::models::{
    question::QuestionType,
    result::{GradingSnapshot, SnapshotRow},
};

/// One (question, points) association as loaded for grading: the point value
/// from the test plus the type and canonical answer of the question.
#[derive(Debug, Clone, FromRow)]
pub struct Association {
    pub question_id: i64,
    pub points: i64,
    #[sqlx(rename = "type")]
    pub question_type: QuestionType,
    pub correct_answer: Option<String>,
}

/// Raw answer sheet: question id (as string key) to the submitted answer.
pub type AnswerMap = HashMap<String, Option<String>>;

/// Outcome of one grading run.
#[derive(Debug, Clone)]
pub struct GradingOutcome {
    pub score: f64,
    pub max_score: i64,
    pub rows: Vec<SnapshotRow>,
}

impl GradingOutcome {
    /// Freezes this outcome into the persisted snapshot shape.
    pub fn into_snapshot(self, test_id: i64) -> GradingSnapshot {
        GradingSnapshot {
            test_id,
            max_score: self.max_score,
            answers: self.rows,
        }
    }
}

/// Grades a submitted answer sheet against a test's association set.
///
/// Deterministic and free of I/O: identical associations and answers always
/// produce an identical outcome. Only mcq and true/false questions with a
/// canonical answer are auto-graded, by whitespace-trimmed case-sensitive
/// comparison. Short-text and essay answers always score zero here; grading
/// them is out of scope for the engine.
pub fn grade(associations: &[Association], answers: &AnswerMap) -> GradingOutcome {
    let mut rows = Vec::with_capacity(associations.len());
    let mut total: i64 = 0;
    let mut max_score: i64 = 0;

    for assoc in associations {
        max_score += assoc.points;

        let student_answer = answers
            .get(&assoc.question_id.to_string())
            .cloned()
            .flatten();

        let mut is_correct = false;
        let mut gained_points = 0;

        if assoc.question_type.auto_gradable() {
            if let (Some(given), Some(canonical)) = (&student_answer, &assoc.correct_answer) {
                if given.trim() == canonical.trim() {
                    is_correct = true;
                    gained_points = assoc.points;
                }
            }
        }

        total += gained_points;

        rows.push(SnapshotRow {
            question_id: assoc.question_id,
            student_answer,
            correct_answer: assoc.correct_answer.clone(),
            is_correct,
            points: assoc.points,
            gained_points,
        });
    }

    GradingOutcome {
        score: total as f64,
        max_score,
        rows,
    }
}
