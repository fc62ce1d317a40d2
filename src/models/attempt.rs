// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";

/// Per-question answer state, the unit of the in-memory ledger and of
/// the persisted snapshot. `is_correct` stays null until scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerState {
    pub question_id: i64,
    pub selected_option_id: Option<String>,
    pub is_correct: Option<bool>,
    pub flagged: bool,
}

impl AnswerState {
    pub fn empty(question_id: i64) -> Self {
        AnswerState {
            question_id,
            selected_option_id: None,
            is_correct: None,
            flagged: false,
        }
    }
}

/// Represents the 'attempts' table in the database.
/// One row per candidate run through an assessment. Scoring fields stay
/// null while the attempt is in progress and become immutable once the
/// status reaches 'completed'.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub assessment_id: i64,

    /// Opaque candidate identity supplied by the caller.
    pub candidate_id: String,

    /// 'in_progress' or 'completed'.
    pub status: String,

    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Full ledger snapshot, stored as a JSON array.
    pub answers: Option<Json<Vec<AnswerState>>>,

    pub score: Option<i32>,
    pub passed: Option<bool>,
    pub correct_count: Option<i32>,
    pub wrong_count: Option<i32>,
    pub unanswered_count: Option<i32>,
    pub time_spent_seconds: Option<i32>,
}

impl Attempt {
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    /// Rebuilds the final report from a completed row. None while the
    /// attempt is still in progress.
    pub fn score_report(&self) -> Option<ScoreReport> {
        if !self.is_completed() {
            return None;
        }
        Some(ScoreReport {
            score: self.score.unwrap_or(0),
            passed: self.passed.unwrap_or(false),
            correct: self.correct_count.unwrap_or(0),
            wrong: self.wrong_count.unwrap_or(0),
            unanswered: self.unanswered_count.unwrap_or(0),
            time_spent_seconds: self.time_spent_seconds.unwrap_or(0),
        })
    }
}

/// Final result of a scored attempt, returned to the caller and
/// persisted onto the attempt row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreReport {
    pub score: i32,
    pub passed: bool,
    pub correct: i32,
    pub wrong: i32,
    pub unanswered: i32,
    pub time_spent_seconds: i32,
}
