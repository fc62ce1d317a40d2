// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'assessments' table in the database.
/// An assessment is the configuration of an exam or simulator: which
/// questions to serve, timing, passing threshold, and review behavior.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assessment {
    pub id: i64,

    pub title: String,

    /// 'exam' or 'simulator'. Both run through the same session engine.
    pub kind: String,

    /// Category tag the question bank is filtered on.
    pub category: String,

    /// Target number of questions to serve. If the bank holds fewer,
    /// fewer are served; that is not an error.
    pub question_count: i32,

    /// Null means untimed.
    pub time_limit_minutes: Option<i32>,

    /// Passing threshold in percent, 0..=100 inclusive.
    pub passing_score: i32,

    pub shuffle_questions: bool,
    pub shuffle_options: bool,

    /// Whether the result may include correct answers and explanations.
    pub show_answers: bool,

    /// Whether the candidate may review their own submitted answers.
    pub allow_review: bool,

    /// Null means unlimited attempts.
    pub max_attempts: Option<i32>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new assessment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(custom(function = validate_kind))]
    pub kind: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(range(min = 1))]
    pub question_count: i32,
    #[validate(range(min = 1))]
    pub time_limit_minutes: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: i32,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default)]
    pub shuffle_options: bool,
    #[serde(default)]
    pub show_answers: bool,
    #[serde(default)]
    pub allow_review: bool,
    #[validate(range(min = 1))]
    pub max_attempts: Option<i32>,
}

fn validate_kind(kind: &str) -> Result<(), validator::ValidationError> {
    match kind {
        "exam" | "simulator" => Ok(()),
        _ => Err(validator::ValidationError::new("unknown_kind")),
    }
}
