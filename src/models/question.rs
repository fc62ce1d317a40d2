// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// A single answer option within a question.
/// The `correct` flag never leaves the server; candidates only ever see
/// the [`PublicOption`] projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Opaque option identity, stable across shuffles.
    pub id: String,
    pub text: String,
    pub correct: bool,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// Category tag used to select questions for an assessment.
    pub category: String,

    /// Question type: 'multiple_choice' or 'true_false'.
    pub question_type: String,

    /// The text content of the question.
    pub prompt: String,

    /// Answer options, stored as a JSON array in the database.
    pub options: Json<Vec<QuestionOption>>,

    pub difficulty: String,

    /// Explanation shown after completion when the assessment allows it.
    pub explanation: Option<String>,

    /// Point value. Scoring is percentage-of-questions based, but the
    /// value is kept for content authors.
    pub points: i32,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    /// Identity of the single correct option.
    /// Authoring validation guarantees exactly one exists.
    pub fn correct_option_id(&self) -> Option<&str> {
        self.options
            .0
            .iter()
            .find(|o| o.correct)
            .map(|o| o.id.as_str())
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.0.iter().any(|o| o.id == option_id)
    }
}

/// DTO for sending a question to the candidate (excludes correct flags,
/// explanation and point value).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub prompt: String,
    pub options: Vec<PublicOption>,
    pub difficulty: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicOption {
    pub id: String,
    pub text: String,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_type: q.question_type.clone(),
            prompt: q.prompt.clone(),
            options: q
                .options
                .0
                .iter()
                .map(|o| PublicOption {
                    id: o.id.clone(),
                    text: o.text.clone(),
                })
                .collect(),
            difficulty: q.difficulty.clone(),
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(min = 1, max = 20))]
    pub question_type: String,
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<QuestionOption>,
    #[validate(length(max = 50))]
    pub difficulty: Option<String>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(range(min = 1))]
    pub points: Option<i32>,
}

fn validate_options(options: &[QuestionOption]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    let mut seen = std::collections::HashSet::new();
    for opt in options {
        if opt.id.is_empty() || opt.text.is_empty() || opt.text.len() > 500 {
            return Err(validator::ValidationError::new("invalid_option"));
        }
        if !seen.insert(opt.id.as_str()) {
            return Err(validator::ValidationError::new("duplicate_option_id"));
        }
    }
    // Exactly one correct option per question, true/false included.
    if options.iter().filter(|o| o.correct).count() != 1 {
        return Err(validator::ValidationError::new("exactly_one_correct_option"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(id: &str, correct: bool) -> QuestionOption {
        QuestionOption {
            id: id.to_string(),
            text: format!("Option {}", id),
            correct,
        }
    }

    #[test]
    fn rejects_zero_or_two_correct_options() {
        assert!(validate_options(&[opt("a", false), opt("b", false)]).is_err());
        assert!(validate_options(&[opt("a", true), opt("b", true)]).is_err());
        assert!(validate_options(&[opt("a", true), opt("b", false)]).is_ok());
    }

    #[test]
    fn rejects_duplicate_option_ids() {
        assert!(validate_options(&[opt("a", true), opt("a", false)]).is_err());
    }

    #[test]
    fn public_question_hides_correct_flag() {
        let q = Question {
            id: 1,
            category: "general".to_string(),
            question_type: "multiple_choice".to_string(),
            prompt: "?".to_string(),
            options: Json(vec![opt("a", true), opt("b", false)]),
            difficulty: "easy".to_string(),
            explanation: Some("because".to_string()),
            points: 1,
            created_at: None,
        };
        let public = PublicQuestion::from(&q);
        let json = serde_json::to_value(&public).unwrap();
        assert!(json["options"][0].get("correct").is_none());
        assert!(json.get("explanation").is_none());
    }
}
