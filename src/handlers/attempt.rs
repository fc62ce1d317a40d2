// src/handlers/attempt.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{registry::SessionRegistry, session::SubmitTrigger},
    error::AppError,
    models::attempt::AnswerState,
    store::Store,
};

/// Live progress for a polling client. Completed attempts answer from
/// the store once their session has been evicted.
pub async fn get_progress(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let progress = registry.progress(id).await?;
    Ok(Json(progress))
}

/// DTO for answering a question.
#[derive(Debug, Deserialize)]
pub struct SelectAnswerRequest {
    pub question_id: i64,
    pub option_id: String,
}

/// Records the candidate's selection for one question.
pub async fn select_answer(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<i64>,
    Json(payload): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = registry.live_session(id).await?;
    let mut session = session.lock().await;
    session.select_answer(payload.question_id, &payload.option_id)?;
    Ok(Json(session.progress()))
}

/// DTO for flagging a question for review.
#[derive(Debug, Deserialize)]
pub struct ToggleFlagRequest {
    pub question_id: i64,
}

/// Flips the review flag on one question.
pub async fn toggle_flag(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<i64>,
    Json(payload): Json<ToggleFlagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = registry.live_session(id).await?;
    let mut session = session.lock().await;
    session.toggle_flag(payload.question_id)?;
    Ok(Json(session.progress()))
}

/// Submits the attempt for scoring. Idempotent: submitting an attempt
/// that is already completed returns the recorded result.
pub async fn submit_attempt(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let report = registry.submit(id, SubmitTrigger::Manual).await?;
    Ok(Json(report))
}

/// One question in the post-completion review.
#[derive(Debug, Serialize)]
pub struct ReviewEntry {
    pub question_id: i64,
    pub prompt: String,
    pub selected_option_id: Option<String>,
    pub flagged: bool,
    /// Only present when the assessment shows answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttemptResultResponse {
    pub attempt_id: i64,
    pub assessment_id: i64,
    pub status: String,
    pub score: Option<i32>,
    pub passed: Option<bool>,
    pub correct: Option<i32>,
    pub wrong: Option<i32>,
    pub unanswered: Option<i32>,
    pub time_spent_seconds: Option<i32>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Present when the assessment allows review; answer keys and
    /// explanations only when it also shows answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Vec<ReviewEntry>>,
}

/// Fetches the finalized result from the store. Works after a server
/// restart, unlike the live-session endpoints.
pub async fn get_result(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = store
        .fetch_attempt(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

    if !attempt.is_completed() {
        return Err(AppError::Conflict(
            "Attempt is still in progress".to_string(),
        ));
    }

    let assessment = store
        .fetch_assessment(attempt.assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    let snapshot: Vec<AnswerState> = attempt
        .answers
        .as_ref()
        .map(|a| a.0.clone())
        .unwrap_or_default();

    let review = if assessment.allow_review || assessment.show_answers {
        Some(build_review(&store, &snapshot, assessment.show_answers).await?)
    } else {
        None
    };

    Ok(Json(AttemptResultResponse {
        attempt_id: attempt.id,
        assessment_id: attempt.assessment_id,
        status: attempt.status,
        score: attempt.score,
        passed: attempt.passed,
        correct: attempt.correct_count,
        wrong: attempt.wrong_count,
        unanswered: attempt.unanswered_count,
        time_spent_seconds: attempt.time_spent_seconds,
        completed_at: attempt.completed_at,
        review,
    }))
}

async fn build_review(
    store: &Arc<dyn Store>,
    snapshot: &[AnswerState],
    show_answers: bool,
) -> Result<Vec<ReviewEntry>, AppError> {
    let ids: Vec<i64> = snapshot.iter().map(|s| s.question_id).collect();
    let questions = store.fetch_questions_by_ids(&ids).await?;

    Ok(snapshot
        .iter()
        .filter_map(|state| {
            let question = questions.iter().find(|q| q.id == state.question_id)?;
            Some(ReviewEntry {
                question_id: state.question_id,
                prompt: question.prompt.clone(),
                selected_option_id: state.selected_option_id.clone(),
                flagged: state.flagged,
                is_correct: if show_answers { state.is_correct } else { None },
                correct_option_id: if show_answers {
                    question.correct_option_id().map(str::to_string)
                } else {
                    None
                },
                explanation: if show_answers {
                    question.explanation.clone()
                } else {
                    None
                },
            })
        })
        .collect())
}
