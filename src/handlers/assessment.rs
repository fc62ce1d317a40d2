// src/handlers/assessment.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{engine::registry::SessionRegistry, error::AppError, store::Store};

/// Lists all assessments.
pub async fn list_assessments(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    let assessments = store.list_assessments().await?;
    Ok(Json(assessments))
}

/// Fetches a single assessment definition.
pub async fn get_assessment(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = store
        .fetch_assessment(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;
    Ok(Json(assessment))
}

/// DTO for starting (or resuming) a session.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub candidate_id: String,
    /// Resume this specific attempt. Without it, the candidate's
    /// in-progress attempt (if any) is resumed automatically.
    pub attempt_id: Option<i64>,
}

/// Starts or resumes a session for an assessment.
///
/// Returns the candidate-safe question set, the restored answer state,
/// and the remaining time. An attempt whose clock already ran out is
/// force-submitted and returned completed, report included.
pub async fn start_session(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<i64>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.candidate_id.is_empty() {
        return Err(AppError::BadRequest("candidate_id is required".to_string()));
    }

    let session = registry
        .start(id, &payload.candidate_id, payload.attempt_id)
        .await?;
    Ok(Json(session))
}
