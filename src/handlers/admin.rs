// src/handlers/admin.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::{assessment::CreateAssessmentRequest, question::CreateQuestionRequest},
    store::Store,
};

/// Creates an assessment definition.
pub async fn create_assessment(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let assessment = store.insert_assessment(&payload).await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

/// Creates a question in the bank.
///
/// The option validator enforces the exactly-one-correct invariant;
/// true/false questions must additionally carry exactly two options.
pub async fn create_question(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.question_type == "true_false" && payload.options.len() != 2 {
        return Err(AppError::BadRequest(
            "true_false questions must have exactly two options".to_string(),
        ));
    }

    let question = store.insert_question(&payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}
