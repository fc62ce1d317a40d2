// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, CreateAssessmentRequest},
        attempt::{AnswerState, Attempt, ScoreReport, STATUS_COMPLETED, STATUS_IN_PROGRESS},
        question::{CreateQuestionRequest, Question},
    },
    store::{FinalizeOutcome, Store},
};

const ATTEMPT_COLUMNS: &str = "id, assessment_id, candidate_id, status, started_at, completed_at, \
     answers, score, passed, correct_count, wrong_count, unanswered_count, time_spent_seconds";

const QUESTION_COLUMNS: &str =
    "id, category, question_type, prompt, options, difficulty, explanation, points, created_at";

const ASSESSMENT_COLUMNS: &str = "id, title, kind, category, question_count, time_limit_minutes, \
     passing_score, shuffle_questions, shuffle_options, show_answers, allow_review, max_attempts, \
     created_at";

/// Postgres-backed store used in production.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn fetch_assessment(&self, id: i64) -> Result<Option<Assessment>, AppError> {
        let assessment = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {} FROM assessments WHERE id = $1",
            ASSESSMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch assessment {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(assessment)
    }

    async fn list_assessments(&self) -> Result<Vec<Assessment>, AppError> {
        let assessments = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {} FROM assessments ORDER BY id",
            ASSESSMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list assessments: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(assessments)
    }

    async fn fetch_questions(&self, category: &str, limit: i64) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {} FROM questions WHERE category = $1 ORDER BY id LIMIT $2",
            QUESTION_COLUMNS
        ))
        .bind(category)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions for '{}': {:?}", category, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(questions)
    }

    async fn fetch_questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Dynamic IN clause for the snapshot's question set
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM questions WHERE id IN (",
            QUESTION_COLUMNS
        ));

        let mut separated = query_builder.separated(",");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let questions = query_builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch questions by ids: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(questions)
    }

    async fn fetch_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {} FROM attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch attempt {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(attempt)
    }

    async fn find_in_progress_attempt(
        &self,
        assessment_id: i64,
        candidate_id: &str,
    ) -> Result<Option<Attempt>, AppError> {
        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {} FROM attempts \
             WHERE assessment_id = $1 AND candidate_id = $2 AND status = $3 \
             ORDER BY started_at DESC LIMIT 1",
            ATTEMPT_COLUMNS
        ))
        .bind(assessment_id)
        .bind(candidate_id)
        .bind(STATUS_IN_PROGRESS)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up in-progress attempt: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(attempt)
    }

    async fn completed_attempt_count(
        &self,
        assessment_id: i64,
        candidate_id: &str,
    ) -> Result<i64, AppError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM attempts \
             WHERE assessment_id = $1 AND candidate_id = $2 AND status = $3",
        )
        .bind(assessment_id)
        .bind(candidate_id)
        .bind(STATUS_COMPLETED)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count completed attempts: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(count.0)
    }

    async fn create_attempt(
        &self,
        assessment_id: i64,
        candidate_id: &str,
        started_at: DateTime<Utc>,
        snapshot: &[AnswerState],
    ) -> Result<Attempt, AppError> {
        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "INSERT INTO attempts (assessment_id, candidate_id, status, started_at, answers) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ATTEMPT_COLUMNS
        ))
        .bind(assessment_id)
        .bind(candidate_id)
        .bind(STATUS_IN_PROGRESS)
        .bind(started_at)
        .bind(Json(snapshot))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create attempt: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(attempt)
    }

    async fn persist_answer_snapshot(
        &self,
        attempt_id: i64,
        snapshot: &[AnswerState],
    ) -> Result<(), AppError> {
        // Conditional on status: a late autosave must not touch a
        // completed attempt. Zero rows affected is a valid no-op.
        sqlx::query("UPDATE attempts SET answers = $1 WHERE id = $2 AND status = $3")
            .bind(Json(snapshot))
            .bind(attempt_id)
            .bind(STATUS_IN_PROGRESS)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        completed_at: DateTime<Utc>,
        report: &ScoreReport,
        snapshot: &[AnswerState],
    ) -> Result<FinalizeOutcome, AppError> {
        let result = sqlx::query(
            "UPDATE attempts SET \
                status = $1, completed_at = $2, answers = $3, score = $4, passed = $5, \
                correct_count = $6, wrong_count = $7, unanswered_count = $8, \
                time_spent_seconds = $9 \
             WHERE id = $10 AND status = $11",
        )
        .bind(STATUS_COMPLETED)
        .bind(completed_at)
        .bind(Json(snapshot))
        .bind(report.score)
        .bind(report.passed)
        .bind(report.correct)
        .bind(report.wrong)
        .bind(report.unanswered)
        .bind(report.time_spent_seconds)
        .bind(attempt_id)
        .bind(STATUS_IN_PROGRESS)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to finalize attempt {}: {:?}", attempt_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            Ok(FinalizeOutcome::AlreadyCompleted)
        } else {
            Ok(FinalizeOutcome::Finalized)
        }
    }

    async fn insert_assessment(
        &self,
        req: &CreateAssessmentRequest,
    ) -> Result<Assessment, AppError> {
        let assessment = sqlx::query_as::<_, Assessment>(&format!(
            "INSERT INTO assessments \
                (title, kind, category, question_count, time_limit_minutes, passing_score, \
                 shuffle_questions, shuffle_options, show_answers, allow_review, max_attempts) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            ASSESSMENT_COLUMNS
        ))
        .bind(&req.title)
        .bind(&req.kind)
        .bind(&req.category)
        .bind(req.question_count)
        .bind(req.time_limit_minutes)
        .bind(req.passing_score)
        .bind(req.shuffle_questions)
        .bind(req.shuffle_options)
        .bind(req.show_answers)
        .bind(req.allow_review)
        .bind(req.max_attempts)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert assessment: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(assessment)
    }

    async fn insert_question(&self, req: &CreateQuestionRequest) -> Result<Question, AppError> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "INSERT INTO questions \
                (category, question_type, prompt, options, difficulty, explanation, points) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            QUESTION_COLUMNS
        ))
        .bind(&req.category)
        .bind(&req.question_type)
        .bind(&req.prompt)
        .bind(Json(&req.options))
        .bind(req.difficulty.as_deref().unwrap_or("medium"))
        .bind(&req.explanation)
        .bind(req.points.unwrap_or(1))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(question)
    }
}
