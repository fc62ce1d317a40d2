// src/store/mod.rs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, CreateAssessmentRequest},
        attempt::{AnswerState, Attempt, ScoreReport},
        question::{CreateQuestionRequest, Question},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome of a finalize write. The write is conditional on the attempt
/// still being in progress, so a second finalization reports
/// `AlreadyCompleted` instead of double-counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Finalized,
    AlreadyCompleted,
}

/// Persistence seam for the session engine.
///
/// The engine only ever talks to the backing database through this
/// trait, which keeps the engine testable against [`MemoryStore`] and
/// pins down the two conditional writes that protect completed
/// attempts: `persist_answer_snapshot` silently no-ops once an attempt
/// is completed, and `finalize_attempt` transitions an attempt exactly
/// once.
#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch_assessment(&self, id: i64) -> Result<Option<Assessment>, AppError>;

    async fn list_assessments(&self) -> Result<Vec<Assessment>, AppError>;

    /// Fetches up to `limit` questions for a category, in the store's
    /// natural (id) order. Shuffling is the loader's concern.
    async fn fetch_questions(&self, category: &str, limit: i64) -> Result<Vec<Question>, AppError>;

    /// Fetches the questions backing a resumed attempt's snapshot.
    /// Questions deleted from the bank since the attempt started are
    /// simply absent from the result.
    async fn fetch_questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError>;

    async fn fetch_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError>;

    /// The candidate's most recent in-progress attempt for an
    /// assessment, if any. Used so that starting never duplicates an
    /// attempt that can be resumed.
    async fn find_in_progress_attempt(
        &self,
        assessment_id: i64,
        candidate_id: &str,
    ) -> Result<Option<Attempt>, AppError>;

    /// Number of completed attempts, for max-attempts enforcement.
    async fn completed_attempt_count(
        &self,
        assessment_id: i64,
        candidate_id: &str,
    ) -> Result<i64, AppError>;

    async fn create_attempt(
        &self,
        assessment_id: i64,
        candidate_id: &str,
        started_at: DateTime<Utc>,
        snapshot: &[AnswerState],
    ) -> Result<Attempt, AppError>;

    /// Best-effort autosave write. Conditional on the attempt still
    /// being in progress: a stale snapshot arriving after finalization
    /// must never stomp a completed attempt.
    async fn persist_answer_snapshot(
        &self,
        attempt_id: i64,
        snapshot: &[AnswerState],
    ) -> Result<(), AppError>;

    /// Terminal write: transitions 'in_progress' to 'completed' and
    /// stores the scored result. No-ops (reporting `AlreadyCompleted`)
    /// if the attempt was finalized before.
    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        completed_at: DateTime<Utc>,
        report: &ScoreReport,
        snapshot: &[AnswerState],
    ) -> Result<FinalizeOutcome, AppError>;

    async fn insert_assessment(&self, req: &CreateAssessmentRequest)
    -> Result<Assessment, AppError>;

    async fn insert_question(&self, req: &CreateQuestionRequest) -> Result<Question, AppError>;
}
