// src/store/memory.rs

use std::collections::HashMap;
use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, CreateAssessmentRequest},
        attempt::{AnswerState, Attempt, ScoreReport, STATUS_COMPLETED, STATUS_IN_PROGRESS},
        question::{CreateQuestionRequest, Question},
    },
    store::{FinalizeOutcome, Store},
};

#[derive(Default)]
struct Inner {
    assessments: HashMap<i64, Assessment>,
    questions: Vec<Question>,
    attempts: HashMap<i64, Attempt>,
    next_assessment_id: i64,
    next_question_id: i64,
    next_attempt_id: i64,
}

/// In-memory store used by the integration tests and for local
/// development without a database. Mirrors the conditional-write
/// semantics of [`super::PgStore`] exactly; additionally counts
/// snapshot writes and can be told to fail them so the autosave
/// properties are observable from tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    snapshot_writes: AtomicUsize,
    fail_snapshot_writes: AtomicBool,
    fail_finalize: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshot writes that reached the store (including
    /// conditional no-ops).
    pub fn snapshot_write_count(&self) -> usize {
        self.snapshot_writes.load(Ordering::SeqCst)
    }

    /// Makes subsequent snapshot writes fail, to exercise the
    /// best-effort autosave path.
    pub fn set_fail_snapshot_writes(&self, fail: bool) {
        self.fail_snapshot_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent finalize writes fail, to exercise the
    /// result-still-returned path.
    pub fn set_fail_finalize(&self, fail: bool) {
        self.fail_finalize.store(fail, Ordering::SeqCst);
    }

    /// Test accessor: the current attempt row.
    pub fn attempt(&self, id: i64) -> Option<Attempt> {
        self.inner.lock().unwrap().attempts.get(&id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_assessment(&self, id: i64) -> Result<Option<Assessment>, AppError> {
        Ok(self.inner.lock().unwrap().assessments.get(&id).cloned())
    }

    async fn list_assessments(&self) -> Result<Vec<Assessment>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut all: Vec<Assessment> = inner.assessments.values().cloned().collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }

    async fn fetch_questions(&self, category: &str, limit: i64) -> Result<Vec<Question>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .questions
            .iter()
            .filter(|q| q.category == category)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn fetch_questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .questions
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn fetch_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        Ok(self.attempt(id))
    }

    async fn find_in_progress_attempt(
        &self,
        assessment_id: i64,
        candidate_id: &str,
    ) -> Result<Option<Attempt>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attempts
            .values()
            .filter(|a| {
                a.assessment_id == assessment_id
                    && a.candidate_id == candidate_id
                    && a.status == STATUS_IN_PROGRESS
            })
            .max_by_key(|a| a.started_at)
            .cloned())
    }

    async fn completed_attempt_count(
        &self,
        assessment_id: i64,
        candidate_id: &str,
    ) -> Result<i64, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attempts
            .values()
            .filter(|a| {
                a.assessment_id == assessment_id
                    && a.candidate_id == candidate_id
                    && a.status == STATUS_COMPLETED
            })
            .count() as i64)
    }

    async fn create_attempt(
        &self,
        assessment_id: i64,
        candidate_id: &str,
        started_at: DateTime<Utc>,
        snapshot: &[AnswerState],
    ) -> Result<Attempt, AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_attempt_id += 1;
        let attempt = Attempt {
            id: inner.next_attempt_id,
            assessment_id,
            candidate_id: candidate_id.to_string(),
            status: STATUS_IN_PROGRESS.to_string(),
            started_at,
            completed_at: None,
            answers: Some(Json(snapshot.to_vec())),
            score: None,
            passed: None,
            correct_count: None,
            wrong_count: None,
            unanswered_count: None,
            time_spent_seconds: None,
        };
        inner.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn persist_answer_snapshot(
        &self,
        attempt_id: i64,
        snapshot: &[AnswerState],
    ) -> Result<(), AppError> {
        self.snapshot_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_snapshot_writes.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(
                "snapshot write failed (injected)".to_string(),
            ));
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(attempt) = inner.attempts.get_mut(&attempt_id) {
            // Same conditional as the SQL UPDATE: in-progress only.
            if attempt.status == STATUS_IN_PROGRESS {
                attempt.answers = Some(Json(snapshot.to_vec()));
            }
        }
        Ok(())
    }

    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        completed_at: DateTime<Utc>,
        report: &ScoreReport,
        snapshot: &[AnswerState],
    ) -> Result<FinalizeOutcome, AppError> {
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(
                "finalize write failed (injected)".to_string(),
            ));
        }
        let mut inner = self.inner.lock().unwrap();
        let attempt = inner
            .attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

        if attempt.status == STATUS_COMPLETED {
            return Ok(FinalizeOutcome::AlreadyCompleted);
        }

        attempt.status = STATUS_COMPLETED.to_string();
        attempt.completed_at = Some(completed_at);
        attempt.answers = Some(Json(snapshot.to_vec()));
        attempt.score = Some(report.score);
        attempt.passed = Some(report.passed);
        attempt.correct_count = Some(report.correct);
        attempt.wrong_count = Some(report.wrong);
        attempt.unanswered_count = Some(report.unanswered);
        attempt.time_spent_seconds = Some(report.time_spent_seconds);
        Ok(FinalizeOutcome::Finalized)
    }

    async fn insert_assessment(
        &self,
        req: &CreateAssessmentRequest,
    ) -> Result<Assessment, AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_assessment_id += 1;
        let assessment = Assessment {
            id: inner.next_assessment_id,
            title: req.title.clone(),
            kind: req.kind.clone(),
            category: req.category.clone(),
            question_count: req.question_count,
            time_limit_minutes: req.time_limit_minutes,
            passing_score: req.passing_score,
            shuffle_questions: req.shuffle_questions,
            shuffle_options: req.shuffle_options,
            show_answers: req.show_answers,
            allow_review: req.allow_review,
            max_attempts: req.max_attempts,
            created_at: Some(Utc::now()),
        };
        inner
            .assessments
            .insert(assessment.id, assessment.clone());
        Ok(assessment)
    }

    async fn insert_question(&self, req: &CreateQuestionRequest) -> Result<Question, AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_question_id += 1;
        let question = Question {
            id: inner.next_question_id,
            category: req.category.clone(),
            question_type: req.question_type.clone(),
            prompt: req.prompt.clone(),
            options: Json(req.options.clone()),
            difficulty: req
                .difficulty
                .clone()
                .unwrap_or_else(|| "medium".to_string()),
            explanation: req.explanation.clone(),
            points: req.points.unwrap_or(1),
            created_at: Some(Utc::now()),
        };
        inner.questions.push(question.clone());
        Ok(question)
    }
}
