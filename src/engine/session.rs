// src/engine/session.rs

use std::sync::Arc;

use serde::Serialize;

use crate::{
    engine::{
        autosave::AutosaveScheduler, clock::Clock, ledger::AnswerLedger, loader::LoadedSession,
        scorer, timer::Countdown,
    },
    error::AppError,
    models::{
        assessment::Assessment,
        attempt::{AnswerState, ScoreReport, STATUS_COMPLETED, STATUS_IN_PROGRESS},
        question::{PublicQuestion, Question},
    },
    store::{FinalizeOutcome, Store},
};

/// What caused a submission. Forced submission on timer expiry runs the
/// exact same scoring path as a manual one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Expiry,
}

/// Live progress of a session, for polling clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionProgress {
    pub attempt_id: i64,
    pub status: String,
    pub total_questions: usize,
    pub answered: usize,
    pub flagged: usize,
    /// Null for untimed assessments.
    pub remaining_seconds: Option<i64>,
}

/// Candidate-safe view of one ledger entry (no correctness).
#[derive(Debug, Clone, Serialize)]
pub struct AnswerView {
    pub question_id: i64,
    pub selected_option_id: Option<String>,
    pub flagged: bool,
}

/// Payload returned when a session starts or resumes.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPayload {
    pub attempt_id: i64,
    pub resumed: bool,
    pub status: String,
    pub assessment: Assessment,
    pub questions: Vec<PublicQuestion>,
    pub answers: Vec<AnswerView>,
    pub remaining_seconds: Option<i64>,
    /// Present only when the attempt was force-submitted on load
    /// because its time had already run out.
    pub report: Option<ScoreReport>,
}

/// One candidate's live run through an assessment.
///
/// All mutation goes through the owning mutex in the session registry,
/// so ledger updates and the submit race (timer expiry vs. manual
/// finish) serialize on a single writer. Idempotence of `submit` is
/// what resolves that race, not locking: the first submission records
/// the outcome, later ones return it unchanged.
pub struct ExamSession {
    attempt_id: i64,
    candidate_id: String,
    assessment: Assessment,
    questions: Vec<Question>,
    ledger: AnswerLedger,
    countdown: Countdown,
    autosave: AutosaveScheduler,
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    resumed: bool,
    outcome: Option<ScoreReport>,
}

impl std::fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamSession")
            .field("attempt_id", &self.attempt_id)
            .field("candidate_id", &self.candidate_id)
            .field("resumed", &self.resumed)
            .finish_non_exhaustive()
    }
}

impl ExamSession {
    pub fn new(
        loaded: LoadedSession,
        autosave: AutosaveScheduler,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let countdown = Countdown::new(
            loaded.attempt.started_at,
            loaded.assessment.time_limit_minutes,
        );
        Self {
            attempt_id: loaded.attempt.id,
            candidate_id: loaded.attempt.candidate_id.clone(),
            assessment: loaded.assessment,
            questions: loaded.questions,
            ledger: loaded.ledger,
            countdown,
            autosave,
            store,
            clock,
            resumed: loaded.resumed,
            outcome: None,
        }
    }

    pub fn attempt_id(&self) -> i64 {
        self.attempt_id
    }

    pub fn candidate_id(&self) -> &str {
        &self.candidate_id
    }

    pub fn is_completed(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn remaining_seconds(&self) -> Option<i64> {
        self.countdown.remaining_seconds(self.clock.now())
    }

    pub fn expired(&self) -> bool {
        self.countdown.expired(self.clock.now())
    }

    /// Records a selection and queues an autosave snapshot.
    pub fn select_answer(&mut self, question_id: i64, option_id: &str) -> Result<(), AppError> {
        self.ensure_in_progress()?;
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| {
                AppError::BadRequest("Question is not part of this session".to_string())
            })?;
        if !question.has_option(option_id) {
            return Err(AppError::BadRequest(
                "Option is not part of this question".to_string(),
            ));
        }

        self.ledger.select(question_id, option_id);
        self.autosave.queue(self.ledger.snapshot());
        Ok(())
    }

    /// Toggles the review flag and queues an autosave snapshot.
    pub fn toggle_flag(&mut self, question_id: i64) -> Result<(), AppError> {
        self.ensure_in_progress()?;
        if !self.ledger.contains(question_id) {
            return Err(AppError::BadRequest(
                "Question is not part of this session".to_string(),
            ));
        }

        self.ledger.toggle_flag(question_id);
        self.autosave.queue(self.ledger.snapshot());
        Ok(())
    }

    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            attempt_id: self.attempt_id,
            status: if self.is_completed() {
                STATUS_COMPLETED.to_string()
            } else {
                STATUS_IN_PROGRESS.to_string()
            },
            total_questions: self.ledger.len(),
            answered: self.ledger.answered_count(),
            flagged: self.ledger.flagged_count(),
            remaining_seconds: self.remaining_seconds(),
        }
    }

    pub fn payload(&self) -> SessionPayload {
        SessionPayload {
            attempt_id: self.attempt_id,
            resumed: self.resumed,
            status: if self.is_completed() {
                STATUS_COMPLETED.to_string()
            } else {
                STATUS_IN_PROGRESS.to_string()
            },
            assessment: self.assessment.clone(),
            questions: self.questions.iter().map(PublicQuestion::from).collect(),
            answers: self
                .ledger
                .snapshot()
                .into_iter()
                .map(|s| AnswerView {
                    question_id: s.question_id,
                    selected_option_id: s.selected_option_id,
                    flagged: s.flagged,
                })
                .collect(),
            remaining_seconds: self.remaining_seconds(),
            report: self.outcome.clone(),
        }
    }

    /// Scores the ledger and finalizes the attempt. Idempotent: a
    /// second call returns the recorded report without recounting.
    ///
    /// If the finalize write fails, the computed report is still
    /// returned so the candidate sees their score; the error is logged
    /// and the remote row stays in progress until a retried submit.
    pub async fn submit(&mut self, trigger: SubmitTrigger) -> ScoreReport {
        if let Some(report) = &self.outcome {
            return report.clone();
        }

        let now = self.clock.now();
        let tally = scorer::grade(&mut self.ledger, &self.questions);
        let score = scorer::percentage(tally.correct, tally.total);
        let report = ScoreReport {
            score,
            passed: score >= self.assessment.passing_score,
            correct: tally.correct as i32,
            wrong: tally.wrong as i32,
            unanswered: tally.unanswered as i32,
            time_spent_seconds: self.countdown.time_spent_seconds(now) as i32,
        };

        let snapshot: Vec<AnswerState> = self.ledger.snapshot();
        match self
            .store
            .finalize_attempt(self.attempt_id, now, &report, &snapshot)
            .await
        {
            Ok(FinalizeOutcome::Finalized) => {
                tracing::info!(
                    "Attempt {} submitted ({:?}): score {} passed {}",
                    self.attempt_id,
                    trigger,
                    report.score,
                    report.passed
                );
            }
            Ok(FinalizeOutcome::AlreadyCompleted) => {
                tracing::warn!(
                    "Attempt {} was already finalized remotely; keeping local result",
                    self.attempt_id
                );
            }
            Err(e) => {
                tracing::error!(
                    "Failed to finalize attempt {}; returning local result anyway: {}",
                    self.attempt_id,
                    e
                );
            }
        }

        self.outcome = Some(report.clone());
        report
    }

    fn ensure_in_progress(&self) -> Result<(), AppError> {
        if self.is_completed() {
            return Err(AppError::Conflict("Attempt already completed".to_string()));
        }
        Ok(())
    }
}
