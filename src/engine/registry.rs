// src/engine/registry.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::{
    engine::{
        autosave::AutosaveScheduler,
        clock::Clock,
        loader,
        session::{ExamSession, SessionPayload, SessionProgress, SubmitTrigger},
    },
    error::AppError,
    models::attempt::{Attempt, ScoreReport},
    store::Store,
};

/// Owns every live session, keyed by attempt id.
///
/// Each session sits behind its own mutex; nothing is shared between
/// attempts. Lookup-or-insert happens under a single write guard, so a
/// start call for an attempt that is already live returns the live
/// session's state and never spawns a second autosave task.
///
/// Sessions are evicted once their attempt is finalized: after that
/// the store is the source of truth, and keeping the session around
/// would retain its questions, ledger and parked autosave task for
/// the life of the server. Progress and submit keep answering for
/// completed attempts by falling back to the store.
pub struct SessionRegistry {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    autosave_debounce: Duration,
    sessions: RwLock<HashMap<i64, Arc<Mutex<ExamSession>>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, autosave_debounce: Duration) -> Self {
        Self {
            store,
            clock,
            autosave_debounce,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Loads (or resumes) a session and registers it. For timed
    /// assessments an expiry task is armed; an attempt whose time has
    /// already run out when loaded is force-submitted immediately and
    /// never registered.
    pub async fn start(
        self: &Arc<Self>,
        assessment_id: i64,
        candidate_id: &str,
        existing_attempt_id: Option<i64>,
    ) -> Result<SessionPayload, AppError> {
        let loaded = loader::load_session(
            self.store.as_ref(),
            self.clock.as_ref(),
            assessment_id,
            candidate_id,
            existing_attempt_id,
        )
        .await?;
        let attempt_id = loaded.attempt.id;

        let mut sessions = self.sessions.write().await;

        // Already live (e.g. a page reload): hand back the in-memory
        // state, which may be fresher than the loaded snapshot.
        if let Some(existing) = sessions.get(&attempt_id).cloned() {
            drop(sessions);
            let session = existing.lock().await;
            return Ok(session.payload());
        }

        let autosave =
            AutosaveScheduler::spawn(self.store.clone(), attempt_id, self.autosave_debounce);
        let mut session = ExamSession::new(loaded, autosave, self.store.clone(), self.clock.clone());

        match session.remaining_seconds() {
            // Out of time before it was even re-opened: finalize here
            // and let the session, scheduler included, drop on return.
            Some(0) => {
                drop(sessions);
                session.submit(SubmitTrigger::Expiry).await;
                Ok(session.payload())
            }
            Some(remaining) => {
                let payload = session.payload();
                sessions.insert(attempt_id, Arc::new(Mutex::new(session)));
                drop(sessions);
                self.arm_expiry(attempt_id, remaining);
                Ok(payload)
            }
            None => {
                let payload = session.payload();
                sessions.insert(attempt_id, Arc::new(Mutex::new(session)));
                Ok(payload)
            }
        }
    }

    pub async fn get(&self, attempt_id: i64) -> Option<Arc<Mutex<ExamSession>>> {
        self.sessions.read().await.get(&attempt_id).cloned()
    }

    /// The live session, for mutation. A finished attempt's session is
    /// gone; the store tells a completed attempt (Conflict) apart from
    /// an unknown one (NotFound).
    pub async fn live_session(&self, attempt_id: i64) -> Result<Arc<Mutex<ExamSession>>, AppError> {
        if let Some(session) = self.get(attempt_id).await {
            return Ok(session);
        }
        match self.store.fetch_attempt(attempt_id).await? {
            Some(attempt) if attempt.is_completed() => {
                Err(AppError::Conflict("Attempt already completed".to_string()))
            }
            _ => Err(AppError::NotFound(
                "No active session for this attempt".to_string(),
            )),
        }
    }

    /// Progress of a live session, or of a persisted attempt once the
    /// session has been evicted (no remaining time in that case).
    pub async fn progress(&self, attempt_id: i64) -> Result<SessionProgress, AppError> {
        if let Some(session) = self.get(attempt_id).await {
            return Ok(session.lock().await.progress());
        }
        let attempt = self
            .store
            .fetch_attempt(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
        Ok(progress_from_row(&attempt))
    }

    /// Submits the attempt and evicts its session. Stays idempotent
    /// after eviction: a completed row answers from the store.
    pub async fn submit(
        &self,
        attempt_id: i64,
        trigger: SubmitTrigger,
    ) -> Result<ScoreReport, AppError> {
        if let Some(session) = self.get(attempt_id).await {
            let report = {
                let mut session = session.lock().await;
                session.submit(trigger).await
            };
            self.evict(attempt_id).await;
            return Ok(report);
        }

        let attempt = self
            .store
            .fetch_attempt(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
        attempt.score_report().ok_or_else(|| {
            AppError::NotFound("No active session for this attempt".to_string())
        })
    }

    /// Number of sessions currently held in memory.
    pub async fn live_session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn evict(&self, attempt_id: i64) {
        self.sessions.write().await.remove(&attempt_id);
    }

    /// Sleeps out the remaining time, then force-submits and evicts.
    /// Losing the race to a manual finish is harmless: the manual path
    /// already evicted, and submit itself is idempotent.
    fn arm_expiry(self: &Arc<Self>, attempt_id: i64, remaining_seconds: i64) {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(remaining_seconds.max(0) as u64)).await;
            if let Some(session) = registry.get(attempt_id).await {
                {
                    let mut session = session.lock().await;
                    if !session.is_completed() {
                        tracing::info!(
                            "Time limit reached for attempt {}; forcing submit",
                            attempt_id
                        );
                        session.submit(SubmitTrigger::Expiry).await;
                    }
                }
                registry.evict(attempt_id).await;
            }
        });
    }
}

fn progress_from_row(attempt: &Attempt) -> SessionProgress {
    let snapshot = attempt
        .answers
        .as_ref()
        .map(|a| a.0.as_slice())
        .unwrap_or(&[]);
    SessionProgress {
        attempt_id: attempt.id,
        status: attempt.status.clone(),
        total_questions: snapshot.len(),
        answered: snapshot
            .iter()
            .filter(|s| s.selected_option_id.is_some())
            .count(),
        flagged: snapshot.iter().filter(|s| s.flagged).count(),
        remaining_seconds: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::SystemClock;
    use crate::models::assessment::CreateAssessmentRequest;
    use crate::models::attempt::AnswerState;
    use crate::models::question::{CreateQuestionRequest, QuestionOption};
    use crate::store::MemoryStore;
    use chrono::Utc;

    async fn seeded_registry(
        time_limit: Option<i32>,
    ) -> (Arc<SessionRegistry>, Arc<MemoryStore>, i64) {
        let store = Arc::new(MemoryStore::new());
        for i in 0..5 {
            store
                .insert_question(&CreateQuestionRequest {
                    category: "sec".to_string(),
                    question_type: "multiple_choice".to_string(),
                    prompt: format!("Question {}", i),
                    options: vec![
                        QuestionOption {
                            id: "a".to_string(),
                            text: "A".to_string(),
                            correct: true,
                        },
                        QuestionOption {
                            id: "b".to_string(),
                            text: "B".to_string(),
                            correct: false,
                        },
                    ],
                    difficulty: None,
                    explanation: None,
                    points: None,
                })
                .await
                .unwrap();
        }
        let assessment = store
            .insert_assessment(&CreateAssessmentRequest {
                title: "Security".to_string(),
                kind: "exam".to_string(),
                category: "sec".to_string(),
                question_count: 5,
                time_limit_minutes: time_limit,
                passing_score: 60,
                shuffle_questions: false,
                shuffle_options: false,
                show_answers: false,
                allow_review: false,
                max_attempts: None,
            })
            .await
            .unwrap();

        let registry = Arc::new(SessionRegistry::new(
            store.clone(),
            Arc::new(SystemClock),
            Duration::from_millis(10),
        ));
        (registry, store, assessment.id)
    }

    #[tokio::test]
    async fn submit_evicts_the_session_and_stays_idempotent() {
        let (registry, store, assessment_id) = seeded_registry(None).await;

        let payload = registry.start(assessment_id, "cand", None).await.unwrap();
        assert_eq!(registry.live_session_count().await, 1);

        let first = registry
            .submit(payload.attempt_id, SubmitTrigger::Manual)
            .await
            .unwrap();
        assert_eq!(registry.live_session_count().await, 0);
        assert!(store.attempt(payload.attempt_id).unwrap().is_completed());

        // The session is gone; the store keeps submit idempotent.
        let second = registry
            .submit(payload.attempt_id, SubmitTrigger::Manual)
            .await
            .unwrap();
        assert_eq!(first, second);

        // Mutation reports completion, not a missing session.
        let err = registry.live_session(payload.attempt_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn progress_of_an_evicted_session_comes_from_the_store() {
        let (registry, _store, assessment_id) = seeded_registry(None).await;

        let payload = registry.start(assessment_id, "cand", None).await.unwrap();
        {
            let session = registry.get(payload.attempt_id).await.unwrap();
            let mut session = session.lock().await;
            session.select_answer(1, "a").unwrap();
            session.toggle_flag(2).unwrap();
        }
        registry
            .submit(payload.attempt_id, SubmitTrigger::Manual)
            .await
            .unwrap();

        let progress = registry.progress(payload.attempt_id).await.unwrap();
        assert_eq!(progress.status, "completed");
        assert_eq!(progress.total_questions, 5);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.flagged, 1);
        assert_eq!(progress.remaining_seconds, None);
    }

    #[tokio::test]
    async fn concurrent_starts_share_one_session() {
        let (registry, _store, assessment_id) = seeded_registry(None).await;

        let (a, b) = tokio::join!(
            registry.start(assessment_id, "cand", None),
            registry.start(assessment_id, "cand", None)
        );
        let a = a.unwrap();
        let b = b.unwrap();

        assert_eq!(a.attempt_id, b.attempt_id);
        assert_eq!(registry.live_session_count().await, 1);
    }

    #[tokio::test]
    async fn expired_attempt_is_finalized_without_being_registered() {
        let (registry, store, assessment_id) = seeded_registry(Some(10)).await;

        let snapshot: Vec<AnswerState> = (1..=5).map(AnswerState::empty).collect();
        let attempt = store
            .create_attempt(
                assessment_id,
                "cand",
                Utc::now() - chrono::Duration::minutes(11),
                &snapshot,
            )
            .await
            .unwrap();

        let payload = registry
            .start(assessment_id, "cand", Some(attempt.id))
            .await
            .unwrap();
        assert_eq!(payload.status, "completed");
        assert_eq!(registry.live_session_count().await, 0);
        assert!(store.attempt(attempt.id).unwrap().is_completed());
    }
}
