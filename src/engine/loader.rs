// src/engine/loader.rs

use rand::seq::SliceRandom;

use crate::{
    engine::{clock::Clock, ledger::AnswerLedger},
    error::AppError,
    models::{assessment::Assessment, attempt::Attempt, question::Question},
    store::Store,
};

/// Everything a live session needs, assembled in one place.
#[derive(Debug)]
pub struct LoadedSession {
    pub assessment: Assessment,
    pub questions: Vec<Question>,
    pub attempt: Attempt,
    pub ledger: AnswerLedger,
    pub resumed: bool,
}

/// Fetches the assessment and its questions, applies shuffling, and
/// resolves the attempt: resuming the candidate's in-progress attempt
/// when one exists (never duplicating it), creating a fresh one
/// otherwise.
///
/// Shuffling happens exactly once per load. The correct flag lives on
/// the option itself, so permuting options cannot desync selections or
/// correctness from option identity.
pub async fn load_session(
    store: &dyn Store,
    clock: &dyn Clock,
    assessment_id: i64,
    candidate_id: &str,
    existing_attempt_id: Option<i64>,
) -> Result<LoadedSession, AppError> {
    let assessment = store
        .fetch_assessment(assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    let attempt = resolve_attempt(store, &assessment, candidate_id, existing_attempt_id).await?;

    match attempt {
        Some(attempt) => resume(store, &assessment, attempt).await,
        None => start_fresh(store, clock, assessment, candidate_id).await,
    }
}

/// Finds the attempt to resume, or `None` when a fresh one should be
/// created. Enforces ownership and the max-attempts limit.
async fn resolve_attempt(
    store: &dyn Store,
    assessment: &Assessment,
    candidate_id: &str,
    existing_attempt_id: Option<i64>,
) -> Result<Option<Attempt>, AppError> {
    if let Some(attempt_id) = existing_attempt_id {
        let attempt = store
            .fetch_attempt(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

        if attempt.assessment_id != assessment.id || attempt.candidate_id != candidate_id {
            return Err(AppError::BadRequest(
                "Attempt does not belong to this assessment and candidate".to_string(),
            ));
        }
        if attempt.is_completed() {
            return Err(AppError::Conflict("Attempt already completed".to_string()));
        }
        return Ok(Some(attempt));
    }

    if let Some(attempt) = store
        .find_in_progress_attempt(assessment.id, candidate_id)
        .await?
    {
        return Ok(Some(attempt));
    }

    if let Some(max) = assessment.max_attempts {
        let completed = store
            .completed_attempt_count(assessment.id, candidate_id)
            .await?;
        if completed >= i64::from(max) {
            return Err(AppError::Conflict(format!(
                "Maximum of {} attempts reached",
                max
            )));
        }
    }

    Ok(None)
}

async fn start_fresh(
    store: &dyn Store,
    clock: &dyn Clock,
    assessment: Assessment,
    candidate_id: &str,
) -> Result<LoadedSession, AppError> {
    let mut questions = store
        .fetch_questions(&assessment.category, i64::from(assessment.question_count))
        .await?;

    if questions.is_empty() {
        return Err(AppError::Conflict(
            "No questions available for this assessment".to_string(),
        ));
    }

    // A bank smaller than the target count serves fewer questions;
    // that is not an error.
    shuffle(&assessment, &mut questions);

    let ledger = AnswerLedger::new(questions.iter().map(|q| q.id));
    let attempt = store
        .create_attempt(assessment.id, candidate_id, clock.now(), &ledger.snapshot())
        .await?;

    tracing::info!(
        "Started attempt {} on assessment {} ({} questions)",
        attempt.id,
        assessment.id,
        questions.len()
    );

    Ok(LoadedSession {
        assessment,
        questions,
        attempt,
        ledger,
        resumed: false,
    })
}

async fn resume(
    store: &dyn Store,
    assessment: &Assessment,
    attempt: Attempt,
) -> Result<LoadedSession, AppError> {
    // Serve the exact question set the attempt started with, so the
    // snapshot restores verbatim.
    let snapshot = attempt
        .answers
        .as_ref()
        .map(|a| a.0.clone())
        .unwrap_or_default();
    let snapshot_ids: Vec<i64> = snapshot.iter().map(|s| s.question_id).collect();

    let mut questions = store.fetch_questions_by_ids(&snapshot_ids).await?;
    // Back into the order the attempt originally served them.
    questions.sort_by_key(|q| {
        snapshot_ids
            .iter()
            .position(|&id| id == q.id)
            .unwrap_or(usize::MAX)
    });

    let mut shuffled = questions;
    if assessment.shuffle_options {
        let mut rng = rand::thread_rng();
        for question in &mut shuffled {
            question.options.0.shuffle(&mut rng);
        }
    }

    let ledger = AnswerLedger::restore(shuffled.iter().map(|q| q.id), &snapshot);

    tracing::info!(
        "Resumed attempt {} on assessment {}",
        attempt.id,
        assessment.id
    );

    Ok(LoadedSession {
        assessment: assessment.clone(),
        questions: shuffled,
        attempt,
        ledger,
        resumed: true,
    })
}

fn shuffle(assessment: &Assessment, questions: &mut [Question]) {
    let mut rng = rand::thread_rng();
    if assessment.shuffle_questions {
        questions.shuffle(&mut rng);
    }
    if assessment.shuffle_options {
        // Each question's options are permuted independently.
        for question in questions.iter_mut() {
            question.options.0.shuffle(&mut rng);
        }
    }
}
