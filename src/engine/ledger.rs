// src/engine/ledger.rs

use std::collections::HashMap;

use crate::models::attempt::AnswerState;

/// In-memory per-question answer state for one active attempt.
///
/// The ledger never scores itself: `select` clears any previously
/// resolved correctness, which is recomputed only at submission time.
/// Flagging and answering are independent dimensions.
#[derive(Debug)]
pub struct AnswerLedger {
    entries: HashMap<i64, AnswerState>,
    /// Served question order, preserved for snapshots.
    order: Vec<i64>,
}

impl AnswerLedger {
    /// One empty entry per served question.
    pub fn new(question_ids: impl IntoIterator<Item = i64>) -> Self {
        let order: Vec<i64> = question_ids.into_iter().collect();
        let entries = order
            .iter()
            .map(|&id| (id, AnswerState::empty(id)))
            .collect();
        Self { entries, order }
    }

    /// Rebuilds the ledger from a persisted snapshot, verbatim
    /// (selections and flags included). Snapshot entries for questions
    /// no longer served are dropped; served questions missing from the
    /// snapshot get a fresh empty entry.
    pub fn restore(question_ids: impl IntoIterator<Item = i64>, snapshot: &[AnswerState]) -> Self {
        let mut ledger = Self::new(question_ids);
        for saved in snapshot {
            if let Some(entry) = ledger.entries.get_mut(&saved.question_id) {
                *entry = saved.clone();
            }
        }
        ledger
    }

    pub fn contains(&self, question_id: i64) -> bool {
        self.entries.contains_key(&question_id)
    }

    /// Records the candidate's selection. Leaves the flag untouched and
    /// clears any stale correctness resolution.
    pub fn select(&mut self, question_id: i64, option_id: &str) {
        if let Some(entry) = self.entries.get_mut(&question_id) {
            entry.selected_option_id = Some(option_id.to_string());
            entry.is_correct = None;
        }
    }

    /// Flips the review flag. Leaves the selection untouched.
    pub fn toggle_flag(&mut self, question_id: i64) {
        if let Some(entry) = self.entries.get_mut(&question_id) {
            entry.flagged = !entry.flagged;
        }
    }

    pub fn get(&self, question_id: i64) -> Option<&AnswerState> {
        self.entries.get(&question_id)
    }

    pub(crate) fn get_mut(&mut self, question_id: i64) -> Option<&mut AnswerState> {
        self.entries.get_mut(&question_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.selected_option_id.is_some())
            .count()
    }

    pub fn flagged_count(&self) -> usize {
        self.entries.values().filter(|e| e.flagged).count()
    }

    /// Full snapshot in served-question order, for persistence.
    pub fn snapshot(&self) -> Vec<AnswerState> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }
}
