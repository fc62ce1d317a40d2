// src/engine/autosave.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::{models::attempt::AnswerState, store::Store};

/// Debounced, best-effort persistence of ledger snapshots.
///
/// Ledger mutations hand a full snapshot to `queue`; the background
/// task persists only the latest snapshot after the channel has been
/// quiet for one debounce window (trailing edge). N rapid mutations
/// therefore produce a single write carrying the Nth snapshot.
///
/// Write failures are logged and swallowed: an in-progress attempt
/// keeps running and the next window retries with a fresher snapshot.
/// The authoritative write happens at final submission regardless.
pub struct AutosaveScheduler {
    tx: mpsc::UnboundedSender<Vec<AnswerState>>,
}

impl AutosaveScheduler {
    pub fn spawn(store: Arc<dyn Store>, attempt_id: i64, debounce: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<AnswerState>>();

        tokio::spawn(async move {
            while let Some(mut latest) = rx.recv().await {
                // Keep absorbing snapshots until a full debounce window
                // passes without a new one.
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(newer)) => latest = newer,
                        // Sender dropped: flush what we have and stop.
                        Ok(None) => break,
                        Err(_) => break,
                    }
                }

                if let Err(e) = store.persist_answer_snapshot(attempt_id, &latest).await {
                    tracing::warn!("Autosave for attempt {} failed: {}", attempt_id, e);
                }
            }
        });

        Self { tx }
    }

    /// Queues a snapshot, restarting the debounce window. Never blocks
    /// and never fails from the caller's perspective.
    pub fn queue(&self, snapshot: Vec<AnswerState>) {
        let _ = self.tx.send(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    async fn attempt_on(store: &Arc<MemoryStore>) -> i64 {
        store
            .create_attempt(1, "cand-1", Utc::now(), &[])
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn rapid_mutations_collapse_to_one_trailing_write() {
        let store = Arc::new(MemoryStore::new());
        let attempt_id = attempt_on(&store).await;
        let scheduler = AutosaveScheduler::spawn(
            store.clone(),
            attempt_id,
            Duration::from_millis(50),
        );

        for i in 0..5 {
            let mut state = AnswerState::empty(1);
            state.selected_option_id = Some(format!("opt-{}", i));
            scheduler.queue(vec![state]);
        }

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(store.snapshot_write_count(), 1);
        let saved = store.attempt(attempt_id).unwrap().answers.unwrap();
        assert_eq!(saved.0[0].selected_option_id.as_deref(), Some("opt-4"));
    }

    #[tokio::test]
    async fn failed_write_does_not_kill_the_scheduler() {
        let store = Arc::new(MemoryStore::new());
        let attempt_id = attempt_on(&store).await;
        let scheduler = AutosaveScheduler::spawn(
            store.clone(),
            attempt_id,
            Duration::from_millis(20),
        );

        store.set_fail_snapshot_writes(true);
        scheduler.queue(vec![AnswerState::empty(1)]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.snapshot_write_count(), 1);
        assert!(store.attempt(attempt_id).unwrap().answers.unwrap().0.is_empty());

        // Next window retries with the latest snapshot.
        store.set_fail_snapshot_writes(false);
        let mut state = AnswerState::empty(1);
        state.selected_option_id = Some("a".to_string());
        scheduler.queue(vec![state]);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.snapshot_write_count(), 2);
        let saved = store.attempt(attempt_id).unwrap().answers.unwrap();
        assert_eq!(saved.0[0].selected_option_id.as_deref(), Some("a"));
    }
}
