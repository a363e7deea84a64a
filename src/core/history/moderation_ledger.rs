// Moderation ledger - the audit log of flagged messages.
//
// This service handles:
// - Recording harmful messages (idempotent on retry)
// - Restoring visibility after a moderator override
// - Listing history newest first
// - Notifying observers after every change
//
// Storage lives behind the HistoryStore port, same as every other core service.

use super::history_models::HistoryEntry;
use super::history_notifier::HistoryNotifier;
use super::history_store::{HistoryStore, StoreError};
use crate::core::messages::MessageId;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

// ============================================================================
// ERRORS
// ============================================================================

/// The history store could not be written or read. Recoverable: the caller
/// keeps its local state and the next successful write converges.
#[derive(Debug, Error)]
#[error("Persistence error: {0}")]
pub struct PersistenceError(#[from] pub StoreError);

/// What `append` did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Newly written.
    Recorded,
    /// Already present (e.g. a retried append); treated as success.
    AlreadyRecorded,
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Ledger of flagged messages, shared by every session in the process.
pub struct ModerationLedger<S: HistoryStore> {
    store: S,
    notifier: Arc<HistoryNotifier>,
    // Serializes append/set_visible per entry id
    entry_locks: DashMap<MessageId, Arc<Mutex<()>>>,
}

impl<S: HistoryStore> ModerationLedger<S> {
    /// Create a new ledger over the given store.
    pub fn new(store: S, notifier: Arc<HistoryNotifier>) -> Self {
        Self {
            store,
            notifier,
            entry_locks: DashMap::new(),
        }
    }

    pub fn notifier(&self) -> &Arc<HistoryNotifier> {
        &self.notifier
    }

    /// Record a flagged message.
    ///
    /// A duplicate id counts as success so a retried append never surfaces
    /// as a user error. Observers are notified in both cases, once the store
    /// write has completed.
    pub async fn append(&self, entry: HistoryEntry) -> Result<AppendOutcome, PersistenceError> {
        let id = entry.id;
        let result = self
            .with_entry_lock(id, async {
                match self.store.insert(&entry).await {
                    Ok(()) => Ok(AppendOutcome::Recorded),
                    Err(StoreError::DuplicateKey(_)) => Ok(AppendOutcome::AlreadyRecorded),
                    Err(e) => Err(PersistenceError(e)),
                }
            })
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(message_id = %id, "Failed to record flagged message: {}", e);
                return Err(e);
            }
        };

        match outcome {
            AppendOutcome::Recorded => {
                tracing::info!(message_id = %id, "Flagged message recorded");
            }
            AppendOutcome::AlreadyRecorded => {
                tracing::debug!(message_id = %id, "Flagged message was already recorded");
            }
        }

        self.notifier.broadcast();
        Ok(outcome)
    }

    /// Make an entry visible again.
    ///
    /// Returns whether anything changed. Unknown or already-visible ids are
    /// a no-op, not an error, and don't notify anyone.
    pub async fn set_visible(&self, id: MessageId) -> Result<bool, PersistenceError> {
        let changed = self
            .with_entry_lock(id, self.store.mark_visible(id))
            .await
            .map_err(|e| {
                tracing::warn!(message_id = %id, "Failed to restore flagged message: {}", e);
                PersistenceError(e)
            })?;

        if changed {
            tracing::info!(message_id = %id, "Flagged message restored to visible");
            self.notifier.broadcast();
        } else {
            tracing::debug!(message_id = %id, "Restore was a no-op");
        }

        Ok(changed)
    }

    /// All entries, newest first. Equal timestamps are ordered by id, highest first.
    pub async fn list_descending(&self) -> Result<Vec<HistoryEntry>, PersistenceError> {
        let mut entries = self.store.query_all_ordered_desc().await?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn with_entry_lock<T>(
        &self,
        id: MessageId,
        work: impl std::future::Future<Output = T>,
    ) -> T {
        let lock = self
            .entry_locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            work.await
        };

        drop(lock);
        // Forget the lock once nobody else is waiting on it
        self.entry_locks
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }
}

// ============================================================================
// TESTS
// ============================================================================
