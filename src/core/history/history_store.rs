use super::history_models::HistoryEntry;
use crate::core::messages::MessageId;
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("History entry {0} already exists")]
    DuplicateKey(MessageId),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting flagged-message history.
///
/// The ledger only needs three things from a store: insert a record,
/// flip a record back to visible, and read everything back newest first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert a new entry. Fails with `StoreError::DuplicateKey` if the id is taken.
    async fn insert(&self, entry: &HistoryEntry) -> Result<(), StoreError>;

    /// Mark an entry visible. Returns `true` only if the entry existed and
    /// was hidden.
    async fn mark_visible(&self, id: MessageId) -> Result<bool, StoreError>;

    /// All entries, timestamp descending, ties broken by id descending.
    async fn query_all_ordered_desc(&self) -> Result<Vec<HistoryEntry>, StoreError>;
}

// Lets the composition root pick a store at runtime.
#[async_trait]
impl HistoryStore for Box<dyn HistoryStore> {
    async fn insert(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        (**self).insert(entry).await
    }

    async fn mark_visible(&self, id: MessageId) -> Result<bool, StoreError> {
        (**self).mark_visible(id).await
    }

    async fn query_all_ordered_desc(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        (**self).query_all_ordered_desc().await
    }
}
