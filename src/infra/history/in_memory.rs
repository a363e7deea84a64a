// In-memory implementation of HistoryStore.
//
// Handy for local runs (HISTORY_STORE=memory) and tests: same contract as the
// SQLite store, nothing survives a restart.

use crate::core::history::{HistoryEntry, HistoryStore, StoreError};
use crate::core::messages::MessageId;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// DashMap-backed history store, safe to share across tasks without a Mutex.
pub struct InMemoryHistoryStore {
    entries: DashMap<MessageId, HistoryEntry>,
}

impl InMemoryHistoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn insert(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        // entry() makes the existence check and the insert one atomic step
        match self.entries.entry(entry.id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(entry.id)),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(())
            }
        }
    }

    async fn mark_visible(&self, id: MessageId) -> Result<bool, StoreError> {
        Ok(match self.entries.get_mut(&id) {
            Some(mut entry) if entry.is_hidden => {
                entry.is_hidden = false;
                true
            }
            _ => false,
        })
    }

    async fn query_all_ordered_desc(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut entries: Vec<HistoryEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();

        // Newest first, id breaks ties
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        Ok(entries)
    }
}
