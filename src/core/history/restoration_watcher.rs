// Restoration watcher - applies moderator overrides from an external feed.
//
// When a moderator decides a flagged message is fine after all, the feed
// delivers (id, is_hidden = false). The watcher makes the ledger entry visible
// and reveals the message in any live transcript that still has it.
// There is no re-hide path: (id, is_hidden = true) events are ignored.

use super::history_models::VisibilityChange;
use super::history_store::HistoryStore;
use super::moderation_ledger::ModerationLedger;
use crate::core::messages::MessageId;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Something holding a live copy of messages that may need revealing.
pub trait RestorationTarget: Send + Sync {
    /// Un-hide the message with this id, if present. Returns `true` if it changed.
    fn reveal(&self, id: MessageId) -> bool;
}

pub struct RestorationWatcher<S: HistoryStore> {
    ledger: Arc<ModerationLedger<S>>,
    targets: Vec<Arc<dyn RestorationTarget>>,
}

impl<S: HistoryStore + 'static> RestorationWatcher<S> {
    pub fn new(ledger: Arc<ModerationLedger<S>>) -> Self {
        Self {
            ledger,
            targets: Vec::new(),
        }
    }

    /// Also reveal restored messages in this target.
    pub fn watch(mut self, target: Arc<dyn RestorationTarget>) -> Self {
        self.targets.push(target);
        self
    }

    /// Apply one feed event. Returns whether anything changed.
    ///
    /// Re-delivering the same event is harmless. A ledger failure is logged
    /// and the live transcripts are still updated.
    pub async fn apply(&self, change: VisibilityChange) -> bool {
        if change.is_hidden {
            tracing::debug!(message_id = %change.id, "Ignoring re-hide event");
            return false;
        }

        let ledger_changed = match self.ledger.set_visible(change.id).await {
            Ok(changed) => changed,
            Err(e) => {
                tracing::warn!(message_id = %change.id, "Could not restore ledger entry: {}", e);
                false
            }
        };

        let mut revealed = 0usize;
        for target in &self.targets {
            if target.reveal(change.id) {
                revealed += 1;
            }
        }

        if ledger_changed || revealed > 0 {
            tracing::info!(
                message_id = %change.id,
                ledger_changed,
                revealed,
                "Applied moderator restoration"
            );
        }

        ledger_changed || revealed > 0
    }

    /// Consume the feed until it closes.
    pub async fn run(self, mut feed: broadcast::Receiver<VisibilityChange>) {
        loop {
            match feed.recv().await {
                Ok(change) => {
                    self.apply(change).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Restoration watcher fell behind the moderation feed");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Moderation feed closed, restoration watcher stopping");
                    break;
                }
            }
        }
    }

    /// Run the watcher as a background task.
    pub fn spawn(self, feed: broadcast::Receiver<VisibilityChange>) -> JoinHandle<()> {
        tokio::spawn(self.run(feed))
    }
}
