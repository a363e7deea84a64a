// In-process moderation decision feed.
//
// Stands in for the external change feed that delivers moderator decisions
// about flagged messages. Anything holding a `ModerationFeed` can publish;
// the restoration watcher subscribes.

use crate::core::history::VisibilityChange;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct ModerationFeed {
    sender: broadcast::Sender<VisibilityChange>,
}

impl ModerationFeed {
    /// `capacity` is how many undelivered decisions a slow subscriber may lag
    /// behind before it starts missing some.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a decision. Returns how many subscribers will see it.
    pub fn publish(&self, change: VisibilityChange) -> usize {
        match self.sender.send(change) {
            Ok(receivers) => {
                tracing::debug!(
                    message_id = %change.id,
                    is_hidden = change.is_hidden,
                    receivers,
                    "Moderation decision published"
                );
                receivers
            }
            Err(_) => {
                tracing::warn!(message_id = %change.id, "Moderation decision had no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VisibilityChange> {
        self.sender.subscribe()
    }
}
