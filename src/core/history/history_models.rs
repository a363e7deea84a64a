use crate::core::messages::{Message, MessageId, Sender};
use crate::core::moderation::FilterResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable audit record of a harmful message.
///
/// Shares its id with the transcript message it came from. Its `is_hidden`
/// flag is owned by the ledger and only ever goes from hidden to visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub is_hidden: bool,
    pub timestamp: DateTime<Utc>,
    pub verdict: FilterResult,
}

impl HistoryEntry {
    /// Build the audit record for a message. Returns `None` unless the
    /// message was classified as harmful.
    pub fn from_message(message: &Message) -> Option<Self> {
        if !message.is_harmful() {
            return None;
        }
        let verdict = message.verdict.as_ref()?;
        Some(Self {
            id: message.id,
            text: message.text.clone(),
            sender: message.sender,
            is_hidden: message.is_hidden,
            timestamp: message.timestamp,
            verdict: verdict.clone(),
        })
    }
}

/// Update delivered by the external moderation feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityChange {
    pub id: MessageId,
    pub is_hidden: bool,
}

impl VisibilityChange {
    /// A moderator decided the message should be shown after all.
    pub fn restore(id: MessageId) -> Self {
        Self {
            id,
            is_hidden: false,
        }
    }

    pub fn hide(id: MessageId) -> Self {
        Self {
            id,
            is_hidden: true,
        }
    }
}
