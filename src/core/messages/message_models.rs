// Message domain models - one entry in a chat transcript.
//
// These are pure domain types with no storage or console dependencies.

use crate::core::moderation::FilterResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Last id handed out by `MessageId::next`, shared by every session in the process.
static LAST_MESSAGE_ID: AtomicI64 = AtomicI64::new(0);

/// Identifier of a transcript message (and of its history entry, if any).
///
/// Ids are time-based (Unix milliseconds) but strictly increasing across the
/// whole process, so two sessions sharing one ledger never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Allocate a fresh id: `max(now_ms, last + 1)`.
    pub fn next() -> Self {
        let now = Utc::now().timestamp_millis();
        let previous = LAST_MESSAGE_ID
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        MessageId(now.max(previous + 1))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(MessageId)
    }
}

/// Who wrote a message. Welcome and "session ended" notices are bot messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Sender::User),
            "bot" => Some(Sender::Bot),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Only a restoration event may change this after creation.
    pub is_hidden: bool,
    /// Present only for user messages that went through the classifier.
    pub verdict: Option<FilterResult>,
}

impl Message {
    /// A classified user message. Harmful content starts out hidden.
    pub fn from_user(text: impl Into<String>, verdict: FilterResult) -> Self {
        Self {
            id: MessageId::next(),
            text: text.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            is_hidden: verdict.is_harmful,
            verdict: Some(verdict),
        }
    }

    pub fn from_bot(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            text: text.into(),
            sender: Sender::Bot,
            timestamp: Utc::now(),
            is_hidden: false,
            verdict: None,
        }
    }

    pub fn is_harmful(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| v.is_harmful)
    }
}
