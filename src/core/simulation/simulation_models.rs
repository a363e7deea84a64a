// Simulation domain models - session state, configuration and the notices
// the presentation layer shows to the user.

use crate::core::history::{AppendOutcome, PersistenceError};
use crate::core::messages::Message;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle of a simulation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not started yet, or stopped and ready to start again.
    Idle,
    /// Accepting messages.
    Active,
    /// Started but not accepting messages.
    Paused,
    /// Shut down for good; `start` no longer works.
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Active => write!(f, "active"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Configuration for a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// How long the bot "thinks" before replying.
    pub bot_reply_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            bot_reply_delay: Duration::from_millis(1000),
        }
    }
}

/// Toast-style feedback for the user. The core only produces these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub kind: NoticeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Destructive,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NoticeKind::Info,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NoticeKind::Destructive,
        }
    }
}

/// Why `send` did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Session is idle or stopped.
    NotActive,
    Paused,
    EmptyText,
}

/// What happened to the audit record of a sent message.
#[derive(Debug)]
pub enum AuditStatus {
    /// Message was benign; nothing to record.
    NotRequired,
    /// Ledger accepted the entry (or already had it).
    Recorded(AppendOutcome),
    /// Ledger write failed. The message stays hidden in the transcript anyway.
    Failed(PersistenceError),
}

/// Result of `SimulationSession::send`.
#[derive(Debug)]
pub enum SendOutcome {
    Ignored(IgnoreReason),
    Sent { message: Message, audit: AuditStatus },
}

impl SendOutcome {
    #[cfg(test)]
    pub fn message(&self) -> Option<&Message> {
        match self {
            SendOutcome::Sent { message, .. } => Some(message),
            SendOutcome::Ignored(_) => None,
        }
    }

    /// Notices the user should see for this send, in display order.
    pub fn notices(&self) -> Vec<Notice> {
        let SendOutcome::Sent { message, audit } = self else {
            return Vec::new();
        };

        let mut notices = Vec::new();
        match audit {
            AuditStatus::NotRequired => {}
            AuditStatus::Recorded(_) => {
                if let Some(verdict) = &message.verdict {
                    notices.push(Notice::destructive(
                        "Message Hidden",
                        format!(
                            "Message contained {} content with {} severity.",
                            verdict.describe_categories(", "),
                            verdict.severity
                        ),
                    ));
                }
            }
            AuditStatus::Failed(_) => {
                notices.push(Notice::destructive(
                    "Error",
                    "Failed to store message in history.",
                ));
            }
        }
        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::StoreError;
    use crate::core::moderation::{FilterResult, HarmCategory, Severity};

    #[test]
    fn test_benign_send_has_no_notices() {
        let outcome = SendOutcome::Sent {
            message: Message::from_user("hello", FilterResult::clean()),
            audit: AuditStatus::NotRequired,
        };
        assert!(outcome.notices().is_empty());
    }

    #[test]
    fn test_recorded_send_describes_verdict() {
        let verdict = FilterResult::harmful(
            vec![HarmCategory::Violence, HarmCategory::Harassment],
            Severity::Medium,
        );
        let outcome = SendOutcome::Sent {
            message: Message::from_user("...", verdict),
            audit: AuditStatus::Recorded(AppendOutcome::Recorded),
        };

        let notices = outcome.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Message Hidden");
        assert_eq!(
            notices[0].description,
            "Message contained violence, harassment content with medium severity."
        );
        assert_eq!(notices[0].kind, NoticeKind::Destructive);
    }

    #[test]
    fn test_failed_send_reports_storage_error() {
        let verdict = FilterResult::harmful(vec![HarmCategory::Spam], Severity::Low);
        let outcome = SendOutcome::Sent {
            message: Message::from_user("...", verdict),
            audit: AuditStatus::Failed(PersistenceError(StoreError::StorageError(
                "offline".to_string(),
            ))),
        };

        let notices = outcome.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].description, "Failed to store message in history.");
    }

    #[test]
    fn test_ignored_send_has_no_message() {
        let outcome = SendOutcome::Ignored(IgnoreReason::Paused);
        assert!(outcome.message().is_none());
        assert!(outcome.notices().is_empty());
    }
}
