// Rendering helpers for the console.
// Everything here returns Strings so the REPL decides where they go.

use crate::core::history::{AppendOutcome, HistoryEntry};
use crate::core::messages::{Message, Sender};
use crate::core::moderation::{CategoryScore, FilterResult};
use crate::core::simulation::{AuditStatus, IgnoreReason, Notice, NoticeKind, SessionState};

const HISTORY_PREVIEW_CHARS: usize = 48;

pub fn format_message(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "🧑 you",
        Sender::Bot => "🤖 bot",
    };
    let time = message.timestamp.format("%H:%M:%S");

    if message.is_hidden {
        let reason = message
            .verdict
            .as_ref()
            .map(|v| format!(" ({}, {} severity)", v.describe_categories(", "), v.severity))
            .unwrap_or_default();
        return format!(
            "[{}] {}: ⛔ message hidden{} [id {}]",
            time, who, reason, message.id
        );
    }

    format!("[{}] {}: {}", time, who, message.text)
}

pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(format_message)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_notice(notice: &Notice) -> String {
    let icon = match notice.kind {
        NoticeKind::Info => "ℹ️",
        NoticeKind::Destructive => "🚫",
    };
    format!("{} {}: {}", icon, notice.title, notice.description)
}

/// A message that was hidden and has since been restored by a moderator.
pub fn format_restored(message: &Message) -> String {
    format!("✅ Restored by a moderator: {}", format_message(message))
}

/// Detail under the notices for a flagged message's history write.
pub fn format_audit(audit: &AuditStatus) -> Option<String> {
    match audit {
        AuditStatus::NotRequired | AuditStatus::Recorded(AppendOutcome::Recorded) => None,
        AuditStatus::Recorded(AppendOutcome::AlreadyRecorded) => {
            Some("   ↳ already in history".to_string())
        }
        AuditStatus::Failed(e) => Some(format!("   ↳ {}", e)),
    }
}

pub fn format_ignored(reason: IgnoreReason, state: SessionState) -> String {
    match reason {
        IgnoreReason::NotActive => format!(
            "Simulation is {}. Use /start to begin sending messages.",
            state
        ),
        IgnoreReason::Paused => "Simulation is paused. Use /start to resume.".to_string(),
        IgnoreReason::EmptyText => "Type something first.".to_string(),
    }
}

pub fn format_status(state: SessionState) -> String {
    let icon = match state {
        SessionState::Active => "🟢",
        SessionState::Paused => "⏸️",
        SessionState::Idle => "⚪",
        SessionState::Stopped => "⏹️",
    };
    format!("{} Simulation {}", icon, state)
}

/// The flagged-message table. Text is shown here since this is the audit view.
pub fn format_history_table(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "📜 No flagged messages yet. Try the simulation to generate some history!"
            .to_string();
    }

    let mut out = format!(
        "📜 Message History ({})\n{:<19}  {:<16}  {:<48}  {}",
        entries.len(),
        "Date",
        "Id",
        "Message",
        "Status"
    );
    for entry in entries {
        out.push('\n');
        out.push_str(&format!(
            "{:<19}  {:<16}  {:<48}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.id.to_string(),
            preview(&entry.text),
            if entry.is_hidden { "hidden" } else { "restored" }
        ));
    }
    out
}

/// Verdict plus per-category scores for `/classify`.
pub fn format_classification(verdict: &FilterResult, scores: &[CategoryScore]) -> String {
    let mut out = if verdict.is_harmful {
        format!(
            "🚩 Harmful: {} ({} severity)",
            verdict.describe_categories(", "),
            verdict.severity
        )
    } else {
        "✅ Clean".to_string()
    };

    for score in scores.iter().filter(|s| s.matches > 0) {
        out.push_str(&format!(
            "\n  {:<15} matches={} score={}{}",
            score.category.to_string(),
            score.matches,
            score.score,
            if score.triggered { " ⚑" } else { "" }
        ));
    }
    out
}

pub fn format_help() -> String {
    [
        "Commands:",
        "  /start            start or resume the simulation",
        "  /pause            pause (or resume) the simulation",
        "  /stop             end the session and reset the chat",
        "  /transcript       show the chat so far",
        "  /history          show flagged-message history",
        "  /restore <id>     publish a moderator decision to restore a message",
        "  /rehide <id>      publish a hide decision (ignored by the watcher)",
        "  /classify <text>  show how text would be classified",
        "  /help             this list",
        "  /quit             exit",
        "Anything else is sent as a chat message.",
    ]
    .join("\n")
}

fn preview(text: &str) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= HISTORY_PREVIEW_CHARS {
        return single_line;
    }
    let cut: String = single_line.chars().take(HISTORY_PREVIEW_CHARS - 1).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::messages::MessageId;
    use crate::core::moderation::{HarmCategory, MessageClassifier, Severity};
    use chrono::Utc;

    #[test]
    fn test_hidden_message_does_not_leak_text() {
        let verdict = FilterResult::harmful(vec![HarmCategory::Violence], Severity::Low);
        let message = Message::from_user("i will kill you", verdict);

        let line = format_message(&message);

        assert!(!line.contains("kill"));
        assert!(line.contains("message hidden"));
        assert!(line.contains("violence"));
        assert!(line.contains(&message.id.to_string()));
    }

    #[test]
    fn test_visible_message_shows_text() {
        let message = Message::from_bot("hello there");
        let line = format_message(&message);
        assert!(line.contains("🤖 bot: hello there"));
    }

    #[test]
    fn test_history_table_statuses() {
        let entry = |id: i64, hidden: bool| HistoryEntry {
            id: MessageId(id),
            text: format!("flagged {}", id),
            sender: Sender::User,
            is_hidden: hidden,
            timestamp: Utc::now(),
            verdict: FilterResult::harmful(vec![HarmCategory::Profanity], Severity::Low),
        };

        let table = format_history_table(&[entry(2, false), entry(1, true)]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("(2)"));
        assert!(lines[2].contains("flagged 2") && lines[2].ends_with("restored"));
        assert!(lines[3].contains("flagged 1") && lines[3].ends_with("hidden"));
    }

    #[test]
    fn test_empty_history() {
        assert!(format_history_table(&[]).contains("No flagged messages yet"));
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "a".repeat(100);
        let short = preview(&long);
        assert_eq!(short.chars().count(), HISTORY_PREVIEW_CHARS);
        assert!(short.ends_with('…'));
        assert_eq!(preview("line\nbreak"), "line break");
    }

    #[test]
    fn test_classification_lists_matching_categories_only() {
        let classifier = MessageClassifier::new();
        let text = "you are an idiot";
        let out = format_classification(&classifier.classify(text), &classifier.score(text));

        assert!(out.starts_with("🚩 Harmful: harassment"));
        assert!(out.contains("harassment"));
        assert!(!out.contains("spam"));

        let clean = format_classification(&classifier.classify("hi"), &classifier.score("hi"));
        assert_eq!(clean, "✅ Clean");
    }

    #[test]
    fn test_audit_detail() {
        use crate::core::history::{PersistenceError, StoreError};

        assert_eq!(format_audit(&AuditStatus::NotRequired), None);
        assert_eq!(
            format_audit(&AuditStatus::Recorded(AppendOutcome::Recorded)),
            None
        );
        assert_eq!(
            format_audit(&AuditStatus::Recorded(AppendOutcome::AlreadyRecorded)).as_deref(),
            Some("   ↳ already in history")
        );

        let failed = AuditStatus::Failed(PersistenceError(StoreError::StorageError(
            "disk full".to_string(),
        )));
        let line = format_audit(&failed).unwrap();
        assert!(line.contains("disk full"));
    }

    #[test]
    fn test_restored_message_shows_text() {
        let verdict = FilterResult::harmful(vec![HarmCategory::Harassment], Severity::Low);
        let mut message = Message::from_user("you idiot", verdict);
        message.is_hidden = false;

        let line = format_restored(&message);
        assert!(line.starts_with("✅ Restored by a moderator:"));
        assert!(line.contains("you idiot"));
    }

    #[test]
    fn test_notice_format() {
        let notice = Notice::destructive("Error", "Failed to store message in history.");
        assert_eq!(
            format_notice(&notice),
            "🚫 Error: Failed to store message in history."
        );
    }
}
