// Line-oriented console driver.
//
// Reads commands from stdin, runs them against the session and prints the
// result. Bot replies and moderator restorations land in the transcript on
// their own schedule, so every command first prints whatever changed since
// the last one.

use super::commands::{parse_command, Command};
use super::formatter::{
    format_audit, format_classification, format_help, format_history_table, format_ignored,
    format_message, format_notice, format_restored, format_status, format_transcript,
};
use crate::core::history::{HistoryStore, VisibilityChange};
use crate::core::messages::{Message, MessageId};
use crate::core::simulation::{SendOutcome, SimulationSession};
use crate::infra::history::ModerationFeed;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// What to print for one command, and whether to keep going.
#[derive(Debug, Default)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn line(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            quit: false,
        }
    }
}

pub struct Console<S: HistoryStore + 'static> {
    session: Arc<SimulationSession<S>>,
    feed: ModerationFeed,
    /// Newest transcript message already printed.
    last_shown: Option<MessageId>,
    /// Messages printed as hidden, so a later restore can be announced.
    shown_hidden: HashSet<MessageId>,
}

impl<S: HistoryStore + 'static> Console<S> {
    pub fn new(session: Arc<SimulationSession<S>>, feed: ModerationFeed) -> Self {
        Self {
            session,
            feed,
            last_shown: None,
            shown_hidden: HashSet::new(),
        }
    }

    /// Read stdin until EOF or `/quit`.
    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("{}", format_help());
        for line in self.catch_up() {
            println!("{}", line);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let reply = match parse_command(&line) {
                Ok(command) => self.execute(command).await,
                Err(e) => Reply::line(format!("⚠️ {}", e)),
            };
            for line in &reply.lines {
                println!("{}", line);
            }
            if reply.quit {
                break;
            }
        }

        tracing::info!("Console closed");
        Ok(())
    }

    pub async fn execute(&mut self, command: Command) -> Reply {
        let mut reply = Reply {
            lines: self.catch_up(),
            quit: false,
        };

        match command {
            Command::Start => {
                reply.lines.push(match self.session.start() {
                    Some(notice) => format_notice(&notice),
                    None => format_status(self.session.state()),
                });
            }
            Command::Pause => {
                reply.lines.push(match self.session.pause() {
                    Some(notice) => format_notice(&notice),
                    None => format_status(self.session.state()),
                });
            }
            Command::Stop => match self.session.stop() {
                Some(notice) => {
                    reply.lines.push(format_notice(&notice));
                    reply.lines.extend(self.catch_up());
                }
                None => reply.lines.push(format_status(self.session.state())),
            },
            Command::History => match self.session.history_snapshot().await {
                Ok(entries) => reply.lines.push(format_history_table(&entries)),
                Err(e) => reply.lines.push(format!("⚠️ Failed to load history: {}", e)),
            },
            Command::Transcript => {
                let transcript = self.session.transcript();
                self.last_shown = transcript.last().map(|m| m.id);
                self.shown_hidden = transcript
                    .iter()
                    .filter(|m| m.is_hidden)
                    .map(|m| m.id)
                    .collect();
                reply.lines.push(format_status(self.session.state()));
                reply.lines.push(format_transcript(&transcript));
            }
            Command::Restore(id) => {
                reply
                    .lines
                    .push(self.publish(VisibilityChange::restore(id), "restore"));
            }
            Command::Rehide(id) => {
                reply
                    .lines
                    .push(self.publish(VisibilityChange::hide(id), "hide"));
            }
            Command::Classify(text) => {
                let verdict = self.session.classify(&text);
                let scores = self.session.explain(&text);
                reply.lines.push(format_classification(&verdict, &scores));
            }
            Command::Help => reply.lines.push(format_help()),
            Command::Quit => reply.quit = true,
            Command::Say(text) => {
                let outcome = self.session.send(&text).await;
                match &outcome {
                    SendOutcome::Ignored(reason) => {
                        reply
                            .lines
                            .push(format_ignored(*reason, self.session.state()));
                    }
                    SendOutcome::Sent { audit, .. } => {
                        reply.lines.extend(self.catch_up());
                        reply
                            .lines
                            .extend(outcome.notices().iter().map(format_notice));
                        reply.lines.extend(format_audit(audit));
                    }
                }
            }
        }

        reply
    }

    fn publish(&self, change: VisibilityChange, action: &str) -> String {
        match self.feed.publish(change) {
            0 => format!(
                "⚠️ Nobody is listening for moderator decisions; {} of {} dropped",
                action, change.id
            ),
            _ => format!("📣 Published {} decision for message {}", action, change.id),
        }
    }

    /// Restorations of messages printed as hidden, then transcript messages
    /// newer than the last one printed.
    fn catch_up(&mut self) -> Vec<String> {
        let transcript = self.session.transcript();
        let mut lines = Vec::new();

        let restored: Vec<&Message> = transcript
            .iter()
            .filter(|m| !m.is_hidden && self.shown_hidden.contains(&m.id))
            .collect();
        for message in restored {
            self.shown_hidden.remove(&message.id);
            lines.push(format_restored(message));
        }
        // Forget hidden messages that a stop has cleared away
        self.shown_hidden
            .retain(|id| transcript.iter().any(|m| m.id == *id));

        let last_shown = self.last_shown;
        for message in transcript
            .iter()
            .filter(|m| last_shown.map_or(true, |last| m.id > last))
        {
            if message.is_hidden {
                self.shown_hidden.insert(message.id);
            }
            lines.push(format_message(message));
        }

        if let Some(newest) = transcript.iter().map(|m| m.id).max() {
            self.last_shown = Some(last_shown.map_or(newest, |last| last.max(newest)));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::{
        HistoryNotifier, ModerationLedger, RestorationTarget, RestorationWatcher,
    };
    use crate::core::moderation::MessageClassifier;
    use crate::core::simulation::SimulationConfig;
    use crate::infra::history::InMemoryHistoryStore;
    use std::time::Duration;

    struct Harness {
        console: Console<InMemoryHistoryStore>,
        session: Arc<SimulationSession<InMemoryHistoryStore>>,
    }

    fn harness() -> Harness {
        let ledger = Arc::new(ModerationLedger::new(
            InMemoryHistoryStore::new(),
            Arc::new(HistoryNotifier::new()),
        ));
        let session = Arc::new(SimulationSession::new(
            Arc::new(MessageClassifier::new()),
            Arc::clone(&ledger),
            SimulationConfig {
                bot_reply_delay: Duration::from_millis(10),
            },
        ));
        let feed = ModerationFeed::new(8);
        RestorationWatcher::new(ledger)
            .watch(Arc::clone(&session) as Arc<dyn RestorationTarget>)
            .spawn(feed.subscribe());

        Harness {
            console: Console::new(Arc::clone(&session), feed),
            session,
        }
    }

    fn joined(reply: &Reply) -> String {
        reply.lines.join("\n")
    }

    /// The watcher runs on its own task; give it a moment to apply.
    async fn wait_until_restored(session: &SimulationSession<InMemoryHistoryStore>, id: MessageId) {
        for _ in 0..100 {
            let entries = session.history_snapshot().await.unwrap();
            if entries.iter().any(|e| e.id == id && !e.is_hidden) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("message {} was never restored", id);
    }

    #[tokio::test]
    async fn test_message_before_start_is_refused() {
        let mut h = harness();
        let reply = h.console.execute(Command::Say("hello".into())).await;

        assert!(joined(&reply).contains("Use /start"));
        assert!(h.session.history_snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_harmful_message_is_hidden_and_announced() {
        let mut h = harness();
        h.console.execute(Command::Start).await;

        let reply = h.console.execute(Command::Say("you are an idiot".into())).await;
        let out = joined(&reply);

        assert!(out.contains("message hidden"));
        assert!(!out.contains("you are an idiot"));
        assert!(out.contains("Message Hidden: Message contained harassment content"));
    }

    #[tokio::test]
    async fn test_bot_reply_shows_up_on_next_command() {
        let mut h = harness();
        h.console.execute(Command::Start).await;
        h.console.execute(Command::Say("hello".into())).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        let reply = h.console.execute(Command::Help).await;

        assert!(joined(&reply).contains("🤖 bot: Thanks for the message!"));
    }

    #[tokio::test]
    async fn test_restore_reveals_message_in_transcript_and_history() {
        let mut h = harness();
        h.console.execute(Command::Start).await;
        let id = match h.session.send("shut up you idiot").await {
            SendOutcome::Sent { message, .. } => message.id,
            other => panic!("unexpected outcome: {:?}", other),
        };

        let reply = h.console.execute(Command::Restore(id)).await;
        assert!(joined(&reply).contains("Published restore decision"));

        wait_until_restored(&h.session, id).await;

        let transcript = joined(&h.console.execute(Command::Transcript).await);
        assert!(transcript.contains("shut up you idiot"));
    }

    #[tokio::test]
    async fn test_restored_message_is_announced_on_next_command() {
        let mut h = harness();
        h.console.execute(Command::Start).await;
        let out = joined(&h.console.execute(Command::Say("you are an idiot".into())).await);
        assert!(!out.contains("you are an idiot"));

        let id = h.session.transcript()[1].id;
        h.console.execute(Command::Restore(id)).await;
        wait_until_restored(&h.session, id).await;

        let out = joined(&h.console.execute(Command::Help).await);
        assert!(out.contains("Restored by a moderator"));
        assert!(out.contains("you are an idiot"));

        // Announced once only
        let out = joined(&h.console.execute(Command::Help).await);
        assert!(!out.contains("Restored by a moderator"));
    }

    #[tokio::test]
    async fn test_classify_goes_through_the_session() {
        let mut h = harness();
        let out = joined(&h.console.execute(Command::Classify("you idiot".into())).await);

        assert!(out.contains("🚩 Harmful: harassment"));
        assert!(out.contains("matches=1"));
        assert_eq!(h.session.state(), crate::core::simulation::SessionState::Idle);
    }

    #[tokio::test]
    async fn test_stop_shows_session_ended_message() {
        let mut h = harness();
        h.console.execute(Command::Start).await;

        let out = joined(&h.console.execute(Command::Stop).await);

        assert!(out.contains("Simulation Ended"));
        assert!(out.contains("Simulation ended. Start a new session"));
    }

    #[tokio::test]
    async fn test_quit() {
        let mut h = harness();
        assert!(h.console.execute(Command::Quit).await.quit);
    }
}
