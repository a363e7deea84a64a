// Simulation session - orchestrates one user's moderated chat.
//
// Each user turn:
// 1. Classify the text
// 2. Append it to the transcript right away, hidden if harmful
// 3. Schedule the bot's reply
// 4. If harmful, record it in the ledger (which notifies history observers)
//
// The hide in step 2 happens before the ledger write on purpose: the live
// view must never show harmful content while the write is in flight, and a
// failed write never un-hides it.

use super::simulation_models::{
    AuditStatus, IgnoreReason, Notice, SendOutcome, SessionState, SimulationConfig,
};
use crate::core::history::{
    HistoryEntry, HistoryStore, HistorySubscription, ModerationLedger, PersistenceError,
    RestorationTarget, StoreError,
};
use crate::core::messages::{Message, MessageId};
use crate::core::moderation::{CategoryScore, FilterResult, MessageClassifier};
use std::sync::{Arc, Mutex, MutexGuard};

const WELCOME_TEXT: &str =
    "Hi! I'm here to help you test the message filter. Try sending some messages!";
const SESSION_ENDED_TEXT: &str = "Simulation ended. Start a new session to keep testing!";
const BENIGN_REPLY: &str = "Thanks for the message! Keep testing our filter system. 👍";

/// State shared between the session and its pending bot replies.
struct SessionInner {
    state: SessionState,
    transcript: Vec<Message>,
    /// Bumped on every stop/shutdown so stale bot replies can tell they're stale.
    generation: u64,
}

impl SessionInner {
    fn reset(&mut self, state: SessionState) {
        self.state = state;
        self.generation += 1;
        self.transcript = vec![Message::from_bot(SESSION_ENDED_TEXT)];
    }
}

fn lock(inner: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn bot_reply_for(verdict: &FilterResult) -> String {
    if verdict.is_harmful {
        format!(
            "I noticed that message might contain {}. Remember, kind words make the internet a better place! 😊",
            verdict.describe_categories(" and ")
        )
    } else {
        BENIGN_REPLY.to_string()
    }
}

/// One user's chat session.
pub struct SimulationSession<S: HistoryStore + 'static> {
    classifier: Arc<MessageClassifier>,
    ledger: Arc<ModerationLedger<S>>,
    config: SimulationConfig,
    inner: Arc<Mutex<SessionInner>>,
}

impl<S: HistoryStore + 'static> SimulationSession<S> {
    /// Create an idle session whose transcript holds the welcome message.
    pub fn new(
        classifier: Arc<MessageClassifier>,
        ledger: Arc<ModerationLedger<S>>,
        config: SimulationConfig,
    ) -> Self {
        Self {
            classifier,
            ledger,
            config,
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Idle,
                transcript: vec![Message::from_bot(WELCOME_TEXT)],
                generation: 0,
            })),
        }
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner).state
    }

    /// Snapshot of the transcript, oldest first.
    pub fn transcript(&self) -> Vec<Message> {
        lock(&self.inner).transcript.clone()
    }

    /// Classify text without sending it.
    pub fn classify(&self, text: &str) -> FilterResult {
        self.classifier.classify(text)
    }

    /// Per-category scores behind `classify`.
    pub fn explain(&self, text: &str) -> Vec<CategoryScore> {
        self.classifier.score(text)
    }

    /// Flagged-message history, newest first.
    pub async fn history_snapshot(&self) -> Result<Vec<HistoryEntry>, PersistenceError> {
        self.ledger.list_descending().await
    }

    /// Get told whenever the history changes.
    pub fn subscribe_to_history<F>(&self, callback: F) -> HistorySubscription
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.ledger.notifier().subscribe(callback)
    }

    /// Begin (or resume) accepting messages.
    pub fn start(&self) -> Option<Notice> {
        let mut inner = lock(&self.inner);
        match inner.state {
            SessionState::Idle | SessionState::Paused => {
                inner.state = SessionState::Active;
                tracing::info!(generation = inner.generation, "Simulation started");
                Some(Notice::info(
                    "Simulation Started",
                    "You can now send messages to test the filter.",
                ))
            }
            SessionState::Active | SessionState::Stopped => None,
        }
    }

    /// Toggle between active and paused.
    pub fn pause(&self) -> Option<Notice> {
        let mut inner = lock(&self.inner);
        match inner.state {
            SessionState::Active => {
                inner.state = SessionState::Paused;
                tracing::info!("Simulation paused");
                Some(Notice::info(
                    "Simulation Paused",
                    "Message sending is paused.",
                ))
            }
            SessionState::Paused => {
                inner.state = SessionState::Active;
                tracing::info!("Simulation resumed");
                Some(Notice::info(
                    "Simulation Resumed",
                    "You can continue sending messages.",
                ))
            }
            SessionState::Idle | SessionState::Stopped => None,
        }
    }

    /// End the run: back to idle with a fresh transcript. Pending bot
    /// replies are dropped; pending ledger writes still complete.
    pub fn stop(&self) -> Option<Notice> {
        let mut inner = lock(&self.inner);
        if inner.state == SessionState::Stopped {
            return None;
        }
        inner.reset(SessionState::Idle);
        tracing::info!(generation = inner.generation, "Simulation ended");
        Some(Notice::info(
            "Simulation Ended",
            "All messages have been cleared. Start a new session to continue testing.",
        ))
    }

    /// Stop for good. Used when the process is exiting.
    pub fn shutdown(&self) {
        let mut inner = lock(&self.inner);
        if inner.state != SessionState::Stopped {
            inner.reset(SessionState::Stopped);
            tracing::info!("Simulation shut down");
        }
    }

    /// Send a user message.
    ///
    /// Does nothing unless the session is active and the text has
    /// something besides whitespace. A ledger failure is reported in the
    /// outcome but never makes a hidden message visible.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let (message, generation) = {
            let mut inner = lock(&self.inner);
            match inner.state {
                SessionState::Active => {}
                SessionState::Paused => return SendOutcome::Ignored(IgnoreReason::Paused),
                SessionState::Idle | SessionState::Stopped => {
                    return SendOutcome::Ignored(IgnoreReason::NotActive)
                }
            }
            if text.trim().is_empty() {
                return SendOutcome::Ignored(IgnoreReason::EmptyText);
            }

            let verdict = self.classifier.classify(text);
            let message = Message::from_user(text, verdict);
            inner.transcript.push(message.clone());
            (message, inner.generation)
        };

        if let Some(verdict) = &message.verdict {
            tracing::info!(
                message_id = %message.id,
                harmful = verdict.is_harmful,
                categories = %verdict.describe_categories(","),
                severity = %verdict.severity,
                "User message classified"
            );
            self.schedule_bot_reply(generation, bot_reply_for(verdict));
        }

        let audit = match HistoryEntry::from_message(&message) {
            Some(entry) => self.record(entry).await,
            None => AuditStatus::NotRequired,
        };

        SendOutcome::Sent { message, audit }
    }

    /// Write to the ledger from a separate task, so the write still lands
    /// if the caller goes away or the session is stopped meanwhile.
    async fn record(&self, entry: HistoryEntry) -> AuditStatus {
        let ledger = Arc::clone(&self.ledger);
        let task = tokio::spawn(async move { ledger.append(entry).await });

        match task.await {
            Ok(Ok(outcome)) => AuditStatus::Recorded(outcome),
            Ok(Err(e)) => AuditStatus::Failed(e),
            Err(e) => {
                tracing::error!("Ledger append task failed: {}", e);
                AuditStatus::Failed(PersistenceError(StoreError::StorageError(e.to_string())))
            }
        }
    }

    fn schedule_bot_reply(&self, generation: u64, text: String) {
        let inner = Arc::clone(&self.inner);
        let delay = self.config.bot_reply_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut inner = lock(&inner);
            if inner.generation != generation {
                tracing::debug!(generation, "Dropping bot reply for a finished session");
                return;
            }
            // Paused sessions still get their reply
            inner.transcript.push(Message::from_bot(text));
        });
    }
}

impl<S: HistoryStore + 'static> RestorationTarget for SimulationSession<S> {
    fn reveal(&self, id: MessageId) -> bool {
        let mut inner = lock(&self.inner);
        match inner
            .transcript
            .iter_mut()
            .find(|m| m.id == id && m.is_hidden)
        {
            Some(message) => {
                message.is_hidden = false;
                tracing::info!(message_id = %id, "Message revealed in live transcript");
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
