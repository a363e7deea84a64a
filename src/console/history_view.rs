// Live history view.
//
// Subscribes to history broadcasts and re-renders the flagged-message table
// each time. The notifier callback only pokes a channel; the re-query runs
// on its own task so the ledger is never called back into synchronously.

use super::formatter::format_history_table;
use crate::core::history::{HistoryStore, HistorySubscription};
use crate::core::simulation::SimulationSession;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct HistoryView {
    subscription: HistorySubscription,
    task: JoinHandle<()>,
}

impl HistoryView {
    /// Start rendering into `output` (one String per re-render).
    pub fn spawn<S>(session: Arc<SimulationSession<S>>, output: mpsc::UnboundedSender<String>) -> Self
    where
        S: HistoryStore + 'static,
    {
        let (changed_tx, mut changed_rx) = mpsc::unbounded_channel::<()>();

        let subscription = session.subscribe_to_history(move || {
            changed_tx
                .send(())
                .map_err(|_| anyhow::anyhow!("history view is gone"))
        });

        let task = tokio::spawn(async move {
            while changed_rx.recv().await.is_some() {
                // Collapse a burst of changes into one re-render
                while changed_rx.try_recv().is_ok() {}

                match session.history_snapshot().await {
                    Ok(entries) => {
                        if output.send(format_history_table(&entries)).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Failed to refresh history view: {}", e),
                }
            }
            tracing::debug!("History view stopped");
        });

        Self { subscription, task }
    }

    /// Unsubscribe and stop re-rendering.
    pub fn close(self) {
        self.subscription.unsubscribe();
        self.task.abort();
    }
}
