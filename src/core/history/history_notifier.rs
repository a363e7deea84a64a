// History notifier - tells observers (e.g. a history view) that the ledger changed.
//
// Observers get no payload; they re-query the ledger when called.
// Fan-out is synchronous and in subscription order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Observer callback. Returning an error only gets it logged.
pub type HistoryCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: Vec<(u64, HistoryCallback)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // A panicking observer never runs under this lock, but don't wedge on poison anyway.
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Observer registry for "history changed" events.
///
/// Build one per process and share it with `Arc`; there is no global instance.
#[derive(Default)]
pub struct HistoryNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl HistoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Keep the returned handle to unsubscribe later;
    /// dropping it leaves the observer registered.
    pub fn subscribe<F>(&self, callback: F) -> HistorySubscription
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observers.push((id, Arc::new(callback)));
        tracing::debug!(subscription_id = id, "History observer subscribed");

        HistorySubscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Call every registered observer once. Returns how many were called.
    ///
    /// The observer list is copied before fan-out, so observers may
    /// subscribe or unsubscribe from inside their callback.
    pub fn broadcast(&self) -> usize {
        let snapshot: Vec<(u64, HistoryCallback)> = lock(&self.registry).observers.clone();

        tracing::debug!(observers = snapshot.len(), "Notifying history observers");

        for (id, callback) in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| (**callback)())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(subscription_id = id, "History observer failed: {}", e);
                }
                Err(_) => {
                    tracing::error!(subscription_id = id, "History observer panicked");
                }
            }
        }

        snapshot.len()
    }

    #[cfg(test)]
    pub fn observer_count(&self) -> usize {
        lock(&self.registry).observers.len()
    }
}

/// Handle returned by `HistoryNotifier::subscribe`.
pub struct HistorySubscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl HistorySubscription {
    /// Remove the observer. Safe to call more than once, and after the
    /// notifier itself is gone.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = lock(&registry);
            let before = registry.observers.len();
            registry.observers.retain(|(id, _)| *id != self.id);
            if registry.observers.len() != before {
                tracing::debug!(subscription_id = self.id, "History observer unsubscribed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_broadcast_calls_each_observer_once_in_order() {
        let notifier = HistoryNotifier::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            notifier.subscribe(move || {
                calls.lock().unwrap().push(name);
                Ok(())
            });
        }

        assert_eq!(notifier.broadcast(), 3);
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let notifier = HistoryNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let subscription = notifier.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let other = notifier.subscribe(|| Ok(()));

        subscription.unsubscribe();
        subscription.unsubscribe();

        assert_eq!(notifier.observer_count(), 1);
        notifier.broadcast();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        other.unsubscribe();
        assert_eq!(notifier.observer_count(), 0);
    }

    #[test]
    fn test_unsubscribe_after_notifier_dropped() {
        let notifier = HistoryNotifier::new();
        let subscription = notifier.subscribe(|| Ok(()));
        drop(notifier);

        subscription.unsubscribe();
    }

    #[test]
    fn test_failing_observer_does_not_stop_fan_out() {
        let notifier = HistoryNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));

        notifier.subscribe(|| Err(anyhow::anyhow!("view is gone")));
        notifier.subscribe(|| panic!("observer blew up"));
        let counter = Arc::clone(&count);
        notifier.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(notifier.broadcast(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Still usable afterwards
        notifier.broadcast();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reentrant_unsubscribe_during_broadcast() {
        let notifier = Arc::new(HistoryNotifier::new());
        let count = Arc::new(AtomicUsize::new(0));
        let handle: Arc<Mutex<Option<HistorySubscription>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&handle);
        let counter = Arc::clone(&count);
        let subscription = notifier.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = slot.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
            Ok(())
        });
        *handle.lock().unwrap() = Some(subscription);

        let counter = Arc::clone(&count);
        notifier.subscribe(move || {
            counter.fetch_add(10, Ordering::SeqCst);
            Ok(())
        });

        notifier.broadcast();
        assert_eq!(count.load(Ordering::SeqCst), 11);

        // The self-removing observer is gone for the next round
        notifier.broadcast();
        assert_eq!(count.load(Ordering::SeqCst), 21);
    }

    #[test]
    fn test_reentrant_subscribe_during_broadcast() {
        let notifier = Arc::new(HistoryNotifier::new());
        let inner = Arc::clone(&notifier);

        notifier.subscribe(move || {
            inner.subscribe(|| Ok(()));
            Ok(())
        });

        // Snapshot taken before fan-out: only the original observer runs
        assert_eq!(notifier.broadcast(), 1);
        assert_eq!(notifier.observer_count(), 2);
    }
}
