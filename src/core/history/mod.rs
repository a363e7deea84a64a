// Core history module - the audit trail of flagged messages.
//
// - history_models: what gets recorded
// - history_store: the storage port (implemented in infra)
// - history_notifier: "history changed" fan-out to observers
// - moderation_ledger: the ledger sessions write to
// - restoration_watcher: applies moderator overrides from an external feed

pub mod history_models;
pub mod history_notifier;
pub mod history_store;
pub mod moderation_ledger;
pub mod restoration_watcher;

pub use history_models::*;
pub use history_notifier::*;
pub use history_store::*;
pub use moderation_ledger::*;
pub use restoration_watcher::*;
