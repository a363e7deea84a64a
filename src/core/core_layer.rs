// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "messages/mod.rs"]
pub mod messages;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "history/mod.rs"]
pub mod history;

#[path = "simulation/mod.rs"]
pub mod simulation;
