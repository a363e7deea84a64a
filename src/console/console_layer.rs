// Console layer - terminal commands, rendering and the live history view.
// This is the only place that knows about stdin/stdout.

#[path = "commands.rs"]
pub mod commands;

#[path = "formatter.rs"]
pub mod formatter;

#[path = "history_view.rs"]
pub mod history_view;

#[path = "repl.rs"]
pub mod repl;
