// Core simulation module - the chat session that ties classification,
// transcript and ledger together.

pub mod simulation_models;
pub mod simulation_session;

pub use simulation_models::*;
pub use simulation_session::*;
