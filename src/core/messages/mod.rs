// Transcript message types shared by the simulation and the history ledger.

pub mod message_models;

pub use message_models::*;
