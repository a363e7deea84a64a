// Core moderation module - contains the harmful-content classifier.
// Same layout as the other core features: models + the logic that uses them.

pub mod message_classifier;
pub mod moderation_models;

pub use message_classifier::*;
pub use moderation_models::*;
