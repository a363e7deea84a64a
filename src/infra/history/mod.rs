// Implementations of the history store port, plus the moderation feed.

pub mod in_memory;
pub mod moderation_feed;
pub mod sqlite_store;

// Re-export for convenience
pub use in_memory::InMemoryHistoryStore;
pub use moderation_feed::ModerationFeed;
pub use sqlite_store::SqliteHistoryStore;
