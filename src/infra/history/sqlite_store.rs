// SQLite-backed history store for the flagged-message audit log.
//
// Tables:
// - message_history: one row per flagged message, keyed by message id.
//   The classifier verdict is kept as JSON in `filter_result`.

use crate::core::history::{HistoryEntry, HistoryStore, StoreError};
use crate::core::messages::{MessageId, Sender};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteHistoryStore {
    pool: Pool<Sqlite>,
}

/// Fixed-width RFC 3339 so that text order in SQLite is chronological order.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn storage_error(e: sqlx::Error) -> StoreError {
    StoreError::StorageError(e.to_string())
}

impl SqliteHistoryStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file at `path`.
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path))
            .await
            .map_err(storage_error)?;
        Ok(Self::new(pool))
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS message_history (
                id INTEGER PRIMARY KEY,
                text TEXT NOT NULL,
                sender TEXT NOT NULL,
                is_hidden BOOLEAN NOT NULL DEFAULT 1,
                timestamp TEXT NOT NULL,
                filter_result TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_message_history_timestamp
                ON message_history(timestamp, id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn insert(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        let filter_result = serde_json::to_string(&entry.verdict)?;

        let result = sqlx::query(
            r#"
            INSERT INTO message_history (id, text, sender, is_hidden, timestamp, filter_result)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(entry.id.get())
        .bind(&entry.text)
        .bind(entry.sender.as_str())
        .bind(entry.is_hidden)
        .bind(format_timestamp(entry.timestamp))
        .bind(filter_result)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateKey(entry.id));
        }
        Ok(())
    }

    async fn mark_visible(&self, id: MessageId) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE message_history SET is_hidden = 0 WHERE id = ? AND is_hidden = 1")
                .bind(id.get())
                .execute(&self.pool)
                .await
                .map_err(storage_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn query_all_ordered_desc(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, text, sender, is_hidden, timestamp, filter_result
            FROM message_history
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id = MessageId(row.get::<i64, _>("id"));

            let sender_str: String = row.get("sender");
            let sender = Sender::parse(&sender_str).ok_or_else(|| {
                StoreError::StorageError(format!("Unknown sender '{}' for entry {}", sender_str, id))
            })?;

            let timestamp_str: String = row.get("timestamp");
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    StoreError::StorageError(format!("Bad timestamp for entry {}: {}", id, e))
                })?;

            let filter_result: String = row.get("filter_result");

            entries.push(HistoryEntry {
                id,
                text: row.get("text"),
                sender,
                is_hidden: row.get("is_hidden"),
                timestamp,
                verdict: serde_json::from_str(&filter_result)?,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{FilterResult, HarmCategory, Severity};
    use chrono::TimeZone;
    use tempfile::TempDir;

    async fn open_store() -> (SqliteHistoryStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let store = SqliteHistoryStore::connect(path.to_str().unwrap())
            .await
            .unwrap();
        store.migrate().await.unwrap();
        (store, dir)
    }

    fn entry(id: i64, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            id: MessageId(id),
            text: format!("flagged {}", id),
            sender: Sender::User,
            is_hidden: true,
            timestamp,
            verdict: FilterResult::harmful(
                vec![HarmCategory::Violence, HarmCategory::Harassment],
                Severity::Medium,
            ),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let (store, _dir) = open_store().await;
        let original = entry(1, Utc::now());

        store.insert(&original).await.unwrap();

        let entries = store.query_all_ordered_desc().await.unwrap();
        assert_eq!(entries, vec![original]);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let (store, _dir) = open_store().await;
        store.insert(&entry(1, Utc::now())).await.unwrap();

        let err = store.insert(&entry(1, Utc::now())).await.unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey(MessageId(1))));
        assert_eq!(store.query_all_ordered_desc().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ordering_timestamp_then_id() {
        let (store, _dir) = open_store().await;
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        for (id, ts) in [(1, early), (2, late), (3, early), (4, late)] {
            store.insert(&entry(id, ts)).await.unwrap();
        }

        let ids: Vec<i64> = store
            .query_all_ordered_desc()
            .await
            .unwrap()
            .iter()
            .map(|e| e.id.get())
            .collect();

        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[tokio::test]
    async fn test_mark_visible_only_changes_hidden_rows() {
        let (store, _dir) = open_store().await;
        store.insert(&entry(1, Utc::now())).await.unwrap();

        assert!(store.mark_visible(MessageId(1)).await.unwrap());
        assert!(!store.mark_visible(MessageId(1)).await.unwrap());
        assert!(!store.mark_visible(MessageId(99)).await.unwrap());

        let entries = store.query_all_ordered_desc().await.unwrap();
        assert!(!entries[0].is_hidden);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent_and_data_survives_reopen() {
        let (store, dir) = open_store().await;
        store.insert(&entry(5, Utc::now())).await.unwrap();
        store.migrate().await.unwrap();
        drop(store);

        let path = dir.path().join("history.db");
        let reopened = SqliteHistoryStore::connect(path.to_str().unwrap())
            .await
            .unwrap();
        reopened.migrate().await.unwrap();

        let entries = reopened.query_all_ordered_desc().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, MessageId(5));
    }
}
