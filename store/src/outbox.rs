//! A durable notification sink.
//!
//! Instead of pushing to a broker directly, notifications are written
//! into an `outbox` table in the same SQLite database as the entities.
//! A relay process reads pending rows, delivers them, and marks them
//! published. A crash between sync and relay loses nothing.

use crate::error::StoreError;
use crate::now_millis;
use async_trait::async_trait;
use brewsync_engine::{NotificationSink, SinkError, Timestamp};
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// One queued notification.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxEntry {
    pub id: i64,
    pub topic: String,
    pub payload: String,
    pub queued_at: i64,
}

impl OutboxEntry {
    /// Payload parsed back into JSON.
    pub fn payload_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// [`NotificationSink`] persisting into the outbox table.
#[derive(Debug, Clone)]
pub struct OutboxSink {
    pool: SqlitePool,
}

impl OutboxSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Notifications queued but not yet published, oldest first.
    pub async fn pending(&self) -> Result<Vec<OutboxEntry>, StoreError> {
        let entries = sqlx::query_as(
            "SELECT id, topic, payload, queued_at FROM outbox \
             WHERE published_at IS NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Mark one entry as published at the given time.
    pub async fn mark_published(&self, id: i64, now: Timestamp) -> Result<(), StoreError> {
        sqlx::query("UPDATE outbox SET published_at = ?1 WHERE id = ?2")
            .bind(now as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for OutboxSink {
    async fn send(&self, topic: &str, payload: Value) -> Result<(), SinkError> {
        sqlx::query("INSERT INTO outbox (topic, payload, queued_at) VALUES (?1, ?2, ?3)")
            .bind(topic)
            .bind(payload.to_string())
            .bind(now_millis() as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| SinkError::Backend(e.to_string()))?;
        Ok(())
    }
}
