//! # Sync Outbox Repository
//!
//! Remote writes that did not go through, kept until the operator replays them.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox for Remote Writes                             │
//! │                                                                         │
//! │  LOCAL OPERATION (e.g. save invoice)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Local store write  ← always first, always authoritative               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Remote RPC (single attempt)                                           │
//! │       │                                                                 │
//! │       ├── ok     → done (PersistedLocalAndRemote)                      │
//! │       └── failed → INSERT INTO sync_outbox (action, key, payload)      │
//! │                    (PersistedLocalOnly)                                │
//! │                                                                         │
//! │  `baht sync push` (explicit, never automatic)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  For each pending entry, oldest first, one attempt:                    │
//! │     ok     → synced_at = now                                           │
//! │     failed → attempts += 1, last_error = ?                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// A queued remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutboxEntry {
    pub id: String,
    /// RPC action name, e.g. `addInvoice`.
    pub action: String,
    /// Invoice number or customer key, for display.
    pub entity_key: String,
    /// Full RPC request JSON.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// Repository for sync outbox operations.
#[derive(Debug, Clone)]
pub struct SyncOutboxRepository {
    pool: SqlitePool,
}

impl SyncOutboxRepository {
    /// Creates a new SyncOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncOutboxRepository { pool }
    }

    /// Records a remote write that failed.
    ///
    /// ## Arguments
    /// * `action` - RPC action name
    /// * `entity_key` - Invoice number or customer key
    /// * `payload` - The full request JSON
    /// * `error` - Why the first attempt failed
    pub async fn queue(
        &self,
        action: &str,
        entity_key: &str,
        payload: &str,
        error: &str,
    ) -> DbResult<SyncOutboxEntry> {
        let now = Utc::now();
        let entry = SyncOutboxEntry {
            id: Uuid::new_v4().to_string(),
            action: action.to_string(),
            entity_key: entity_key.to_string(),
            payload: payload.to_string(),
            attempts: 1,
            last_error: Some(error.to_string()),
            created_at: now,
            attempted_at: Some(now),
            synced_at: None,
        };

        debug!(action = %action, entity_key = %entity_key, "Queuing remote write");

        sqlx::query(
            r#"
            INSERT INTO sync_outbox (
                id, action, entity_key, payload,
                attempts, last_error, created_at, attempted_at, synced_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.action)
        .bind(&entry.entity_key)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.synced_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Pending entries, oldest first.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<SyncOutboxEntry>> {
        let entries: Vec<SyncOutboxEntry> = sqlx::query_as(
            r#"
            SELECT id, action, entity_key, payload, attempts, last_error,
                   created_at, attempted_at, synced_at
            FROM sync_outbox
            WHERE synced_at IS NULL
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as successfully replayed.
    pub async fn mark_synced(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE sync_outbox SET
                synced_at = ?2,
                attempted_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Records another failed attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE sync_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Counts pending entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sync_outbox WHERE synced_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Deletes every replayed entry. Returns how many were removed.
    pub async fn cleanup_synced(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sync_outbox WHERE synced_at IS NOT NULL")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
