//! # State Repository
//!
//! Key/value persisted state: settings, company profile, images, login
//! session, and the invoice number counter.
//!
//! ## Keys
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────────┐
//! │ key                  │ value                                            │
//! ├──────────────────────┼──────────────────────────────────────────────────┤
//! │ settings             │ JSON InvoiceSettings                             │
//! │ company              │ JSON CompanyProfile                              │
//! │ logo / signature     │ data-URL string (raw)                            │
//! │ session              │ JSON Session                                     │
//! │ invoice_counter      │ integer as text (raw)                            │
//! │ invoice_counter_date │ YYMMDD (raw)                                     │
//! └──────────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! ## Numbering
//! `reserve_next` reads the counter, applies the day rollover, issues the
//! number and writes the advanced counter inside one transaction, so a
//! reservation is either fully recorded or not at all.

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use baht_core::auth::Session;
use baht_core::numbering::InvoiceCounter;
use baht_core::{CompanyProfile, InvoiceSettings};

pub const KEY_SETTINGS: &str = "settings";
pub const KEY_COMPANY: &str = "company";
pub const KEY_LOGO: &str = "logo";
pub const KEY_SIGNATURE: &str = "signature";
pub const KEY_SESSION: &str = "session";
pub const KEY_COUNTER: &str = "invoice_counter";
pub const KEY_COUNTER_DATE: &str = "invoice_counter_date";

/// Repository for the `app_state` table.
#[derive(Debug, Clone)]
pub struct StateRepository {
    pool: SqlitePool,
}

impl StateRepository {
    /// Creates a new StateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StateRepository { pool }
    }

    // =========================================================================
    // Raw and JSON values
    // =========================================================================

    /// Reads a raw string value.
    pub async fn get_raw(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM app_state WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    /// Writes a raw string value, replacing any previous one.
    pub async fn set_raw(&self, key: &str, value: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        put(&mut *conn, key, value).await
    }

    /// Deletes a key. Missing keys are fine.
    pub async fn remove(&self, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM app_state WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Reads and decodes a JSON value.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes and writes a JSON value.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> DbResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw).await
    }

    // =========================================================================
    // Settings, company, session
    // =========================================================================

    /// Stored settings, or defaults when none were saved yet.
    pub async fn settings(&self) -> DbResult<InvoiceSettings> {
        Ok(self.get_json(KEY_SETTINGS).await?.unwrap_or_default())
    }

    pub async fn save_settings(&self, settings: &InvoiceSettings) -> DbResult<()> {
        debug!(vat_rate = %settings.vat_rate.percent(), "Saving settings");
        self.set_json(KEY_SETTINGS, settings).await
    }

    /// Stored company profile, or an empty one.
    pub async fn company(&self) -> DbResult<CompanyProfile> {
        Ok(self.get_json(KEY_COMPANY).await?.unwrap_or_default())
    }

    pub async fn save_company(&self, company: &CompanyProfile) -> DbResult<()> {
        debug!(name = %company.name, "Saving company profile");
        self.set_json(KEY_COMPANY, company).await
    }

    pub async fn session(&self) -> DbResult<Option<Session>> {
        self.get_json(KEY_SESSION).await
    }

    pub async fn save_session(&self, session: &Session) -> DbResult<()> {
        self.set_json(KEY_SESSION, session).await
    }

    pub async fn clear_session(&self) -> DbResult<()> {
        self.remove(KEY_SESSION).await
    }

    // =========================================================================
    // Invoice number counter
    // =========================================================================

    /// Current counter state as persisted.
    pub async fn counter(&self) -> DbResult<InvoiceCounter> {
        read_counter(&self.pool).await
    }

    /// Next number without reserving it.
    pub async fn preview_next(&self, today: NaiveDate) -> DbResult<String> {
        Ok(self.counter().await?.preview_next(today))
    }

    /// Reserves the next number and persists the advanced counter.
    ///
    /// Call once per invoice actually saved. An unused reservation leaves a
    /// gap, which is acceptable; it never produces a duplicate.
    pub async fn reserve_next(&self, today: NaiveDate) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;

        let mut counter = read_counter(&mut *tx).await?;
        let number = counter.reserve_next(today);
        write_counter(&mut tx, &counter).await?;

        tx.commit().await?;

        debug!(invoice_number = %number, next = counter.counter, "Reserved invoice number");
        Ok(number)
    }

    /// Admin override: sets the counter to `start` for `today`.
    ///
    /// ## Errors
    /// `DbError::Validation` when `start < 1`; nothing is written.
    pub async fn reset_counter(&self, start: i64, today: NaiveDate) -> DbResult<InvoiceCounter> {
        let mut tx = self.pool.begin().await?;

        let mut counter = read_counter(&mut *tx).await?;
        counter.reset(start, today)?;
        write_counter(&mut tx, &counter).await?;

        tx.commit().await?;

        info!(
            counter = counter.counter,
            date = counter.last_date.as_deref().unwrap_or_default(),
            "Invoice counter reset"
        );
        Ok(counter)
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn put(conn: &mut SqliteConnection, key: &str, value: &str) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO app_state (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

async fn read_counter<'e, E>(executor: E) -> DbResult<InvoiceCounter>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT key, value FROM app_state WHERE key IN (?1, ?2)")
            .bind(KEY_COUNTER)
            .bind(KEY_COUNTER_DATE)
            .fetch_all(executor)
            .await?;

    let mut counter = InvoiceCounter::new(1, None);
    for (key, value) in rows {
        match key.as_str() {
            KEY_COUNTER => counter.counter = value.trim().parse().unwrap_or(1),
            KEY_COUNTER_DATE if !value.trim().is_empty() => {
                counter.last_date = Some(value.trim().to_string())
            }
            _ => {}
        }
    }
    Ok(counter)
}

async fn write_counter(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    counter: &InvoiceCounter,
) -> DbResult<()> {
    put(&mut **tx, KEY_COUNTER, &counter.counter.to_string()).await?;
    if let Some(date) = &counter.last_date {
        put(&mut **tx, KEY_COUNTER_DATE, date).await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
