//! # Invoice Repository
//!
//! The local invoice store: newest-first history with lifecycle operations.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Lifecycle                                 │
//! │                                                                         │
//! │  1. ADD                                                                │
//! │     └── add() → row at the front (position = MIN - 1)                  │
//! │                                                                         │
//! │  2. EDIT / RENAME                                                      │
//! │     └── edit(original, invoice) → NotFound / UniqueViolation / ok      │
//! │     └── upsert(original?, invoice) → Updated or Inserted               │
//! │                                                                         │
//! │  3. CANCEL ⇄ RESTORE                                                   │
//! │     └── cancel() → status cancelled, cancelled_at stamped              │
//! │     └── restore() → status active, cancelled_at cleared                │
//! │                                                                         │
//! │  4. REMOVE (local only, never cascades to the remote sheet)            │
//! │     └── delete(number) → every row with that number                    │
//! │     └── purge_all() → whole history                                    │
//! │                                                                         │
//! │  5. MERGE                                                              │
//! │     └── merge_remote() → append unknown numbers, re-sort by number ↓   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Matching
//! Invoice numbers match after trimming, case-sensitively. `invoice_number`
//! is not unique in the table; lookups take the first row in store order.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::UpsertOutcome;
use baht_core::stats::{DashboardFilter, DashboardStats};
use baht_core::validation::validate_invoice_number;
use baht_core::{BranchType, DigitString, Invoice, InvoiceStatus, Money};

const SELECT_COLUMNS: &str = r#"
    id, invoice_number, position, date,
    customer_name, customer_address, customer_tax_id, customer_phone, customer_email,
    branch_type, branch_number, items, payment,
    subtotal_satang, vat_satang, total_satang, thai_text,
    status, created_at, updated_at, cancelled_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    #[allow(dead_code)]
    id: String,
    invoice_number: String,
    #[allow(dead_code)]
    position: i64,
    date: String,
    customer_name: String,
    customer_address: String,
    customer_tax_id: String,
    customer_phone: String,
    customer_email: String,
    branch_type: BranchType,
    branch_number: String,
    items: String,
    payment: String,
    subtotal_satang: i64,
    vat_satang: i64,
    total_satang: i64,
    thai_text: String,
    status: InvoiceStatus,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> DbResult<Self> {
        Ok(Invoice {
            invoice_number: row.invoice_number,
            date: row.date,
            customer_name: row.customer_name,
            customer_address: row.customer_address,
            customer_tax_id: DigitString::new(row.customer_tax_id),
            customer_phone: DigitString::new(row.customer_phone),
            customer_email: row.customer_email,
            branch_type: row.branch_type,
            branch_number: row.branch_number,
            items: serde_json::from_str(&row.items)?,
            subtotal: Money::from_satang(row.subtotal_satang),
            vat: Money::from_satang(row.vat_satang),
            total: Money::from_satang(row.total_satang),
            payment: serde_json::from_str(&row.payment)?,
            thai_text: row.thai_text,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

fn into_invoices(rows: Vec<InvoiceRow>) -> DbResult<Vec<Invoice>> {
    rows.into_iter().map(Invoice::try_from).collect()
}

// =============================================================================
// Search Query
// =============================================================================

/// Filter for [`InvoiceRepository::search`].
///
/// `text` matches invoice number or customer name, case-insensitively,
/// after trimming. Dates are inclusive `YYYY-MM-DD` bounds compared as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceQuery {
    pub text: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl InvoiceQuery {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn from(mut self, date: impl Into<String>) -> Self {
        self.from = Some(date.into());
        self
    }

    pub fn to(mut self, date: impl Into<String>) -> Self {
        self.to = Some(date.into());
        self
    }

    fn needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    fn matches_text(&self, invoice: &Invoice) -> bool {
        match self.needle() {
            Some(needle) => {
                invoice.invoice_number.to_lowercase().contains(&needle)
                    || invoice.customer_name.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// Outcome of [`InvoiceRepository::merge_remote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Remote invoices appended locally.
    pub added: usize,
    /// Invoices in the store after the merge.
    pub total: usize,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// All invoices, newest first.
    pub async fn list(&self) -> DbResult<Vec<Invoice>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM invoices ORDER BY position ASC");
        let rows: Vec<InvoiceRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        into_invoices(rows)
    }

    /// First invoice with this number, if any.
    pub async fn get(&self, invoice_number: &str) -> DbResult<Option<Invoice>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM invoices
             WHERE TRIM(invoice_number) = ?1
             ORDER BY position ASC LIMIT 1"
        );
        let row: Option<InvoiceRow> = sqlx::query_as(&sql)
            .bind(invoice_number.trim())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Invoice::try_from).transpose()
    }

    /// All invoice numbers in store order.
    pub async fn numbers(&self) -> DbResult<Vec<String>> {
        let numbers: Vec<String> =
            sqlx::query_scalar("SELECT invoice_number FROM invoices ORDER BY position ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(numbers)
    }

    /// Number of invoices in the store.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts at the front of the history.
    ///
    /// No uniqueness check: issuing fresh numbers is the numbering
    /// authority's job. `created_at` is stamped if unset.
    pub async fn add(&self, invoice: &Invoice) -> DbResult<Invoice> {
        let mut stored = invoice.clone();
        stored.created_at.get_or_insert_with(Utc::now);

        debug!(invoice_number = %stored.invoice_number, "Adding invoice");

        let mut tx = self.pool.begin().await?;
        insert_front(&mut tx, &stored).await?;
        tx.commit().await?;

        Ok(stored)
    }

    /// Updates the invoice matched by `original` (or by its own number when
    /// `original` is absent), inserting it at the front when nothing matches.
    pub async fn upsert(&self, original: Option<&str>, invoice: &Invoice) -> DbResult<UpsertOutcome> {
        let key = original
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| invoice.invoice_number.trim());

        let mut stored = invoice.clone();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let outcome = match find_id(&mut *tx, key).await? {
            Some(id) => {
                stored.updated_at = Some(now);
                update_row(&mut tx, &id, &stored).await?;
                UpsertOutcome::Updated
            }
            None => {
                stored.created_at.get_or_insert(now);
                insert_front(&mut tx, &stored).await?;
                UpsertOutcome::Inserted
            }
        };
        tx.commit().await?;

        debug!(key = %key, invoice_number = %stored.invoice_number, ?outcome, "Upserted invoice");
        Ok(outcome)
    }

    /// Edits an existing invoice, possibly renaming it.
    ///
    /// ## Errors
    /// - `Validation` if the new number is blank
    /// - `NotFound` if `original` is not in the store
    /// - `UniqueViolation` if renaming onto another invoice's number
    ///
    /// Nothing is written when any check fails.
    pub async fn edit(&self, original: &str, invoice: &Invoice) -> DbResult<Invoice> {
        let original = original.trim();
        let new_number = validate_invoice_number(&invoice.invoice_number)?;

        let mut tx = self.pool.begin().await?;

        let id = find_id(&mut *tx, original)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", original))?;

        if new_number != original {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM invoices WHERE TRIM(invoice_number) = ?1 AND id != ?2",
            )
            .bind(&new_number)
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;
            if taken > 0 {
                return Err(DbError::duplicate("invoice_number", new_number));
            }
        }

        let mut stored = invoice.clone();
        stored.invoice_number = new_number;
        stored.updated_at = Some(Utc::now());
        update_row(&mut tx, &id, &stored).await?;

        tx.commit().await?;

        info!(original = %original, invoice_number = %stored.invoice_number, "Invoice edited");
        self.get(&stored.invoice_number)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", stored.invoice_number))
    }

    /// Marks the invoice cancelled and stamps `cancelled_at`.
    ///
    /// Cancelling twice is harmless; the stamp is overwritten.
    pub async fn cancel(&self, invoice_number: &str) -> DbResult<Invoice> {
        let now = Utc::now();
        self.set_status(invoice_number, InvoiceStatus::Cancelled, Some(now), now)
            .await
    }

    /// Returns a cancelled invoice to active and clears `cancelled_at`.
    pub async fn restore(&self, invoice_number: &str) -> DbResult<Invoice> {
        self.set_status(invoice_number, InvoiceStatus::Active, None, Utc::now())
            .await
    }

    async fn set_status(
        &self,
        invoice_number: &str,
        status: InvoiceStatus,
        cancelled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DbResult<Invoice> {
        let number = invoice_number.trim();

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = ?2,
                cancelled_at = ?3,
                updated_at = ?4
            WHERE id = (
                SELECT id FROM invoices
                WHERE TRIM(invoice_number) = ?1
                ORDER BY position ASC LIMIT 1
            )
            "#,
        )
        .bind(number)
        .bind(status)
        .bind(cancelled_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", number));
        }

        info!(invoice_number = %number, status = %status, "Invoice status changed");
        self.get(number)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", number))
    }

    /// Removes every local row with this number. The remote copy is kept.
    pub async fn delete(&self, invoice_number: &str) -> DbResult<u64> {
        let number = invoice_number.trim();
        let result = sqlx::query("DELETE FROM invoices WHERE TRIM(invoice_number) = ?1")
            .bind(number)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", number));
        }

        info!(invoice_number = %number, rows = result.rows_affected(), "Invoice deleted locally");
        Ok(result.rows_affected())
    }

    /// Removes the whole local history. Irreversible; no remote cascade.
    pub async fn purge_all(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM invoices")
            .execute(&self.pool)
            .await?;
        info!(rows = result.rows_affected(), "Invoice history purged");
        Ok(result.rows_affected())
    }

    /// Filters the history by text and inclusive date range, newest first.
    pub async fn search(&self, query: &InvoiceQuery) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM invoices
             WHERE (?1 IS NULL OR date >= ?1)
               AND (?2 IS NULL OR date <= ?2)
             ORDER BY position ASC"
        );
        let from = query.from.as_deref().map(str::trim).filter(|d| !d.is_empty());
        let to = query.to.as_deref().map(str::trim).filter(|d| !d.is_empty());

        let rows: Vec<InvoiceRow> = sqlx::query_as(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        let invoices = into_invoices(rows)?;
        Ok(invoices
            .into_iter()
            .filter(|inv| query.matches_text(inv))
            .collect())
    }

    /// Additive merge of the remote history.
    ///
    /// Remote invoices whose number is not yet known locally are appended;
    /// local rows are never overwritten. Afterwards the whole store is
    /// re-sorted by invoice number, descending.
    pub async fn merge_remote(&self, remote: &[Invoice]) -> DbResult<MergeReport> {
        let mut tx = self.pool.begin().await?;

        let existing: Vec<String> = sqlx::query_scalar("SELECT TRIM(invoice_number) FROM invoices")
            .fetch_all(&mut *tx)
            .await?;
        let mut known: HashSet<String> = existing.into_iter().collect();

        let mut added = 0;
        for invoice in remote {
            let number = invoice.invoice_number.trim();
            if number.is_empty() || !known.insert(number.to_string()) {
                continue;
            }
            insert_front(&mut tx, invoice).await?;
            added += 1;
        }

        sqlx::query(
            r#"
            UPDATE invoices SET position = (
                SELECT ranked.rn FROM (
                    SELECT id, ROW_NUMBER() OVER (
                        ORDER BY invoice_number DESC, position ASC
                    ) AS rn
                    FROM invoices
                ) AS ranked
                WHERE ranked.id = invoices.id
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(added, total, "Merged remote invoices");
        Ok(MergeReport {
            added,
            total: total as usize,
        })
    }

    /// Dashboard figures over the history.
    pub async fn stats(&self, filter: &DashboardFilter, today: NaiveDate) -> DbResult<DashboardStats> {
        let invoices = self.list().await?;
        let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(DashboardStats::compute(
            &invoices,
            customers as usize,
            filter,
            today,
        ))
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn find_id<'e, E>(executor: E, invoice_number: &str) -> DbResult<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM invoices WHERE TRIM(invoice_number) = ?1 ORDER BY position ASC LIMIT 1",
    )
    .bind(invoice_number.trim())
    .fetch_optional(executor)
    .await?;
    Ok(id)
}

async fn insert_front(tx: &mut sqlx::Transaction<'_, Sqlite>, invoice: &Invoice) -> DbResult<()> {
    let position: i64 = sqlx::query_scalar("SELECT COALESCE(MIN(position), 1) - 1 FROM invoices")
        .fetch_one(&mut **tx)
        .await?;

    insert_row(&mut **tx, &Uuid::new_v4().to_string(), position, invoice).await
}

async fn insert_row(
    conn: &mut SqliteConnection,
    id: &str,
    position: i64,
    invoice: &Invoice,
) -> DbResult<()> {
    let items = serde_json::to_string(&invoice.items)?;
    let payment = serde_json::to_string(&invoice.payment)?;

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, position, date,
            customer_name, customer_address, customer_tax_id, customer_phone, customer_email,
            branch_type, branch_number, items, payment,
            subtotal_satang, vat_satang, total_satang, thai_text,
            status, created_at, updated_at, cancelled_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13,
            ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21
        )
        "#,
    )
    .bind(id)
    .bind(invoice.invoice_number.trim())
    .bind(position)
    .bind(&invoice.date)
    .bind(&invoice.customer_name)
    .bind(&invoice.customer_address)
    .bind(invoice.customer_tax_id.as_str())
    .bind(invoice.customer_phone.as_str())
    .bind(&invoice.customer_email)
    .bind(invoice.branch_type)
    .bind(&invoice.branch_number)
    .bind(items)
    .bind(payment)
    .bind(invoice.subtotal.satang())
    .bind(invoice.vat.satang())
    .bind(invoice.total.satang())
    .bind(&invoice.thai_text)
    .bind(invoice.status)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .bind(invoice.cancelled_at)
    .execute(conn)
    .await?;

    Ok(())
}

async fn update_row(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    id: &str,
    invoice: &Invoice,
) -> DbResult<()> {
    let items = serde_json::to_string(&invoice.items)?;
    let payment = serde_json::to_string(&invoice.payment)?;

    sqlx::query(
        r#"
        UPDATE invoices SET
            invoice_number = ?2,
            date = ?3,
            customer_name = ?4,
            customer_address = ?5,
            customer_tax_id = ?6,
            customer_phone = ?7,
            customer_email = ?8,
            branch_type = ?9,
            branch_number = ?10,
            items = ?11,
            payment = ?12,
            subtotal_satang = ?13,
            vat_satang = ?14,
            total_satang = ?15,
            thai_text = ?16,
            status = ?17,
            created_at = COALESCE(created_at, ?18),
            updated_at = ?19,
            cancelled_at = ?20
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(invoice.invoice_number.trim())
    .bind(&invoice.date)
    .bind(&invoice.customer_name)
    .bind(&invoice.customer_address)
    .bind(invoice.customer_tax_id.as_str())
    .bind(invoice.customer_phone.as_str())
    .bind(&invoice.customer_email)
    .bind(invoice.branch_type)
    .bind(&invoice.branch_number)
    .bind(items)
    .bind(payment)
    .bind(invoice.subtotal.satang())
    .bind(invoice.vat.satang())
    .bind(invoice.total.satang())
    .bind(&invoice.thai_text)
    .bind(invoice.status)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .bind(invoice.cancelled_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
