//! # Record Sync
//!
//! Invoice and customer operations that write locally first and then mirror
//! the change to the remote collaborator on a best-effort basis.
//!
//! ## Operation Map
//! ```text
//! ┌──────────────────┬─────────────────────────────┬──────────────────────────┐
//! │ operation        │ local (authoritative)       │ remote (best effort)     │
//! ├──────────────────┼─────────────────────────────┼──────────────────────────┤
//! │ save_invoice     │ reserve number, add, upsert │ addInvoice,              │
//! │                  │ customer                    │ add/updateCustomer       │
//! │ edit_invoice     │ edit (rename checked)       │ updateCustomer,          │
//! │                  │                             │ updateInvoice + original │
//! │ update_invoice   │ upsert by original/number   │ updateInvoice            │
//! │ cancel / restore │ status change               │ updateInvoice            │
//! │ delete_invoice   │ remove                      │ (none, sheet keeps it)   │
//! │ save_customer    │ upsert                      │ add/updateCustomer       │
//! │ sync_history     │ additive merge              │ read Invoices sheet      │
//! │ pull_customers   │ replace cache               │ read Customers sheet     │
//! │ send_email       │ (none)                      │ sendInvoiceEmail         │
//! │ login            │ session                     │ login (fallback)         │
//! └──────────────────┴─────────────────────────────┴──────────────────────────┘
//! ```
//!
//! Every input check runs before the first write. A failed remote write is
//! recorded in the sync outbox and reported through [`Persisted::LocalOnly`].

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use baht_core::auth::{authenticate_local, Session};
use baht_core::validation::{check_payment, validate_email, validate_invoice, validate_iso_date, PaymentWarning};
use baht_core::{Customer, Invoice, InvoiceStatus, ValidationError};
use baht_db::{Database, DbError, MergeReport, UpsertOutcome};

use crate::email::email_payload;
use crate::error::{SyncError, SyncResult};
use crate::numbering::{sync_invoice_number, NumberSyncOutcome};
use crate::protocol::{Credentials, InvoicePayload, RpcRequest, RpcResponse};
use crate::remote::{Persisted, RemoteCollaborator};
use crate::sheet::{customers_from_rows, invoices_from_rows, SheetName};

/// What `save_invoice` produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedInvoice {
    pub invoice: Persisted<Invoice>,
    pub customer: Persisted<Customer>,
    /// Ticked payment amounts that do not add up to the total.
    #[serde(skip)]
    pub payment_warning: Option<PaymentWarning>,
}

/// What `edit_invoice` produced. The customer row is mirrored separately
/// and can fail on its own.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedInvoice {
    pub invoice: Persisted<Invoice>,
    pub customer: Persisted<Customer>,
}

/// Outcome of one remote write.
enum RemoteWrite {
    Skipped,
    Acked,
    Failed(String),
}

/// Local store plus optional remote collaborator.
#[derive(Clone)]
pub struct RecordSync {
    db: Database,
    remote: Option<Arc<dyn RemoteCollaborator>>,
}

impl std::fmt::Debug for RecordSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSync")
            .field("db", &self.db)
            .field("remote", &self.remote.is_some())
            .finish()
    }
}

impl RecordSync {
    pub fn new(db: Database, remote: Option<Arc<dyn RemoteCollaborator>>) -> Self {
        RecordSync { db, remote }
    }

    /// No remote: every operation is local only.
    pub fn local(db: Database) -> Self {
        Self::new(db, None)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn remote(&self) -> Option<&dyn RemoteCollaborator> {
        self.remote.as_deref()
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Saves a new invoice under the next reserved number.
    ///
    /// ## Flow
    /// 1. Validate (customer name, a described line, email)
    /// 2. Drop undescribed lines, recompute totals and Thai text
    /// 3. Reserve the number and add the invoice locally
    /// 4. Upsert the customer from the invoice snapshot
    /// 5. `addInvoice`, then `addCustomer` / `updateCustomer` remotely
    ///
    /// `draft.invoice_number` is ignored.
    pub async fn save_invoice(&self, draft: Invoice, today: NaiveDate) -> SyncResult<SavedInvoice> {
        let mut invoice = draft;
        validate_invoice(&invoice)?;
        if invoice.date.trim().is_empty() {
            invoice.date = today.format("%Y-%m-%d").to_string();
        } else {
            validate_iso_date("date", &invoice.date)?;
        }

        let settings = self.db.state().settings().await?;
        invoice.retain_described_items();
        invoice.recompute(settings.vat_rate);
        invoice.status = InvoiceStatus::Active;
        invoice.cancelled_at = None;
        invoice.updated_at = None;

        invoice.invoice_number = self.db.state().reserve_next(today).await?;
        let stored = self.db.invoices().add(&invoice).await?;
        let (outcome, customer) = self.db.customers().upsert(&stored.customer_snapshot()).await?;

        info!(invoice_number = %stored.invoice_number, total = %stored.total, "Invoice saved");

        let payment_warning = check_payment(&stored.payment, stored.total);
        let invoice_write = self
            .push(RpcRequest::AddInvoice(InvoicePayload::new(stored.clone())))
            .await;
        let customer_write = self.push(customer_request(outcome, customer.clone())).await;

        Ok(SavedInvoice {
            invoice: persisted(stored, invoice_write),
            customer: persisted(customer, customer_write),
            payment_warning,
        })
    }

    /// Edits an invoice in place, renaming it when the number changed.
    ///
    /// Status, creation and cancellation stamps are kept from the stored
    /// record. The remote gets `updateCustomer` and then `updateInvoice`
    /// carrying the original number.
    pub async fn edit_invoice(&self, original: &str, edited: Invoice) -> SyncResult<EditedInvoice> {
        let mut invoice = edited;
        validate_invoice(&invoice)?;
        validate_iso_date("date", &invoice.date)?;

        let existing = self
            .db
            .invoices()
            .get(original)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", original.trim()))?;

        let settings = self.db.state().settings().await?;
        invoice.retain_described_items();
        invoice.recompute(settings.vat_rate);
        invoice.status = existing.status;
        invoice.created_at = existing.created_at;
        invoice.cancelled_at = existing.cancelled_at;

        let stored = self.db.invoices().edit(original, &invoice).await?;
        let (_, customer) = self.db.customers().upsert(&stored.customer_snapshot()).await?;

        let customer_write = self.push(RpcRequest::UpdateCustomer(customer.clone())).await;
        let invoice_write = self
            .push(RpcRequest::UpdateInvoice(InvoicePayload::renamed(
                stored.clone(),
                original.trim(),
            )))
            .await;
        Ok(EditedInvoice {
            invoice: persisted(stored, invoice_write),
            customer: persisted(customer, customer_write),
        })
    }

    /// Update-or-insert keyed by `original` (else the invoice's own number).
    pub async fn update_invoice(
        &self,
        original: Option<&str>,
        invoice: Invoice,
    ) -> SyncResult<Persisted<UpsertOutcome>> {
        let outcome = self.db.invoices().upsert(original, &invoice).await?;
        let payload = match original {
            Some(original) => InvoicePayload::renamed(invoice, original.trim()),
            None => InvoicePayload::new(invoice),
        };
        let write = self.push(RpcRequest::UpdateInvoice(payload)).await;
        Ok(persisted(outcome, write))
    }

    /// Voids an invoice. `NotFound` when the number is unknown.
    pub async fn cancel_invoice(&self, invoice_number: &str) -> SyncResult<Persisted<Invoice>> {
        let stored = self.db.invoices().cancel(invoice_number).await?;
        let write = self
            .push(RpcRequest::UpdateInvoice(InvoicePayload::new(stored.clone())))
            .await;
        Ok(persisted(stored, write))
    }

    /// Returns a cancelled invoice to active.
    pub async fn restore_invoice(&self, invoice_number: &str) -> SyncResult<Persisted<Invoice>> {
        let stored = self.db.invoices().restore(invoice_number).await?;
        let write = self
            .push(RpcRequest::UpdateInvoice(InvoicePayload::new(stored.clone())))
            .await;
        Ok(persisted(stored, write))
    }

    /// Removes an invoice locally. The remote row stays as the audit trail.
    pub async fn delete_invoice(&self, invoice_number: &str) -> SyncResult<u64> {
        Ok(self.db.invoices().delete(invoice_number).await?)
    }

    /// Merges remote invoices the store does not know yet.
    pub async fn sync_history(&self) -> SyncResult<MergeReport> {
        let remote = self.remote.as_ref().ok_or(SyncError::NotConfigured("sheets_url"))?;
        let rows = remote.fetch_sheet(SheetName::Invoices).await?;
        let invoices = invoices_from_rows(&rows);
        let report = self.db.invoices().merge_remote(&invoices).await?;
        info!(added = report.added, total = report.total, "History synced from remote");
        Ok(report)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Saves a customer, matching an existing one by tax ID, then id, then name.
    pub async fn save_customer(&self, customer: Customer) -> SyncResult<Persisted<Customer>> {
        validate_email(&customer.email)?;
        let (outcome, stored) = self.db.customers().upsert(&customer).await?;
        let write = self.push(customer_request(outcome, stored.clone())).await;
        Ok(persisted(stored, write))
    }

    /// Replaces the local customer cache with the remote list.
    pub async fn pull_customers(&self) -> SyncResult<usize> {
        let remote = self.remote.as_ref().ok_or(SyncError::NotConfigured("sheets_url"))?;
        let rows = remote.fetch_sheet(SheetName::Customers).await?;
        let customers = customers_from_rows(&rows);
        let count = self.db.customers().replace_all(&customers).await?;
        info!(count, "Customers pulled from remote");
        Ok(count)
    }

    // =========================================================================
    // Numbering, Email, Session
    // =========================================================================

    /// See [`sync_invoice_number`].
    pub async fn sync_invoice_number(
        &self,
        target: NaiveDate,
        today: NaiveDate,
    ) -> SyncResult<NumberSyncOutcome> {
        sync_invoice_number(&self.db, self.remote(), target, today).await
    }

    /// Emails an invoice summary through the remote.
    pub async fn send_invoice_email(
        &self,
        invoice_number: &str,
        recipient: &str,
    ) -> SyncResult<RpcResponse> {
        if recipient.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "customerEmail".to_string(),
            }
            .into());
        }
        validate_email(recipient)?;

        let invoice = self
            .db
            .invoices()
            .get(invoice_number)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_number.trim()))?;
        let company = self.db.state().company().await?;
        let settings = self.db.state().settings().await?;

        let remote = self.remote.as_ref().ok_or(SyncError::NotConfigured("script_url"))?;
        let payload = email_payload(&invoice, &company, recipient, settings.vat_rate);
        let response = remote.call(&RpcRequest::SendInvoiceEmail(payload)).await?;
        info!(invoice_number = %invoice.invoice_number, to = %recipient.trim(), "Invoice emailed");
        Ok(response)
    }

    /// Signs in with the built-in administrator, or through the remote
    /// `Users` sheet when the local check fails and a remote is configured.
    pub async fn login(&self, username: &str, password: &str, now: DateTime<Utc>) -> SyncResult<Session> {
        let user = match authenticate_local(username, password) {
            Some(user) => user,
            None => {
                let remote = self.remote.as_ref().ok_or(SyncError::InvalidCredentials)?;
                let request = RpcRequest::Login(Credentials {
                    username: username.trim().to_string(),
                    password: password.to_string(),
                });
                remote
                    .call(&request)
                    .await?
                    .user
                    .ok_or_else(|| SyncError::InvalidResponse("login response without user".into()))?
            }
        };

        let session = Session::new(user, now);
        self.db.state().save_session(&session).await?;
        info!(username = %session.user.username, "Logged in");
        Ok(session)
    }

    /// The stored session if it has not expired.
    pub async fn current_session(&self, now: DateTime<Utc>) -> SyncResult<Option<Session>> {
        Ok(self
            .db
            .state()
            .session()
            .await?
            .filter(|s| s.is_valid(now)))
    }

    pub async fn logout(&self) -> SyncResult<()> {
        self.db.state().clear_session().await?;
        info!("Logged out");
        Ok(())
    }

    // =========================================================================
    // Remote writes
    // =========================================================================

    /// Sends one write. Failures are queued in the outbox, never returned.
    async fn push(&self, request: RpcRequest) -> RemoteWrite {
        let Some(remote) = self.remote.as_ref() else {
            return RemoteWrite::Skipped;
        };

        match remote.call(&request).await {
            Ok(_) => {
                debug!(action = request.action(), key = %request.entity_key(), "Remote write acknowledged");
                RemoteWrite::Acked
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(action = request.action(), key = %request.entity_key(), error = %reason, "Remote write failed, kept locally");
                self.queue(&request, &reason).await;
                RemoteWrite::Failed(reason)
            }
        }
    }

    async fn queue(&self, request: &RpcRequest, reason: &str) {
        if !request.is_replayable() {
            return;
        }
        let payload = match request.to_json() {
            Ok(payload) => payload,
            Err(err) => {
                error!(action = request.action(), error = %err, "Could not encode request for outbox");
                return;
            }
        };
        if let Err(err) = self
            .db
            .sync_outbox()
            .queue(request.action(), &request.entity_key(), &payload, reason)
            .await
        {
            error!(action = request.action(), error = %err, "Could not queue remote write");
        }
    }
}

fn customer_request(outcome: UpsertOutcome, customer: Customer) -> RpcRequest {
    match outcome {
        UpsertOutcome::Updated => RpcRequest::UpdateCustomer(customer),
        UpsertOutcome::Inserted => RpcRequest::AddCustomer(customer),
    }
}

fn persisted<T>(value: T, write: RemoteWrite) -> Persisted<T> {
    match write {
        RemoteWrite::Skipped => Persisted::Local { value },
        RemoteWrite::Acked => Persisted::LocalAndRemote { value },
        RemoteWrite::Failed(reason) => Persisted::LocalOnly { value, reason },
    }
}
