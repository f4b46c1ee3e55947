//! # Invoice Number Sync
//!
//! Reconciles the local counter with the remote "latest number" for a day.
//!
//! ```text
//! sync_invoice_number(target, today)
//!      │
//!      ├── no remote ─────────────────────► Fallback(preview_next)
//!      │
//!      ├── getLatestInvoiceNumber {date}
//!      │        │
//!      │        ├── ok ──► reset_counter(next, today) ──► Synced(latest)
//!      │        │
//!      │        └── failed / timeout ────► Fallback(preview_next)
//!      │                                   (counter untouched)
//! ```
//! One attempt per call; nothing retries on its own.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use baht_core::numbering::{date_prefix, LatestNumber};
use baht_db::Database;

use crate::error::SyncResult;
use crate::protocol::{LatestNumberQuery, RpcRequest};
use crate::remote::RemoteCollaborator;

/// Result of a number sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum NumberSyncOutcome {
    /// The remote answered and the counter was reset to `latest.next_number`
    /// for today.
    Synced { latest: LatestNumber },
    /// The remote could not be used; the local preview stands.
    Fallback {
        next_invoice_number: String,
        reason: String,
    },
}

impl NumberSyncOutcome {
    /// The number the operator should expect next.
    pub fn next_invoice_number(&self) -> &str {
        match self {
            NumberSyncOutcome::Synced { latest } => &latest.next_invoice_number,
            NumberSyncOutcome::Fallback {
                next_invoice_number,
                ..
            } => next_invoice_number,
        }
    }
}

/// Asks the remote for the latest number issued on `target` and aligns the
/// local counter with it.
///
/// ## Errors
/// Only local store failures. Remote failures produce
/// [`NumberSyncOutcome::Fallback`].
pub async fn sync_invoice_number(
    db: &Database,
    remote: Option<&dyn RemoteCollaborator>,
    target: NaiveDate,
    today: NaiveDate,
) -> SyncResult<NumberSyncOutcome> {
    let Some(remote) = remote else {
        return fallback(db, today, "remote not configured".to_string()).await;
    };

    let target_prefix = date_prefix(target);
    let request = RpcRequest::GetLatestInvoiceNumber(LatestNumberQuery {
        date: Some(target.format("%Y-%m-%d").to_string()),
        date_prefix: None,
    });

    let response = match remote.call(&request).await {
        Ok(response) => response,
        Err(err) if err.is_remote_failure() => {
            warn!(date = %target, error = %err, "Invoice number sync failed, using local counter");
            return fallback(db, today, err.to_string()).await;
        }
        Err(err) => return Err(err),
    };

    let latest = response.latest_number(&target_prefix);
    db.state()
        .reset_counter(i64::from(latest.next_number), today)
        .await?;
    info!(
        date_prefix = %latest.date_prefix,
        latest = latest.latest_number,
        next = latest.next_number,
        "Invoice counter synced from remote"
    );

    Ok(NumberSyncOutcome::Synced { latest })
}

async fn fallback(db: &Database, today: NaiveDate, reason: String) -> SyncResult<NumberSyncOutcome> {
    Ok(NumberSyncOutcome::Fallback {
        next_invoice_number: db.state().preview_next(today).await?,
        reason,
    })
}
