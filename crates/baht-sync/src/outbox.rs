//! # Outbox Replay
//!
//! Re-sends remote writes that failed when they were first made.
//!
//! ## Replay Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          sync_outbox                                 │
//! │                                                                      │
//! │  id | action        | entity_key  | payload | attempts | synced_at   │
//! │  ───┼───────────────┼─────────────┼─────────┼──────────┼──────────── │
//! │  1  │ addInvoice    │ 2601140001  │ {...}   │ 1        │ NULL        │
//! │  2  │ addCustomer   │ 0105561...  │ {...}   │ 1        │ NULL        │
//! └──────────────────────────────┬───────────────────────────────────────┘
//!                                │ get_pending(limit), oldest first
//!                                ▼
//!                  ┌──────────────────────────────┐
//!                  │ decode RpcRequest            │──bad──► mark_failed
//!                  │ remote.call(request)         │
//!                  └──────┬───────────────┬───────┘
//!                         │ ok            │ err
//!                         ▼               ▼
//!                    mark_synced     mark_failed (attempts += 1)
//! ```
//!
//! Runs on explicit request only. Each pending entry gets exactly one attempt
//! per run; nothing is scheduled in the background.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use baht_db::Database;

use crate::error::SyncResult;
use crate::protocol::RpcRequest;
use crate::remote::RemoteCollaborator;

/// Entries older than this many failed attempts are still replayed but
/// reported as stuck.
pub const STUCK_AFTER_ATTEMPTS: i64 = 10;

/// Default number of entries handled per run.
pub const DEFAULT_REPLAY_LIMIT: u32 = 100;

/// What one replay run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    /// Entries still pending that have failed at least [`STUCK_AFTER_ATTEMPTS`] times.
    pub stuck: usize,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Replays up to `limit` pending outbox entries against `remote`.
///
/// ## Errors
/// Only local store failures. A remote failure marks the entry and moves on.
pub async fn replay_outbox(
    db: &Database,
    remote: &dyn RemoteCollaborator,
    limit: u32,
) -> SyncResult<ReplayReport> {
    let outbox = db.sync_outbox();
    let entries = outbox.get_pending(limit).await?;
    let mut report = ReplayReport::default();

    if entries.is_empty() {
        debug!("No pending outbox entries");
        return Ok(report);
    }

    info!(count = entries.len(), "Replaying outbox");

    for entry in entries {
        report.attempted += 1;

        let request = match RpcRequest::from_json(&entry.payload) {
            Ok(request) => request,
            Err(err) => {
                error!(id = %entry.id, action = %entry.action, error = %err, "Undecodable outbox entry");
                outbox.mark_failed(&entry.id, &err.to_string()).await?;
                report.failed += 1;
                continue;
            }
        };

        match remote.call(&request).await {
            Ok(_) => {
                outbox.mark_synced(&entry.id).await?;
                report.synced += 1;
                debug!(id = %entry.id, action = %entry.action, key = %entry.entity_key, "Outbox entry replayed");
            }
            Err(err) => {
                outbox.mark_failed(&entry.id, &err.to_string()).await?;
                report.failed += 1;
                if entry.attempts + 1 >= STUCK_AFTER_ATTEMPTS {
                    report.stuck += 1;
                }
                warn!(
                    id = %entry.id,
                    action = %entry.action,
                    key = %entry.entity_key,
                    attempts = entry.attempts + 1,
                    error = %err,
                    "Outbox replay failed"
                );
            }
        }
    }

    info!(synced = report.synced, failed = report.failed, "Outbox replay finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRemote;
    use crate::protocol::InvoicePayload;
    use baht_core::{Customer, Invoice};
    use baht_db::DbConfig;

    async fn queue(db: &Database, request: &RpcRequest) {
        db.sync_outbox()
            .queue(
                request.action(),
                &request.entity_key(),
                &request.to_json().unwrap(),
                "remote is offline",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_replay_sends_pending_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let remote = InMemoryRemote::new();

        let invoice = Invoice {
            invoice_number: "2601140001".into(),
            customer_name: "ร้านป้าแดง".into(),
            ..Default::default()
        };
        queue(&db, &RpcRequest::AddInvoice(InvoicePayload::new(invoice))).await;
        queue(
            &db,
            &RpcRequest::AddCustomer(Customer {
                id: "CUST-1".into(),
                name: "ร้านป้าแดง".into(),
                ..Default::default()
            }),
        )
        .await;

        let report = replay_outbox(&db, &remote, DEFAULT_REPLAY_LIMIT).await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.synced, 2);
        assert!(report.is_clean());

        assert_eq!(remote.calls().await, vec!["addInvoice", "addCustomer"]);
        assert_eq!(remote.invoices().await[0].invoice_number, "2601140001");
        assert_eq!(db.sync_outbox().count_pending().await.unwrap(), 0);

        let again = replay_outbox(&db, &remote, DEFAULT_REPLAY_LIMIT).await.unwrap();
        assert_eq!(again.attempted, 0);
    }

    #[tokio::test]
    async fn test_failed_replay_stays_pending() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let remote = InMemoryRemote::new();
        remote.set_offline(true);

        queue(
            &db,
            &RpcRequest::AddCustomer(Customer {
                name: "ร้านป้าแดง".into(),
                ..Default::default()
            }),
        )
        .await;

        let report = replay_outbox(&db, &remote, DEFAULT_REPLAY_LIMIT).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.stuck, 0);

        let pending = db.sync_outbox().get_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_marked_failed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let remote = InMemoryRemote::new();
        db.sync_outbox()
            .queue("addInvoice", "x", "not json", "boom")
            .await
            .unwrap();

        let report = replay_outbox(&db, &remote, DEFAULT_REPLAY_LIMIT).await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(remote.calls().await.is_empty());
    }
}
