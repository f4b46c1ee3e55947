//! # Sync Commands
//!
//! ```text
//! sync status   pending outbox entries (oldest first)
//! sync push     replay pending entries once, then drop synced rows
//! ```

use baht_sync::{replay_outbox, SyncError};

use crate::cli::SyncCommand;
use crate::error::ApiError;
use crate::state::AppState;

/// Entries listed by `sync status`.
const STATUS_LIST_LIMIT: u32 = 20;

pub async fn run(state: &AppState, command: SyncCommand) -> Result<String, ApiError> {
    match command {
        SyncCommand::Push { limit } => push(state, limit).await,
        SyncCommand::Status => status(state).await,
    }
}

pub async fn push(state: &AppState, limit: u32) -> Result<String, ApiError> {
    let remote = state
        .sync
        .remote()
        .ok_or(SyncError::NotConfigured("script_url"))?;

    let report = replay_outbox(state.db(), remote, limit).await?;
    let cleaned = state.db().sync_outbox().cleanup_synced().await?;
    tracing::debug!(cleaned, "Synced outbox rows removed");

    let mut notice = format!(
        "Replayed {} writes: {} synced, {} failed",
        report.attempted, report.synced, report.failed
    );
    if report.stuck > 0 {
        notice.push_str(&format!(" ({} stuck)", report.stuck));
    }
    Ok(notice)
}

pub async fn status(state: &AppState) -> Result<String, ApiError> {
    let outbox = state.db().sync_outbox();
    let pending = outbox.count_pending().await?;
    if pending == 0 {
        return Ok("Nothing pending".to_string());
    }

    let mut lines = vec![format!("{} writes pending", pending)];
    for entry in outbox.get_pending(STATUS_LIST_LIMIT).await? {
        lines.push(format!(
            "  {:<16} {:<12} attempts {}  {}",
            entry.action,
            entry.entity_key,
            entry.attempts,
            entry.last_error.unwrap_or_default()
        ));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::invoice::new_invoice;
    use crate::commands::test_support::{local_state, state_with_remote};
    use crate::cli::InvoiceArgs;
    use crate::error::ErrorCode;

    fn args() -> InvoiceArgs {
        InvoiceArgs {
            customer: Some("ร้านป้าแดง".into()),
            items: vec!["ค่าอาหาร:1:107".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_offline_writes_replay_later() {
        let (state, remote) = state_with_remote().await;
        remote.set_offline(true);
        new_invoice(&state, args()).await.unwrap();

        let listed = status(&state).await.unwrap();
        assert!(listed.starts_with("2 writes pending"));
        assert!(listed.contains("addInvoice"));

        // still offline: one more attempt each, nothing lost
        let notice = push(&state, 100).await.unwrap();
        assert_eq!(notice, "Replayed 2 writes: 0 synced, 2 failed");

        remote.set_offline(false);
        let notice = push(&state, 100).await.unwrap();
        assert_eq!(notice, "Replayed 2 writes: 2 synced, 0 failed");
        assert_eq!(status(&state).await.unwrap(), "Nothing pending");
        assert_eq!(remote.invoices().await.len(), 1);
    }

    #[tokio::test]
    async fn test_push_needs_remote() {
        let state = local_state().await;
        let err = push(&state, 100).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
