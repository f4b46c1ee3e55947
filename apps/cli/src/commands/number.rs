//! # Invoice Number Commands
//!
//! `preview` never advances the counter; `reserve` does. `sync` asks the
//! remote for the latest number of a day and resets the counter to follow it.

use tracing::debug;

use baht_core::numbering::format_invoice_number;
use baht_core::validation::validate_iso_date;
use baht_sync::NumberSyncOutcome;

use crate::cli::NumberCommand;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn run(state: &AppState, command: NumberCommand) -> Result<String, ApiError> {
    match command {
        NumberCommand::Preview => preview(state).await,
        NumberCommand::Reserve => reserve(state).await,
        NumberCommand::Reset { start } => reset(state, start).await,
        NumberCommand::Sync { date } => sync(state, date.as_deref()).await,
    }
}

pub async fn preview(state: &AppState) -> Result<String, ApiError> {
    let next = state.db().state().preview_next(state.today).await?;
    Ok(format!("Next invoice number: {}", next))
}

pub async fn reserve(state: &AppState) -> Result<String, ApiError> {
    let number = state.db().state().reserve_next(state.today).await?;
    Ok(format!("Reserved invoice number {}", number))
}

pub async fn reset(state: &AppState, start: i64) -> Result<String, ApiError> {
    let counter = state.db().state().reset_counter(start, state.today).await?;
    let prefix = counter.last_date.unwrap_or_default();
    Ok(format!(
        "Counter reset, next invoice number: {}",
        format_invoice_number(&prefix, counter.counter)
    ))
}

pub async fn sync(state: &AppState, date: Option<&str>) -> Result<String, ApiError> {
    let target = match date {
        Some(value) => validate_iso_date("date", value)?,
        None => state.today,
    };
    debug!(%target, "number sync command");

    let outcome = state.sync.sync_invoice_number(target, state.today).await?;
    Ok(match outcome {
        NumberSyncOutcome::Synced { latest } => format!(
            "Latest number for {}: {} (next {})",
            latest.date_prefix,
            if latest.latest_number == 0 {
                "none".to_string()
            } else {
                format_invoice_number(&latest.date_prefix, latest.latest_number)
            },
            latest.next_invoice_number
        ),
        NumberSyncOutcome::Fallback {
            next_invoice_number,
            reason,
        } => format!(
            "Next invoice number: {} (local only: {})",
            next_invoice_number, reason
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{local_state, state_with_remote};
    use baht_core::Invoice;

    #[tokio::test]
    async fn test_preview_does_not_advance() {
        let state = local_state().await;
        assert_eq!(preview(&state).await.unwrap(), "Next invoice number: 2601140001");
        assert_eq!(preview(&state).await.unwrap(), "Next invoice number: 2601140001");

        assert_eq!(reserve(&state).await.unwrap(), "Reserved invoice number 2601140001");
        assert_eq!(preview(&state).await.unwrap(), "Next invoice number: 2601140002");
    }

    #[tokio::test]
    async fn test_reset() {
        let state = local_state().await;
        assert_eq!(
            reset(&state, 42).await.unwrap(),
            "Counter reset, next invoice number: 2601140042"
        );

        let err = reset(&state, 0).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
        assert_eq!(preview(&state).await.unwrap(), "Next invoice number: 2601140042");
    }

    #[tokio::test]
    async fn test_sync_aligns_counter() {
        let (state, remote) = state_with_remote().await;
        remote
            .seed_invoices(vec![Invoice {
                invoice_number: "2601140007".into(),
                date: "2026-01-14".into(),
                ..Default::default()
            }])
            .await;

        let notice = sync(&state, None).await.unwrap();
        assert_eq!(notice, "Latest number for 260114: 2601140007 (next 2601140008)");
        assert_eq!(preview(&state).await.unwrap(), "Next invoice number: 2601140008");
    }

    #[tokio::test]
    async fn test_sync_offline_falls_back() {
        let (state, remote) = state_with_remote().await;
        remote.set_offline(true);

        let notice = sync(&state, None).await.unwrap();
        assert!(notice.starts_with("Next invoice number: 2601140001 (local only: "));
    }

    #[tokio::test]
    async fn test_sync_rejects_bad_date() {
        let state = local_state().await;
        let err = sync(&state, Some("14/01/2026")).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
    }
}
