//! # History Commands
//!
//! ```text
//! history sync    remote Invoices sheet ──merge──► local store
//! history export  local store ──► invoice_history_YYYY-MM-DD.csv
//! stats           local store ──► dashboard figures
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use tracing::info;

use baht_core::export::{export_file_name, write_history_csv};
use baht_core::stats::{DashboardFilter, DashboardStats};
use baht_core::validation::validate_iso_date;
use baht_core::{format_currency, ValidationError};

use crate::cli::{HistoryCommand, StatsArgs};
use crate::error::ApiError;
use crate::state::AppState;

const MONTHS_EN: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub async fn run(state: &AppState, command: HistoryCommand) -> Result<String, ApiError> {
    match command {
        HistoryCommand::Sync => sync_history(state).await,
        HistoryCommand::Export { file } => export_history(state, file).await,
    }
}

pub async fn sync_history(state: &AppState) -> Result<String, ApiError> {
    let report = state.sync.sync_history().await?;
    Ok(format!(
        "Merged {} new invoices from remote ({} in history)",
        report.added, report.total
    ))
}

pub async fn export_history(state: &AppState, file: Option<PathBuf>) -> Result<String, ApiError> {
    let invoices = state.db().invoices().list().await?;
    let path = file.unwrap_or_else(|| PathBuf::from(export_file_name(state.today)));

    let writer = BufWriter::new(File::create(&path)?);
    write_history_csv(writer, &invoices)?;

    info!(?path, count = invoices.len(), "History exported");
    Ok(format!("Exported {} invoices to {}", invoices.len(), path.display()))
}

// =============================================================================
// Dashboard
// =============================================================================

pub async fn stats(state: &AppState, args: StatsArgs) -> Result<String, ApiError> {
    let filter = stats_filter(state, args)?;
    let stats = state.db().invoices().stats(&filter, state.today).await?;
    Ok(render_stats(&filter, &stats, state))
}

fn stats_filter(state: &AppState, args: StatsArgs) -> Result<DashboardFilter, ApiError> {
    match (args.year, args.from, args.to) {
        (Some(year), _, _) => {
            if let Some(month) = args.month {
                if !(1..=12).contains(&month) {
                    return Err(ValidationError::OutOfRange {
                        field: "month".to_string(),
                        min: 1,
                        max: 12,
                    }
                    .into());
                }
            }
            Ok(DashboardFilter::Year {
                year,
                month: args.month,
            })
        }
        (None, Some(from), Some(to)) => {
            validate_iso_date("from", &from)?;
            validate_iso_date("to", &to)?;
            Ok(DashboardFilter::Range { from, to })
        }
        _ => Ok(DashboardFilter::current_month(state.today)),
    }
}

fn render_stats(filter: &DashboardFilter, stats: &DashboardStats, state: &AppState) -> String {
    let period = match filter {
        DashboardFilter::Year {
            year,
            month: Some(month),
        } => format!("{}-{:02}", year, month),
        DashboardFilter::Year { year, month: None } => year.to_string(),
        DashboardFilter::Range { from, to } => format!("{} .. {}", from, to),
    };

    let mut lines = vec![
        format!("Period:      {}", period),
        format!(
            "Invoices:    {} ({} active, {} cancelled)",
            stats.total_invoices, stats.active_invoices, stats.cancelled_invoices
        ),
        format!("Sales:       {}", format_currency(stats.total_sales)),
        format!("VAT:         {}", format_currency(stats.total_vat)),
        format!("Cancelled:   {}", format_currency(stats.cancelled_total)),
        format!("Today:       {}", stats.today_invoices),
        format!("Customers:   {}", stats.total_customers),
        format!("Monthly sales {}:", filter.chart_year(state.today)),
    ];
    for (name, amount) in MONTHS_EN.iter().zip(stats.monthly_sales.iter()) {
        lines.push(format!("  {} {:>14}", name, format_currency(*amount)));
    }
    if !stats.recent.is_empty() {
        lines.push("Recent:".to_string());
        for invoice in &stats.recent {
            lines.push(format!(
                "  {} {} {}",
                invoice.invoice_number,
                invoice.customer_name,
                format_currency(invoice.total)
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{local_state, state_with_remote};
    use crate::error::ErrorCode;
    use baht_core::{Invoice, InvoiceItem};

    async fn seed(state: &AppState, name: &str, price: f64) {
        let draft = Invoice {
            customer_name: name.to_string(),
            items: vec![InvoiceItem::new("ค่าบริการ", 1.0, price)],
            ..Default::default()
        };
        state.sync.save_invoice(draft, state.today).await.unwrap();
    }

    #[tokio::test]
    async fn test_export_writes_csv() {
        let state = local_state().await;
        seed(&state, "ร้านป้าแดง", 107.0).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let notice = export_history(&state, Some(path.clone())).await.unwrap();
        assert!(notice.starts_with("Exported 1 invoices"));

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("ร้านป้าแดง"));
        assert!(text.contains("107.00"));
    }

    #[tokio::test]
    async fn test_sync_history_merges() {
        let (state, remote) = state_with_remote().await;
        seed(&state, "ร้านป้าแดง", 107.0).await;
        remote
            .seed_invoices(vec![Invoice {
                invoice_number: "2601130003".into(),
                date: "2026-01-13".into(),
                customer_name: "บริษัท ทดสอบ จำกัด".into(),
                items: vec![InvoiceItem::new("ค่าห้อง", 1.0, 1070.0)],
                ..Default::default()
            }])
            .await;

        let notice = sync_history(&state).await.unwrap();
        assert_eq!(notice, "Merged 1 new invoices from remote (2 in history)");
    }

    #[tokio::test]
    async fn test_sync_history_without_remote() {
        let state = local_state().await;
        let err = sync_history(&state).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }

    #[tokio::test]
    async fn test_stats_defaults_to_current_month() {
        let state = local_state().await;
        seed(&state, "ร้านป้าแดง", 107.0).await;
        seed(&state, "บริษัท ทดสอบ จำกัด", 214.0).await;
        state.sync.cancel_invoice("2601140002").await.unwrap();

        let text = stats(&state, StatsArgs::default()).await.unwrap();
        assert!(text.contains("Period:      2026-01"));
        assert!(text.contains("Invoices:    2 (1 active, 1 cancelled)"));
        assert!(text.contains("Sales:       107.00"));
        assert!(text.contains("Cancelled:   214.00"));
    }

    #[tokio::test]
    async fn test_stats_filter_validation() {
        let state = local_state().await;
        let args = StatsArgs {
            year: Some(2026),
            month: Some(13),
            ..Default::default()
        };
        let err = stats(&state, args).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let args = StatsArgs {
            from: Some("2026-01-01".into()),
            to: Some("31/01/2026".into()),
            ..Default::default()
        };
        assert!(stats(&state, args).await.is_err());
    }
}
