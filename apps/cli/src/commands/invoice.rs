//! # Invoice Commands

use tracing::{debug, info};

use baht_core::format::{display_invoice_date, format_thai_date_short, parse_iso_date};
use baht_core::{format_currency, BranchType, DigitString, Invoice, InvoiceItem, Money, PaymentInfo};
use baht_db::InvoiceQuery;

use super::persisted_note;
use crate::cli::{InvoiceArgs, InvoiceCommand};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn run(state: &AppState, command: InvoiceCommand) -> Result<String, ApiError> {
    match command {
        InvoiceCommand::New(args) => new_invoice(state, args).await,
        InvoiceCommand::Edit {
            number,
            new_number,
            fields,
        } => edit_invoice(state, &number, new_number, fields).await,
        InvoiceCommand::Cancel { number } => cancel_invoice(state, &number).await,
        InvoiceCommand::Restore { number } => restore_invoice(state, &number).await,
        InvoiceCommand::Delete { number } => delete_invoice(state, &number).await,
        InvoiceCommand::List { query, from, to } => {
            let filter = InvoiceQuery {
                text: query,
                from,
                to,
            };
            list_invoices(state, &filter).await
        }
        InvoiceCommand::Show { number, json } => show_invoice(state, &number, json).await,
        InvoiceCommand::Purge { yes } => purge_invoices(state, yes).await,
        InvoiceCommand::Email { number, to } => email_invoice(state, &number, &to).await,
    }
}

pub async fn new_invoice(state: &AppState, args: InvoiceArgs) -> Result<String, ApiError> {
    debug!("invoice new command");

    let mut draft = Invoice::default();
    prefill_customer(state, &mut draft, args.customer_id.as_deref()).await?;
    apply_fields(&mut draft, args)?;

    let saved = state.sync.save_invoice(draft, state.today).await?;
    let invoice = saved.invoice.value();

    let mut lines = vec![
        format!(
            "Saved invoice {} ({})",
            invoice.invoice_number,
            persisted_note(&saved.invoice)
        ),
        format!(
            "  {}  {} baht  ({})",
            invoice.customer_name,
            format_currency(invoice.total),
            invoice.thai_text
        ),
        format!("  customer record ({})", persisted_note(&saved.customer)),
    ];
    if let Some(warning) = saved.payment_warning {
        lines.push(format!("  warning: {}", warning));
    }
    Ok(lines.join("\n"))
}

pub async fn edit_invoice(
    state: &AppState,
    number: &str,
    new_number: Option<String>,
    args: InvoiceArgs,
) -> Result<String, ApiError> {
    debug!(invoice_number = %number, "invoice edit command");

    let mut invoice = state
        .db()
        .invoices()
        .get(number)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", number.trim()))?;

    if let Some(new_number) = new_number {
        invoice.invoice_number = new_number.trim().to_string();
    }
    prefill_customer(state, &mut invoice, args.customer_id.as_deref()).await?;
    apply_fields(&mut invoice, args)?;

    let edited = state.sync.edit_invoice(number, invoice).await?;
    let stored = edited.invoice.value();
    info!(original = %number, invoice_number = %stored.invoice_number, "Invoice edited from CLI");

    let renamed = if stored.invoice_number != number.trim() {
        format!(" (was {})", number.trim())
    } else {
        String::new()
    };
    Ok([
        format!(
            "Updated invoice {}{} total {} ({})",
            stored.invoice_number,
            renamed,
            format_currency(stored.total),
            persisted_note(&edited.invoice)
        ),
        format!("  customer record ({})", persisted_note(&edited.customer)),
    ]
    .join("\n"))
}

pub async fn cancel_invoice(state: &AppState, number: &str) -> Result<String, ApiError> {
    let cancelled = state.sync.cancel_invoice(number).await?;
    Ok(format!(
        "Cancelled invoice {} ({})",
        cancelled.value().invoice_number,
        persisted_note(&cancelled)
    ))
}

pub async fn restore_invoice(state: &AppState, number: &str) -> Result<String, ApiError> {
    let restored = state.sync.restore_invoice(number).await?;
    Ok(format!(
        "Restored invoice {} ({})",
        restored.value().invoice_number,
        persisted_note(&restored)
    ))
}

pub async fn delete_invoice(state: &AppState, number: &str) -> Result<String, ApiError> {
    state.sync.delete_invoice(number).await?;
    Ok(format!("Deleted invoice {} (local)", number.trim()))
}

pub async fn list_invoices(state: &AppState, filter: &InvoiceQuery) -> Result<String, ApiError> {
    let invoices = state.db().invoices().search(filter).await?;
    if invoices.is_empty() {
        return Ok("No invoices".to_string());
    }

    let lines: Vec<String> = invoices
        .iter()
        .map(|inv| {
            format!(
                "{:<12} {:<10} {:>14}  {}  {}",
                inv.invoice_number,
                parse_iso_date(&inv.date)
                    .map(format_thai_date_short)
                    .unwrap_or_else(|_| inv.date.clone()),
                format_currency(inv.total),
                inv.status.label_th(),
                inv.customer_name
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

pub async fn show_invoice(state: &AppState, number: &str, json: bool) -> Result<String, ApiError> {
    let invoice = state
        .db()
        .invoices()
        .get(number)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", number.trim()))?;

    if json {
        return serde_json::to_string_pretty(&invoice).map_err(|e| ApiError::internal(e.to_string()));
    }

    let mut lines = vec![
        format!("เลขที่ {}  [{}]", invoice.invoice_number, invoice.status.label_th()),
        format!("วันที่ {}", display_invoice_date(&invoice.date)),
        format!("ลูกค้า {}", invoice.customer_name),
    ];
    if !invoice.customer_address.is_empty() {
        lines.push(format!("ที่อยู่ {}", invoice.customer_address));
    }
    if !invoice.customer_tax_id.is_empty() {
        let branch = match invoice.branch_type {
            BranchType::Hq => "สำนักงานใหญ่".to_string(),
            BranchType::Branch => format!("สาขา {}", invoice.branch_number),
        };
        lines.push(format!("เลขประจำตัวผู้เสียภาษี {} {}", invoice.customer_tax_id.as_str(), branch));
    }
    for (idx, item) in invoice.items.iter().enumerate() {
        lines.push(format!(
            "  {}. {} x{} @ {}",
            idx + 1,
            item.description,
            item.quantity,
            format_currency(Money::from_baht_f64(item.price))
        ));
    }
    lines.push(format!("ยอดก่อน VAT {}", format_currency(invoice.subtotal)));
    lines.push(format!("VAT {}", format_currency(invoice.vat)));
    lines.push(format!("รวมทั้งสิ้น {} ({})", format_currency(invoice.total), invoice.thai_text));
    Ok(lines.join("\n"))
}

pub async fn purge_invoices(state: &AppState, yes: bool) -> Result<String, ApiError> {
    if !yes {
        return Err(ApiError::validation(
            "Refusing to delete every invoice without --yes",
        ));
    }
    let removed = state.db().invoices().purge_all().await?;
    Ok(format!("Deleted {} invoices (local)", removed))
}

pub async fn email_invoice(state: &AppState, number: &str, to: &str) -> Result<String, ApiError> {
    let response = state.sync.send_invoice_email(number, to).await?;
    let sent_to = response.sent_to.unwrap_or_else(|| to.trim().to_string());
    Ok(format!("Emailed invoice {} to {}", number.trim(), sent_to))
}

// =============================================================================
// Argument mapping
// =============================================================================

/// Copies a saved customer onto the invoice's customer snapshot.
async fn prefill_customer(
    state: &AppState,
    invoice: &mut Invoice,
    key: Option<&str>,
) -> Result<(), ApiError> {
    let Some(key) = key else {
        return Ok(());
    };
    let customer = state
        .db()
        .customers()
        .find_by_key(key)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", key.trim()))?;

    debug!(customer_id = %customer.id, "Customer picked for invoice");
    invoice.customer_name = customer.name;
    invoice.customer_address = customer.address;
    invoice.customer_tax_id = customer.tax_id;
    invoice.customer_phone = customer.phone;
    invoice.customer_email = customer.email;
    Ok(())
}

/// Copies the given fields onto `invoice`; absent fields are left alone.
fn apply_fields(invoice: &mut Invoice, args: InvoiceArgs) -> Result<(), ApiError> {
    if let Some(customer) = args.customer {
        invoice.customer_name = customer;
    }
    if let Some(address) = args.address {
        invoice.customer_address = address;
    }
    if let Some(tax_id) = args.tax_id {
        invoice.customer_tax_id = DigitString::new(tax_id);
    }
    if let Some(phone) = args.phone {
        invoice.customer_phone = DigitString::new(phone);
    }
    if let Some(email) = args.email {
        invoice.customer_email = email;
    }
    if let Some(branch) = args.branch {
        invoice.branch_type = BranchType::Branch;
        invoice.branch_number = branch.trim().to_string();
    } else if args.hq {
        invoice.branch_type = BranchType::Hq;
        invoice.branch_number.clear();
    }
    if let Some(date) = args.date {
        invoice.date = date;
    }
    if !args.items.is_empty() {
        invoice.items = args
            .items
            .iter()
            .map(|raw| parse_item(raw.as_str()))
            .collect::<Result<_, _>>()?;
    }
    if args.cash.is_some() || args.transfer.is_some() {
        invoice.payment = payment_from_args(args.cash, args.transfer);
    }
    Ok(())
}

/// Parses `"description:quantity:price"`. The description may itself
/// contain colons; the last two fields are the numbers.
pub fn parse_item(raw: &str) -> Result<InvoiceItem, ApiError> {
    let mut parts = raw.rsplitn(3, ':');
    let (price, quantity, description) = match (parts.next(), parts.next(), parts.next()) {
        (Some(price), Some(quantity), Some(description)) => (price, quantity, description),
        _ => {
            return Err(ApiError::validation(format!(
                "Item '{}' must look like description:quantity:price",
                raw
            )))
        }
    };

    let number = |field: &str, value: &str| {
        value
            .trim()
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ApiError::validation(format!("Item {} '{}' is not a number", field, value)))
    };

    Ok(InvoiceItem::new(
        description.trim(),
        number("quantity", quantity)?,
        number("price", price)?,
    ))
}

fn payment_from_args(cash: Option<f64>, transfer: Option<f64>) -> PaymentInfo {
    PaymentInfo {
        cash: cash.is_some(),
        cash_amount: cash.map(Money::from_baht_f64).unwrap_or_default(),
        transfer: transfer.is_some(),
        transfer_amount: transfer.map(Money::from_baht_f64).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{local_state, state_with_remote};
    use baht_core::Customer;

    fn args(customer: &str, items: &[&str]) -> InvoiceArgs {
        InvoiceArgs {
            customer: Some(customer.to_string()),
            items: items.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_item() {
        let item = parse_item("ค่าบริการ: รอบเช้า:2:1,070.50").unwrap();
        assert_eq!(item.description, "ค่าบริการ: รอบเช้า");
        assert_eq!(item.quantity, 2.0);
        assert_eq!(item.price, 1070.5);

        assert!(parse_item("no numbers").is_err());
        assert!(parse_item("x:abc:1").is_err());
    }

    #[tokio::test]
    async fn test_new_invoice_notice() {
        let (state, remote) = state_with_remote().await;
        let notice = new_invoice(&state, args("ร้านป้าแดง", &["ค่าอาหาร:1:107"]))
            .await
            .unwrap();

        assert!(notice.starts_with("Saved invoice 2601140001 (local+remote)"));
        assert!(notice.contains("หนึ่งร้อยเจ็ดบาทถ้วน"));
        assert_eq!(remote.invoices().await.len(), 1);
    }

    #[tokio::test]
    async fn test_new_invoice_offline_reports_reason() {
        let (state, remote) = state_with_remote().await;
        remote.set_offline(true);

        let notice = new_invoice(&state, args("ร้านป้าแดง", &["ค่าอาหาร:1:107"]))
            .await
            .unwrap();
        assert!(notice.contains("(local only: "));
        assert_eq!(state.db().invoices().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_payment_warning_in_notice() {
        let state = local_state().await;
        let mut input = args("ร้านป้าแดง", &["ค่าอาหาร:1:107"]);
        input.cash = Some(100.0);

        let notice = new_invoice(&state, input).await.unwrap();
        assert!(notice.contains("(local)"));
        assert!(notice.contains("warning:"));
    }

    #[tokio::test]
    async fn test_edit_keeps_unset_fields() {
        let state = local_state().await;
        let mut input = args("ร้านป้าแดง", &["ค่าอาหาร:1:107"]);
        input.tax_id = Some("0105561234567".into());
        new_invoice(&state, input).await.unwrap();

        let notice = edit_invoice(
            &state,
            "2601140001",
            Some("2601140009".into()),
            InvoiceArgs {
                items: vec!["ค่าอาหาร:2:107".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(notice.contains("2601140009 (was 2601140001)"));
        assert!(notice.ends_with("customer record (local)"));

        let stored = state.db().invoices().get("2601140009").await.unwrap().unwrap();
        assert_eq!(stored.customer_name, "ร้านป้าแดง");
        assert_eq!(stored.customer_tax_id.as_str(), "0105561234567");
        assert_eq!(stored.total, Money::from_baht(214));
    }

    #[tokio::test]
    async fn test_new_invoice_from_saved_customer() {
        let state = local_state().await;
        let saved = state
            .sync
            .save_customer(Customer {
                name: "บริษัท ทดสอบ จำกัด".into(),
                address: "1 ถนนสุขุมวิท".into(),
                tax_id: DigitString::new("0105561234567"),
                phone: DigitString::new("021234567"),
                email: "ap@example.co.th".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .into_value();

        let mut input = args("", &["ค่าอาหาร:1:107"]);
        input.customer = None;
        input.customer_id = Some(saved.id.clone());
        new_invoice(&state, input).await.unwrap();

        let stored = state.db().invoices().get("2601140001").await.unwrap().unwrap();
        assert_eq!(stored.customer_name, "บริษัท ทดสอบ จำกัด");
        assert_eq!(stored.customer_address, "1 ถนนสุขุมวิท");
        assert_eq!(stored.customer_tax_id.as_str(), "0105561234567");
        assert_eq!(stored.customer_phone.as_str(), "021234567");
        assert_eq!(stored.customer_email, "ap@example.co.th");

        // by tax ID, with an explicit field overriding the saved one
        let mut input = args("", &["ค่าอาหาร:1:107"]);
        input.customer = None;
        input.customer_id = Some("0105561234567".into());
        input.phone = Some("0899999999".into());
        new_invoice(&state, input).await.unwrap();

        let stored = state.db().invoices().get("2601140002").await.unwrap().unwrap();
        assert_eq!(stored.customer_name, "บริษัท ทดสอบ จำกัด");
        assert_eq!(stored.customer_phone.as_str(), "0899999999");

        let mut input = args("", &["ค่าอาหาร:1:107"]);
        input.customer_id = Some("CUST-missing".into());
        let err = new_invoice(&state, input).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
        assert_eq!(state.db().invoices().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_invoice_is_not_found() {
        let state = local_state().await;
        let err = cancel_invoice(&state, "2601149999").await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);

        let err = edit_invoice(&state, "2601149999", None, InvoiceArgs::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_delete_makes_no_remote_call() {
        let (state, remote) = state_with_remote().await;
        new_invoice(&state, args("ร้านป้าแดง", &["ค่าอาหาร:1:107"]))
            .await
            .unwrap();
        let calls = remote.calls().await.len();

        let notice = delete_invoice(&state, "2601140001").await.unwrap();
        assert_eq!(notice, "Deleted invoice 2601140001 (local)");
        assert_eq!(remote.calls().await.len(), calls);
    }

    #[tokio::test]
    async fn test_purge_requires_yes() {
        let state = local_state().await;
        new_invoice(&state, args("ร้านป้าแดง", &["ค่าอาหาร:1:107"]))
            .await
            .unwrap();

        assert!(purge_invoices(&state, false).await.is_err());
        assert_eq!(state.db().invoices().count().await.unwrap(), 1);
        assert_eq!(purge_invoices(&state, true).await.unwrap(), "Deleted 1 invoices (local)");
    }

    #[tokio::test]
    async fn test_list_and_show() {
        let state = local_state().await;
        new_invoice(&state, args("ร้านป้าแดง", &["ค่าอาหาร:1:107"]))
            .await
            .unwrap();
        new_invoice(&state, args("บริษัท ทดสอบ จำกัด", &["ค่าห้อง:1:1070"]))
            .await
            .unwrap();

        let listed = list_invoices(&state, &InvoiceQuery::default().text("ทดสอบ"))
            .await
            .unwrap();
        assert!(listed.contains("2601140002"));
        assert!(!listed.contains("2601140001"));
        assert!(listed.contains("14/01/2569"));

        let shown = show_invoice(&state, "2601140002", false).await.unwrap();
        assert!(shown.contains("รวมทั้งสิ้น 1,070.00"));
        assert!(shown.contains("14 มกราคม 2569"));
    }
}
