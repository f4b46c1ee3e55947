//! # History Export
//!
//! Writes invoice history as a CSV that spreadsheet software opens with Thai
//! text intact and leading zeros preserved.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ \u{FEFF}                                   UTF-8 byte order mark        │
//! │ เลขที่ใบกำกับ,วันที่,ลูกค้า,ที่อยู่,เลขผู้เสียภาษี,ยอดก่อน VAT,VAT,ยอดรวม,สถานะ │
//! │ "=""2601140001""",2026-01-14,ร้าน ก,1 ถนน ข,"=""0105…""",100.00,…,ปกติ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoice numbers and tax IDs go out as `="…"` formulas so they stay text.
//! Addresses are flattened to one line with commas removed.

use chrono::NaiveDate;
use std::io::Write;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{DigitString, Invoice};

/// Column headers, in order.
pub const HISTORY_HEADERS: [&str; 9] = [
    "เลขที่ใบกำกับ",
    "วันที่",
    "ลูกค้า",
    "ที่อยู่",
    "เลขผู้เสียภาษี",
    "ยอดก่อน VAT",
    "VAT",
    "ยอดรวม",
    "สถานะ",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes `invoices` as CSV (with BOM) to `writer`.
pub fn write_history_csv<'a, W, I>(mut writer: W, invoices: I) -> CoreResult<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Invoice>,
{
    writer.write_all(UTF8_BOM)?;

    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    csv.write_record(HISTORY_HEADERS)?;
    for invoice in invoices {
        csv.write_record(history_row(invoice))?;
    }
    csv.flush()?;
    Ok(())
}

/// Renders the export into a string.
pub fn history_csv_string<'a, I>(invoices: I) -> CoreResult<String>
where
    I: IntoIterator<Item = &'a Invoice>,
{
    let mut buffer = Vec::new();
    write_history_csv(&mut buffer, invoices)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Default download name: `invoice_history_2026-01-14.csv`.
pub fn export_file_name(today: NaiveDate) -> String {
    format!("invoice_history_{}.csv", today.format("%Y-%m-%d"))
}

fn history_row(invoice: &Invoice) -> [String; 9] {
    [
        DigitString::new(&invoice.invoice_number).to_csv_formula(),
        invoice.date.clone(),
        invoice.customer_name.clone(),
        flatten_address(&invoice.customer_address),
        invoice.customer_tax_id.to_csv_formula(),
        plain_amount(invoice.subtotal),
        plain_amount(invoice.vat),
        plain_amount(invoice.total),
        invoice.status.label_th().to_string(),
    ]
}

fn flatten_address(address: &str) -> String {
    address
        .chars()
        .map(|c| if matches!(c, ',' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

/// `1234.5` baht as `1234.50` (no grouping, so cells stay numeric).
fn plain_amount(amount: Money) -> String {
    format!(
        "{}{}.{:02}",
        if amount.is_negative() { "-" } else { "" },
        amount.baht().unsigned_abs(),
        amount.satang_part()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvoiceItem, InvoiceStatus, VatRate};

    fn sample() -> Invoice {
        let mut invoice = Invoice {
            invoice_number: "2601140001".into(),
            date: "2026-01-14".into(),
            customer_name: "ร้าน ก".into(),
            customer_address: "1 ถนนสุขุมวิท,\nกรุงเทพฯ".into(),
            customer_tax_id: DigitString::new("0105561234567"),
            items: vec![InvoiceItem::new("ค่าอาหาร", 1.0, 107.0)],
            ..Default::default()
        };
        invoice.recompute(VatRate::THAI_STANDARD);
        invoice
    }

    #[test]
    fn test_export_starts_with_bom_and_headers() {
        let csv = history_csv_string(&[sample()]).unwrap();
        assert!(csv.starts_with('\u{FEFF}'));
        let first_line = csv.trim_start_matches('\u{FEFF}').lines().next().unwrap();
        assert_eq!(first_line, HISTORY_HEADERS.join(","));
    }

    #[test]
    fn test_export_keeps_leading_zero_tax_id() {
        let csv = history_csv_string(&[sample()]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "\"=\"\"2601140001\"\"\",2026-01-14,ร้าน ก,1 ถนนสุขุมวิท  กรุงเทพฯ,\"=\"\"0105561234567\"\"\",100.00,7.00,107.00,ปกติ"
        );
    }

    #[test]
    fn test_export_cancelled_and_blank_tax_id() {
        let mut invoice = sample();
        invoice.status = InvoiceStatus::Cancelled;
        invoice.customer_tax_id = DigitString::default();
        let csv = history_csv_string(&[invoice]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",,100.00,7.00,107.00,ยกเลิก"));
    }

    #[test]
    fn test_export_file_name() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
        assert_eq!(export_file_name(today), "invoice_history_2026-01-14.csv");
    }
}
