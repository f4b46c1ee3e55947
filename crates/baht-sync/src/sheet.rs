//! # Bulk Sheet Read
//!
//! Parses the spreadsheet's tabular query output and maps rows onto
//! customers and invoices.
//!
//! ## Query Output
//! ```text
//! google.visualization.Query.setResponse({
//!   "status": "ok",
//!   "table": {
//!     "cols": [ {"id":"A","label":"รหัสลูกค้า"}, {"id":"B","label":"ชื่อลูกค้า"}, ... ],
//!     "rows": [ {"c": [ {"v":"CUST-1"}, {"v":105561234567,"f":"0105561234567"}, null ]} ]
//!   }
//! });
//! ```
//!
//! ## Column Resolution
//! Sheets are edited by hand, so headers drift. Each field is looked up as:
//! ```text
//! Thai header ──► column letter ──► colN ──► Nth key of the row ──► default
//! ```
//! The first non-blank value wins (blank = "", 0, false, null).

use serde_json::Value;

use baht_core::money::{parse_lenient_number, Money};
use baht_core::thai_text::amount_to_thai_words;
use baht_core::types::{items_from_value, payment_from_value};
use baht_core::{BranchType, Customer, DigitString, Invoice};

use crate::error::{SyncError, SyncResult};

/// Which tab of the spreadsheet to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetName {
    Customers,
    Invoices,
}

impl SheetName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetName::Customers => "Customers",
            SheetName::Invoices => "Invoices",
        }
    }
}

impl std::fmt::Display for SheetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Rows
// =============================================================================

/// One sheet row: header → cell, in column order.
///
/// Assigning an existing header replaces its value in place, so a sheet with
/// repeated headers keeps the last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    cells: Vec<(String, Value)>,
}

impl SheetRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cell.
    pub fn insert(&mut self, header: impl Into<String>, value: Value) {
        let header = header.into();
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((header, value)),
        }
    }

    /// Builder form of [`SheetRow::insert`].
    pub fn with(mut self, header: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(header, value.into());
        self
    }

    pub fn get(&self, header: &str) -> Option<&Value> {
        self.cells.iter().find(|(h, _)| h == header).map(|(_, v)| v)
    }

    /// The value of the Nth key.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.cells.get(index).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// First non-blank value among `headers`, then the Nth key when given.
    pub fn lookup(&self, headers: &[&str], position: Option<usize>) -> Option<&Value> {
        headers
            .iter()
            .filter_map(|h| self.get(h))
            .chain(position.and_then(|i| self.at(i)))
            .find(|v| is_present(v))
    }

    /// [`SheetRow::lookup`] as text, empty when nothing is present.
    pub fn text(&self, headers: &[&str], position: Option<usize>) -> String {
        self.lookup(headers, position).map(cell_text).unwrap_or_default()
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Renders a cell as text; whole floats print without a fraction.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses a query response body into rows.
///
/// The body may be wrapped in a callback; the JSON object between the first
/// `{` and the last `}` is used.
pub fn parse_gviz(body: &str) -> SyncResult<Vec<SheetRow>> {
    let (start, end) = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(SyncError::InvalidResponse(
                "sheet response contains no JSON object".into(),
            ))
        }
    };

    let response: Value = serde_json::from_str(&body[start..=end])
        .map_err(|e| SyncError::InvalidResponse(e.to_string()))?;

    if response.get("status").and_then(Value::as_str) == Some("error") {
        let reason = response
            .pointer("/errors/0/detailed_message")
            .or_else(|| response.pointer("/errors/0/message"))
            .and_then(Value::as_str)
            .unwrap_or("sheet query failed");
        return Err(SyncError::Remote(reason.to_string()));
    }

    let Some(rows) = response.pointer("/table/rows").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let headers: Vec<String> = response
        .pointer("/table/cols")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .enumerate()
                .map(|(idx, col)| column_header(col, idx))
                .collect()
        })
        .unwrap_or_default();

    Ok(rows.iter().map(|row| parse_row(row, &headers)).collect())
}

fn column_header(col: &Value, idx: usize) -> String {
    ["label", "id"]
        .iter()
        .filter_map(|key| col.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("col{}", idx))
}

fn parse_row(row: &Value, headers: &[String]) -> SheetRow {
    let mut parsed = SheetRow::new();
    let Some(cells) = row.get("c").and_then(Value::as_array) else {
        return parsed;
    };

    for (idx, cell) in cells.iter().enumerate() {
        let header = headers
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("col{}", idx));
        parsed.insert(header, cell_value(cell));
    }
    parsed
}

/// Formatted value first (keeps leading zeros), then raw, then blank.
/// Date cells come back as ISO dates regardless of their display format.
fn cell_value(cell: &Value) -> Value {
    if cell.is_null() {
        return Value::String(String::new());
    }

    let raw = cell.get("v").filter(|v| !v.is_null());
    if let Some(iso) = raw.and_then(Value::as_str).and_then(gviz_date) {
        return Value::String(iso);
    }

    match cell.get("f").filter(|f| !f.is_null()) {
        Some(f) if !cell_text(f).is_empty() => Value::String(cell_text(f)),
        _ => raw.cloned().unwrap_or_else(|| Value::String(String::new())),
    }
}

/// `Date(2026,0,14)` → `2026-01-14` (months are zero-based).
fn gviz_date(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix("Date(")?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u32>());
    let year = parts.next()?.ok()?;
    let month = parts.next()?.ok()?;
    let day = parts.next()?.ok()?;
    let date = chrono::NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month.checked_add(1)?, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Maps `Customers` rows. Rows without a name are dropped; rows without an
/// id get `CUST-<row number>`.
pub fn customers_from_rows(rows: &[SheetRow]) -> Vec<Customer> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let id = row.text(&["รหัสลูกค้า", "A", "col0"], Some(0));
            Customer {
                id: if id.is_empty() {
                    format!("CUST-{}", index + 1)
                } else {
                    id
                },
                name: row.text(&["ชื่อลูกค้า", "B", "col1"], Some(1)),
                address: row.text(&["ที่อยู่", "C", "col2"], Some(2)),
                tax_id: DigitString::new(row.text(&["เลขผู้เสียภาษี", "D", "col3"], Some(3))),
                phone: DigitString::new(row.text(&["เบอร์โทร", "E", "col4"], Some(4))),
                email: row.text(&["Email", "F", "col5"], Some(5)),
            }
        })
        .filter(|c| !c.name.trim().is_empty())
        .collect()
}

/// Maps `Invoices` rows. Rows without an invoice number are dropped.
///
/// Amounts accept thousands separators; `items` and `payment` may be JSON
/// text. Only the exact values `hq` and `branch` set the branch type.
pub fn invoices_from_rows(rows: &[SheetRow]) -> Vec<Invoice> {
    rows.iter()
        .filter_map(|row| {
            let invoice_number =
                row.text(&["เลขที่ใบกำกับ", "Invoice No", "A", "col0"], Some(0));
            if invoice_number.is_empty() {
                return None;
            }

            let amount = |headers: &[&str], position: usize| {
                row.lookup(headers, Some(position))
                    .map(parse_lenient_number)
                    .map(Money::from_baht_f64)
                    .unwrap_or_default()
            };
            let total = amount(&["รวมทั้งสิ้น", "Total", "H", "col7"], 7);

            let items = row
                .lookup(&["รายการ", "items", "I", "col8"], Some(8))
                .map(items_from_value)
                .unwrap_or_default();
            let payment = row
                .lookup(&["payment", "การชำระเงิน", "J", "col9"], Some(9))
                .map(payment_from_value)
                .unwrap_or_default();

            let branch_type = match row.text(&["branchType", "ประเภทสาขา"], None).as_str() {
                "branch" => BranchType::Branch,
                _ => BranchType::Hq,
            };
            let branch_number = match branch_type {
                BranchType::Branch => row.text(&["branchNumber", "เลขสาขา"], None),
                BranchType::Hq => String::new(),
            };

            Some(Invoice {
                invoice_number,
                date: row.text(&["วันที่", "Date", "B", "col1"], Some(1)),
                customer_name: row.text(&["ลูกค้า", "Customer", "C", "col2"], Some(2)),
                customer_address: row.text(&["ที่อยู่", "D", "col3"], Some(3)),
                customer_tax_id: DigitString::new(
                    row.text(&["เลขผู้เสียภาษี", "E", "col4"], Some(4)),
                ),
                subtotal: amount(&["ราคารวม", "F", "col5"], 5),
                vat: amount(&["VAT", "G", "col6"], 6),
                total,
                thai_text: amount_to_thai_words(total),
                items,
                payment,
                branch_type,
                branch_number,
                ..Default::default()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMERS_BODY: &str = r#"/*O_o*/
google.visualization.Query.setResponse({"version":"0.6","status":"ok","table":{
 "cols":[{"id":"A","label":"รหัสลูกค้า","type":"string"},
         {"id":"B","label":"ชื่อลูกค้า","type":"string"},
         {"id":"C","label":"ที่อยู่","type":"string"},
         {"id":"D","label":"เลขผู้เสียภาษี","type":"number"},
         {"id":"E","label":"","type":"string"},
         {"id":"F","label":"Email","type":"string"}],
 "rows":[
  {"c":[{"v":"CUST-1700000000000"},{"v":"บริษัท ทดสอบ จำกัด"},{"v":"กรุงเทพฯ"},
        {"v":105561234567,"f":"0105561234567"},{"v":"0812345678"},null]},
  {"c":[null,{"v":""},null,null,null,null]},
  {"c":[null,{"v":"ร้านป้าแดง"},null,null,null,{"v":"daeng@example.com"}]}
 ]}});"#;

    #[test]
    fn test_parse_gviz_prefers_formatted_value() {
        let rows = parse_gviz(CUSTOMERS_BODY).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("เลขผู้เสียภาษี"), Some(&Value::from("0105561234567")));
        // Blank label falls back to the column id.
        assert_eq!(rows[0].get("E"), Some(&Value::from("0812345678")));
        assert_eq!(rows[0].get("Email"), Some(&Value::from("")));
    }

    #[test]
    fn test_customers_from_rows() {
        let rows = parse_gviz(CUSTOMERS_BODY).unwrap();
        let customers = customers_from_rows(&rows);

        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].tax_id.as_str(), "0105561234567");
        assert_eq!(customers[0].phone.as_str(), "0812345678");
        assert_eq!(customers[1].id, "CUST-3");
        assert_eq!(customers[1].email, "daeng@example.com");
    }

    #[test]
    fn test_error_status() {
        let body = r#"{"status":"error","errors":[{"reason":"invalid_query","message":"Invalid query"}]}"#;
        match parse_gviz(body) {
            Err(SyncError::Remote(reason)) => assert_eq!(reason, "Invalid query"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_gviz("<html>Sign in</html>"),
            Err(SyncError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_missing_table_is_empty() {
        assert!(parse_gviz(r#"{"status":"ok"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_date_cells_become_iso() {
        let body = r#"{"status":"ok","table":{"cols":[{"id":"A","label":"วันที่"}],
            "rows":[{"c":[{"v":"Date(2026,0,14)","f":"14/1/2026"}]}]}}"#;
        let rows = parse_gviz(body).unwrap();
        assert_eq!(rows[0].get("วันที่"), Some(&Value::from("2026-01-14")));
    }

    #[test]
    fn test_out_of_range_date_cell_keeps_formatted_text() {
        let body = r#"{"status":"ok","table":{"cols":[{"id":"A","label":"วันที่"}],
            "rows":[{"c":[{"v":"Date(2026,4294967295,1)","f":"??"}]},
                    {"c":[{"v":"Date(2026,12,1)"}]}]}}"#;
        let rows = parse_gviz(body).unwrap();
        assert_eq!(rows[0].get("วันที่"), Some(&Value::from("??")));
        assert_eq!(rows[1].get("วันที่"), Some(&Value::from("Date(2026,12,1)")));
    }

    #[test]
    fn test_invoices_from_rows() {
        let rows = vec![
            SheetRow::new()
                .with("เลขที่ใบกำกับ", "2601140001")
                .with("วันที่", "2026-01-14")
                .with("ลูกค้า", "บริษัท ทดสอบ จำกัด")
                .with("ที่อยู่", "")
                .with("เลขผู้เสียภาษี", "0105561234567")
                .with("ราคารวม", "1,000.00")
                .with("VAT", 70)
                .with("รวมทั้งสิ้น", "1,070.00")
                .with("รายการ", r#"[{"description":"ค่าอาหาร","quantity":1,"price":1070}]"#)
                .with("payment", "not json")
                .with("branchType", "branch")
                .with("branchNumber", "00002"),
            SheetRow::new()
                .with("เลขที่ใบกำกับ", "")
                .with("วันที่", "2026-01-14"),
        ];

        let invoices = invoices_from_rows(&rows);
        assert_eq!(invoices.len(), 1);

        let invoice = &invoices[0];
        assert_eq!(invoice.subtotal, Money::from_baht(1000));
        assert_eq!(invoice.vat, Money::from_baht(70));
        assert_eq!(invoice.total, Money::from_baht(1070));
        assert_eq!(invoice.items.len(), 1);
        assert!(!invoice.payment.has_method());
        assert_eq!(invoice.branch_type, BranchType::Branch);
        assert_eq!(invoice.branch_number, "00002");
        assert_eq!(invoice.thai_text, "หนึ่งพันเจ็ดสิบบาทถ้วน");
    }

    #[test]
    fn test_unknown_branch_type_is_head_office() {
        let rows = vec![SheetRow::new()
            .with("เลขที่ใบกำกับ", "2601140002")
            .with("branchType", "Branch")
            .with("branchNumber", "00003")];
        let invoice = &invoices_from_rows(&rows)[0];
        assert_eq!(invoice.branch_type, BranchType::Hq);
        assert!(invoice.branch_number.is_empty());
    }

    #[test]
    fn test_positional_fallback() {
        // Headers nobody recognises: fields come from key order.
        let rows = vec![SheetRow::new()
            .with("x0", "2601140003")
            .with("x1", "2026-01-14")
            .with("x2", "ลูกค้าทั่วไป")];
        let invoice = &invoices_from_rows(&rows)[0];
        assert_eq!(invoice.invoice_number, "2601140003");
        assert_eq!(invoice.customer_name, "ลูกค้าทั่วไป");
    }
}
