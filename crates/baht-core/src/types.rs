//! # Domain Types
//!
//! Core domain types for Baht Invoice.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │     Invoice     │   │  InvoiceItem    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (CUST-…)    │   │  invoice_number │◄──│  description    │       │
//! │  │  name           │   │  date           │   │  quantity       │       │
//! │  │  tax_id ◄───────┼───│  customer_*     │   │  price (incl.)  │       │
//! │  │  phone          │   │  subtotal/vat   │   └─────────────────┘       │
//! │  └─────────────────┘   │  total, status  │                              │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    VatRate      │   │  InvoiceStatus  │   │   DigitString   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Active         │   │  "0105…" kept   │       │
//! │  │  700 = 7%       │   │  Cancelled      │   │  as opaque text │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Identity
//! An invoice copies the customer's fields at issue time. It never refers to
//! the customer row, so later customer edits do not rewrite tax documents.
//!
//! ## Wire Format
//! Every type serializes in `camelCase` because the same JSON shape goes to
//! the spreadsheet endpoint and into the local JSON columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::money::{self, calculate_totals, InvoiceTotals, Money};
use crate::thai_text::amount_to_thai_words;

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 700 bps = 7% (Thai standard VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VatRate(u32);

impl VatRate {
    /// The standard Thai VAT rate (7%).
    pub const THAI_STANDARD: VatRate = VatRate(700);

    /// Creates a VAT rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        VatRate(bps)
    }

    /// Creates a VAT rate from a percentage (e.g. `7.0`).
    ///
    /// Negative or non-finite input clamps to zero.
    pub fn from_percent(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return VatRate(0);
        }
        VatRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display and settings only).
    #[inline]
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate::THAI_STANDARD
    }
}

/// Settings store the rate as a plain percentage number (`"vatRate": 7`).
impl Serialize for VatRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.percent())
    }
}

impl<'de> Deserialize<'de> for VatRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pct = money::lenient_f64(deserializer)?;
        Ok(VatRate::from_percent(pct))
    }
}

// =============================================================================
// Opaque Numeric Strings
// =============================================================================

/// Digits that must stay text: tax IDs and phone numbers.
///
/// ## The Leading-Zero Problem
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Tax ID "0105561234567"                                                 │
/// │                                                                         │
/// │  Coerced to a number  ──► 105561234567      ❌ invalid on a tax invoice │
/// │                                                                         │
/// │  Kept as DigitString  ──► per-transport rules:                          │
/// │    spreadsheet cell   ──► "'0105561234567"  (text-format marker)        │
/// │    CSV export         ──► ="0105561234567"  (formula escape)            │
/// │    JSON               ──► "0105561234567"   (always a string)           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Deserialization accepts both strings and numbers so rows that were
/// already coerced upstream still load, and strips the spreadsheet
/// leading-quote marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DigitString(String);

impl DigitString {
    /// Creates a digit string, trimming whitespace and any leading `'` marker.
    pub fn new(value: impl AsRef<str>) -> Self {
        let trimmed = value.as_ref().trim();
        let stripped = trimmed.strip_prefix('\'').unwrap_or(trimmed);
        DigitString(stripped.trim().to_string())
    }

    /// Returns the raw text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if no digits were supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Spreadsheet cell form: a leading `'` forces text format.
    pub fn to_sheet_cell(&self) -> String {
        if self.0.is_empty() {
            String::new()
        } else {
            format!("'{}", self.0)
        }
    }

    /// CSV form: `="…"` keeps spreadsheet applications from parsing a number.
    pub fn to_csv_formula(&self) -> String {
        if self.0.is_empty() {
            String::new()
        } else {
            format!("=\"{}\"", self.0)
        }
    }
}

impl fmt::Display for DigitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DigitString {
    fn from(value: &str) -> Self {
        DigitString::new(value)
    }
}

impl From<String> for DigitString {
    fn from(value: String) -> Self {
        DigitString::new(value)
    }
}

impl Serialize for DigitString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DigitString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(s) => DigitString::new(s),
            serde_json::Value::Number(n) => DigitString::new(n.to_string()),
            serde_json::Value::Null => DigitString::default(),
            other => DigitString::new(other.to_string()),
        })
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Invoice lifecycle status.
///
/// Cancellation is reversible; only an explicit purge removes rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Issued and counted in sales totals.
    #[default]
    Active,
    /// Voided by the operator; kept for the audit trail.
    Cancelled,
}

impl InvoiceStatus {
    /// Thai label used in exports (`ปกติ` / `ยกเลิก`).
    pub fn label_th(&self) -> &'static str {
        match self {
            InvoiceStatus::Active => "ปกติ",
            InvoiceStatus::Cancelled => "ยกเลิก",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Active => write!(f, "active"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Head office or numbered branch, printed under the buyer's tax ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum BranchType {
    /// สำนักงานใหญ่
    #[default]
    Hq,
    /// สาขา (with a branch number)
    Branch,
}

impl BranchType {
    /// Parses remote cell text; anything other than `branch` is head office.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim() {
            "branch" => BranchType::Branch,
            _ => BranchType::Hq,
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchType::Hq => write!(f, "hq"),
            BranchType::Branch => write!(f, "branch"),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A buyer that can be picked when composing an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Stable identifier (`CUST-<millis>` or supplied by the remote sheet).
    #[serde(default, deserialize_with = "money::lenient_string")]
    pub id: String,

    /// Display name, required for persistence.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub address: String,

    /// Fiscal identity; preferred match key for upserts.
    #[serde(default)]
    pub tax_id: DigitString,

    #[serde(default)]
    pub phone: DigitString,

    #[serde(default)]
    pub email: String,
}

impl Customer {
    /// Generates a new customer ID from a timestamp.
    pub fn generate_id(now: DateTime<Utc>) -> String {
        format!("CUST-{}", now.timestamp_millis())
    }

    /// Search match: case-insensitive substring on name and id, plain
    /// substring on the tax ID. A blank query matches nothing.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.name.to_lowercase().contains(&needle)
            || self.id.to_lowercase().contains(&needle)
            || self.tax_id.as_str().contains(query)
    }
}

// =============================================================================
// Invoice Items & Payment
// =============================================================================

/// One line on an invoice. `price` is VAT-inclusive.
///
/// Quantity and price arrive from free-text inputs and remote JSON, so both
/// deserialize leniently: numeric strings parse, anything else becomes 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    #[serde(default, deserialize_with = "money::lenient_string")]
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "money::lenient_f64")]
    pub quantity: f64,

    #[serde(default, deserialize_with = "money::lenient_f64")]
    pub price: f64,
}

impl InvoiceItem {
    /// Creates a line item.
    pub fn new(description: impl Into<String>, quantity: f64, price: f64) -> Self {
        InvoiceItem {
            id: String::new(),
            description: description.into(),
            quantity,
            price,
        }
    }

    /// `quantity * price` in baht, unrounded. Non-finite input counts as 0.
    pub fn gross_amount(&self) -> f64 {
        let qty = if self.quantity.is_finite() { self.quantity } else { 0.0 };
        let price = if self.price.is_finite() { self.price } else { 0.0 };
        qty * price
    }

    /// True when the line has a description worth saving.
    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }
}

/// How the buyer settled the invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    #[serde(default)]
    pub cash: bool,

    #[serde(default, with = "money::as_baht")]
    pub cash_amount: Money,

    #[serde(default)]
    pub transfer: bool,

    #[serde(default, with = "money::as_baht")]
    pub transfer_amount: Money,
}

impl PaymentInfo {
    /// True if at least one payment method is ticked.
    pub fn has_method(&self) -> bool {
        self.cash || self.transfer
    }

    /// Sum of the amounts for the ticked methods.
    pub fn paid(&self) -> Money {
        let mut paid = Money::zero();
        if self.cash {
            paid += self.cash_amount;
        }
        if self.transfer {
            paid += self.transfer_amount;
        }
        paid
    }
}

/// Decodes line items from an array or a JSON string. Malformed input yields
/// no items.
pub fn items_from_value(value: &serde_json::Value) -> Vec<InvoiceItem> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => {
            serde_json::from_str(s).unwrap_or_default()
        }
        serde_json::Value::Array(_) => serde_json::from_value(value.clone()).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Decodes payment info from an object or a JSON string. Malformed input
/// yields the empty default.
pub fn payment_from_value(value: &serde_json::Value) -> PaymentInfo {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => {
            serde_json::from_str(s).unwrap_or_default()
        }
        serde_json::Value::Object(_) => serde_json::from_value(value.clone()).unwrap_or_default(),
        _ => PaymentInfo::default(),
    }
}

fn lenient_items<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<InvoiceItem>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(items_from_value(&value))
}

fn lenient_payment<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PaymentInfo, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(payment_from_value(&value))
}

// =============================================================================
// Invoice
// =============================================================================

/// A tax invoice: header, customer snapshot, lines, and derived totals.
///
/// ## Invariants
/// - `subtotal`, `vat`, `total` equal [`calculate_totals`] over `items`
///   (call [`Invoice::recompute`] after editing lines)
/// - `thai_text` spells out `total`
/// - `invoice_number` is not unique at the storage layer; the numbering
///   authority is responsible for issuing fresh numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(deserialize_with = "money::lenient_string")]
    pub invoice_number: String,

    /// ISO calendar date `YYYY-MM-DD`, kept as text for lexical range filters.
    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub customer_name: String,

    #[serde(default)]
    pub customer_address: String,

    #[serde(default)]
    pub customer_tax_id: DigitString,

    #[serde(default)]
    pub customer_phone: DigitString,

    #[serde(default)]
    pub customer_email: String,

    #[serde(default)]
    pub branch_type: BranchType,

    #[serde(default)]
    pub branch_number: String,

    /// Accepts an array or a JSON-encoded string (the remote RPC form).
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<InvoiceItem>,

    #[serde(default, with = "money::as_baht")]
    pub subtotal: Money,

    #[serde(default, with = "money::as_baht")]
    pub vat: Money,

    #[serde(default, with = "money::as_baht")]
    pub total: Money,

    #[serde(default, deserialize_with = "lenient_payment")]
    pub payment: PaymentInfo,

    #[serde(default)]
    pub thai_text: String,

    #[serde(default)]
    pub status: InvoiceStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Recomputes `subtotal`, `vat`, `total` and `thai_text` from the items.
    pub fn recompute(&mut self, rate: VatRate) -> InvoiceTotals {
        let totals = calculate_totals(&self.items, rate);
        self.subtotal = totals.subtotal;
        self.vat = totals.vat;
        self.total = totals.total;
        self.thai_text = amount_to_thai_words(totals.total);
        totals
    }

    /// Drops lines without a description.
    pub fn retain_described_items(&mut self) {
        self.items.retain(InvoiceItem::has_description);
    }

    /// Returns true if the invoice has been voided.
    pub fn is_cancelled(&self) -> bool {
        self.status == InvoiceStatus::Cancelled
    }

    /// Builds the customer record implied by this invoice's snapshot.
    pub fn customer_snapshot(&self) -> Customer {
        Customer {
            id: String::new(),
            name: self.customer_name.trim().to_string(),
            address: self.customer_address.clone(),
            tax_id: self.customer_tax_id.clone(),
            phone: self.customer_phone.clone(),
            email: self.customer_email.clone(),
        }
    }
}

// =============================================================================
// Settings & Company Profile
// =============================================================================

/// Operator-editable settings persisted under the `settings` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSettings {
    /// Document prefix shown by the display layer (numbers themselves are `YYMMDDNNNN`).
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,

    #[serde(default = "default_number_padding")]
    pub invoice_number_padding: u32,

    /// Default description offered for a new line item.
    #[serde(default = "default_category")]
    pub default_category: String,

    #[serde(default)]
    pub vat_rate: VatRate,

    /// Bulk-read spreadsheet URL.
    #[serde(default)]
    pub sheets_url: Option<String>,

    /// RPC endpoint URL.
    #[serde(default)]
    pub script_url: Option<String>,
}

fn default_invoice_prefix() -> String {
    "INV-WDD".to_string()
}

fn default_number_padding() -> u32 {
    crate::numbering::RUNNING_NUMBER_WIDTH as u32
}

fn default_category() -> String {
    "ค่าอาหารและเครื่องดื่ม".to_string()
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        InvoiceSettings {
            invoice_prefix: default_invoice_prefix(),
            invoice_number_padding: default_number_padding(),
            default_category: default_category(),
            vat_rate: VatRate::default(),
            sheets_url: None,
            script_url: None,
        }
    }
}

/// The seller printed in the invoice header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub tax_id: DigitString,

    #[serde(default)]
    pub phone: DigitString,

    #[serde(default)]
    pub branch_type: BranchType,

    #[serde(default)]
    pub branch_number: String,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_string_keeps_leading_zero() {
        let tax_id: DigitString = serde_json::from_str("\"0105561234567\"").unwrap();
        assert_eq!(tax_id.as_str(), "0105561234567");
        assert_eq!(serde_json::to_string(&tax_id).unwrap(), "\"0105561234567\"");
    }

    #[test]
    fn test_digit_string_strips_sheet_marker() {
        let phone = DigitString::new("'0812345678");
        assert_eq!(phone.as_str(), "0812345678");
        assert_eq!(phone.to_sheet_cell(), "'0812345678");
        assert_eq!(phone.to_csv_formula(), "=\"0812345678\"");
    }

    #[test]
    fn test_digit_string_accepts_numbers() {
        let value: DigitString = serde_json::from_str("812345678").unwrap();
        assert_eq!(value.as_str(), "812345678");
        assert_eq!(DigitString::default().to_csv_formula(), "");
    }

    #[test]
    fn test_vat_rate_percent_round_trip() {
        let rate: VatRate = serde_json::from_str("7").unwrap();
        assert_eq!(rate, VatRate::THAI_STANDARD);
        assert_eq!(VatRate::from_percent(-1.0).bps(), 0);
        assert_eq!(serde_json::to_string(&rate).unwrap(), "7.0");
    }

    #[test]
    fn test_item_lenient_numbers() {
        let item: InvoiceItem =
            serde_json::from_str(r#"{"id":17,"description":"ข้าว","quantity":"2","price":"abc"}"#)
                .unwrap();
        assert_eq!(item.id, "17");
        assert_eq!(item.quantity, 2.0);
        assert_eq!(item.price, 0.0);
        assert_eq!(item.gross_amount(), 0.0);
    }

    #[test]
    fn test_branch_type_lenient() {
        assert_eq!(BranchType::parse_lenient("branch"), BranchType::Branch);
        assert_eq!(BranchType::parse_lenient("สาขา"), BranchType::Hq);
        assert_eq!(BranchType::parse_lenient(""), BranchType::Hq);
    }

    #[test]
    fn test_invoice_recompute_sets_text() {
        let mut invoice = Invoice {
            invoice_number: "2601140001".into(),
            items: vec![InvoiceItem::new("ค่าอาหาร", 1.0, 107.0)],
            ..Default::default()
        };
        invoice.recompute(VatRate::THAI_STANDARD);
        assert_eq!(invoice.total, Money::from_baht(107));
        assert_eq!(invoice.vat, Money::from_baht(7));
        assert_eq!(invoice.subtotal, Money::from_baht(100));
        assert_eq!(invoice.thai_text, "หนึ่งร้อยเจ็ดบาทถ้วน");
    }

    #[test]
    fn test_invoice_wire_format_uses_baht_numbers() {
        let invoice = Invoice {
            invoice_number: "2601140001".into(),
            total: Money::from_satang(10750),
            ..Default::default()
        };
        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["invoiceNumber"], "2601140001");
        assert_eq!(json["total"], 107.5);
        assert_eq!(json["status"], "active");
        assert!(json.get("cancelledAt").is_none());
    }

    #[test]
    fn test_invoice_items_accept_json_string() {
        let invoice: Invoice = serde_json::from_str(
            r#"{"invoiceNumber":"2601140001","items":"[{\"description\":\"ข้าว\",\"quantity\":1,\"price\":50}]","payment":"oops"}"#,
        )
        .unwrap();
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].description, "ข้าว");
        assert_eq!(invoice.payment, PaymentInfo::default());
    }

    #[test]
    fn test_settings_defaults_from_empty_object() {
        let settings: InvoiceSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, InvoiceSettings::default());
        assert_eq!(settings.invoice_number_padding, 4);
    }

    #[test]
    fn test_customer_query_match() {
        let customer = Customer {
            id: "CUST-Abc".into(),
            name: "Siam Trading".into(),
            tax_id: DigitString::new("0105561234567"),
            ..Default::default()
        };
        assert!(customer.matches_query("siam"));
        assert!(customer.matches_query("  TRADING "));
        assert!(customer.matches_query("cust-abc"));
        assert!(customer.matches_query("5561234"));
        assert!(!customer.matches_query("ร้าน"));
        assert!(!customer.matches_query("   "));
    }
}
