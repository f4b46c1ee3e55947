//! # Money Module
//!
//! Provides the `Money` type and the VAT-inclusive totals calculation.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Satang                                           │
//! │    ฿107.00 = 10700 satang                                               │
//! │    Quantities and prices are multiplied once in f64, then rounded at   │
//! │    the satang boundary. Everything downstream is integer math.         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## VAT-Inclusive Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices already contain VAT. Tax is EXTRACTED, never added.            │
//! │                                                                         │
//! │  gross    = Σ quantity × price                  (unrounded)            │
//! │  vat      = gross × rate / (100 + rate)         (unrounded)            │
//! │                                                                         │
//! │  total    = round(gross)        ─┐                                     │
//! │  vat      = round(vat)          ─┼─ each rounded half away from zero  │
//! │  subtotal = total − vat          ┘  in satang, so subtotal + vat is    │
//! │                                     exactly total                      │
//! │                                                                         │
//! │  Example: 1 × ฿107.00 @ 7%  →  subtotal 100.00, vat 7.00, total 107.00 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::types::{InvoiceItem, VatRate};

/// Satang per baht.
pub const SATANG_PER_BAHT: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in satang (1/100 baht).
///
/// Serializes as an integer satang count. Records that travel to the
/// spreadsheet use [`as_baht`] on their fields instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from satang.
    #[inline]
    pub const fn from_satang(satang: i64) -> Self {
        Money(satang)
    }

    /// Creates a Money value from whole baht.
    #[inline]
    pub const fn from_baht(baht: i64) -> Self {
        Money(baht * SATANG_PER_BAHT)
    }

    /// Rounds a baht amount to the nearest satang, half away from zero.
    ///
    /// Non-finite input yields zero.
    ///
    /// ## Example
    /// ```rust
    /// use baht_core::money::Money;
    ///
    /// assert_eq!(Money::from_baht_f64(12.3456).satang(), 1235);
    /// assert_eq!(Money::from_baht_f64(f64::NAN), Money::zero());
    /// ```
    pub fn from_baht_f64(baht: f64) -> Self {
        if !baht.is_finite() {
            return Money::zero();
        }
        Money((baht * SATANG_PER_BAHT as f64).round() as i64)
    }

    /// Returns the value in satang.
    #[inline]
    pub const fn satang(&self) -> i64 {
        self.0
    }

    /// Returns the whole-baht portion (truncated toward zero).
    #[inline]
    pub const fn baht(&self) -> i64 {
        self.0 / SATANG_PER_BAHT
    }

    /// Returns the satang portion (always 0-99).
    #[inline]
    pub const fn satang_part(&self) -> i64 {
        (self.0 % SATANG_PER_BAHT).abs()
    }

    /// Returns the value as fractional baht (for the wire format only).
    #[inline]
    pub fn to_baht_f64(&self) -> f64 {
        self.0 as f64 / SATANG_PER_BAHT as f64
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }
}

/// Displays with Thai grouping and two decimals: `1,234.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_currency(*self))
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Currency Formatting
// =============================================================================

/// Formats an amount the way th-TH locale prints currency: `1,234,567.89`.
///
/// ## Example
/// ```rust
/// use baht_core::money::{format_currency, Money};
///
/// assert_eq!(format_currency(Money::from_satang(123456789)), "1,234,567.89");
/// assert_eq!(format_currency(Money::from_satang(-550)), "-5.50");
/// ```
pub fn format_currency(amount: Money) -> String {
    let whole = amount.baht().unsigned_abs().to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!(
        "{}{}.{:02}",
        if amount.is_negative() { "-" } else { "" },
        grouped,
        amount.satang_part()
    )
}

// =============================================================================
// VAT-Inclusive Totals
// =============================================================================

/// Derived amounts for a set of invoice lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Amount before VAT.
    pub subtotal: Money,
    /// VAT extracted from the inclusive prices.
    pub vat: Money,
    /// Amount payable (sum of inclusive line amounts).
    pub total: Money,
}

/// Computes subtotal, VAT and total for VAT-inclusive line items.
///
/// Never fails: empty input and non-numeric quantities or prices yield zeros.
///
/// ## Example
/// ```rust
/// use baht_core::money::{calculate_totals, Money};
/// use baht_core::types::{InvoiceItem, VatRate};
///
/// let items = vec![InvoiceItem::new("ค่าอาหาร", 1.0, 107.0)];
/// let totals = calculate_totals(&items, VatRate::THAI_STANDARD);
///
/// assert_eq!(totals.subtotal, Money::from_baht(100));
/// assert_eq!(totals.vat, Money::from_baht(7));
/// assert_eq!(totals.total, Money::from_baht(107));
/// ```
pub fn calculate_totals<'a, I>(items: I, rate: VatRate) -> InvoiceTotals
where
    I: IntoIterator<Item = &'a InvoiceItem>,
{
    let gross: f64 = items.into_iter().map(InvoiceItem::gross_amount).sum();
    let bps = rate.bps() as f64;
    let vat_exact = gross * bps / (10_000.0 + bps);

    let total = Money::from_baht_f64(gross);
    let vat = Money::from_baht_f64(vat_exact);

    InvoiceTotals {
        subtotal: total - vat,
        vat,
        total,
    }
}

/// Amount of a single line before VAT (the preview's "amount" column).
pub fn line_amount_before_vat(item: &InvoiceItem, rate: VatRate) -> Money {
    let bps = rate.bps() as f64;
    Money::from_baht_f64(item.gross_amount() * 10_000.0 / (10_000.0 + bps))
}

// =============================================================================
// Lenient Deserializers
// =============================================================================
// Spreadsheet rows and hand-typed inputs mix numbers, numeric strings with
// thousands separators, and blanks. These helpers accept all of them.

/// Parses a number from JSON number, numeric string (commas allowed), or blank.
/// Anything unparseable becomes `0.0`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_lenient_number(&value))
}

/// Parses a JSON value as a number, stripping thousands separators.
pub fn parse_lenient_number(value: &serde_json::Value) -> f64 {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Accepts a string or a number and yields its text form.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Serde adapter that writes `Money` as a baht number (`107.5`) and reads it
/// back leniently. Used by records that the spreadsheet stores in baht.
pub mod as_baht {
    use super::{lenient_f64, Money};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(amount.to_baht_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        lenient_f64(deserializer).map(Money::from_baht_f64)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(quantity: f64, price: f64) -> InvoiceItem {
        InvoiceItem::new("line", quantity, price)
    }

    #[test]
    fn test_single_item_at_standard_rate() {
        let totals = calculate_totals(&[item(1.0, 107.0)], VatRate::THAI_STANDARD);
        assert_eq!(totals.subtotal.satang(), 10000);
        assert_eq!(totals.vat.satang(), 700);
        assert_eq!(totals.total.satang(), 10700);
    }

    #[test]
    fn test_empty_items_are_zero() {
        let totals = calculate_totals(&[], VatRate::THAI_STANDARD);
        assert_eq!(totals, InvoiceTotals::default());
    }

    #[test]
    fn test_non_finite_values_count_as_zero() {
        let totals = calculate_totals(
            &[item(f64::NAN, 10.0), item(2.0, 53.5)],
            VatRate::THAI_STANDARD,
        );
        assert_eq!(totals.total.satang(), 10700);
    }

    #[test]
    fn test_rounding_at_satang_boundary() {
        // 100 × 7 / 107 = 6.5420… → 6.54
        let totals = calculate_totals(&[item(1.0, 100.0)], VatRate::THAI_STANDARD);
        assert_eq!(totals.vat.satang(), 654);
        assert_eq!(totals.subtotal.satang(), 9346);
        assert_eq!(totals.total.satang(), 10000);
    }

    #[test]
    fn test_fractional_quantities() {
        let totals = calculate_totals(&[item(1.5, 35.0), item(3.0, 19.99)], VatRate::THAI_STANDARD);
        // 52.50 + 59.97 = 112.47; vat = 7.3578… → 7.36
        assert_eq!(totals.total.satang(), 11247);
        assert_eq!(totals.vat.satang(), 736);
        assert_eq!(totals.subtotal.satang(), 10511);
    }

    #[test]
    fn test_zero_rate() {
        let totals = calculate_totals(&[item(2.0, 50.0)], VatRate::from_bps(0));
        assert_eq!(totals.vat, Money::zero());
        assert_eq!(totals.subtotal, totals.total);
    }

    #[test]
    fn test_line_amount_before_vat() {
        let amount = line_amount_before_vat(&item(2.0, 53.5), VatRate::THAI_STANDARD);
        assert_eq!(amount, Money::from_baht(100));
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Money::zero()), "0.00");
        assert_eq!(format_currency(Money::from_satang(5)), "0.05");
        assert_eq!(format_currency(Money::from_satang(99999)), "999.99");
        assert_eq!(format_currency(Money::from_satang(100000)), "1,000.00");
        assert_eq!(format_currency(Money::from_satang(123456789)), "1,234,567.89");
        assert_eq!(format_currency(Money::from_satang(-123450)), "-1,234.50");
        assert_eq!(Money::from_baht(107).to_string(), "107.00");
    }

    #[test]
    fn test_from_baht_f64_half_away_from_zero() {
        assert_eq!(Money::from_baht_f64(0.125).satang(), 13);
        assert_eq!(Money::from_baht_f64(-0.125).satang(), -13);
        assert_eq!(Money::from_baht_f64(f64::INFINITY), Money::zero());
    }

    #[test]
    fn test_as_baht_reads_strings_with_commas() {
        #[derive(serde::Deserialize)]
        struct Row {
            #[serde(with = "as_baht")]
            total: Money,
        }
        let row: Row = serde_json::from_str(r#"{"total":"1,070.50"}"#).unwrap();
        assert_eq!(row.total.satang(), 107050);
        let row: Row = serde_json::from_str(r#"{"total":""}"#).unwrap();
        assert_eq!(row.total, Money::zero());
    }

    #[test]
    fn test_money_sum() {
        let amounts = [Money::from_baht(1), Money::from_satang(50)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.satang(), 150);
    }

    proptest! {
        #[test]
        fn prop_subtotal_plus_vat_is_total(
            lines in proptest::collection::vec((0u32..1_000, 0u32..10_000_000), 0..20),
            rate_bps in 0u32..3_000,
        ) {
            let items: Vec<InvoiceItem> = lines
                .iter()
                .map(|(qty, price)| item(*qty as f64, *price as f64 / 100.0))
                .collect();
            let totals = calculate_totals(&items, VatRate::from_bps(rate_bps));

            let diff = (totals.subtotal + totals.vat - totals.total).satang().abs();
            prop_assert!(diff <= 1);
            prop_assert!(!totals.vat.is_negative());
            prop_assert!(totals.vat <= totals.total);
        }
    }
}
