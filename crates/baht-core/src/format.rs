//! Thai calendar date formatting for printed invoices.
//!
//! Dates print with Thai month names and the Buddhist-era year
//! (Gregorian + 543).

use chrono::{Datelike, NaiveDate};

use crate::error::{CoreError, CoreResult};

/// Offset from the Gregorian year to the Buddhist era.
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

const THAI_MONTHS: [&str; 12] = [
    "มกราคม",
    "กุมภาพันธ์",
    "มีนาคม",
    "เมษายน",
    "พฤษภาคม",
    "มิถุนายน",
    "กรกฎาคม",
    "สิงหาคม",
    "กันยายน",
    "ตุลาคม",
    "พฤศจิกายน",
    "ธันวาคม",
];

/// `2026-01-14` → `"14 มกราคม 2569"`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use baht_core::format::format_thai_date;
///
/// let date = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
/// assert_eq!(format_thai_date(date), "14 มกราคม 2569");
/// ```
pub fn format_thai_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        THAI_MONTHS[date.month0() as usize],
        date.year() + BUDDHIST_ERA_OFFSET
    )
}

/// `2026-01-14` → `"14/01/2569"`.
pub fn format_thai_date_short(date: NaiveDate) -> String {
    format!(
        "{:02}/{:02}/{}",
        date.day(),
        date.month(),
        date.year() + BUDDHIST_ERA_OFFSET
    )
}

/// Parses a stored `YYYY-MM-DD` date string.
pub fn parse_iso_date(value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidDate(value.to_string()))
}

/// Formats a stored date string for display, falling back to the raw text
/// when it is not ISO.
pub fn display_invoice_date(value: &str) -> String {
    parse_iso_date(value)
        .map(format_thai_date)
        .unwrap_or_else(|_| value.to_string())
}
