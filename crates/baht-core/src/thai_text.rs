//! # Thai Baht Text
//!
//! Spells out amounts in Thai for the "amount in words" line of a tax invoice.
//!
//! ## Reading Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Place values within a group:  แสน หมื่น พัน ร้อย สิบ (units)           │
//! │                                                                         │
//! │  • zero digits are silent                                               │
//! │  • tens digit 1  → สิบ        (not หนึ่งสิบ)                             │
//! │  • tens digit 2  → ยี่สิบ      (not สองสิบ)                              │
//! │  • units digit 1 → เอ็ด when anything precedes it (11, 101, 1,000,001) │
//! │  • every 6 digits from the right are joined with ล้าน                  │
//! │                                                                         │
//! │  12,345,678.50 → สิบสองล้านสามแสนสี่หมื่นห้าพันหกร้อยเจ็ดสิบแปด         │
//! │                  บาทห้าสิบสตางค์                                        │
//! │  21.00         → ยี่สิบเอ็ดบาทถ้วน                                       │
//! │  0.00          → ศูนย์บาทถ้วน                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::Money;

const DIGITS: [&str; 10] = [
    "", "หนึ่ง", "สอง", "สาม", "สี่", "ห้า", "หก", "เจ็ด", "แปด", "เก้า",
];
const PLACES: [&str; 6] = ["", "สิบ", "ร้อย", "พัน", "หมื่น", "แสน"];

const ZERO: &str = "ศูนย์";
const MILLION: &str = "ล้าน";
const BAHT: &str = "บาท";
const SATANG: &str = "สตางค์";
const EVEN: &str = "ถ้วน";

/// Converts a non-negative integer to Thai number words.
///
/// ## Example
/// ```rust
/// use baht_core::thai_text::number_to_thai_words;
///
/// assert_eq!(number_to_thai_words(21), "ยี่สิบเอ็ด");
/// assert_eq!(number_to_thai_words(0), "ศูนย์");
/// ```
pub fn number_to_thai_words(number: u64) -> String {
    if number == 0 {
        return ZERO.to_string();
    }
    let mut out = String::new();
    push_words(number, false, &mut out);
    out
}

/// Appends the reading of `number` (> 0). `has_prefix` tells the lowest group
/// that higher digits were already read, which turns a lone units 1 into เอ็ด.
fn push_words(number: u64, has_prefix: bool, out: &mut String) {
    let millions = number / 1_000_000;
    let group = number % 1_000_000;

    if millions > 0 {
        push_words(millions, has_prefix, out);
        out.push_str(MILLION);
    }
    push_group(group, has_prefix || millions > 0, out);
}

/// Reads one group of up to six digits.
fn push_group(group: u64, has_prefix: bool, out: &mut String) {
    if group == 0 {
        return;
    }
    let digits: Vec<usize> = group
        .to_string()
        .bytes()
        .map(|b| (b - b'0') as usize)
        .collect();

    let len = digits.len();
    for (i, &digit) in digits.iter().enumerate() {
        let place = len - i - 1;
        if digit == 0 {
            continue;
        }
        match (place, digit) {
            (1, 1) => out.push_str("สิบ"),
            (1, 2) => out.push_str("ยี่สิบ"),
            (0, 1) if i > 0 || has_prefix => out.push_str("เอ็ด"),
            _ => {
                out.push_str(DIGITS[digit]);
                out.push_str(PLACES[place]);
            }
        }
    }
}

/// Converts an amount to Thai currency words, baht then satang.
///
/// Negative amounts are read by magnitude; a tax invoice never prints a
/// negative total.
///
/// ## Example
/// ```rust
/// use baht_core::money::Money;
/// use baht_core::thai_text::amount_to_thai_words;
///
/// assert_eq!(amount_to_thai_words(Money::from_baht(107)), "หนึ่งร้อยเจ็ดบาทถ้วน");
/// assert_eq!(amount_to_thai_words(Money::from_satang(25)), "ยี่สิบห้าสตางค์");
/// ```
pub fn amount_to_thai_words(amount: Money) -> String {
    let amount = amount.abs();
    let baht = amount.baht() as u64;
    let satang = amount.satang_part() as u64;

    if baht == 0 && satang == 0 {
        return format!("{ZERO}{BAHT}{EVEN}");
    }

    let mut out = String::new();
    if baht > 0 {
        out.push_str(&number_to_thai_words(baht));
        out.push_str(BAHT);
    }
    if satang > 0 {
        out.push_str(&number_to_thai_words(satang));
        out.push_str(SATANG);
    } else {
        out.push_str(EVEN);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
