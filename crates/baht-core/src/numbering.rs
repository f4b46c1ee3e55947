//! # Invoice Numbering
//!
//! Daily running numbers of the form `YYMMDDNNNN`.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌────────────────────────┐   any request with    ┌─────────────────┐ │
//! │   │ no counter for today   │ ─── last_date≠today ─►│ counter active  │ │
//! │   │ (last_date ≠ today)    │   counter := 1        │ last_date=today │ │
//! │   └────────────────────────┘                       └───────┬─────────┘ │
//! │                                                            │           │
//! │        preview_next()  →  today + pad4(counter)   (no mutation)        │
//! │        reserve_next()  →  today + pad4(counter),  counter += 1         │
//! │        reset(n ≥ 1)    →  counter := n,  last_date := today            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Gaps are tolerated (a reserved number may never be saved); duplicates are
//! not. The counter only goes backwards through [`InvoiceCounter::reset`].
//!
//! "Today" is always passed in by the caller, so this module never reads the
//! clock.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Width of the zero-padded running number.
pub const RUNNING_NUMBER_WIDTH: usize = 4;

/// Length of the `YYMMDD` date prefix.
pub const DATE_PREFIX_LEN: usize = 6;

/// Formats a date as the `YYMMDD` invoice prefix (Gregorian two-digit year).
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use baht_core::numbering::date_prefix;
///
/// let date = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
/// assert_eq!(date_prefix(date), "260114");
/// ```
pub fn date_prefix(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Joins a date prefix and a running number: `("260114", 7)` → `"2601140007"`.
pub fn format_invoice_number(prefix: &str, running: u32) -> String {
    format!("{prefix}{running:0width$}", width = RUNNING_NUMBER_WIDTH)
}

// =============================================================================
// Local Counter
// =============================================================================

/// The persisted numbering state: next running number and the day it is for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCounter {
    /// Next running number to hand out for `last_date`.
    pub counter: u32,

    /// `YYMMDD` the counter was last issued for.
    pub last_date: Option<String>,
}

impl InvoiceCounter {
    pub fn new(counter: u32, last_date: Option<String>) -> Self {
        InvoiceCounter { counter, last_date }
    }

    /// The running number that applies to `today_prefix` after rollover.
    fn current_for(&self, today_prefix: &str) -> u32 {
        match self.last_date.as_deref() {
            Some(last) if last == today_prefix => self.counter.max(1),
            _ => 1,
        }
    }

    /// Returns the number the next reservation would get, without mutating.
    pub fn preview_next(&self, today: NaiveDate) -> String {
        let prefix = date_prefix(today);
        let running = self.current_for(&prefix);
        format_invoice_number(&prefix, running)
    }

    /// Issues a number: applies day rollover, returns it, then advances.
    pub fn reserve_next(&mut self, today: NaiveDate) -> String {
        let prefix = date_prefix(today);
        let running = self.current_for(&prefix);
        let number = format_invoice_number(&prefix, running);

        self.counter = running.saturating_add(1);
        self.last_date = Some(prefix);
        number
    }

    /// Admin override: forces the counter to `start` for `today`.
    ///
    /// ## Errors
    /// `start < 1` is rejected and the counter is left untouched.
    pub fn reset(&mut self, start: i64, today: NaiveDate) -> ValidationResult<()> {
        let start = validate_counter_start(start)?;
        self.counter = start;
        self.last_date = Some(date_prefix(today));
        Ok(())
    }
}

/// Checks an operator-supplied counter start.
pub fn validate_counter_start(start: i64) -> ValidationResult<u32> {
    if start < 1 {
        return Err(ValidationError::MustBePositive {
            field: "counter".to_string(),
        });
    }
    u32::try_from(start).map_err(|_| ValidationError::OutOfRange {
        field: "counter".to_string(),
        min: 1,
        max: u32::MAX as i64,
    })
}

// =============================================================================
// Latest Number Derivation
// =============================================================================

/// Highest running number issued for `prefix` among `numbers`.
///
/// A number matches when it starts with `prefix` and the remainder begins
/// with at least one ASCII digit; trailing garbage after the digits is
/// ignored. Returns 0 when nothing matches.
///
/// ## Example
/// ```rust
/// use baht_core::numbering::latest_running_number;
///
/// let numbers = ["2601140003", "2601140010", "2601130099", "260114abc"];
/// assert_eq!(latest_running_number("260114", numbers), 10);
/// ```
pub fn latest_running_number<I, S>(prefix: &str, numbers: I) -> u32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    numbers
        .into_iter()
        .filter_map(|number| running_part(prefix, number.as_ref().trim()))
        .max()
        .unwrap_or(0)
}

fn running_part(prefix: &str, number: &str) -> Option<u32> {
    let rest = number.strip_prefix(prefix)?;
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    rest[..digits_end].parse().ok()
}

/// Result of a latest-number lookup, as reported by the remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestNumber {
    pub date_prefix: String,
    pub latest_number: u32,
    pub next_number: u32,
    pub next_invoice_number: String,
}

impl LatestNumber {
    /// Derives the latest and next numbers for `prefix` from known numbers.
    pub fn derive<I, S>(prefix: &str, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_latest(prefix, latest_running_number(prefix, numbers))
    }

    pub fn from_latest(prefix: &str, latest: u32) -> Self {
        let next = latest.saturating_add(1);
        LatestNumber {
            date_prefix: prefix.to_string(),
            latest_number: latest,
            next_number: next,
            next_invoice_number: format_invoice_number(prefix, next),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
