//! # baht-core: Pure Business Logic for Baht Invoice
//!
//! This crate is the **heart** of Baht Invoice. It contains the tax-invoice
//! rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Baht Invoice Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/cli (`baht`)                            │   │
//! │  │    invoice new ──► number reserve ──► history export           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ baht-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ thai_text │  │ numbering │  │   │
//! │  │   │  Invoice  │  │   Money   │  │ baht text │  │  counter  │  │   │
//! │  │   │ Customer  │  │  totals   │  │           │  │  YYMMDD   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │validation │  │  format   │  │  export   │  │   stats   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • NO CLOCK • PURE FUNCTIONS          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          baht-db (SQLite store)  ·  baht-sync (remote)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Invoice, Customer, PaymentInfo, settings)
//! - [`money`] - Money in satang, VAT-inclusive totals, currency formatting
//! - [`thai_text`] - Amounts spelled out in Thai
//! - [`numbering`] - Daily `YYMMDDNNNN` invoice numbers
//! - [`validation`] - Business rule validation
//! - [`format`] - Thai calendar dates
//! - [`export`] - CSV history export
//! - [`stats`] - Dashboard figures
//! - [`auth`] - Local login stub and session expiry
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; "today" is a parameter
//! 2. **Integer Money**: amounts are stored in satang (i64) and rounded once
//! 3. **Opaque Digits**: tax IDs and phones are text, never numbers
//! 4. **Explicit Errors**: typed errors, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use baht_core::money::{calculate_totals, Money};
//! use baht_core::thai_text::amount_to_thai_words;
//! use baht_core::types::{InvoiceItem, VatRate};
//!
//! let items = vec![InvoiceItem::new("ค่าอาหาร", 2.0, 53.5)];
//! let totals = calculate_totals(&items, VatRate::THAI_STANDARD);
//!
//! assert_eq!(totals.total, Money::from_baht(107));
//! assert_eq!(totals.vat, Money::from_baht(7));
//! assert_eq!(amount_to_thai_words(totals.total), "หนึ่งร้อยเจ็ดบาทถ้วน");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod error;
pub mod export;
pub mod format;
pub mod money;
pub mod numbering;
pub mod stats;
pub mod thai_text;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use baht_core::Money` instead of
// `use baht_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError, ValidationResult};
pub use money::{calculate_totals, format_currency, InvoiceTotals, Money};
pub use numbering::{InvoiceCounter, LatestNumber};
pub use thai_text::amount_to_thai_words;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default VAT rate in percent.
pub const DEFAULT_VAT_PERCENT: f64 = 7.0;

/// Hardcoded local administrator (the login is a stub, not a security boundary).
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_ADMIN_NAME: &str = "ผู้ดูแลระบบ";
pub const DEFAULT_ADMIN_ROLE: &str = "admin";

/// How long a login stays valid, in hours.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Most customers a search returns.
pub const CUSTOMER_SEARCH_LIMIT: usize = 10;
