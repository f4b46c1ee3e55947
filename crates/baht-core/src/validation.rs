//! # Validation Module
//!
//! Input validation for invoices, customers and admin overrides.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI argument parsing (clap)                                  │
//! │  ├── Types and required arguments                                      │
//! │  └── "desc:qty:price" item syntax                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: business rules                                  │
//! │  ├── customer name, described items, email shape                       │
//! │  └── counter override ≥ 1, invoice number present                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Record store (baht-db)                                       │
//! │  ├── not-found on edit/cancel/restore/delete                           │
//! │  └── duplicate number on rename                                        │
//! │                                                                         │
//! │  Every layer rejects before mutating; nothing here is logged as a      │
//! │  system failure.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payment mismatches are soft: [`check_payment`] returns a warning and the
//! invoice is still saved.

use chrono::NaiveDate;
use std::fmt;

use crate::error::{ValidationError, ValidationResult};
use crate::money::{format_currency, Money};
use crate::types::{Invoice, InvoiceItem, PaymentInfo};

/// Largest payment mismatch that is still considered settled (0.01 baht).
pub const PAYMENT_TOLERANCE: Money = Money::from_satang(1);

// =============================================================================
// String Validators
// =============================================================================

/// Validates a customer name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use baht_core::validation::validate_customer_name;
///
/// assert_eq!(validate_customer_name("  บริษัท ก จำกัด ").unwrap(), "บริษัท ก จำกัด");
/// assert!(validate_customer_name("   ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customerName".to_string(),
        });
    }
    Ok(name.to_string())
}

/// Validates an invoice number typed by the operator and returns it trimmed.
pub fn validate_invoice_number(number: &str) -> ValidationResult<String> {
    let number = number.trim();
    if number.is_empty() {
        return Err(ValidationError::Required {
            field: "invoiceNumber".to_string(),
        });
    }
    Ok(number.to_string())
}

/// Validates an optional email address.
///
/// Empty input is accepted. Anything else must look like `local@domain.tld`:
/// no whitespace, exactly one `@`, and a dot inside the domain with text on
/// both sides.
///
/// ## Example
/// ```rust
/// use baht_core::validation::validate_email;
///
/// assert!(validate_email("").is_ok());
/// assert!(validate_email("billing@example.co.th").is_ok());
/// assert!(validate_email("billing@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(());
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "expected name@domain.tld".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let dot = domain.rfind('.').ok_or_else(invalid)?;
    if dot == 0 || dot == domain.len() - 1 {
        return Err(invalid());
    }
    Ok(())
}

/// Parses an ISO `YYYY-MM-DD` date.
pub fn validate_iso_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{}' is not YYYY-MM-DD", value.trim()),
        }
    })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a VAT rate in percent.
///
/// ## Rules
/// - Must be finite and between 0 and 100
pub fn validate_vat_percent(pct: f64) -> ValidationResult<()> {
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: "vatRate".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Invoice Validators
// =============================================================================

/// Validates the line items: at least one must carry a description.
pub fn validate_items(items: &[InvoiceItem]) -> ValidationResult<()> {
    if !items.iter().any(InvoiceItem::has_description) {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    Ok(())
}

/// Validates an invoice before it is saved or edited.
///
/// ## Workflow
/// ```text
/// save invoice
///      │
///      ├── customer name blank?      → Required { customerName }
///      ├── no described line?        → Required { items }
///      ├── email present but bad?    → InvalidFormat { email }
///      │
///      └── OK → reserve number, persist
/// ```
pub fn validate_invoice(invoice: &Invoice) -> ValidationResult<()> {
    validate_customer_name(&invoice.customer_name)?;
    validate_items(&invoice.items)?;
    validate_email(&invoice.customer_email)?;
    Ok(())
}

// =============================================================================
// Payment Check
// =============================================================================

/// Soft payment mismatch: the ticked amounts do not add up to the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentWarning {
    pub paid: Money,
    pub total: Money,
}

impl PaymentWarning {
    /// `paid - total`; negative when underpaid.
    pub fn difference(&self) -> Money {
        self.paid - self.total
    }
}

impl fmt::Display for PaymentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "เงินสด + เงินโอน ({}) ≠ ยอดรวม ({})",
            format_currency(self.paid),
            format_currency(self.total)
        )
    }
}

/// Compares the payment against the invoice total.
///
/// Returns `None` when no method is ticked or the amounts agree within
/// [`PAYMENT_TOLERANCE`].
pub fn check_payment(payment: &PaymentInfo, total: Money) -> Option<PaymentWarning> {
    if !payment.has_method() {
        return None;
    }
    let paid = payment.paid();
    if (paid - total).abs() > PAYMENT_TOLERANCE {
        Some(PaymentWarning { paid, total })
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_customer_name() {
        assert!(validate_customer_name("ร้านอาหารดี").is_ok());
        assert!(validate_customer_name("").is_err());
        assert!(validate_customer_name(" \t ").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("  ").is_ok());

        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("a@.com").is_err());
        assert!(validate_email("a@example.").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_validate_items_requires_description() {
        let blank = vec![InvoiceItem::new("  ", 1.0, 10.0)];
        assert!(validate_items(&blank).is_err());
        assert!(validate_items(&[]).is_err());

        let mixed = vec![
            InvoiceItem::new("", 1.0, 10.0),
            InvoiceItem::new("ค่าเครื่องดื่ม", 2.0, 35.0),
        ];
        assert!(validate_items(&mixed).is_ok());
    }

    #[test]
    fn test_validate_invoice_checks_in_order() {
        let invoice = Invoice {
            invoice_number: "2601140001".into(),
            customer_email: "broken".into(),
            ..Default::default()
        };
        let err = validate_invoice(&invoice).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Required {
                field: "customerName".into()
            }
        );
    }

    #[test]
    fn test_validate_iso_date() {
        assert!(validate_iso_date("from", "2026-01-14").is_ok());
        assert!(validate_iso_date("from", "14/01/2026").is_err());
        assert!(validate_iso_date("from", "2026-02-30").is_err());
    }

    #[test]
    fn test_validate_vat_percent() {
        assert!(validate_vat_percent(7.0).is_ok());
        assert!(validate_vat_percent(0.0).is_ok());
        assert!(validate_vat_percent(-1.0).is_err());
        assert!(validate_vat_percent(f64::NAN).is_err());
    }

    #[test]
    fn test_check_payment() {
        let total = Money::from_baht(107);
        let exact = PaymentInfo {
            cash: true,
            cash_amount: Money::from_baht(100),
            transfer: true,
            transfer_amount: Money::from_baht(7),
        };
        assert_eq!(check_payment(&exact, total), None);

        let within_tolerance = PaymentInfo {
            cash: true,
            cash_amount: Money::from_satang(10699),
            ..Default::default()
        };
        assert_eq!(check_payment(&within_tolerance, total), None);

        let short = PaymentInfo {
            cash: true,
            cash_amount: Money::from_baht(100),
            ..Default::default()
        };
        let warning = check_payment(&short, total).unwrap();
        assert_eq!(warning.difference(), Money::from_baht(-7));
        assert!(warning.to_string().contains("107.00"));
    }

    #[test]
    fn test_check_payment_ignores_unticked() {
        let unticked = PaymentInfo {
            cash: false,
            cash_amount: Money::from_baht(5),
            ..Default::default()
        };
        assert_eq!(check_payment(&unticked, Money::from_baht(107)), None);
    }
}
