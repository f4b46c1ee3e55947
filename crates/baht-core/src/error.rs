//! # Error Types
//!
//! Domain-specific error types for baht-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  baht-core errors (this file)                                          │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  baht-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  baht-sync errors (separate crate)                                     │
//! │  └── SyncError        - Remote collaborator failures                   │
//! │                                                                         │
//! │  CLI errors (in app)                                                   │
//! │  └── ApiError         - The notice the operator sees                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Operator     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation errors are rejected before any state changes and are never
//! logged as system failures.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invoice cannot be found.
    ///
    /// ## When This Occurs
    /// - Editing, cancelling or restoring a number the store does not hold
    /// - Emailing an invoice that was deleted locally
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Renaming an invoice onto a number that is already taken.
    ///
    /// ## User Workflow
    /// ```text
    /// Edit 2601140003 → new number 2601140001
    ///      │
    ///      ▼
    /// 2601140001 already in store
    ///      │
    ///      ▼
    /// DuplicateInvoiceNumber("2601140001")   (nothing changed)
    /// ```
    #[error("Invoice number {0} already exists")]
    DuplicateInvoiceNumber(String),

    /// A date string is not `YYYY-MM-DD`.
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Writing an export failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<csv::Error> for CoreError {
    fn from(err: csv::Error) -> Self {
        CoreError::Export(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Export(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when operator input doesn't meet requirements and are raised
/// before any mutation or remote call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
