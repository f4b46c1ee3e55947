//! # API Error Type
//!
//! The user-facing notice for every failed command.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the CLI                                │
//! │                                                                         │
//! │  Command handler                                                        │
//! │  Result<String, ApiError>                                               │
//! │         │                                                               │
//! │         ├── ValidationError ─────────────► VALIDATION_ERROR             │
//! │         ├── DbError::NotFound ───────────► NOT_FOUND                    │
//! │         ├── DbError::UniqueViolation ────► VALIDATION_ERROR             │
//! │         ├── DbError (other) ─────────────► DATABASE_ERROR (logged)      │
//! │         ├── SyncError (config) ──────────► CONFIG_ERROR                 │
//! │         ├── SyncError (transport/remote) ► REMOTE_ERROR                 │
//! │         └── InvalidCredentials ──────────► AUTH_ERROR                   │
//! │                                                                         │
//! │  main.rs prints "[CODE] message" on stderr and exits non-zero          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Remote failures during a save never reach this type: the save succeeds
//! locally and the notice carries the reason.

use serde::Serialize;

use baht_core::{CoreError, ValidationError};
use baht_db::DbError;
use baht_sync::SyncError;

/// Error returned from command handlers.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Invoice not found: 2601140001" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Invoice or customer not found
    NotFound,

    /// Input rejected before any change
    ValidationError,

    /// Local store failure
    DatabaseError,

    /// Remote could not be reached or refused the request
    RemoteError,

    /// Config file, URL or missing endpoint
    ConfigError,

    /// Login failed
    AuthError,

    /// Anything else
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Validation(e) => ApiError::from(e),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Serialization(e) => {
                tracing::error!("Stored record could not be decoded: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Stored data is unreadable")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvoiceNotFound(number) => ApiError::not_found("Invoice", &number),
            CoreError::DuplicateInvoiceNumber(number) => {
                ApiError::validation(format!("Invoice number {} already exists", number))
            }
            CoreError::InvalidDate(value) => {
                ApiError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", value))
            }
            CoreError::Export(reason) => ApiError::internal(format!("Export failed: {}", reason)),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

/// Converts sync errors to API errors.
impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Store(e) => ApiError::from(e),
            SyncError::Validation(e) => ApiError::from(e),
            SyncError::InvalidCredentials => {
                ApiError::new(ErrorCode::AuthError, "Invalid username or password")
            }
            SyncError::Internal(e) => ApiError::internal(e),
            other if other.is_config_error() => ApiError::new(ErrorCode::ConfigError, other.to_string()),
            other => {
                tracing::warn!(error = %other, "Remote call failed");
                ApiError::new(ErrorCode::RemoteError, other.to_string())
            }
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = serde_json::to_value(self.code)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        write!(f, "[{}] {}", code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_code() {
        let err = ApiError::from(SyncError::Store(DbError::not_found("Invoice", "2601140001")));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.to_string(), "[NOT_FOUND] Invoice not found: 2601140001");
    }

    #[test]
    fn test_sync_error_categories() {
        assert_eq!(
            ApiError::from(SyncError::NotConfigured("script_url")).code,
            ErrorCode::ConfigError
        );
        assert_eq!(
            ApiError::from(SyncError::Timeout(10)).code,
            ErrorCode::RemoteError
        );
        assert_eq!(
            ApiError::from(SyncError::InvalidCredentials).code,
            ErrorCode::AuthError
        );
        let validation = ValidationError::Required {
            field: "customerName".into(),
        };
        assert_eq!(
            ApiError::from(SyncError::Validation(validation)).code,
            ErrorCode::ValidationError
        );
    }
}
