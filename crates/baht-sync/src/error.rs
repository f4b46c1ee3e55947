//! # Sync Error Types
//!
//! Error types for remote collaborator operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  InvalidResponse        │ │
//! │  │  NotConfigured  │  │  Timeout        │  │  Remote (success:false) │ │
//! │  │  InvalidUrl     │  │  Http status    │  │  Serialization          │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │  Local store    │  │   Validation    │                              │
//! │  │                 │  │                 │                              │
//! │  │  Store(DbError) │  │  rejected input │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport and protocol failures are treated the same way by callers: the
//! local write already happened, the remote result is reported as a reason.

use thiserror::Error;

use baht_core::ValidationError;
use baht_db::DbError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all remote and orchestration failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The endpoint needed for this call is not set.
    #[error("Remote endpoint not configured: {0}")]
    NotConfigured(&'static str),

    /// Invalid endpoint URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The read path gave up.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-success HTTP status.
    #[error("HTTP {status}")]
    Http { status: u16 },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Body was not the JSON shape we expect.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The remote answered `success: false`.
    #[error("Remote rejected the request: {0}")]
    Remote(String),

    /// Failed to encode a request.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Local store failure. Not-found and duplicate keep their identity.
    #[error(transparent)]
    Store(#[from] DbError),

    /// Input rejected before any mutation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Login rejected by the local stub.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            SyncError::Http {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            SyncError::InvalidResponse(err.to_string())
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// True when a later explicit replay might succeed.
    ///
    /// ## Retryable
    /// - Connection failures and timeouts
    /// - 5xx responses
    /// - Unparsable bodies (script endpoints return HTML error pages)
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConnectionFailed(_)
            | SyncError::Timeout(_)
            | SyncError::InvalidResponse(_) => true,
            SyncError::Http { status } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// True if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::NotConfigured(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// True for failures of the remote round trip itself (as opposed to the
    /// local store or the operator's input).
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            SyncError::ConnectionFailed(_)
                | SyncError::Timeout(_)
                | SyncError::Http { .. }
                | SyncError::InvalidResponse(_)
                | SyncError::Remote(_)
                | SyncError::NotConfigured(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::ConnectionFailed("dns".into()).is_retryable());
        assert!(SyncError::Timeout(10).is_retryable());
        assert!(SyncError::Http { status: 502 }.is_retryable());

        assert!(!SyncError::Http { status: 404 }.is_retryable());
        assert!(!SyncError::Remote("Unknown action".into()).is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_categories() {
        assert!(SyncError::NotConfigured("script_url").is_config_error());
        assert!(SyncError::Remote("x".into()).is_remote_failure());
        assert!(!SyncError::Store(DbError::not_found("Invoice", "1")).is_remote_failure());
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: SyncError = DbError::not_found("Invoice", "2601140001").into();
        assert_eq!(err.to_string(), "Invoice not found: 2601140001");
    }
}
