//! # Remote Collaborator
//!
//! The seam between record sync and whatever answers the RPC: the HTTP
//! script endpoint in production, [`InMemoryRemote`](crate::memory::InMemoryRemote)
//! in tests and dry runs.
//!
//! ## Persistence Outcomes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Best-Effort Write Outcome                           │
//! │                                                                         │
//! │   local write ──► ok ──► remote configured? ──no──► Local              │
//! │                                │                                        │
//! │                               yes                                       │
//! │                                │                                        │
//! │                          remote call ──ok──► LocalAndRemote            │
//! │                                │                                        │
//! │                              failed ──► LocalOnly { reason }           │
//! │                                         (queued in sync_outbox)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A failed local write is an `Err`; no remote call is made after it.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SyncResult;
use crate::protocol::{RpcRequest, RpcResponse};
use crate::sheet::{SheetName, SheetRow};

/// Something that answers the RPC table and the bulk sheet read.
#[async_trait]
pub trait RemoteCollaborator: Send + Sync {
    /// Sends one request. `success: false` comes back as
    /// [`SyncError::Remote`](crate::SyncError::Remote).
    async fn call(&self, request: &RpcRequest) -> SyncResult<RpcResponse>;

    /// Reads every row of a sheet tab.
    async fn fetch_sheet(&self, sheet: SheetName) -> SyncResult<Vec<SheetRow>>;
}

/// Where a mutation ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "persisted", rename_all = "camelCase")]
pub enum Persisted<T> {
    /// Stored locally; no remote is configured.
    Local { value: T },
    /// Stored locally and acknowledged by the remote.
    LocalAndRemote { value: T },
    /// Stored locally; the remote call failed.
    LocalOnly { value: T, reason: String },
}

impl<T> Persisted<T> {
    pub fn value(&self) -> &T {
        match self {
            Persisted::Local { value }
            | Persisted::LocalAndRemote { value }
            | Persisted::LocalOnly { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Persisted::Local { value }
            | Persisted::LocalAndRemote { value }
            | Persisted::LocalOnly { value, .. } => value,
        }
    }

    /// Why the remote half failed, if it did.
    pub fn remote_failure(&self) -> Option<&str> {
        match self {
            Persisted::LocalOnly { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_remote_synced(&self) -> bool {
        matches!(self, Persisted::LocalAndRemote { .. })
    }

    /// Same outcome, different value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Persisted<U> {
        match self {
            Persisted::Local { value } => Persisted::Local { value: f(value) },
            Persisted::LocalAndRemote { value } => Persisted::LocalAndRemote { value: f(value) },
            Persisted::LocalOnly { value, reason } => Persisted::LocalOnly {
                value: f(value),
                reason,
            },
        }
    }

    /// Short label for notices: `local`, `local+remote`, `local only`.
    pub fn label(&self) -> &'static str {
        match self {
            Persisted::Local { .. } => "local",
            Persisted::LocalAndRemote { .. } => "local+remote",
            Persisted::LocalOnly { .. } => "local only",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_accessors() {
        let ok = Persisted::LocalAndRemote { value: 1 };
        assert!(ok.is_remote_synced());
        assert_eq!(ok.remote_failure(), None);

        let failed = Persisted::LocalOnly {
            value: 2,
            reason: "Connection failed".to_string(),
        };
        assert_eq!(failed.remote_failure(), Some("Connection failed"));
        assert_eq!(failed.clone().map(|v| v * 10).into_value(), 20);
        assert_eq!(failed.label(), "local only");
    }

    #[test]
    fn test_persisted_serializes_with_tag() {
        let value = serde_json::to_value(Persisted::Local { value: "x" }).unwrap();
        assert_eq!(value["persisted"], "local");
        assert_eq!(value["value"], "x");
    }
}
