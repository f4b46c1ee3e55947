//! # baht-sync: Remote Collaborator for Baht Invoice
//!
//! Everything that talks to the spreadsheet-backed remote: the RPC protocol,
//! the HTTP client, the bulk sheet reader, invoice-number reconciliation and
//! the best-effort record sync that wraps every local write.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Remote Sync Layer                              │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    RecordSync (records.rs)                       │  │
//! │  │                                                                  │  │
//! │  │  validate ─► local write (baht-db) ─► remote write (best effort) │  │
//! │  │                                            │                     │  │
//! │  │                          failure ─► sync_outbox + LocalOnly      │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ dyn RemoteCollaborator                  │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  HttpRemote    │  │ InMemoryRemote │  │  Outbox replay         │    │
//! │  │                │  │                │  │                        │    │
//! │  │ POST {action,  │  │ Same action    │  │ Re-sends queued writes │    │
//! │  │ data} + gviz   │  │ table, offline │  │ once per request       │    │
//! │  │ sheet reads    │  │ switch         │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Number sync (numbering.rs)                                     │   │
//! │  │  getLatestInvoiceNumber ─► reset local counter for today        │   │
//! │  │  remote failure ─► local preview, counter untouched             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - `baht.toml` loading (file, env, defaults)
//! - [`error`] - Sync error types
//! - [`protocol`] - RPC request/response types
//! - [`remote`] - The collaborator trait and [`Persisted`] outcomes
//! - [`client`] - HTTP implementation
//! - [`memory`] - In-process implementation
//! - [`sheet`] - Bulk sheet parsing and row mapping
//! - [`numbering`] - Invoice number reconciliation
//! - [`records`] - Invoice and customer operations with remote mirroring
//! - [`outbox`] - Replay of failed remote writes
//! - [`email`] - Invoice email body
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use baht_sync::{BahtConfig, HttpRemote, RecordSync};
//!
//! let config = BahtConfig::load_or_default(None);
//! let remote = HttpRemote::new(&config.remote)?;
//! let sync = RecordSync::new(database, Some(Arc::new(remote)));
//!
//! let saved = sync.save_invoice(draft, today).await?;
//! println!("{}", saved.invoice.label());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod config;
pub mod email;
pub mod error;
pub mod memory;
pub mod numbering;
pub mod outbox;
pub mod protocol;
pub mod records;
pub mod remote;
pub mod sheet;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::HttpRemote;
pub use config::{BahtConfig, DatabaseSettings, InvoiceDefaults, RemoteSettings};
pub use error::{SyncError, SyncResult};
pub use memory::{InMemoryRemote, RemoteUser};
pub use numbering::{sync_invoice_number, NumberSyncOutcome};
pub use outbox::{replay_outbox, ReplayReport, DEFAULT_REPLAY_LIMIT};
pub use protocol::{RpcRequest, RpcResponse};
pub use records::{EditedInvoice, RecordSync, SavedInvoice};
pub use remote::{Persisted, RemoteCollaborator};
pub use sheet::SheetName;
