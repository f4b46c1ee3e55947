//! # Repository Module
//!
//! Database repository implementations for Baht Invoice.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command / record sync                                             │
//! │       │                                                                 │
//! │       │  db.invoices().cancel("2601140001")                            │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── add / upsert / edit                                               │
//! │  ├── cancel / restore / delete / purge_all                             │
//! │  └── search / merge_remote / stats                                     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoice history and lifecycle
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer cache
//! - [`StateRepository`](state::StateRepository) - Settings, company, counter, session
//! - [`SyncOutboxRepository`](sync::SyncOutboxRepository) - Failed remote writes

pub mod customer;
pub mod invoice;
pub mod state;
pub mod sync;

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A matching row was updated.
    Updated,
    /// Nothing matched; a new row was inserted.
    Inserted,
}
