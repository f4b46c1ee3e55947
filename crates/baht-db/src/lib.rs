//! # baht-db: Database Layer for Baht Invoice
//!
//! Local storage for invoices, customers and persisted state, on SQLite with
//! sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Baht Invoice Data Flow                           │
//! │                                                                         │
//! │  CLI command (invoice new)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     baht-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CustomerRepo  │    │ 001_initial  │  │   │
//! │  │   │               │    │ StateRepo     │    │              │  │   │
//! │  │   │               │    │ OutboxRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/baht.db   or   :memory: in tests                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use baht_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/baht.db")).await?;
//!
//! let number = db.state().reserve_next(today).await?;
//! db.invoices().add(&invoice).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::customer::CustomerRepository;
pub use repository::invoice::{InvoiceQuery, InvoiceRepository, MergeReport};
pub use repository::state::StateRepository;
pub use repository::sync::{SyncOutboxEntry, SyncOutboxRepository};
pub use repository::UpsertOutcome;
