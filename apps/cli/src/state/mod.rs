//! # State Module
//!
//! Everything a command needs, built once per invocation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │   --config ──► BahtConfig (file + BAHT_* env)                           │
//! │                    │                                                    │
//! │   --db ────────────┼──► Database (SQLite, migrations applied)           │
//! │                    │         │                                          │
//! │                    │         └──► persisted settings (VAT, endpoints)   │
//! │                    ▼                          │                         │
//! │   --dry-run / --local ──► RemoteMode ─────────┤                         │
//! │                                               ▼                         │
//! │                             RecordSync { db, Option<remote> }           │
//! │                                                                         │
//! │  AppState = BahtConfig + RecordSync + "today"                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod sync;

use std::sync::Arc;

use chrono::NaiveDate;

use baht_db::Database;
use baht_sync::{BahtConfig, RecordSync, RemoteCollaborator};

use crate::cli::Cli;
use crate::error::ApiError;

pub use config::{effective_remote, load_config, seed_settings};
pub use db::{open_database, resolve_database_path};
pub use sync::{build_remote, RemoteMode};

/// Per-invocation application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: BahtConfig,
    pub sync: RecordSync,
    pub today: NaiveDate,
    pub mode: RemoteMode,
}

impl AppState {
    /// Loads config, opens the database and selects the remote.
    pub async fn open(cli: &Cli, today: NaiveDate) -> Result<Self, ApiError> {
        let config = load_config(cli.config.clone())?;
        let path = resolve_database_path(cli.db.clone(), &config)?;
        let db = open_database(path).await?;
        seed_settings(&db, &config).await?;

        let mode = RemoteMode::from_flags(cli.dry_run, cli.local);
        Self::with_database(config, db, mode, today).await
    }

    /// Builds state around an already opened database.
    pub async fn with_database(
        config: BahtConfig,
        db: Database,
        mode: RemoteMode,
        today: NaiveDate,
    ) -> Result<Self, ApiError> {
        let settings = db.state().settings().await?;
        let remote_settings = effective_remote(&config, &settings);
        let remote = build_remote(mode, &remote_settings, today)?;

        Ok(AppState {
            config,
            sync: RecordSync::new(db, remote),
            today,
            mode,
        })
    }

    /// State over an explicit remote. Used by tests.
    pub fn with_remote(db: Database, remote: Option<Arc<dyn RemoteCollaborator>>, today: NaiveDate) -> Self {
        AppState {
            config: BahtConfig::default(),
            sync: RecordSync::new(db, remote),
            today,
            mode: RemoteMode::Configured,
        }
    }

    pub fn db(&self) -> &Database {
        self.sync.database()
    }
}
