//! # Database State
//!
//! Resolves and opens the SQLite file.
//!
//! ## Path Resolution
//! 1. `--db PATH`
//! 2. `BAHT_DB_PATH` / `[database] path`
//! 3. Platform data dir:
//!    - **macOS**: `~/Library/Application Support/com.baht.invoice/baht.db`
//!    - **Windows**: `%APPDATA%\baht\invoice\data\baht.db`
//!    - **Linux**: `~/.local/share/invoice/baht.db`

use std::path::PathBuf;

use tracing::info;

use baht_db::{Database, DbConfig};
use baht_sync::BahtConfig;

use crate::error::ApiError;

pub fn resolve_database_path(
    cli_override: Option<PathBuf>,
    config: &BahtConfig,
) -> Result<PathBuf, ApiError> {
    cli_override
        .or_else(|| config.database_path())
        .ok_or_else(|| ApiError::internal("Could not determine app data directory"))
}

/// Opens (creating if needed) the database and applies migrations.
pub async fn open_database(path: PathBuf) -> Result<Database, ApiError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    info!(?path, "Opening database");
    let db = Database::new(DbConfig::new(path)).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override_wins() {
        let mut config = BahtConfig::default();
        config.database.path = Some(PathBuf::from("/from/config.db"));
        let path = resolve_database_path(Some(PathBuf::from("/from/cli.db")), &config).unwrap();
        assert_eq!(path, PathBuf::from("/from/cli.db"));

        let path = resolve_database_path(None, &config).unwrap();
        assert_eq!(path, PathBuf::from("/from/config.db"));
    }

    #[tokio::test]
    async fn test_open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("baht.db");
        let db = open_database(path.clone()).await.unwrap();
        assert!(db.health_check().await);
        assert!(path.exists());
    }
}
