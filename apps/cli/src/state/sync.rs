//! # Remote Selection
//!
//! ```text
//!   --local ─────────────────────────────► None (every write is local)
//!   --dry-run ───────────────────────────► InMemoryRemote (fresh, empty)
//!   endpoints configured and enabled ────► HttpRemote
//!   otherwise ───────────────────────────► None
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use baht_sync::{HttpRemote, InMemoryRemote, RemoteCollaborator, RemoteSettings};

use crate::error::ApiError;

/// Which remote the command talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteMode {
    /// Whatever the config and saved settings say.
    Configured,
    /// In-process spreadsheet.
    DryRun,
    /// No remote.
    Disabled,
}

impl RemoteMode {
    pub fn from_flags(dry_run: bool, local: bool) -> Self {
        if dry_run {
            RemoteMode::DryRun
        } else if local {
            RemoteMode::Disabled
        } else {
            RemoteMode::Configured
        }
    }
}

pub fn build_remote(
    mode: RemoteMode,
    settings: &RemoteSettings,
    today: NaiveDate,
) -> Result<Option<Arc<dyn RemoteCollaborator>>, ApiError> {
    match mode {
        RemoteMode::Disabled => {
            debug!("Remote disabled for this command");
            Ok(None)
        }
        RemoteMode::DryRun => {
            info!("Dry run: using in-process remote");
            Ok(Some(Arc::new(InMemoryRemote::with_today(today))))
        }
        RemoteMode::Configured if settings.is_configured() => {
            Ok(Some(Arc::new(HttpRemote::new(settings)?)))
        }
        RemoteMode::Configured => {
            debug!("No remote configured");
            Ok(None)
        }
    }
}
