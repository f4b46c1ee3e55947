//! # Configuration
//!
//! File and environment configuration for Baht Invoice.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BAHT_SCRIPT_URL=https://script.google.com/macros/s/.../exec        │
//! │     BAHT_DB_PATH=/srv/baht/baht.db                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/invoice/baht.toml (Linux)                                │
//! │     ~/Library/Application Support/com.baht.invoice/baht.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     no remote, data-dir database, 7% VAT                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Settings saved through the app (`app_state.settings`) win over the
//! `[remote]` URLs here; this file only seeds them.
//!
//! ## Configuration File Format
//! ```toml
//! # baht.toml
//! [remote]
//! script_url = "https://script.google.com/macros/s/XXXX/exec"
//! sheets_url = "https://docs.google.com/spreadsheets/d/XXXX/edit"
//! read_timeout_secs = 10
//! enabled = true
//!
//! [database]
//! path = "/home/me/.local/share/invoice/baht.db"
//!
//! [invoice]
//! vat_rate = 7
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// Default remote read timeout, in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

/// Default database file name inside the data directory.
pub const DATABASE_FILE_NAME: &str = "baht.db";

/// Default config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "baht.toml";

// =============================================================================
// Remote Settings
// =============================================================================

/// Where the spreadsheet collaborator lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// RPC endpoint (POST `{action, data}`).
    #[serde(default)]
    pub script_url: Option<String>,

    /// Spreadsheet URL used for the bulk read.
    #[serde(default)]
    pub sheets_url: Option<String>,

    /// Timeout for the read path (bulk read, latest number, login).
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Master switch; when false every operation is local only.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            script_url: None,
            sheets_url: None,
            read_timeout_secs: default_read_timeout(),
            enabled: true,
        }
    }
}

impl RemoteSettings {
    /// True if at least one endpoint is usable.
    pub fn is_configured(&self) -> bool {
        self.enabled && (non_blank(&self.script_url) || non_blank(&self.sheets_url))
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

// =============================================================================
// Database & Invoice Settings
// =============================================================================

/// Local store location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; `None` means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Defaults used before the operator saves settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDefaults {
    /// VAT percent.
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
}

fn default_vat_rate() -> f64 {
    baht_core::DEFAULT_VAT_PERCENT
}

impl Default for InvoiceDefaults {
    fn default() -> Self {
        InvoiceDefaults {
            vat_rate: default_vat_rate(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BahtConfig {
    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub invoice: InvoiceDefaults,
}

impl BahtConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (baht.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        for url in [&self.remote.script_url, &self.remote.sheets_url]
            .into_iter()
            .flatten()
        {
            validate_http_url(url)?;
        }

        if self.remote.read_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "read_timeout_secs must be greater than 0".into(),
            ));
        }

        baht_core::validation::validate_vat_percent(self.invoice.vat_rate)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        Ok(())
    }

    /// Applies `BAHT_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BAHT_SCRIPT_URL") {
            debug!(url = %url, "Overriding script URL from environment");
            self.remote.script_url = Some(url);
        }

        if let Some(url) = lookup("BAHT_SHEETS_URL") {
            debug!(url = %url, "Overriding sheets URL from environment");
            self.remote.sheets_url = Some(url);
        }

        if let Some(secs) = lookup("BAHT_READ_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.remote.read_timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid BAHT_READ_TIMEOUT_SECS"),
            }
        }

        if let Some(enabled) = lookup("BAHT_REMOTE_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.remote.enabled = true,
                "0" | "false" | "no" | "off" => self.remote.enabled = false,
                _ => warn!(value = %enabled, "Ignoring invalid BAHT_REMOTE_ENABLED"),
            }
        }

        if let Some(path) = lookup("BAHT_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(rate) = lookup("BAHT_VAT_RATE") {
            match rate.parse::<f64>() {
                Ok(r) => self.invoice.vat_rate = r,
                Err(_) => warn!(value = %rate, "Ignoring invalid BAHT_VAT_RATE"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Database path: configured, or `<data dir>/baht.db`.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .path
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME)))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "baht", "invoice")
}

fn validate_http_url(value: &str) -> SyncResult<()> {
    let url = url::Url::parse(value.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(SyncError::InvalidUrl(format!(
            "URL must start with http:// or https://, got scheme '{}'",
            other
        ))),
    }
}
