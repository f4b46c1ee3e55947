//! # Configuration State
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`BAHT_*`)
//! 2. Config file (`baht.toml`)
//! 3. Defaults
//!
//! Remote endpoints saved with `settings set-remote` live in the database and
//! win over the file; the file only seeds them.

use std::path::PathBuf;

use tracing::{debug, info};

use baht_core::{InvoiceSettings, VatRate};
use baht_db::Database;
use baht_sync::{BahtConfig, RemoteSettings};

use crate::error::ApiError;

/// Loads `baht.toml` (or `path`) with environment overrides applied.
pub fn load_config(path: Option<PathBuf>) -> Result<BahtConfig, ApiError> {
    Ok(BahtConfig::load(path)?)
}

/// Writes the file's VAT rate into the database the first time it is opened.
pub async fn seed_settings(db: &Database, config: &BahtConfig) -> Result<(), ApiError> {
    if db.state().get_raw("settings").await?.is_some() {
        return Ok(());
    }

    let settings = InvoiceSettings {
        vat_rate: VatRate::from_percent(config.invoice.vat_rate),
        ..InvoiceSettings::default()
    };
    db.state().save_settings(&settings).await?;
    info!(vat_rate = config.invoice.vat_rate, "Seeded invoice settings");
    Ok(())
}

/// Remote endpoints: persisted settings first, then the config file.
pub fn effective_remote(config: &BahtConfig, settings: &InvoiceSettings) -> RemoteSettings {
    let pick = |saved: &Option<String>, file: &Option<String>| {
        saved
            .as_ref()
            .filter(|url| !url.trim().is_empty())
            .or(file.as_ref())
            .cloned()
    };

    let remote = RemoteSettings {
        script_url: pick(&settings.script_url, &config.remote.script_url),
        sheets_url: pick(&settings.sheets_url, &config.remote.sheets_url),
        ..config.remote.clone()
    };
    debug!(
        script = remote.script_url.is_some(),
        sheets = remote.sheets_url.is_some(),
        enabled = remote.enabled,
        "Remote endpoints resolved"
    );
    remote
}
