//! # Settings Commands
//!
//! Invoice settings (VAT rate, remote endpoints) and the seller's company
//! profile. Both are stored in the local database only.

use tracing::info;

use baht_core::validation::validate_vat_percent;
use baht_core::{BranchType, DigitString, VatRate};
use baht_db::repository::state::{KEY_LOGO, KEY_SIGNATURE};

use crate::cli::{CompanyCommand, ImageArgs, SettingsCommand};
use crate::error::ApiError;
use crate::state::{effective_remote, AppState};

pub async fn run(state: &AppState, command: SettingsCommand) -> Result<String, ApiError> {
    match command {
        SettingsCommand::Show => show_settings(state).await,
        SettingsCommand::SetVat { percent } => set_vat(state, percent).await,
        SettingsCommand::SetRemote {
            script_url,
            sheets_url,
        } => set_remote(state, script_url, sheets_url).await,
    }
}

pub async fn run_company(state: &AppState, command: CompanyCommand) -> Result<String, ApiError> {
    match command {
        CompanyCommand::Show => show_company(state).await,
        CompanyCommand::Set {
            name,
            address,
            tax_id,
            phone,
            branch,
            hq,
        } => {
            let mut company = state.db().state().company().await?;
            if let Some(name) = name {
                company.name = name;
            }
            if let Some(address) = address {
                company.address = address;
            }
            if let Some(tax_id) = tax_id {
                company.tax_id = DigitString::new(tax_id);
            }
            if let Some(phone) = phone {
                company.phone = DigitString::new(phone);
            }
            if let Some(branch) = branch {
                company.branch_type = BranchType::Branch;
                company.branch_number = branch.trim().to_string();
            } else if hq {
                company.branch_type = BranchType::Hq;
                company.branch_number.clear();
            }

            state.db().state().save_company(&company).await?;
            info!(name = %company.name, "Company profile saved");
            Ok(format!("Saved company profile {} (local)", company.name))
        }
        CompanyCommand::Logo(args) => image(state, KEY_LOGO, args).await,
        CompanyCommand::Signature(args) => image(state, KEY_SIGNATURE, args).await,
    }
}

/// Logo and signature are stored as raw data-URL strings.
async fn image(state: &AppState, key: &str, args: ImageArgs) -> Result<String, ApiError> {
    let store = state.db().state();
    if args.clear {
        store.remove(key).await?;
        return Ok(format!("Cleared {} (local)", key));
    }

    match args.data_url {
        Some(data_url) => {
            let data_url = data_url.trim();
            if !data_url.starts_with("data:image/") {
                return Err(ApiError::validation(format!(
                    "{} must be a data:image/... URL",
                    key
                )));
            }
            store.set_raw(key, data_url).await?;
            info!(key, bytes = data_url.len(), "Company image saved");
            Ok(format!("Saved {} (local)", key))
        }
        None => Ok(match store.get_raw(key).await? {
            Some(value) => format!("{}: {} characters", key, value.len()),
            None => format!("{}: (not set)", key),
        }),
    }
}

pub async fn show_settings(state: &AppState) -> Result<String, ApiError> {
    let settings = state.db().state().settings().await?;
    let remote = effective_remote(&state.config, &settings);

    let endpoint = |url: &Option<String>| url.clone().unwrap_or_else(|| "(not set)".to_string());
    Ok([
        format!("VAT rate:    {}%", settings.vat_rate.percent()),
        format!("Prefix:      {}", settings.invoice_prefix),
        format!("Category:    {}", settings.default_category),
        format!("Script URL:  {}", endpoint(&remote.script_url)),
        format!("Sheets URL:  {}", endpoint(&remote.sheets_url)),
        format!("Remote:      {:?}", state.mode),
    ]
    .join("\n"))
}

pub async fn set_vat(state: &AppState, percent: f64) -> Result<String, ApiError> {
    validate_vat_percent(percent)?;

    let mut settings = state.db().state().settings().await?;
    settings.vat_rate = VatRate::from_percent(percent);
    state.db().state().save_settings(&settings).await?;

    info!(percent, "VAT rate changed");
    Ok(format!("VAT rate set to {}% (local)", settings.vat_rate.percent()))
}

/// Saves remote endpoints. An empty value clears the saved endpoint so the
/// config file applies again.
pub async fn set_remote(
    state: &AppState,
    script_url: Option<String>,
    sheets_url: Option<String>,
) -> Result<String, ApiError> {
    if script_url.is_none() && sheets_url.is_none() {
        return Err(ApiError::validation(
            "Give --script-url and/or --sheets-url",
        ));
    }

    let normalize = |value: String| {
        let value = value.trim().to_string();
        if value.is_empty() {
            Ok(None)
        } else {
            url::Url::parse(&value)
                .map(|_| Some(value))
                .map_err(|e| ApiError::validation(format!("Invalid URL: {}", e)))
        }
    };

    let mut settings = state.db().state().settings().await?;
    if let Some(script_url) = script_url {
        settings.script_url = normalize(script_url)?;
    }
    if let Some(sheets_url) = sheets_url {
        settings.sheets_url = normalize(sheets_url)?;
    }
    state.db().state().save_settings(&settings).await?;

    info!(
        script = settings.script_url.is_some(),
        sheets = settings.sheets_url.is_some(),
        "Remote endpoints saved"
    );
    Ok("Remote endpoints saved (local)".to_string())
}

pub async fn show_company(state: &AppState) -> Result<String, ApiError> {
    let company = state.db().state().company().await?;
    let branch = match company.branch_type {
        BranchType::Hq => "สำนักงานใหญ่".to_string(),
        BranchType::Branch => format!("สาขา {}", company.branch_number),
    };
    Ok([
        format!("Name:     {}", company.name),
        format!("Address:  {}", company.address),
        format!("Tax ID:   {} {}", company.tax_id.as_str(), branch),
        format!("Phone:    {}", company.phone.as_str()),
    ]
    .join("\n"))
}
