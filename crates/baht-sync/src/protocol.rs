//! # Remote RPC Protocol
//!
//! Request and response shapes for the spreadsheet script endpoint.
//!
//! ## Action Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Remote RPC Actions                                 │
//! │                                                                         │
//! │  WRITES (best effort, queued on failure)                               │
//! │  ───────────────────────────────────────                               │
//! │  addCustomer            customer record           ──► {success}        │
//! │  updateCustomer         customer (match by taxId) ──► {success}        │
//! │  addInvoice             invoice, items as string  ──► {success}        │
//! │  updateInvoice          invoice + original number ──► {oldNumber, ..}  │
//! │                                                                         │
//! │  READS (10 s timeout, local fallback)                                  │
//! │  ────────────────────────────────────                                  │
//! │  getLatestInvoiceNumber {date} | {datePrefix}     ──► {nextNumber, ..} │
//! │  login                  {username, password}      ──► {user}           │
//! │                                                                         │
//! │  OTHER                                                                 │
//! │  ─────                                                                 │
//! │  sendInvoiceEmail       html summary + recipient  ──► {sentTo}         │
//! │  <anything else>                                  ──► Unknown action   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Requests use serde's adjacently tagged enum:
//! ```json
//! { "action": "addInvoice", "data": { "invoiceNumber": "2601140001", ... } }
//! ```
//! Every response carries a top-level `success` boolean.

use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};

use baht_core::auth::UserProfile;
use baht_core::money::{self, Money};
use baht_core::numbering::{format_invoice_number, LatestNumber};
use baht_core::{Customer, Invoice};

use crate::error::{SyncError, SyncResult};

/// Error text for an action the endpoint does not implement.
pub const UNKNOWN_ACTION: &str = "Unknown action";

// =============================================================================
// Requests
// =============================================================================

/// One RPC call: `{ "action": ..., "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum RpcRequest {
    AddCustomer(Customer),
    UpdateCustomer(Customer),
    AddInvoice(InvoicePayload),
    UpdateInvoice(InvoicePayload),
    GetLatestInvoiceNumber(LatestNumberQuery),
    SendInvoiceEmail(EmailPayload),
    Login(Credentials),
}

impl RpcRequest {
    /// The wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            RpcRequest::AddCustomer(_) => "addCustomer",
            RpcRequest::UpdateCustomer(_) => "updateCustomer",
            RpcRequest::AddInvoice(_) => "addInvoice",
            RpcRequest::UpdateInvoice(_) => "updateInvoice",
            RpcRequest::GetLatestInvoiceNumber(_) => "getLatestInvoiceNumber",
            RpcRequest::SendInvoiceEmail(_) => "sendInvoiceEmail",
            RpcRequest::Login(_) => "login",
        }
    }

    /// Human-readable key of the record the call is about.
    pub fn entity_key(&self) -> String {
        match self {
            RpcRequest::AddCustomer(c) | RpcRequest::UpdateCustomer(c) => {
                if c.tax_id.is_empty() {
                    c.name.trim().to_string()
                } else {
                    c.tax_id.as_str().to_string()
                }
            }
            RpcRequest::AddInvoice(p) | RpcRequest::UpdateInvoice(p) => {
                p.invoice.invoice_number.clone()
            }
            RpcRequest::GetLatestInvoiceNumber(q) => q
                .date_prefix
                .clone()
                .or_else(|| q.date.clone())
                .unwrap_or_default(),
            RpcRequest::SendInvoiceEmail(e) => e.invoice_number.clone(),
            RpcRequest::Login(c) => c.username.trim().to_string(),
        }
    }

    /// Reads are bounded by the read timeout; writes use the transport default.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            RpcRequest::GetLatestInvoiceNumber(_) | RpcRequest::Login(_)
        )
    }

    /// Record writes that may be queued in the outbox and replayed later.
    pub fn is_replayable(&self) -> bool {
        matches!(
            self,
            RpcRequest::AddCustomer(_)
                | RpcRequest::UpdateCustomer(_)
                | RpcRequest::AddInvoice(_)
                | RpcRequest::UpdateInvoice(_)
        )
    }

    /// Encodes the request body.
    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a request body (outbox payloads, the in-process remote).
    pub fn from_json(body: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Invoice record as the script expects it.
///
/// Serializes as the flat invoice object with `items` JSON-encoded into a
/// string, plus `originalInvoiceNumber` when the invoice is being renamed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    #[serde(flatten)]
    pub invoice: Invoice,

    #[serde(default)]
    pub original_invoice_number: Option<String>,
}

impl InvoicePayload {
    pub fn new(invoice: Invoice) -> Self {
        InvoicePayload {
            invoice,
            original_invoice_number: None,
        }
    }

    /// Payload for an update that may change the number.
    pub fn renamed(invoice: Invoice, original: impl Into<String>) -> Self {
        InvoicePayload {
            invoice,
            original_invoice_number: Some(original.into()),
        }
    }

    /// The number the remote should look for: original if given, else current.
    pub fn match_number(&self) -> &str {
        self.original_invoice_number
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.invoice.invoice_number)
            .trim()
    }
}

impl Serialize for InvoicePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = serde_json::to_value(&self.invoice).map_err(S::Error::custom)?;
        let serde_json::Value::Object(mut fields) = value else {
            return Err(S::Error::custom("invoice did not serialize to an object"));
        };

        let items = serde_json::to_string(&self.invoice.items).map_err(S::Error::custom)?;
        fields.insert("items".to_string(), serde_json::Value::String(items));

        let extra = usize::from(self.original_invoice_number.is_some());
        let mut map = serializer.serialize_map(Some(fields.len() + extra))?;
        for (key, value) in &fields {
            map.serialize_entry(key, value)?;
        }
        if let Some(original) = &self.original_invoice_number {
            map.serialize_entry("originalInvoiceNumber", original)?;
        }
        map.end()
    }
}

/// `getLatestInvoiceNumber` input. `datePrefix` wins over `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestNumberQuery {
    /// ISO date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// `YYMMDD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_prefix: Option<String>,
}

/// `sendInvoiceEmail` input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub invoice_html: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default, with = "money::as_baht")]
    pub total: Money,
}

/// `login` input.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Any RPC response. Only `success` is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_invoice_number: Option<String>,
}

impl RpcResponse {
    /// `{success: true, message}`.
    pub fn ok(message: impl Into<String>) -> Self {
        RpcResponse {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// `{success: false, error}`.
    pub fn failure(error: impl Into<String>) -> Self {
        RpcResponse {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn unknown_action() -> Self {
        Self::failure(UNKNOWN_ACTION)
    }

    /// Turns `success: false` into [`SyncError::Remote`].
    pub fn into_result(self) -> SyncResult<Self> {
        if self.success {
            Ok(self)
        } else {
            let reason = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            Err(SyncError::Remote(reason))
        }
    }

    /// Reads a `getLatestInvoiceNumber` answer for `target_prefix`.
    ///
    /// An empty sheet answers with no prefix and no next number; that means
    /// "start at 1 for the day we asked about".
    pub fn latest_number(&self, target_prefix: &str) -> LatestNumber {
        let prefix = self
            .date_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(target_prefix);
        let latest = self.latest_number.unwrap_or(0);
        let next = self
            .next_number
            .filter(|n| *n > 0)
            .unwrap_or_else(|| latest.saturating_add(1));
        let next_invoice_number = self
            .next_invoice_number
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format_invoice_number(prefix, next));

        LatestNumber {
            date_prefix: prefix.to_string(),
            latest_number: latest,
            next_number: next,
            next_invoice_number,
        }
    }
}
