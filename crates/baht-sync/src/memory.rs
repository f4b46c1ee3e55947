//! # In-Process Remote
//!
//! A [`RemoteCollaborator`] that keeps the spreadsheet in memory and answers
//! the full action table the way the script endpoint does. Used by tests and
//! by `--dry-run` in the CLI.
//!
//! Requests go through the same JSON encoding as the HTTP client, so payload
//! shape mistakes show up here too.
//!
//! ```rust,ignore
//! let remote = InMemoryRemote::new();
//! remote.set_offline(true);   // every call fails with ConnectionFailed
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use baht_core::auth::UserProfile;
use baht_core::numbering::{date_prefix, LatestNumber};
use baht_core::{Customer, Invoice};

use crate::error::{SyncError, SyncResult};
use crate::protocol::{
    Credentials, EmailPayload, InvoicePayload, LatestNumberQuery, RpcRequest, RpcResponse,
};
use crate::remote::RemoteCollaborator;
use crate::sheet::{SheetName, SheetRow};

/// A row of the `Users` sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub status: String,
}

impl RemoteUser {
    pub fn active(username: &str, password: &str, name: &str, role: &str) -> Self {
        RemoteUser {
            username: username.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            status: "active".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct SheetState {
    customers: Vec<Customer>,
    invoices: Vec<Invoice>,
    users: Vec<RemoteUser>,
    emails: Vec<EmailPayload>,
    calls: Vec<String>,
}

/// In-memory spreadsheet collaborator.
#[derive(Debug)]
pub struct InMemoryRemote {
    state: Mutex<SheetState>,
    offline: AtomicBool,
    today: chrono::NaiveDate,
}

impl InMemoryRemote {
    /// Empty sheets, online, with "today" taken from the system clock.
    pub fn new() -> Self {
        Self::with_today(chrono::Local::now().date_naive())
    }

    /// Fixes the date used when `getLatestInvoiceNumber` receives no date.
    pub fn with_today(today: chrono::NaiveDate) -> Self {
        InMemoryRemote {
            state: Mutex::new(SheetState::default()),
            offline: AtomicBool::new(false),
            today,
        }
    }

    /// While offline every call fails like an unreachable host.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub async fn add_user(&self, user: RemoteUser) {
        self.state.lock().await.users.push(user);
    }

    pub async fn seed_customers(&self, customers: Vec<Customer>) {
        self.state.lock().await.customers.extend(customers);
    }

    pub async fn seed_invoices(&self, invoices: Vec<Invoice>) {
        self.state.lock().await.invoices.extend(invoices);
    }

    pub async fn customers(&self) -> Vec<Customer> {
        self.state.lock().await.customers.clone()
    }

    pub async fn invoices(&self) -> Vec<Invoice> {
        self.state.lock().await.invoices.clone()
    }

    pub async fn sent_emails(&self) -> Vec<EmailPayload> {
        self.state.lock().await.emails.clone()
    }

    /// Action names received so far, offline attempts included.
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    /// Answers a raw `{action, data}` body, including actions this crate
    /// never sends.
    pub async fn dispatch_json(&self, body: &Value) -> RpcResponse {
        let action = body.get("action").and_then(Value::as_str).unwrap_or("");
        let mut state = self.state.lock().await;
        state.calls.push(action.to_string());

        match serde_json::from_value::<RpcRequest>(body.clone()) {
            Ok(request) => apply(&mut state, request, self.today),
            Err(_) => RpcResponse::unknown_action(),
        }
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Action Handlers
// =============================================================================

fn apply(state: &mut SheetState, request: RpcRequest, today: chrono::NaiveDate) -> RpcResponse {
    match request {
        RpcRequest::AddCustomer(customer) => add_customer(state, customer),
        RpcRequest::UpdateCustomer(customer) => update_customer(state, customer),
        RpcRequest::AddInvoice(payload) => add_invoice(state, payload.invoice),
        RpcRequest::UpdateInvoice(payload) => update_invoice(state, payload),
        RpcRequest::GetLatestInvoiceNumber(query) => latest_number(state, &query, today),
        RpcRequest::SendInvoiceEmail(email) => send_email(state, email),
        RpcRequest::Login(credentials) => login(state, &credentials),
    }
}

fn add_customer(state: &mut SheetState, customer: Customer) -> RpcResponse {
    state.customers.push(customer);
    RpcResponse::ok("เพิ่มลูกค้าสำเร็จ")
}

fn update_customer(state: &mut SheetState, customer: Customer) -> RpcResponse {
    let tax_id = customer.tax_id.as_str();
    let found = state
        .customers
        .iter_mut()
        .find(|c| !tax_id.is_empty() && c.tax_id.as_str() == tax_id);

    match found {
        Some(existing) => {
            let id = if customer.id.is_empty() {
                existing.id.clone()
            } else {
                customer.id.clone()
            };
            let email = if customer.email.is_empty() {
                existing.email.clone()
            } else {
                customer.email.clone()
            };
            *existing = Customer { id, email, ..customer };
            RpcResponse::ok("อัพเดทลูกค้าสำเร็จ")
        }
        None => add_customer(state, customer),
    }
}

fn add_invoice(state: &mut SheetState, invoice: Invoice) -> RpcResponse {
    state.invoices.push(invoice);
    RpcResponse::ok("บันทึกใบกำกับภาษีสำเร็จ")
}

fn update_invoice(state: &mut SheetState, payload: InvoicePayload) -> RpcResponse {
    let search = payload.match_number().to_string();
    match state
        .invoices
        .iter_mut()
        .find(|i| i.invoice_number.trim() == search)
    {
        Some(existing) => {
            *existing = payload.invoice.clone();
            RpcResponse {
                old_number: payload.original_invoice_number,
                new_number: Some(payload.invoice.invoice_number),
                ..RpcResponse::ok("อัปเดตใบกำกับภาษีสำเร็จ")
            }
        }
        None => add_invoice(state, payload.invoice),
    }
}

fn latest_number(
    state: &SheetState,
    query: &LatestNumberQuery,
    today: chrono::NaiveDate,
) -> RpcResponse {
    if state.invoices.is_empty() {
        return RpcResponse {
            latest_number: Some(0),
            date_prefix: Some(String::new()),
            ..RpcResponse::ok("ยังไม่มีใบกำกับภาษี")
        };
    }

    let prefix = match (&query.date_prefix, &query.date) {
        (Some(p), _) if !p.is_empty() => p.clone(),
        (_, Some(d)) if !d.is_empty() => chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map(date_prefix)
            .unwrap_or_else(|_| date_prefix(today)),
        _ => date_prefix(today),
    };

    let latest = LatestNumber::derive(&prefix, state.invoices.iter().map(|i| &i.invoice_number));
    RpcResponse {
        date_prefix: Some(latest.date_prefix.clone()),
        latest_number: Some(latest.latest_number),
        next_number: Some(latest.next_number),
        message: Some(format!(
            "เลขใบกำกับล่าสุดของวันที่ {}: {}",
            latest.date_prefix, latest.latest_number
        )),
        next_invoice_number: Some(latest.next_invoice_number),
        ..RpcResponse::ok("")
    }
}

fn send_email(state: &mut SheetState, email: EmailPayload) -> RpcResponse {
    if email.customer_email.trim().is_empty() {
        return RpcResponse::failure("กรุณาระบุ email ลูกค้า");
    }
    if email.invoice_html.trim().is_empty() {
        return RpcResponse::failure("ไม่พบข้อมูลใบกำกับภาษี");
    }

    let sent_to = email.customer_email.clone();
    state.emails.push(email);
    RpcResponse {
        sent_to: Some(sent_to.clone()),
        ..RpcResponse::ok(format!("ส่ง email ไปยัง {} สำเร็จ", sent_to))
    }
}

fn login(state: &SheetState, credentials: &Credentials) -> RpcResponse {
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return RpcResponse::failure("กรุณากรอกชื่อผู้ใช้และรหัสผ่าน");
    }

    let wanted = credentials.username.to_lowercase();
    let Some(user) = state
        .users
        .iter()
        .find(|u| u.username.trim().to_lowercase() == wanted)
    else {
        return RpcResponse::failure("ไม่พบชื่อผู้ใช้นี้ในระบบ");
    };

    if user.password != credentials.password {
        return RpcResponse::failure("รหัสผ่านไม่ถูกต้อง");
    }
    if !user.status.eq_ignore_ascii_case("active") {
        return RpcResponse::failure("บัญชีถูกระงับการใช้งาน");
    }

    RpcResponse {
        user: Some(UserProfile {
            username: user.username.trim().to_string(),
            name: user.name.clone(),
            role: user.role.clone(),
        }),
        ..RpcResponse::ok("เข้าสู่ระบบสำเร็จ")
    }
}

// =============================================================================
// Sheet Rendering
// =============================================================================

fn customer_row(customer: &Customer) -> SheetRow {
    SheetRow::new()
        .with("รหัสลูกค้า", customer.id.as_str())
        .with("ชื่อลูกค้า", customer.name.as_str())
        .with("ที่อยู่", customer.address.as_str())
        .with("เลขผู้เสียภาษี", customer.tax_id.as_str())
        .with("เบอร์โทร", customer.phone.as_str())
        .with("Email", customer.email.as_str())
}

fn invoice_row(invoice: &Invoice) -> SheetRow {
    let items = serde_json::to_string(&invoice.items).unwrap_or_else(|_| "[]".to_string());
    let payment = serde_json::to_string(&invoice.payment).unwrap_or_default();
    SheetRow::new()
        .with("เลขที่ใบกำกับ", invoice.invoice_number.as_str())
        .with("วันที่", invoice.date.as_str())
        .with("ลูกค้า", invoice.customer_name.as_str())
        .with("ที่อยู่", invoice.customer_address.as_str())
        .with("เลขผู้เสียภาษี", invoice.customer_tax_id.as_str())
        .with("ราคารวม", invoice.subtotal.to_baht_f64())
        .with("VAT", invoice.vat.to_baht_f64())
        .with("รวมทั้งสิ้น", invoice.total.to_baht_f64())
        .with("รายการ", items)
        .with("payment", payment)
        .with("branchType", invoice.branch_type.to_string())
        .with("branchNumber", invoice.branch_number.as_str())
}

#[async_trait]
impl RemoteCollaborator for InMemoryRemote {
    async fn call(&self, request: &RpcRequest) -> SyncResult<RpcResponse> {
        if self.is_offline() {
            self.state.lock().await.calls.push(request.action().to_string());
            return Err(SyncError::ConnectionFailed("remote is offline".into()));
        }

        let body: Value = serde_json::from_str(&request.to_json()?)?;
        debug!(action = request.action(), "In-memory remote call");
        self.dispatch_json(&body).await.into_result()
    }

    async fn fetch_sheet(&self, sheet: SheetName) -> SyncResult<Vec<SheetRow>> {
        if self.is_offline() {
            return Err(SyncError::ConnectionFailed("remote is offline".into()));
        }

        let state = self.state.lock().await;
        Ok(match sheet {
            SheetName::Customers => state.customers.iter().map(customer_row).collect(),
            SheetName::Invoices => state.invoices.iter().map(invoice_row).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{customers_from_rows, invoices_from_rows};
    use baht_core::{DigitString, InvoiceItem, Money};
    use chrono::NaiveDate;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 14).unwrap()
    }

    fn invoice(number: &str) -> Invoice {
        Invoice {
            invoice_number: number.to_string(),
            date: "2026-01-14".into(),
            customer_name: "ร้านป้าแดง".into(),
            items: vec![InvoiceItem::new("ค่าอาหาร", 1.0, 107.0)],
            total: Money::from_baht(107),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let remote = InMemoryRemote::with_today(today());
        let response = remote
            .dispatch_json(&json!({"action": "deleteEverything", "data": {}}))
            .await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Unknown action"));
    }

    #[tokio::test]
    async fn test_update_invoice_renames_or_adds() {
        let remote = InMemoryRemote::with_today(today());
        remote.seed_invoices(vec![invoice("2601140001")]).await;

        let renamed = InvoicePayload::renamed(invoice("2601140005"), "2601140001");
        let response = remote.call(&RpcRequest::UpdateInvoice(renamed)).await.unwrap();
        assert_eq!(response.old_number.as_deref(), Some("2601140001"));
        assert_eq!(response.new_number.as_deref(), Some("2601140005"));

        let missing = InvoicePayload::new(invoice("2601140009"));
        remote.call(&RpcRequest::UpdateInvoice(missing)).await.unwrap();

        let numbers: Vec<String> = remote
            .invoices()
            .await
            .into_iter()
            .map(|i| i.invoice_number)
            .collect();
        assert_eq!(numbers, vec!["2601140005", "2601140009"]);
    }

    #[tokio::test]
    async fn test_update_customer_matches_tax_id() {
        let remote = InMemoryRemote::with_today(today());
        remote
            .seed_customers(vec![Customer {
                id: "CUST-1".into(),
                name: "เดิม".into(),
                tax_id: DigitString::new("'0105561234567"),
                email: "old@example.com".into(),
                ..Default::default()
            }])
            .await;

        let update = Customer {
            name: "ใหม่".into(),
            tax_id: DigitString::new("0105561234567"),
            ..Default::default()
        };
        remote.call(&RpcRequest::UpdateCustomer(update)).await.unwrap();

        let customers = remote.customers().await;
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].name, "ใหม่");
        assert_eq!(customers[0].id, "CUST-1");
        assert_eq!(customers[0].email, "old@example.com");
    }

    #[tokio::test]
    async fn test_latest_number() {
        let remote = InMemoryRemote::with_today(today());
        let query = RpcRequest::GetLatestInvoiceNumber(LatestNumberQuery {
            date: Some("2026-01-14".into()),
            date_prefix: None,
        });

        let empty = remote.call(&query).await.unwrap();
        assert_eq!(empty.latest_number, Some(0));
        assert_eq!(empty.next_number, None);

        remote
            .seed_invoices(vec![
                invoice("2601140003"),
                invoice("2601140010"),
                invoice("2601130099"),
                invoice("260114abc"),
            ])
            .await;
        let response = remote.call(&query).await.unwrap();
        assert_eq!(response.latest_number, Some(10));
        assert_eq!(response.next_invoice_number.as_deref(), Some("2601140011"));
    }

    #[tokio::test]
    async fn test_send_email_requires_fields() {
        let remote = InMemoryRemote::with_today(today());
        let mut email = EmailPayload {
            invoice_number: "2601140001".into(),
            invoice_html: "<p>ok</p>".into(),
            ..Default::default()
        };
        assert!(matches!(
            remote.call(&RpcRequest::SendInvoiceEmail(email.clone())).await,
            Err(SyncError::Remote(_))
        ));

        email.customer_email = "daeng@example.com".into();
        let response = remote.call(&RpcRequest::SendInvoiceEmail(email)).await.unwrap();
        assert_eq!(response.sent_to.as_deref(), Some("daeng@example.com"));
        assert_eq!(remote.sent_emails().await.len(), 1);
    }

    #[tokio::test]
    async fn test_login() {
        let remote = InMemoryRemote::with_today(today());
        remote
            .add_user(RemoteUser::active("Somchai", "pw", "สมชาย", "user"))
            .await;
        remote
            .add_user(RemoteUser {
                status: "suspended".into(),
                ..RemoteUser::active("nok", "pw", "นก", "user")
            })
            .await;

        let ok = remote
            .call(&RpcRequest::Login(Credentials {
                username: "SOMCHAI".into(),
                password: "pw".into(),
            }))
            .await
            .unwrap();
        assert_eq!(ok.user.unwrap().username, "Somchai");

        let suspended = remote
            .call(&RpcRequest::Login(Credentials {
                username: "nok".into(),
                password: "pw".into(),
            }))
            .await;
        assert!(matches!(suspended, Err(SyncError::Remote(_))));
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let remote = InMemoryRemote::with_today(today());
        remote.set_offline(true);

        let err = remote
            .call(&RpcRequest::AddInvoice(InvoicePayload::new(invoice("2601140001"))))
            .await
            .unwrap_err();
        assert!(err.is_remote_failure());
        assert!(remote.fetch_sheet(SheetName::Invoices).await.is_err());
        assert_eq!(remote.calls().await, vec!["addInvoice"]);
        assert!(remote.invoices().await.is_empty());
    }

    #[tokio::test]
    async fn test_sheet_rows_map_back() {
        let remote = InMemoryRemote::with_today(today());
        remote.seed_invoices(vec![invoice("2601140001")]).await;
        remote
            .seed_customers(vec![Customer {
                id: "CUST-1".into(),
                name: "ร้านป้าแดง".into(),
                tax_id: DigitString::new("0105561234567"),
                ..Default::default()
            }])
            .await;

        let invoices = invoices_from_rows(&remote.fetch_sheet(SheetName::Invoices).await.unwrap());
        assert_eq!(invoices[0].invoice_number, "2601140001");
        assert_eq!(invoices[0].items.len(), 1);
        assert_eq!(invoices[0].total, Money::from_baht(107));

        let customers =
            customers_from_rows(&remote.fetch_sheet(SheetName::Customers).await.unwrap());
        assert_eq!(customers[0].tax_id.as_str(), "0105561234567");
    }
}
