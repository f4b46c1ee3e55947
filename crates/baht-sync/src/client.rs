//! # HTTP Remote
//!
//! [`RemoteCollaborator`] over HTTP: RPC to the script endpoint, bulk reads
//! from the spreadsheet's query endpoint.
//!
//! ## Requests
//! ```text
//! RPC    POST {script_url}
//!        Content-Type: text/plain;charset=utf-8
//!        {"action":"addInvoice","data":{...}}
//!
//! READ   GET  {origin}/spreadsheets/d/{id}/gviz/tq?tqx=out:json&sheet=Invoices
//! ```
//! The script host rejects `application/json` preflights from browsers, so
//! the body goes out as plain text like the web client sends it.
//!
//! Reads (`fetch_sheet`, `getLatestInvoiceNumber`, `login`) are bounded by
//! the configured read timeout. Writes use the transport default.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};
use url::Url;

use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{RpcRequest, RpcResponse};
use crate::remote::RemoteCollaborator;
use crate::sheet::{parse_gviz, SheetName, SheetRow};

/// Spreadsheet reference parsed from a sheets URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetEndpoint {
    origin: String,
    spreadsheet_id: String,
}

/// HTTP client for the spreadsheet collaborator.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    script_url: Option<Url>,
    sheet: Option<SheetEndpoint>,
    read_timeout: Duration,
}

impl HttpRemote {
    /// Builds a client from config. Missing endpoints are allowed; calls that
    /// need them fail with [`SyncError::NotConfigured`].
    pub fn new(settings: &RemoteSettings) -> SyncResult<Self> {
        Self::from_urls(
            settings.script_url.as_deref(),
            settings.sheets_url.as_deref(),
            Duration::from_secs(settings.read_timeout_secs),
        )
    }

    pub fn from_urls(
        script_url: Option<&str>,
        sheets_url: Option<&str>,
        read_timeout: Duration,
    ) -> SyncResult<Self> {
        let script_url = script_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(Url::parse)
            .transpose()?;

        let sheet = match sheets_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(raw) => {
                let url = Url::parse(raw)?;
                let spreadsheet_id = parse_spreadsheet_id(raw).ok_or_else(|| {
                    SyncError::InvalidUrl(format!("not a spreadsheet URL: {}", raw))
                })?;
                Some(SheetEndpoint {
                    origin: url.origin().ascii_serialization(),
                    spreadsheet_id,
                })
            }
            None => None,
        };

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SyncError::Internal(e.to_string()))?;

        Ok(HttpRemote {
            client,
            script_url,
            sheet,
            read_timeout,
        })
    }

    fn timeout_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.read_timeout.as_secs())
        } else {
            SyncError::from(err)
        }
    }
}

/// Extracts the spreadsheet id from `.../spreadsheets/d/{id}/...`.
pub fn parse_spreadsheet_id(url: &str) -> Option<String> {
    const MARKER: &str = "/spreadsheets/d/";
    let start = url.find(MARKER)? + MARKER.len();
    let id: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[async_trait]
impl RemoteCollaborator for HttpRemote {
    async fn call(&self, request: &RpcRequest) -> SyncResult<RpcResponse> {
        let url = self
            .script_url
            .clone()
            .ok_or(SyncError::NotConfigured("script_url"))?;

        let body = request.to_json()?;
        debug!(action = request.action(), key = %request.entity_key(), "Calling remote");

        let mut builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body);
        if request.is_read() {
            builder = builder.timeout(self.read_timeout);
        }

        let response = builder.send().await.map_err(|e| self.timeout_error(e))?;
        let status = response.status();
        if !status.is_success() {
            warn!(action = request.action(), status = status.as_u16(), "Remote returned HTTP error");
            return Err(SyncError::Http {
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| self.timeout_error(e))?;
        let parsed: RpcResponse = serde_json::from_str(&text)
            .map_err(|e| SyncError::InvalidResponse(e.to_string()))?;

        parsed.into_result()
    }

    async fn fetch_sheet(&self, sheet: SheetName) -> SyncResult<Vec<SheetRow>> {
        let endpoint = self
            .sheet
            .as_ref()
            .ok_or(SyncError::NotConfigured("sheets_url"))?;

        let mut url = Url::parse(&format!(
            "{}/spreadsheets/d/{}/gviz/tq",
            endpoint.origin, endpoint.spreadsheet_id
        ))?;
        url.query_pairs_mut()
            .append_pair("tqx", "out:json")
            .append_pair("sheet", sheet.as_str());

        debug!(sheet = %sheet, "Fetching sheet");

        let response = self
            .client
            .get(url)
            .timeout(self.read_timeout)
            .send()
            .await
            .map_err(|e| self.timeout_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.timeout_error(e))?;
        let rows = parse_gviz(&body)?;
        debug!(sheet = %sheet, rows = rows.len(), "Sheet fetched");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Credentials, LatestNumberQuery};
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_for(server: &MockServer, timeout: Duration) -> HttpRemote {
        HttpRemote::from_urls(
            Some(&format!("{}/macros/s/abc/exec", server.uri())),
            Some(&format!("{}/spreadsheets/d/sheet-123_x/edit#gid=0", server.uri())),
            timeout,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_spreadsheet_id() {
        assert_eq!(
            parse_spreadsheet_id("https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=0"),
            Some("1AbC-d_9".to_string())
        );
        assert_eq!(parse_spreadsheet_id("https://example.com/doc"), None);
    }

    #[test]
    fn test_rejects_non_spreadsheet_url() {
        let err = HttpRemote::from_urls(None, Some("https://example.com/x"), Duration::from_secs(10))
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_call_posts_action_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/macros/s/abc/exec"))
            .and(body_string_contains("\"action\":\"getLatestInvoiceNumber\""))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"success":true,"datePrefix":"260114","latestNumber":3,"nextNumber":4,"nextInvoiceNumber":"2601140004"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let remote = remote_for(&server, Duration::from_secs(5));
        let request = RpcRequest::GetLatestInvoiceNumber(LatestNumberQuery {
            date: None,
            date_prefix: Some("260114".into()),
        });
        let response = remote.call(&request).await.unwrap();
        assert_eq!(response.latest_number("260114").next_invoice_number, "2601140004");
    }

    #[tokio::test]
    async fn test_success_false_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"success":false,"error":"รหัสผ่านไม่ถูกต้อง"}"#),
            )
            .mount(&server)
            .await;

        let remote = remote_for(&server, Duration::from_secs(5));
        let request = RpcRequest::Login(Credentials {
            username: "admin".into(),
            password: "wrong".into(),
        });
        match remote.call(&request).await {
            Err(SyncError::Remote(reason)) => assert_eq!(reason, "รหัสผ่านไม่ถูกต้อง"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_html_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>error</html>"))
            .mount(&server)
            .await;

        let remote = remote_for(&server, Duration::from_secs(5));
        let request = RpcRequest::Login(Credentials::default());
        let err = remote.call(&request).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidResponse(_)));
        assert!(err.is_remote_failure());
    }

    #[tokio::test]
    async fn test_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let remote = remote_for(&server, Duration::from_secs(5));
        let err = remote
            .call(&RpcRequest::Login(Credentials::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Http { status: 503 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_read_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"success":true}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let remote = remote_for(&server, Duration::from_millis(200));
        let err = remote
            .call(&RpcRequest::Login(Credentials::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fetch_sheet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spreadsheets/d/sheet-123_x/gviz/tq"))
            .and(query_param("tqx", "out:json"))
            .and(query_param("sheet", "Customers"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"/*O_o*/ google.visualization.Query.setResponse({"status":"ok","table":{"cols":[{"id":"A","label":"ชื่อลูกค้า"}],"rows":[{"c":[{"v":"ร้านป้าแดง"}]}]}});"#,
            ))
            .mount(&server)
            .await;

        let remote = remote_for(&server, Duration::from_secs(5));
        let rows = remote.fetch_sheet(SheetName::Customers).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text(&["ชื่อลูกค้า"], None), "ร้านป้าแดง");
    }

    #[tokio::test]
    async fn test_unconfigured_endpoints() {
        let remote = HttpRemote::from_urls(None, None, Duration::from_secs(10)).unwrap();
        assert!(matches!(
            remote.call(&RpcRequest::Login(Credentials::default())).await,
            Err(SyncError::NotConfigured("script_url"))
        ));
        assert!(matches!(
            remote.fetch_sheet(SheetName::Invoices).await,
            Err(SyncError::NotConfigured("sheets_url"))
        ));
    }
}
