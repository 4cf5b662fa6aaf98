//! HTTP seam. The real implementation wraps reqwest with a cookie store;
//! flow logic never sees cookies, redirects, or TLS.

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use thiserror::Error;

use crate::config::BankConfig;

/// Network-level failure. Server responses, even error pages, come back as a
/// [`Page`] instead so callers can classify by status and body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// One response from the bank.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub body: String,
    /// Filename from `Content-Disposition: attachment`, when the server
    /// suggests one (the CSV download does).
    pub attachment_name: Option<String>,
}

impl Page {
    pub fn ok(body: impl Into<String>) -> Self {
        Page {
            status: 200,
            body: body.into(),
            attachment_name: None,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Opaque request capability against the (possibly authenticated) banking
/// session. Exactly one instance exists per run.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Page, TransportError>;
    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<Page, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &BankConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:140.0) Gecko/20100101 Firefox/140.0")
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn read(response: reqwest::Response) -> Result<Page, TransportError> {
        let status = response.status().as_u16();
        let attachment_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_attachment_name);
        // reqwest decodes the body per the response charset; the bank still
        // serves ISO-8859-1 for CSV downloads.
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Page {
            status,
            body,
            attachment_name,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Page, TransportError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Self::read(response).await
    }

    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<Page, TransportError> {
        let response = self
            .client
            .post(self.url(path))
            .form(fields)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Self::read(response).await
    }
}

fn parse_attachment_name(header: &str) -> Option<String> {
    let rest = header.strip_prefix("attachment; filename=")?;
    let name = rest.trim().trim_matches('"').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
