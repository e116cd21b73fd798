//! Upstream data collaborator
//!
//! A read-only JSON-over-HTTP client for `data.sec.gov`. Only one attempt is
//! made per request; every transport failure or non-2xx status surfaces as
//! [`Error::UpstreamUnavailable`] and callers decide how to degrade.

use crate::error::{Error, Result};
use crate::path::UpstreamPath;
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// SEC EDGAR API base URL
pub const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// Anything that can resolve an [`UpstreamPath`] to a JSON document.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch_json(&self, path: &UpstreamPath) -> Result<Value>;
}

/// Identifying contact sent with every request (SEC requires one).
#[derive(Debug, Clone)]
pub struct Contact {
    pub company: String,
    pub email: String,
}

impl Contact {
    pub fn user_agent(&self) -> String {
        format!("{} {}", self.company, self.email)
    }
}

pub struct EdgarClient {
    client: reqwest::Client,
    base_url: String,
}

impl EdgarClient {
    pub fn new(contact: &Contact) -> Result<Self> {
        Self::builder(contact).build()
    }

    pub fn builder(contact: &Contact) -> EdgarClientBuilder {
        EdgarClientBuilder {
            user_agent: contact.user_agent(),
            base_url: EDGAR_BASE_URL.to_string(),
            timeout: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

pub struct EdgarClientBuilder {
    user_agent: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl EdgarClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Without a timeout a hung upstream stalls the calling session.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<EdgarClient> {
        // gzip/deflate features make reqwest send Accept-Encoding and decode bodies
        let mut builder = reqwest::Client::builder().user_agent(
            HeaderValue::from_str(&self.user_agent)
                .map_err(|_| Error::fatal("Contact contains characters not allowed in a header"))?,
        );
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| Error::fatal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(EdgarClient {
            client,
            base_url: self.base_url,
        })
    }
}

#[async_trait]
impl Upstream for EdgarClient {
    async fn fetch_json(&self, path: &UpstreamPath) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path.render());
        debug!(url = %url, "SEC request");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "SEC request failed");
            Error::upstream(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "SEC request returned error status");
            return Err(Error::upstream(format!("HTTP {} for {}", status, path)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::upstream(format!("Invalid JSON from {}: {}", path, e)))
    }
}

impl std::fmt::Debug for EdgarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgarClient").field("base_url", &self.base_url).finish()
    }
}
