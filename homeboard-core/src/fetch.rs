//! Single-shot HTTP GET of a source page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::ports::PortError;

/// Browser-like user agent some upstream sites insist on.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Clone)]
/// Description of one outbound request.
pub struct FetchRequest {
    /// Absolute URL to GET.
    pub url: String,
    /// Extra request headers as name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request timeout; `None` leaves it to the transport default.
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    /// Plain GET without extra headers or timeout.
    #[must_use]
    pub fn get<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    /// Add a request header.
    #[must_use]
    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send the browser-like user agent.
    #[must_use]
    pub fn browser_user_agent(self) -> Self {
        self.header("User-Agent", BROWSER_USER_AGENT)
    }

    /// Bound the request by an explicit timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
/// Trait for retrieving the raw text of a page.
pub trait FetchPort: Send + Sync {
    /// Perform exactly one GET for the request. No retries.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Fetch`] on transport failure, timeout, or non-2xx
    /// status, and [`PortError::Decode`] when the body is not valid UTF-8.
    async fn fetch(&self, request: &FetchRequest) -> Result<String, PortError>;
}

/// [`FetchPort`] backed by a shared reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchPort for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, PortError> {
        let mut req = self.client.get(&request.url);
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        tracing::debug!(url = %request.url, "fetching source page");

        let body = req
            .send()
            .await
            .map_err(PortError::from)?
            .error_for_status()
            .map_err(PortError::from)?
            .bytes()
            .await
            .map_err(PortError::from)?;

        String::from_utf8(body.to_vec()).map_err(PortError::from)
    }
}
