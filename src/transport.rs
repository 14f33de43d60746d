//! HTTP transport to an Elasticsearch-compatible endpoint

use reqwest::blocking::Client;
use reqwest::Method;
use std::time::Duration;
use tracing::debug;

use crate::error::{FilterQlError, Result};
use crate::service::RawTransport;

/// Blocking [`RawTransport`] over `reqwest`
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FilterQlError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RawTransport for HttpTransport {
    fn perform_request(
        &self,
        method: &str,
        path: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<Vec<u8>> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| FilterQlError::Transport(format!("Invalid method {}: {}", method, e)))?;
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, url = url.as_str(), "Sending request");

        let mut request = self.client.request(method, &url).body(body.to_vec());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .map_err(|e| FilterQlError::Transport(format!("Request to {} failed: {}", url, e)))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .map_err(|e| FilterQlError::Transport(format!("Failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(FilterQlError::Transport(format!(
                "{} returned {}: {}",
                url,
                status,
                String::from_utf8_lossy(&bytes)
            )));
        }
        Ok(bytes.to_vec())
    }
}
