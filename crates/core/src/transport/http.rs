//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client};
use tracing::debug;

use super::{Method, Transport, TransportError, TransportRequest, TransportResponse};

/// Default user agent sent to trackers.
const USER_AGENT: &str = concat!("trackline/", env!("CARGO_PKG_VERSION"));

/// HTTP transport over a shared reqwest client.
///
/// Redirects are surfaced to the caller instead of followed, since a redirect
/// to the login page is how most trackers signal an expired session. Cookies
/// are managed by the session layer, not by a cookie jar.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an already-configured client (proxies, custom TLS).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        base_url: &str,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let url = request.url(base_url);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url).form(&request.form),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

        debug!(status, bytes = body.len(), path = %request.path, "Transport response");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}
