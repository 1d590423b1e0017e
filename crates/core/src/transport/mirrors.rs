//! Base URL failover.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::warn;

use super::{Transport, TransportError, TransportRequest, TransportResponse};

/// A tracker's base URL plus fallback mirrors.
///
/// The mirror that last answered stays active for later requests.
#[derive(Debug)]
pub struct MirrorSet {
    urls: Vec<String>,
    active: AtomicUsize,
}

impl MirrorSet {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            active: AtomicUsize::new(0),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// The base URL requests currently go to.
    pub fn active(&self) -> String {
        let index = self.active.load(Ordering::SeqCst);
        self.urls.get(index).cloned().unwrap_or_default()
    }

    /// Send `request`, moving on to the next mirror on connection failure.
    ///
    /// Every mirror is tried at most once, starting from the active one.
    /// Returns the base URL that answered alongside the response.
    pub async fn send(
        &self,
        transport: &dyn Transport,
        request: &TransportRequest,
    ) -> Result<(String, TransportResponse), TransportError> {
        if self.urls.is_empty() {
            return Err(TransportError::Other("no base URL configured".to_string()));
        }

        let start = self.active.load(Ordering::SeqCst);
        let mut last_error = TransportError::Other("no mirror attempted".to_string());

        for step in 0..self.urls.len() {
            let index = (start + step) % self.urls.len();
            let base_url = &self.urls[index];
            match transport.send(base_url, request).await {
                Ok(response) => {
                    if index != start {
                        self.active.store(index, Ordering::SeqCst);
                    }
                    return Ok((base_url.clone(), response));
                }
                Err(TransportError::Connect(msg)) => {
                    warn!(base_url = %base_url, error = %msg, "Mirror unreachable, trying next");
                    last_error = TransportError::Connect(msg);
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_error)
    }

    /// Borrow `inner` as a transport that fails over across this set.
    pub fn over<'a>(&'a self, inner: &'a dyn Transport) -> Failover<'a> {
        Failover {
            mirrors: self,
            inner,
        }
    }
}

/// A transport routed through a [`MirrorSet`].
///
/// The base URL given to `send` is ignored; the active mirror is used.
pub struct Failover<'a> {
    mirrors: &'a MirrorSet,
    inner: &'a dyn Transport,
}

#[async_trait]
impl Transport for Failover<'_> {
    async fn send(
        &self,
        _base_url: &str,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.mirrors
            .send(self.inner, request)
            .await
            .map(|(_, response)| response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    #[tokio::test]
    async fn test_fails_over_and_remembers_mirror() {
        let transport = MockTransport::new();
        transport.fail_base("https://primary.example", TransportError::Connect("refused".into()));
        transport.on("ajax.php", TransportResponse::new(200, "{}"));

        let mirrors = MirrorSet::new(vec![
            "https://primary.example".to_string(),
            "https://mirror.example".to_string(),
        ]);
        let request = TransportRequest::get("ajax.php");

        let (base, response) = mirrors.send(&transport, &request).await.unwrap();
        assert_eq!(base, "https://mirror.example");
        assert_eq!(response.status, 200);
        assert_eq!(mirrors.active(), "https://mirror.example");

        mirrors.send(&transport, &request).await.unwrap();
        // Second call goes straight to the mirror.
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_timeout_does_not_fail_over() {
        let transport = MockTransport::new();
        transport.fail_base("https://primary.example", TransportError::Timeout);

        let mirrors = MirrorSet::new(vec![
            "https://primary.example".to_string(),
            "https://mirror.example".to_string(),
        ]);
        let result = mirrors.send(&transport, &TransportRequest::get("x")).await;

        assert_eq!(result.unwrap_err(), TransportError::Timeout);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_all_mirrors_down() {
        let transport = MockTransport::new();
        transport.fail_base("https://a.example", TransportError::Connect("a".into()));
        transport.fail_base("https://b.example", TransportError::Connect("b".into()));

        let mirrors = MirrorSet::new(vec![
            "https://a.example".to_string(),
            "https://b.example".to_string(),
        ]);
        let result = mirrors.send(&transport, &TransportRequest::get("x")).await;

        assert!(matches!(result, Err(TransportError::Connect(_))));
        assert_eq!(mirrors.active(), "https://a.example");
    }
}
