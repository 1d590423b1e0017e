//! The tracker-family client.
//!
//! Composes session, throttle, query translation and row mapping for one
//! tracker. Tracker-specific behavior comes only from the [`TrackerProfile`]
//! and the injected [`AdapterHooks`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::{create_authenticator, Session, SessionManager};
use crate::metrics;
use crate::transport::{MirrorSet, Transport, TransportError, TransportRequest, TransportResponse};

use super::discount::scalar_string;
use super::hooks::AdapterHooks;
use super::mapper::{flatten_rows, map_rows, MapContext};
use super::profile::TrackerProfile;
use super::query;
use super::rate_limiter::RequestThrottle;
use super::types::{
    ErrorPhase, SearchQuery, SearchResult, Tracker, TrackerError, TrackerErrorKind,
};

/// How a response relates to the session that sent it.
enum Verdict {
    Usable,
    Expired,
    RateLimited(Option<u64>),
}

/// Shared client for one tracker of the family.
pub struct TrackerClient {
    profile: Arc<TrackerProfile>,
    transport: Arc<dyn Transport>,
    mirrors: Arc<MirrorSet>,
    session: SessionManager,
    throttle: Arc<RequestThrottle>,
    hooks: AdapterHooks,
}

impl TrackerClient {
    pub fn new(profile: TrackerProfile, transport: Arc<dyn Transport>) -> Result<Self, TrackerError> {
        let authenticator = create_authenticator(&profile.credentials, &profile.auth)
            .map_err(|e| TrackerError::new(&profile.id, ErrorPhase::Auth, e.into()))?;
        let mirrors = Arc::new(MirrorSet::new(profile.base_urls.clone()));
        let session = SessionManager::new(
            profile.id.clone(),
            authenticator,
            Arc::clone(&transport),
            Arc::clone(&mirrors),
            profile.passkey.clone(),
        );
        let throttle = Arc::new(RequestThrottle::new(
            profile.site(),
            profile.min_request_delay,
        ));

        Ok(Self {
            profile: Arc::new(profile),
            transport,
            mirrors,
            session,
            throttle,
            hooks: AdapterHooks::default(),
        })
    }

    /// Share request timing with other clients of the same tracker.
    pub fn with_throttle(mut self, throttle: Arc<RequestThrottle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_hooks(mut self, hooks: AdapterHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn profile(&self) -> &TrackerProfile {
        &self.profile
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Base URL requests currently go to.
    pub fn active_base_url(&self) -> String {
        self.mirrors.active()
    }

    /// Run one search and map the returned page.
    ///
    /// A search that matches nothing is a successful, empty result.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult, TrackerError> {
        let started = Instant::now();
        let result = self.run_search(query).await;
        let elapsed = started.elapsed();

        let tracker = self.profile.id.as_str();
        metrics::SEARCH_DURATION
            .with_label_values(&[tracker])
            .observe(elapsed.as_secs_f64());
        let label = match &result {
            Ok(found) if found.is_empty() => "empty",
            Ok(_) => "success",
            Err(e) => e.kind.label(),
        };
        metrics::SEARCHES_TOTAL.with_label_values(&[tracker, label]).inc();

        result.map(|mut found| {
            found.duration_ms = elapsed.as_millis() as u64;
            found
        })
    }

    /// [`search`](Self::search) that stops as soon as `cancel` fires.
    pub async fn search_cancellable(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, TrackerError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(self.error(ErrorPhase::Query, TrackerErrorKind::Cancelled)),
            result = self.search(query) => result,
        }
    }

    /// Fetch a torrent file from a download URL produced by this client.
    ///
    /// When a token download is refused because no tokens are left, the
    /// download is retried once without the token marker.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, TrackerError> {
        let tracker = self.profile.id.as_str();
        let tokens = &self.profile.tokens;
        let with_token = tokens.supported && has_param(url, &tokens.param, &tokens.value);

        let result = match self.fetch(url).await {
            Err(e) if with_token && e.kind == TrackerErrorKind::Api(TOKENS_EXHAUSTED.to_string()) => {
                warn!(tracker = %tracker, "No freeleech tokens left, downloading without token");
                metrics::TOKEN_DOWNLOADS
                    .with_label_values(&[tracker, "fallback"])
                    .inc();
                self.fetch(&strip_param(url, &tokens.param)).await
            }
            Ok(body) => {
                if with_token {
                    metrics::TOKEN_DOWNLOADS.with_label_values(&[tracker, "spent"]).inc();
                }
                Ok(body)
            }
            other => other,
        };

        let label = match &result {
            Ok(_) => "success",
            Err(e) => e.kind.label(),
        };
        metrics::DOWNLOADS_TOTAL.with_label_values(&[tracker, label]).inc();
        result
    }

    /// [`download`](Self::download) that stops as soon as `cancel` fires.
    pub async fn download_cancellable(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TrackerError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(self.error(ErrorPhase::Download, TrackerErrorKind::Cancelled)),
            result = self.download(url) => result,
        }
    }

    async fn run_search(&self, query: &SearchQuery) -> Result<SearchResult, TrackerError> {
        let request = query::build(&self.profile, query);
        debug!(
            tracker = %self.profile.id,
            path = %request.path,
            params = request.query.len(),
            "Searching"
        );

        let (base_url, response, session) = self.execute(&request, ErrorPhase::Query).await?;
        if !response.is_success() {
            return Err(self.error(
                ErrorPhase::Query,
                TrackerErrorKind::Http {
                    status: response.status,
                },
            ));
        }

        let body: Value = serde_json::from_slice(&response.body).map_err(|e| {
            self.error(
                ErrorPhase::Parse,
                TrackerErrorKind::MalformedResponse(format!("invalid JSON: {}", e)),
            )
        })?;
        self.check_status(&body)?;
        let rows = self.extract_rows(&body)?;
        let rows = flatten_rows(&rows, self.profile.response.nested_rows_key.as_deref());

        let ctx = MapContext {
            profile: &self.profile,
            hooks: &self.hooks,
            session: &session,
            base_url: &base_url,
            query,
        };
        let mapped = map_rows(&ctx, &rows);

        let tracker = self.profile.id.as_str();
        for (outcome, count) in [
            ("mapped", mapped.releases.len()),
            ("failed", mapped.failures.len()),
            ("skipped", mapped.skipped.len()),
        ] {
            metrics::ROWS_MAPPED
                .with_label_values(&[tracker, outcome])
                .inc_by(count as u64);
        }
        for failure in &mapped.failures {
            warn!(
                tracker = %tracker,
                row = failure.index,
                torrent_id = ?failure.torrent_id,
                error = %failure.detail,
                "Skipping unparsable row"
            );
        }
        debug!(
            tracker = %tracker,
            rows = rows.len(),
            releases = mapped.releases.len(),
            skipped = mapped.skipped.len(),
            "Search mapped"
        );

        Ok(SearchResult {
            tracker: self.profile.id.clone(),
            releases: mapped.releases,
            row_failures: mapped.failures,
            skipped: mapped.skipped,
            duration_ms: 0,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TrackerError> {
        let request = TransportRequest::get(self.relative_to_mirror(url));
        let mut response = if request.is_absolute() {
            // Credentials only ever go to configured mirrors.
            debug!(tracker = %self.profile.id, "Download host is not a mirror, sending without credentials");
            self.send_plain(&request).await?
        } else {
            self.execute(&request, ErrorPhase::Download).await?.1
        };

        // One hop to a storage host; login redirects were handled in execute.
        if response.is_redirect() {
            if let Some(location) = response.location().map(str::to_string) {
                debug!(tracker = %self.profile.id, "Following download redirect");
                response = self.send_plain(&TransportRequest::get(location)).await?;
            }
        }

        if !looks_like_torrent(&response.body) {
            let text = response.text().to_lowercase();
            if contains_any(&text, &self.profile.tokens.failure_markers) {
                return Err(self.error(
                    ErrorPhase::Download,
                    TrackerErrorKind::Api(TOKENS_EXHAUSTED.to_string()),
                ));
            }
        }
        if !response.is_success() {
            return Err(self.error(
                ErrorPhase::Download,
                TrackerErrorKind::Http {
                    status: response.status,
                },
            ));
        }
        Ok(response.body)
    }

    /// Send a download request without session credentials.
    async fn send_plain(&self, request: &TransportRequest) -> Result<TransportResponse, TrackerError> {
        self.throttle.acquire().await;
        let (_, response) = self
            .mirrors
            .send(self.transport.as_ref(), request)
            .await
            .map_err(|e| self.error(ErrorPhase::Download, transport_kind(e)))?;
        Ok(response)
    }

    /// Send with session handling.
    ///
    /// An expired session is refreshed and the request resent exactly once;
    /// a second expiry fails with `SessionExpired`.
    async fn execute(
        &self,
        request: &TransportRequest,
        phase: ErrorPhase,
    ) -> Result<(String, TransportResponse, Session), TrackerError> {
        for attempt in 0..2 {
            let session = self
                .session
                .ensure_authenticated()
                .await
                .map_err(|e| self.error(ErrorPhase::Auth, e.into()))?;

            let mut authorized = request.clone();
            self.session.authorize(&session, &mut authorized);

            self.throttle.acquire().await;
            let (base_url, response) = self
                .mirrors
                .send(self.transport.as_ref(), &authorized)
                .await
                .map_err(|e| self.error(phase, transport_kind(e)))?;

            match self.classify(&response) {
                Verdict::Usable => return Ok((base_url, response, session)),
                Verdict::RateLimited(retry_after_secs) => {
                    warn!(tracker = %self.profile.id, ?retry_after_secs, "Rate limited");
                    return Err(self.error(phase, TrackerErrorKind::RateLimited { retry_after_secs }));
                }
                Verdict::Expired => {
                    warn!(
                        tracker = %self.profile.id,
                        status = response.status,
                        attempt,
                        "Session expired"
                    );
                    self.session.invalidate_stale(&session).await;
                }
            }
        }

        info!(tracker = %self.profile.id, "Session still expired after relogin, giving up");
        Err(self.error(ErrorPhase::Auth, TrackerErrorKind::SessionExpired))
    }

    fn classify(&self, response: &TransportResponse) -> Verdict {
        let auth = &self.profile.auth;

        if response.status == 429 {
            let retry_after = response
                .header("Retry-After")
                .and_then(|v| v.trim().parse().ok());
            return Verdict::RateLimited(retry_after);
        }

        if response.is_redirect() {
            let location = response.location().unwrap_or_default().to_lowercase();
            if contains_any(&location, &auth.expiry.redirect_markers) {
                return Verdict::Expired;
            }
        }
        if auth.expiry.statuses.contains(&response.status) {
            return Verdict::Expired;
        }

        if let Some(text) = self.error_text(response) {
            if contains_any(&text, &auth.rate_limit_markers) {
                return Verdict::RateLimited(None);
            }
            if contains_any(&text, &auth.expiry.body_markers) {
                return Verdict::Expired;
            }
        }
        Verdict::Usable
    }

    /// Lowercased text that may carry a failure marker.
    ///
    /// Successful result sets and torrent files are never inspected, so a
    /// release title containing a marker phrase cannot trip expiry.
    fn error_text(&self, response: &TransportResponse) -> Option<String> {
        if !response.is_success() {
            return Some(response.text().to_lowercase());
        }
        if looks_like_torrent(&response.body) {
            return None;
        }
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(body) => {
                let layout = &self.profile.response;
                let status = layout
                    .status_pointer
                    .as_deref()
                    .and_then(|p| body.pointer(p))
                    .and_then(scalar_string)?;
                if status.eq_ignore_ascii_case(&layout.success_value) {
                    return None;
                }
                let message = layout
                    .error_pointer
                    .as_deref()
                    .and_then(|p| body.pointer(p))
                    .and_then(scalar_string)
                    .unwrap_or(status);
                Some(message.to_lowercase())
            }
            Err(_) => Some(response.text().to_lowercase()),
        }
    }

    fn check_status(&self, body: &Value) -> Result<(), TrackerError> {
        let layout = &self.profile.response;
        let Some(pointer) = layout.status_pointer.as_deref() else {
            return Ok(());
        };
        let Some(status) = body.pointer(pointer).and_then(scalar_string) else {
            return Err(self.error(
                ErrorPhase::Parse,
                TrackerErrorKind::MalformedResponse(format!("missing status at {}", pointer)),
            ));
        };
        if status.eq_ignore_ascii_case(&layout.success_value) {
            return Ok(());
        }
        let message = layout
            .error_pointer
            .as_deref()
            .and_then(|p| body.pointer(p))
            .and_then(scalar_string)
            .unwrap_or_else(|| format!("status {}", status));
        Err(self.error(ErrorPhase::Query, TrackerErrorKind::Api(message)))
    }

    fn extract_rows(&self, body: &Value) -> Result<Vec<Value>, TrackerError> {
        let pointer = self.profile.response.rows_pointer.as_str();
        match body.pointer(pointer) {
            Some(Value::Array(rows)) => Ok(rows.clone()),
            Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Object(map)) if map.is_empty() => Ok(Vec::new()),
            None if parent_is_empty(body, pointer) => Ok(Vec::new()),
            _ => Err(self.error(
                ErrorPhase::Parse,
                TrackerErrorKind::MalformedResponse(format!("no result rows at {}", pointer)),
            )),
        }
    }

    /// Strip a known mirror prefix so the request follows failover.
    fn relative_to_mirror(&self, url: &str) -> String {
        for base in self.mirrors.urls() {
            let base = base.trim_end_matches('/');
            if let Some(rest) = url.strip_prefix(base) {
                if rest.is_empty() || rest.starts_with('/') {
                    return rest.trim_start_matches('/').to_string();
                }
            }
        }
        url.to_string()
    }

    fn error(&self, phase: ErrorPhase, kind: TrackerErrorKind) -> TrackerError {
        TrackerError::new(&self.profile.id, phase, kind)
    }
}

impl std::fmt::Debug for TrackerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerClient")
            .field("tracker", &self.profile.id)
            .field("mirrors", &self.mirrors.urls())
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[async_trait]
impl Tracker for TrackerClient {
    fn id(&self) -> &str {
        &self.profile.id
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, TrackerError> {
        TrackerClient::search(self, query).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, TrackerError> {
        TrackerClient::download(self, url).await
    }
}

const TOKENS_EXHAUSTED: &str = "no freeleech tokens left";

fn transport_kind(e: TransportError) -> TrackerErrorKind {
    match e {
        TransportError::Timeout => TrackerErrorKind::Timeout,
        other => TrackerErrorKind::Transport(other.to_string()),
    }
}

fn contains_any(haystack: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .any(|m| haystack.contains(&m.to_lowercase()))
}

/// Bencoded dictionaries start with `d` and a key length.
fn looks_like_torrent(body: &[u8]) -> bool {
    matches!(body, [b'd', second, ..] if second.is_ascii_digit())
}

fn parent_is_empty(body: &Value, pointer: &str) -> bool {
    let Some((parent, _)) = pointer.rsplit_once('/') else {
        return false;
    };
    match body.pointer(parent) {
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Null) => true,
        _ => false,
    }
}

fn query_pairs(url: &str) -> impl Iterator<Item = &str> {
    url.split_once('?')
        .map(|(_, q)| q)
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty())
}

fn has_param(url: &str, name: &str, value: &str) -> bool {
    let wanted = format!("{}={}", urlencoding::encode(name), urlencoding::encode(value));
    query_pairs(url).any(|pair| pair == wanted)
}

fn strip_param(url: &str, name: &str) -> String {
    let Some((path, _)) = url.split_once('?') else {
        return url.to_string();
    };
    let encoded = urlencoding::encode(name);
    let kept: Vec<&str> = query_pairs(url)
        .filter(|pair| pair.split('=').next() != Some(encoded.as_ref()))
        .collect();
    if kept.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, kept.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::testing::{fixtures, MockTransport};
    use serde_json::json;

    fn client_with(config: TrackerConfig, transport: Arc<MockTransport>) -> TrackerClient {
        let profile = TrackerProfile::from_config(&config).unwrap();
        TrackerClient::new(profile, transport).unwrap()
    }

    fn client(transport: Arc<MockTransport>) -> TrackerClient {
        client_with(fixtures::gazelle_config("t", "https://t.example"), transport)
    }

    #[test]
    fn test_strip_and_detect_param() {
        let url = "https://t.example/torrents.php?action=download&id=1&usetoken=1";
        assert!(has_param(url, "usetoken", "1"));
        assert_eq!(
            strip_param(url, "usetoken"),
            "https://t.example/torrents.php?action=download&id=1"
        );
        assert_eq!(strip_param("dl.php?usetoken=1", "usetoken"), "dl.php");
        assert!(!has_param("dl.php?id=1", "usetoken", "1"));
    }

    #[test]
    fn test_looks_like_torrent() {
        assert!(looks_like_torrent(b"d8:announce"));
        assert!(!looks_like_torrent(b"<html>"));
        assert!(!looks_like_torrent(b"d"));
    }

    #[tokio::test]
    async fn test_search_maps_gazelle_response() {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        transport.on(
            "ajax.php",
            fixtures::search_response(vec![fixtures::gazelle_group(
                10,
                "Abbey Road",
                vec![fixtures::gazelle_torrent(101), fixtures::gazelle_torrent(102)],
            )]),
        );
        let client = client(Arc::clone(&transport));

        let result = client.search(&SearchQuery::text("abbey road")).await.unwrap();
        assert_eq!(result.releases.len(), 2);
        assert_eq!(result.releases[0].torrent_id, "101");
        assert!(result.releases[0].title.contains("Abbey Road"));

        let sent = transport.requests();
        let search = sent.iter().find(|r| r.route() == "ajax.php").unwrap();
        assert_eq!(search.request.query_value("searchstr"), Some("abbey road"));
        assert_eq!(search.request.header_value("Cookie"), Some("session=s1"));
    }

    #[tokio::test]
    async fn test_empty_results_are_success() {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        transport.on(
            "ajax.php",
            TransportResponse::new(200, json!({"status": "success", "response": []}).to_string()),
        );
        let client = client(Arc::clone(&transport));

        let result = client.search(&SearchQuery::text("nothing")).await.unwrap();
        assert!(result.is_empty());
        assert!(result.row_failures.is_empty());
    }

    #[tokio::test]
    async fn test_api_failure_status() {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        transport.on(
            "ajax.php",
            TransportResponse::new(
                200,
                json!({"status": "failure", "error": "bad parameters"}).to_string(),
            ),
        );
        let client = client(transport);

        let err = client.search(&SearchQuery::text("x")).await.unwrap_err();
        assert_eq!(err.kind, TrackerErrorKind::Api("bad parameters".to_string()));
        assert_eq!(err.phase, ErrorPhase::Query);
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        transport.on("ajax.php", TransportResponse::new(200, "<html>maintenance</html>"));
        let client = client(transport);

        let err = client.search(&SearchQuery::text("x")).await.unwrap_err();
        assert!(matches!(err.kind, TrackerErrorKind::MalformedResponse(_)));
        assert_eq!(err.phase, ErrorPhase::Parse);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limit_from_status_and_marker() {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        transport.on(
            "ajax.php",
            TransportResponse::new(429, "").with_header("Retry-After", "30"),
        );
        let client = client(Arc::clone(&transport));

        let err = client.search(&SearchQuery::text("x")).await.unwrap_err();
        assert_eq!(
            err.kind,
            TrackerErrorKind::RateLimited {
                retry_after_secs: Some(30)
            }
        );
        assert!(err.is_retryable());

        transport.on(
            "ajax.php",
            TransportResponse::new(
                200,
                json!({"status": "failure", "error": "Rate limit exceeded"}).to_string(),
            ),
        );
        let err = client.search(&SearchQuery::text("x")).await.unwrap_err();
        assert_eq!(
            err.kind,
            TrackerErrorKind::RateLimited {
                retry_after_secs: None
            }
        );
        assert_eq!(transport.requests_to("login.php"), 1);
    }

    #[tokio::test]
    async fn test_marker_in_release_title_is_not_expiry() {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        transport.on(
            "ajax.php",
            fixtures::search_response(vec![fixtures::gazelle_group(
                1,
                "Not Logged In",
                vec![fixtures::gazelle_torrent(5)],
            )]),
        );
        let client = client(Arc::clone(&transport));

        let result = client.search(&SearchQuery::default()).await.unwrap();
        assert_eq!(result.releases.len(), 1);
        assert_eq!(transport.requests_to("login.php"), 1);
    }

    #[tokio::test]
    async fn test_invalid_credentials_surface_in_auth_phase() {
        let transport = Arc::new(MockTransport::new());
        transport.on(
            "login.php",
            TransportResponse::new(200, "Your username or password was incorrect."),
        );
        let client = client(Arc::clone(&transport));

        let err = client.search(&SearchQuery::text("x")).await.unwrap_err();
        assert_eq!(err.phase, ErrorPhase::Auth);
        assert!(matches!(err.kind, TrackerErrorKind::InvalidCredentials(_)));
        assert_eq!(transport.requests_to("ajax.php"), 0);
    }

    #[tokio::test]
    async fn test_transport_timeout_is_retryable() {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        transport.on_error("ajax.php", TransportError::Timeout);
        let client = client(transport);

        let err = client.search(&SearchQuery::text("x")).await.unwrap_err();
        assert_eq!(err.kind, TrackerErrorKind::Timeout);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_download_follows_storage_redirect() {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        transport.on(
            "torrents.php",
            TransportResponse::new(302, "").with_header("Location", "https://cdn.example/file.torrent"),
        );
        transport.on("file.torrent", TransportResponse::new(200, "d8:announce3:urle"));
        let client = client(Arc::clone(&transport));

        let body = client
            .download("https://t.example/torrents.php?action=download&id=1")
            .await
            .unwrap();
        assert_eq!(body, b"d8:announce3:urle");
    }

    #[tokio::test]
    async fn test_download_url_relative_to_active_mirror() {
        let transport = Arc::new(MockTransport::new());
        transport.on("login.php", fixtures::login_ok());
        transport.on("torrents.php", TransportResponse::new(200, "d4:infoe"));
        let client = client(Arc::clone(&transport));

        client
            .download("https://t.example/torrents.php?action=download&id=1")
            .await
            .unwrap();
        let sent = transport.requests();
        let download = sent.iter().find(|r| r.route() == "torrents.php").unwrap();
        assert_eq!(download.base_url, "https://t.example");
        assert!(!download.request.is_absolute());
    }
}
