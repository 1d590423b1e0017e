//! Mock transport for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// A request seen by the mock, with the base URL it was sent to.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub base_url: String,
    pub request: TransportRequest,
}

impl RecordedRequest {
    pub fn route(&self) -> String {
        route_key(&self.request)
    }
}

pub type Reply = Result<TransportResponse, TransportError>;

/// A request handler that produces replies dynamically.
type Handler = Box<dyn Fn(&str, &TransportRequest) -> Option<Reply> + Send + Sync>;

/// Mock implementation of the Transport trait.
///
/// Replies are routed by path (`ajax.php`, `login.php`), ignoring the query
/// string and, for absolute URLs, the host. Each route holds a queue of
/// replies; the last one repeats once the queue is drained. Unrouted
/// requests get a 404.
///
/// # Example
///
/// ```rust,ignore
/// use trackline_core::testing::MockTransport;
///
/// let transport = MockTransport::new();
/// transport.on("login.php", TransportResponse::new(302, "").with_header("Set-Cookie", "session=x"));
/// transport.on("ajax.php", TransportResponse::new(200, body));
///
/// // ... run the client ...
/// assert_eq!(transport.requests_to("login.php"), 1);
/// ```
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    failing_bases: Mutex<HashMap<String, TransportError>>,
    handler: Mutex<Option<Handler>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("routes", &"<routes>")
            .field("handler", &"<handler>")
            .field("requests", &self.request_count())
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            failing_bases: Mutex::new(HashMap::new()),
            handler: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    /// Always answer `path` with `response`.
    pub fn on(&self, path: &str, response: TransportResponse) {
        self.on_sequence(path, vec![Ok(response)]);
    }

    /// Answer `path` with `replies` in order, repeating the last.
    pub fn on_sequence(&self, path: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .unwrap()
            .insert(normalize(path), replies.into_iter().collect());
    }

    /// Fail every request to `path` with `error`.
    pub fn on_error(&self, path: &str, error: TransportError) {
        self.on_sequence(path, vec![Err(error)]);
    }

    /// Fail every request sent to `base_url`, whatever the path.
    pub fn fail_base(&self, base_url: &str, error: TransportError) {
        self.failing_bases
            .lock()
            .unwrap()
            .insert(base_url.to_string(), error);
    }

    /// Consulted before the routes; returning `None` falls through.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&str, &TransportRequest) -> Option<Reply> + Send + Sync + 'static,
    {
        *self.handler.lock().unwrap() = Some(Box::new(handler));
    }

    /// Delay every reply.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Number of requests routed to `path`.
    pub fn requests_to(&self, path: &str) -> usize {
        let path = normalize(path);
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route() == path)
            .count()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn reply(&self, base_url: &str, request: &TransportRequest) -> Reply {
        if let Some(error) = self.failing_bases.lock().unwrap().get(base_url) {
            return Err(error.clone());
        }

        if let Some(handler) = self.handler.lock().unwrap().as_ref() {
            if let Some(reply) = handler(base_url, request) {
                return reply;
            }
        }

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&route_key(request)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        base_url: &str,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            base_url: base_url.to_string(),
            request: request.clone(),
        });

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.reply(base_url, request)
    }
}

fn not_found() -> Reply {
    Ok(TransportResponse::new(404, "not found"))
}

fn normalize(path: &str) -> String {
    path.split('?')
        .next()
        .unwrap_or_default()
        .trim_start_matches('/')
        .to_string()
}

/// Path of a request without host or query string.
fn route_key(request: &TransportRequest) -> String {
    let path = if request.is_absolute() {
        let after_scheme = request
            .path
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&request.path);
        after_scheme
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or_default()
    } else {
        request.path.as_str()
    };
    normalize(path)
}
